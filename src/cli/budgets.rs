use chrono::{Datelike, Local};
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::budget::{BudgetAnalysis, BudgetService, SpendingLine};
use crate::cli::{print_json, BudgetsCommands, Context};
use crate::error::{PocketbookError, Result};
use crate::fmt::{money, pct};
use crate::models::{Budget, PeriodType};
use crate::period::month_name;

pub(crate) fn period_label(budget: &Budget) -> String {
    match budget.month {
        Some(m) => format!("{} {}", month_name(m), budget.year),
        None => budget.year.to_string(),
    }
}

fn usage_cell(line: &SpendingLine) -> Cell {
    let text = pct(line.percentage_used);
    if line.is_over_budget {
        Cell::new(text.red().bold())
    } else if line.percentage_used >= rust_decimal::Decimal::from(80) {
        Cell::new(text.yellow())
    } else {
        Cell::new(text.green())
    }
}

pub(crate) fn print_analysis(analysis: &BudgetAnalysis) {
    let mut table = Table::new();
    table.set_header(vec!["Category", "Allocated", "Spent", "Remaining", "Used"]);
    for c in &analysis.categories {
        table.add_row(vec![
            Cell::new(&c.category_name),
            Cell::new(money(c.line.allocated)),
            Cell::new(money(c.line.spent)),
            Cell::new(money(c.line.remaining)),
            usage_cell(&c.line),
        ]);
    }
    let t = &analysis.totals;
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money(t.allocated)),
        Cell::new(money(t.spent)),
        Cell::new(money(t.remaining)),
        usage_cell(t),
    ]);
    println!(
        "Budget: {} ({})\n{table}",
        analysis.budget.name,
        period_label(&analysis.budget)
    );
    if t.is_over_budget {
        println!("{}", "Over budget".red().bold());
    }
}

pub fn dispatch(ctx: &Context, command: BudgetsCommands) -> Result<()> {
    let today = Local::now().date_naive();
    match command {
        BudgetsCommands::Create {
            name,
            period,
            year,
            month,
            description,
        } => {
            let month = match period {
                PeriodType::Monthly => Some(month.unwrap_or(today.month())),
                PeriodType::Yearly => None,
            };
            create(ctx, &name, period, year.unwrap_or(today.year()), month, description.as_deref())
        }
        BudgetsCommands::Allocate {
            budget_id,
            category,
            amount,
            description,
        } => {
            let conn = ctx.connect()?;
            let alloc = BudgetService::new(&conn).add_category(
                budget_id,
                &category,
                amount,
                description.as_deref(),
            )?;
            if ctx.json {
                return print_json(&alloc);
            }
            println!(
                "Allocated {} to {} in budget #{}",
                money(alloc.allocated_amount),
                alloc.category_name,
                alloc.budget_id
            );
            Ok(())
        }
        BudgetsCommands::List { all } => list(ctx, !all),
        BudgetsCommands::Show { id } => show(ctx, id),
        BudgetsCommands::Current { year, month, yearly } => {
            let year = year.unwrap_or(today.year());
            let month = if yearly {
                None
            } else {
                Some(month.unwrap_or(today.month()))
            };
            current(ctx, year, month)
        }
        BudgetsCommands::Delete { id } => {
            let conn = ctx.connect()?;
            if !BudgetService::new(&conn).delete(id)? {
                return Err(PocketbookError::not_found("Budget", id));
            }
            println!("Deleted budget #{id}");
            Ok(())
        }
    }
}

fn create(
    ctx: &Context,
    name: &str,
    period: PeriodType,
    year: i32,
    month: Option<u32>,
    description: Option<&str>,
) -> Result<()> {
    let conn = ctx.connect()?;
    let budget = BudgetService::new(&conn).create(name, period, year, month, description)?;
    if ctx.json {
        return print_json(&budget);
    }
    println!(
        "Created {} budget #{}: {} ({})",
        budget.period_type,
        budget.id,
        budget.name,
        period_label(&budget)
    );
    Ok(())
}

fn list(ctx: &Context, active_only: bool) -> Result<()> {
    let conn = ctx.connect()?;
    let budgets = BudgetService::new(&conn).list(active_only)?;
    if ctx.json {
        return print_json(&budgets);
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Period", "Active"]);
    for b in &budgets {
        table.add_row(vec![
            Cell::new(b.id),
            Cell::new(&b.name),
            Cell::new(b.period_type),
            Cell::new(period_label(b)),
            Cell::new(if b.is_active { "yes" } else { "no" }),
        ]);
    }
    println!("Budgets\n{table}");
    Ok(())
}

fn show(ctx: &Context, id: i64) -> Result<()> {
    let conn = ctx.connect()?;
    let analysis = BudgetService::new(&conn).analyze(id)?;
    if ctx.json {
        return print_json(&analysis);
    }
    print_analysis(&analysis);
    Ok(())
}

fn current(ctx: &Context, year: i32, month: Option<u32>) -> Result<()> {
    let conn = ctx.connect()?;
    let svc = BudgetService::new(&conn);
    let Some(budget) = svc.current(year, month)? else {
        let period = match month {
            Some(m) => format!("{} {year}", month_name(m)),
            None => year.to_string(),
        };
        println!("No active budget for {period}.");
        return Ok(());
    };
    let analysis = svc.analyze(budget.id)?;
    if ctx.json {
        return print_json(&analysis);
    }
    print_analysis(&analysis);
    Ok(())
}
