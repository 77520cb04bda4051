use chrono::{Datelike, Local};
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::budgets::print_analysis;
use crate::cli::investments::print_portfolio;
use crate::cli::{print_json, Context, ReportsCommands};
use crate::error::Result;
use crate::fmt::{money, pct, signed_pct};
use crate::ledger::TransactionSummary;
use crate::reports::{ReportService, Trend};

fn trend_cell(change: rust_decimal::Decimal, trend: Trend) -> Cell {
    let text = format!("{} ({trend})", signed_pct(change));
    match trend {
        Trend::Up => Cell::new(text.green()),
        Trend::Down => Cell::new(text.red()),
        Trend::Stable => Cell::new(text),
    }
}

fn print_summary(title: &str, s: &TransactionSummary) {
    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![Cell::new("Income".green().bold()), Cell::new(money(s.income_total))]);
    table.add_row(vec![Cell::new("Expenses".red().bold()), Cell::new(money(s.expense_total))]);
    table.add_row(vec![Cell::new("Net".bold()), Cell::new(money(s.balance))]);
    table.add_row(vec![Cell::new("Transactions"), Cell::new(s.transaction_count)]);
    for c in &s.top_categories {
        table.add_row(vec![Cell::new(format!("  {}", c.name)), Cell::new(money(c.amount))]);
    }
    println!("{title}\n{table}");
}

pub fn dispatch(ctx: &Context, command: ReportsCommands) -> Result<()> {
    let today = Local::now().date_naive();
    let conn = ctx.connect()?;
    let svc = ReportService::new(&conn);
    match command {
        ReportsCommands::Monthly { year, month } => {
            let report = svc.monthly(year.unwrap_or(today.year()), month.unwrap_or(today.month()))?;
            if ctx.json {
                return print_json(&report);
            }
            print_summary(
                &format!("Monthly Report: {} {}", report.month_name, report.year),
                &report.transactions,
            );

            let t = &report.trends;
            let mut trend = Table::new();
            trend.set_header(vec!["", "Previous", "Current", "Change"]);
            trend.add_row(vec![
                Cell::new("Income"),
                Cell::new(money(t.previous.income_total)),
                Cell::new(money(report.transactions.income_total)),
                trend_cell(t.income_change, t.income_trend),
            ]);
            trend.add_row(vec![
                Cell::new("Expenses"),
                Cell::new(money(t.previous.expense_total)),
                Cell::new(money(report.transactions.expense_total)),
                trend_cell(t.expense_change, t.expense_trend),
            ]);
            println!("\nTrend vs {}-{:02}\n{trend}", t.previous_year, t.previous_month);

            if let Some(budget) = &report.budget {
                println!();
                print_analysis(budget);
            }
            if report.investments.investments_count > 0 {
                println!();
                print_portfolio(&report.investments);
            }
        }
        ReportsCommands::Yearly { year } => {
            let report = svc.yearly(year.unwrap_or(today.year()))?;
            if ctx.json {
                return print_json(&report);
            }
            print_summary(&format!("Yearly Report: {}", report.year), &report.annual_summary);

            let mut months = Table::new();
            months.set_header(vec!["Month", "Income", "Expenses", "Net", "Count"]);
            for m in &report.months {
                months.add_row(vec![
                    Cell::new(m.month_name),
                    Cell::new(money(m.summary.income_total)),
                    Cell::new(money(m.summary.expense_total)),
                    Cell::new(money(m.summary.balance)),
                    Cell::new(m.summary.transaction_count),
                ]);
            }
            println!("\nBy Month\n{months}");

            let g = &report.growth;
            let mut growth = Table::new();
            growth.set_header(vec!["", &format!("{}", report.year - 1), &format!("{}", report.year), "Growth"]);
            for (label, prev, cur, change) in [
                ("Income", g.previous.income_total, report.annual_summary.income_total, g.income_growth),
                ("Expenses", g.previous.expense_total, report.annual_summary.expense_total, g.expense_growth),
                ("Net", g.previous.balance, report.annual_summary.balance, g.net_growth),
            ] {
                growth.add_row(vec![
                    Cell::new(label),
                    Cell::new(money(prev)),
                    Cell::new(money(cur)),
                    trend_cell(change, Trend::of(change)),
                ]);
            }
            println!("\nYear over Year\n{growth}");
        }
        ReportsCommands::Categories {
            from_date,
            to_date,
            category,
        } => {
            let report = svc.category_breakdown(from_date, to_date, category.as_deref())?;
            if ctx.json {
                return print_json(&report);
            }
            let mut table = Table::new();
            table.set_header(vec!["Category", "Income", "Expense", "Net", "Count", "Average"]);
            for c in &report.categories {
                table.add_row(vec![
                    Cell::new(&c.name),
                    Cell::new(money(c.income)),
                    Cell::new(money(c.expense)),
                    Cell::new(money(c.net)),
                    Cell::new(c.transaction_count),
                    Cell::new(money(c.average)),
                ]);
            }
            table.add_row(vec![
                Cell::new("Total".bold()),
                Cell::new(money(report.total_income)),
                Cell::new(money(report.total_expense)),
                Cell::new(money(report.total_income - report.total_expense)),
                Cell::new(report.total_transactions),
                Cell::new(""),
            ]);
            println!("Categories {} to {}\n{table}", report.start_date, report.end_date);
        }
        ReportsCommands::Cashflow {
            from_date,
            to_date,
            granularity,
        } => {
            let report = svc.cash_flow(from_date, to_date, granularity)?;
            if ctx.json {
                return print_json(&report);
            }
            let mut table = Table::new();
            table.set_header(vec!["Period", "Income", "Expense", "Net", "Balance", "Count"]);
            for b in &report.buckets {
                let period = if b.period_start == b.period_end {
                    b.period_start.to_string()
                } else {
                    format!("{} to {}", b.period_start, b.period_end)
                };
                let balance = money(b.running_balance);
                let balance = if b.running_balance.is_sign_negative() && !b.running_balance.is_zero() {
                    balance.red()
                } else {
                    balance.normal()
                };
                table.add_row(vec![
                    Cell::new(period),
                    Cell::new(money(b.income)),
                    Cell::new(money(b.expense)),
                    Cell::new(money(b.net)),
                    Cell::new(balance),
                    Cell::new(b.transaction_count),
                ]);
            }
            println!(
                "Cash Flow ({}) {} to {}\n{table}",
                report.granularity, report.start_date, report.end_date
            );
            println!(
                "Income {}  Expense {}  Net {}  ({} of income spent)",
                money(report.total_income),
                money(report.total_expense),
                money(report.net_flow),
                pct(crate::models::percent_of(report.total_expense, report.total_income))
            );
        }
    }
    Ok(())
}
