use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::cli::{print_json, Context, InvestmentsCommands};
use crate::error::{PocketbookError, Result};
use crate::fmt::{money, pct};
use crate::investment::{InvestmentService, NewInvestment, Performer, PortfolioSummary};

fn return_cell(amount: Decimal, percentage: Decimal) -> Cell {
    let text = format!("{} ({})", money(amount), pct(percentage));
    if amount.is_sign_negative() && !amount.is_zero() {
        Cell::new(text.red())
    } else {
        Cell::new(text.green())
    }
}

fn performer_table(title: &str, performers: &[Performer]) {
    if performers.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Invested", "Value", "Return"]);
    for p in performers {
        table.add_row(vec![
            Cell::new(p.id),
            Cell::new(&p.name),
            Cell::new(p.investment_type),
            Cell::new(money(p.invested)),
            Cell::new(money(p.current_value)),
            return_cell(p.return_amount, p.return_percentage),
        ]);
    }
    println!("\n{title}\n{table}");
}

pub(crate) fn print_portfolio(summary: &PortfolioSummary) {
    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![Cell::new("Invested"), Cell::new(money(summary.total_invested))]);
    table.add_row(vec![Cell::new("Current value"), Cell::new(money(summary.current_value))]);
    table.add_row(vec![
        Cell::new("Return".bold()),
        return_cell(summary.total_return, summary.return_percentage),
    ]);
    table.add_row(vec![Cell::new("Holdings"), Cell::new(summary.investments_count)]);
    println!("Portfolio\n{table}");

    if !summary.by_type.is_empty() {
        let mut types = Table::new();
        types.set_header(vec!["Type", "Count", "Invested", "Value", "Return"]);
        for (kind, bucket) in &summary.by_type {
            types.add_row(vec![
                Cell::new(kind),
                Cell::new(bucket.count),
                Cell::new(money(bucket.invested)),
                Cell::new(money(bucket.current_value)),
                Cell::new(money(bucket.return_amount)),
            ]);
        }
        println!("\nBy Type\n{types}");
    }
    performer_table("Top Performers", &summary.top_performers);
    performer_table("Worst Performers", &summary.worst_performers);
}

pub fn dispatch(ctx: &Context, command: InvestmentsCommands) -> Result<()> {
    let conn = ctx.connect()?;
    let svc = InvestmentService::new(&conn);
    match command {
        InvestmentsCommands::Add {
            name,
            investment_type,
            amount,
            current,
            shares,
            price,
            date,
            description,
        } => {
            let inv = svc.create(NewInvestment {
                current_value: current,
                shares,
                purchase_price: price,
                purchase_date: date,
                description,
                ..NewInvestment::new(name, investment_type, amount)
            })?;
            if ctx.json {
                return print_json(&inv);
            }
            println!(
                "Added {} #{}: {} ({})",
                inv.investment_type,
                inv.id,
                inv.name,
                money(inv.initial_amount)
            );
        }
        InvestmentsCommands::List { all, investment_type } => {
            let investments = svc.list(!all, investment_type)?;
            if ctx.json {
                return print_json(&investments);
            }
            let mut table = Table::new();
            table.set_header(vec!["ID", "Name", "Type", "Purchased", "Invested", "Value", "Return", "Shares"]);
            for inv in &investments {
                table.add_row(vec![
                    Cell::new(inv.id),
                    Cell::new(&inv.name),
                    Cell::new(inv.investment_type),
                    Cell::new(inv.purchase_date),
                    Cell::new(money(inv.initial_amount)),
                    Cell::new(money(inv.current_value)),
                    return_cell(inv.return_amount(), inv.return_percentage()),
                    Cell::new(inv.shares.map(|s| s.to_string()).unwrap_or_default()),
                ]);
            }
            println!("Investments\n{table}");
        }
        InvestmentsCommands::UpdateValue { id, value, date } => {
            let inv = svc
                .update_value(id, value, date)?
                .ok_or_else(|| PocketbookError::not_found("Investment", id))?;
            if ctx.json {
                return print_json(&inv);
            }
            println!(
                "{}: {} -> {} ({})",
                inv.name,
                money(inv.initial_amount),
                money(inv.current_value),
                pct(inv.return_percentage())
            );
        }
        InvestmentsCommands::Performance { id } => {
            let perf = svc.performance(id)?;
            if ctx.json {
                return print_json(&perf);
            }
            let inv = &perf.investment;
            let mut table = Table::new();
            table.set_header(vec!["", "Value"]);
            table.add_row(vec![Cell::new("Type"), Cell::new(inv.investment_type)]);
            table.add_row(vec![Cell::new("Purchased"), Cell::new(inv.purchase_date)]);
            table.add_row(vec![Cell::new("Invested"), Cell::new(money(inv.initial_amount))]);
            table.add_row(vec![Cell::new("Current value"), Cell::new(money(inv.current_value))]);
            table.add_row(vec![
                Cell::new("Return".bold()),
                return_cell(perf.total_return, perf.return_percentage),
            ]);
            table.add_row(vec![Cell::new("Holding days"), Cell::new(perf.holding_days)]);
            table.add_row(vec![Cell::new("Annualized"), Cell::new(pct(perf.annualized_return))]);
            table.add_row(vec![Cell::new("Dividends"), Cell::new(money(perf.total_dividends))]);
            println!("{} (as of {})\n{table}", inv.name, perf.as_of);
        }
        InvestmentsCommands::Portfolio => {
            let summary = svc.portfolio_summary()?;
            if ctx.json {
                return print_json(&summary);
            }
            print_portfolio(&summary);
        }
        InvestmentsCommands::Dividend {
            id,
            amount,
            date,
            notes,
        } => {
            let dividend = svc.add_dividend(id, amount, date, notes.as_deref())?;
            if ctx.json {
                return print_json(&dividend);
            }
            println!(
                "Recorded dividend of {} on {} for investment #{}",
                money(dividend.amount),
                dividend.payment_date,
                dividend.investment_id
            );
        }
        InvestmentsCommands::Delete { id } => {
            if !svc.delete(id)? {
                return Err(PocketbookError::not_found("Investment", id));
            }
            println!("Deleted investment #{id}");
        }
    }
    Ok(())
}
