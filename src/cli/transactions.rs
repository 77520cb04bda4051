use std::fs::File;
use std::io;
use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{print_json, Context, FilterArgs, TransactionsCommands};
use crate::error::{PocketbookError, Result};
use crate::fmt::money;
use crate::ledger::{NewTransaction, TransactionFilter, TransactionService, TransactionUpdate};
use crate::models::{Transaction, TransactionType};

impl From<FilterArgs> for TransactionFilter {
    fn from(args: FilterArgs) -> Self {
        TransactionFilter {
            transaction_type: args.transaction_type,
            category_name: args.category,
            account_name: args.account,
            start_date: args.from_date,
            end_date: args.to_date,
            min_amount: args.min,
            max_amount: args.max,
            tags: args.tags,
            search: args.search,
            order: args.order,
            offset: args.offset,
            limit: args.limit,
        }
    }
}

fn signed_amount(t: &Transaction) -> String {
    match t.transaction_type {
        TransactionType::Income => format!("+{}", money(t.amount)).green().to_string(),
        TransactionType::Expense => format!("-{}", money(t.amount)).red().to_string(),
        TransactionType::Transfer => money(t.amount).blue().to_string(),
    }
}

pub fn dispatch(ctx: &Context, command: TransactionsCommands) -> Result<()> {
    match command {
        TransactionsCommands::Add {
            amount,
            description,
            transaction_type,
            category,
            account,
            payment_method,
            tags,
            notes,
            date,
        } => {
            let mut input = NewTransaction::new(amount, description, transaction_type)
                .category(category.unwrap_or_else(|| ctx.settings.default_category.clone()))
                .account(account.unwrap_or_else(|| ctx.settings.default_account.clone()))
                .payment_method(payment_method)
                .tags(tags);
            input.notes = notes;
            input.date = date;
            add(ctx, input)
        }
        TransactionsCommands::List { filter } => list(ctx, filter.into()),
        TransactionsCommands::Show { id } => show(ctx, id),
        TransactionsCommands::Edit {
            id,
            amount,
            description,
            transaction_type,
            category,
            account,
            payment_method,
            tags,
            notes,
            date,
        } => edit(
            ctx,
            id,
            TransactionUpdate {
                amount,
                description,
                transaction_type,
                payment_method,
                tags,
                notes: notes.map(|n| Some(n).filter(|n| !n.trim().is_empty())),
                date,
                category_name: category,
                account_name: account,
            },
        ),
        TransactionsCommands::Delete { id } => delete(ctx, id),
        TransactionsCommands::Summary {
            from_date,
            to_date,
            account,
        } => summary(ctx, from_date, to_date, account.as_deref()),
        TransactionsCommands::Export { output, filter } => export(ctx, output, filter.into()),
    }
}

fn add(ctx: &Context, input: NewTransaction) -> Result<()> {
    let conn = ctx.connect()?;
    let t = TransactionService::new(&conn).create(input)?;
    if ctx.json {
        return print_json(&t);
    }
    println!(
        "Added {} #{}: {} {} ({})",
        t.transaction_type,
        t.id,
        t.description,
        money(t.amount),
        t.category_name.as_deref().unwrap_or("-")
    );
    Ok(())
}

fn list(ctx: &Context, filter: TransactionFilter) -> Result<()> {
    let conn = ctx.connect()?;
    let rows = TransactionService::new(&conn).list(&filter)?;
    if ctx.json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Category", "Account", "Amount", "Tags"]);
    for t in &rows {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.date),
            Cell::new(&t.description),
            Cell::new(t.category_name.as_deref().unwrap_or("")),
            Cell::new(t.account_name.as_deref().unwrap_or("")),
            Cell::new(signed_amount(t)),
            Cell::new(t.tags.join(", ")),
        ]);
    }
    println!("Transactions\n{table}");
    Ok(())
}

fn show(ctx: &Context, id: i64) -> Result<()> {
    let conn = ctx.connect()?;
    let t = TransactionService::new(&conn)
        .get(id)?
        .ok_or_else(|| PocketbookError::not_found("Transaction", id))?;
    if ctx.json {
        return print_json(&t);
    }
    println!("Transaction #{}", t.id);
    println!("  Date:         {}", t.date);
    println!("  Description:  {}", t.description);
    println!("  Type:         {}", t.transaction_type);
    println!("  Amount:       {}", signed_amount(&t));
    println!("  Category:     {}", t.category_name.as_deref().unwrap_or("-"));
    println!("  Account:      {}", t.account_name.as_deref().unwrap_or("-"));
    println!("  Payment:      {}", t.payment_method);
    if !t.tags.is_empty() {
        println!("  Tags:         {}", t.tags.join(", "));
    }
    if let Some(notes) = &t.notes {
        println!("  Notes:        {notes}");
    }
    println!("  Updated:      {}", t.updated_at);
    Ok(())
}

fn edit(ctx: &Context, id: i64, changes: TransactionUpdate) -> Result<()> {
    let conn = ctx.connect()?;
    let t = TransactionService::new(&conn)
        .update(id, changes)?
        .ok_or_else(|| PocketbookError::not_found("Transaction", id))?;
    if ctx.json {
        return print_json(&t);
    }
    println!("Updated transaction #{}: {} {}", t.id, t.description, money(t.amount));
    Ok(())
}

fn delete(ctx: &Context, id: i64) -> Result<()> {
    let conn = ctx.connect()?;
    if !TransactionService::new(&conn).delete(id)? {
        return Err(PocketbookError::not_found("Transaction", id));
    }
    println!("Deleted transaction #{id}");
    Ok(())
}

fn summary(
    ctx: &Context,
    from_date: Option<chrono::NaiveDate>,
    to_date: Option<chrono::NaiveDate>,
    account: Option<&str>,
) -> Result<()> {
    let conn = ctx.connect()?;
    let s = TransactionService::new(&conn).summary(from_date, to_date, account)?;
    if ctx.json {
        return print_json(&s);
    }

    let period = match (s.start_date, s.end_date) {
        (Some(a), Some(b)) => format!("{a} to {b}"),
        (Some(a), None) => format!("since {a}"),
        (None, Some(b)) => format!("through {b}"),
        (None, None) => "all time".to_string(),
    };
    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![Cell::new("Income".green().bold()), Cell::new(money(s.income_total))]);
    table.add_row(vec![Cell::new("Expenses".red().bold()), Cell::new(money(s.expense_total))]);
    let balance_label = if s.balance.is_sign_negative() {
        "Balance".red().bold()
    } else {
        "Balance".green().bold()
    };
    table.add_row(vec![Cell::new(balance_label), Cell::new(money(s.balance))]);
    table.add_row(vec![Cell::new("Transactions"), Cell::new(s.transaction_count)]);
    println!("Summary ({period})\n{table}");

    if !s.top_categories.is_empty() {
        let mut top = Table::new();
        top.set_header(vec!["Category", "Spent"]);
        for c in &s.top_categories {
            top.add_row(vec![Cell::new(&c.name), Cell::new(money(c.amount))]);
        }
        println!("\nTop Expense Categories\n{top}");
    }
    Ok(())
}

fn export(ctx: &Context, output: Option<PathBuf>, filter: TransactionFilter) -> Result<()> {
    let conn = ctx.connect()?;
    let svc = TransactionService::new(&conn);
    match output {
        Some(path) => {
            let count = svc.export_csv(&filter, File::create(&path)?)?;
            eprintln!("Exported {count} transactions to {}", path.display());
        }
        None => {
            svc.export_csv(&filter, io::stdout().lock())?;
        }
    }
    Ok(())
}
