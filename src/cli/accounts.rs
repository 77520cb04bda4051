use comfy_table::{Cell, Table};

use crate::catalog::{add_account, list_accounts, NewAccount};
use crate::cli::{print_json, AccountsCommands, Context};
use crate::error::Result;
use crate::fmt::money;

pub fn dispatch(ctx: &Context, command: AccountsCommands) -> Result<()> {
    match command {
        AccountsCommands::Add {
            name,
            account_type,
            balance,
            credit_limit,
            closing_day,
            due_day,
        } => add(
            ctx,
            NewAccount {
                name,
                account_type,
                balance,
                credit_limit,
                closing_day,
                due_day,
            },
        ),
        AccountsCommands::List => list(ctx),
    }
}

fn add(ctx: &Context, input: NewAccount) -> Result<()> {
    let conn = ctx.connect()?;
    let account = add_account(&conn, input)?;
    if ctx.json {
        return print_json(&account);
    }
    println!("Added account: {} ({})", account.name, account.account_type);
    Ok(())
}

fn list(ctx: &Context) -> Result<()> {
    let conn = ctx.connect()?;
    let accounts = list_accounts(&conn)?;
    if ctx.json {
        return print_json(&accounts);
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Balance", "Credit Limit", "Closing", "Due"]);
    for a in accounts {
        table.add_row(vec![
            Cell::new(a.id),
            Cell::new(a.name),
            Cell::new(a.account_type),
            Cell::new(money(a.balance)),
            Cell::new(a.credit_limit.map(money).unwrap_or_default()),
            Cell::new(a.closing_day.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(a.due_day.map(|d| d.to_string()).unwrap_or_default()),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}
