use serde::Serialize;

use crate::cli::{print_json, Context};
use crate::error::Result;
use crate::settings::settings_path;

#[derive(Serialize)]
struct Counts {
    categories: i64,
    accounts: i64,
    transactions: i64,
    budgets: i64,
    investments: i64,
    goals: i64,
}

fn format_bytes(bytes: u64) -> String {
    match bytes {
        b if b >= 1 << 20 => format!("{:.1} MB", b as f64 / (1u64 << 20) as f64),
        b if b >= 1 << 10 => format!("{:.1} KB", b as f64 / (1u64 << 10) as f64),
        b => format!("{b} B"),
    }
}

pub fn run(ctx: &Context) -> Result<()> {
    let db_path = ctx.db_path();

    if !db_path.exists() {
        println!("Settings:   {}", settings_path().display());
        println!("Database:   {}", db_path.display());
        println!();
        println!("Database not found. Run `pocketbook init` to set up.");
        return Ok(());
    }

    let conn = ctx.connect()?;
    let count = |table: &str| -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?)
    };
    let counts = Counts {
        categories: count("categories")?,
        accounts: count("accounts")?,
        transactions: count("transactions")?,
        budgets: count("budgets")?,
        investments: count("investments")?,
        goals: count("goals")?,
    };

    if ctx.json {
        return print_json(&counts);
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("Settings:   {}", settings_path().display());
    println!("Database:   {}", db_path.display());
    println!("DB size:    {}", format_bytes(size));
    println!("Currency:   {}", ctx.settings.default_currency);
    println!();
    println!("Categories:    {}", counts.categories);
    println!("Accounts:      {}", counts.accounts);
    println!("Transactions:  {}", counts.transactions);
    println!("Budgets:       {}", counts.budgets);
    println!("Investments:   {}", counts.investments);
    println!("Goals:         {}", counts.goals);
    Ok(())
}
