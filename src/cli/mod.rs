pub mod accounts;
pub mod budgets;
pub mod categories;
pub mod goals;
pub mod init;
pub mod investments;
pub mod reports;
pub mod status;
pub mod transactions;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{get_connection, init_db};
use crate::error::{PocketbookError, Result};
use crate::ledger::TransactionOrder;
use crate::models::{AccountType, InvestmentType, PaymentMethod, PeriodType, TransactionType};
use crate::reports::Granularity;
use crate::settings::Settings;

/// What every command handler needs: resolved settings, the `--db`
/// override and the output mode.
pub struct Context {
    pub settings: Settings,
    pub db_override: Option<PathBuf>,
    pub json: bool,
}

impl Context {
    pub fn db_path(&self) -> PathBuf {
        self.settings.db_path(self.db_override.as_deref())
    }

    /// Open the database, which must already have been created by `init`.
    pub fn connect(&self) -> Result<Connection> {
        let path = self.db_path();
        if !path.exists() {
            return Err(PocketbookError::Settings(format!(
                "database not found at {}; run `pocketbook init` first",
                path.display()
            )));
        }
        let conn = get_connection(&path)?;
        init_db(&conn)?;
        Ok(conn)
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Parser)]
#[command(name = "pocketbook", version, about = "Personal finance ledger: transactions, budgets, investments and reports.")]
pub struct Cli {
    /// Database file (default: <data_dir>/pocketbook.db)
    #[arg(long, global = true, env = "POCKETBOOK_DB")]
    pub db: Option<PathBuf>,
    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database (and optionally choose a data directory).
    Init {
        /// Directory for pocketbook data
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Show configuration and record counts.
    Status,
    /// Record and query transactions.
    #[command(alias = "tx")]
    Transactions {
        #[command(subcommand)]
        command: TransactionsCommands,
    },
    /// Manage categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Plan spending per category.
    Budgets {
        #[command(subcommand)]
        command: BudgetsCommands,
    },
    /// Track investment holdings.
    Investments {
        #[command(subcommand)]
        command: InvestmentsCommands,
    },
    /// Track savings goals.
    Goals {
        #[command(subcommand)]
        command: GoalsCommands,
    },
    /// Generate reports.
    Reports {
        #[command(subcommand)]
        command: ReportsCommands,
    },
}

/// Transaction filters shared by `list` and `export`.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// income, expense or transfer
    #[arg(long = "type")]
    pub transaction_type: Option<TransactionType>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub account: Option<String>,
    /// First date, inclusive (YYYY-MM-DD)
    #[arg(long = "from")]
    pub from_date: Option<NaiveDate>,
    /// Last date, inclusive (YYYY-MM-DD)
    #[arg(long = "to")]
    pub to_date: Option<NaiveDate>,
    #[arg(long)]
    pub min: Option<Decimal>,
    #[arg(long)]
    pub max: Option<Decimal>,
    /// Require this tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Case-insensitive text in description or notes
    #[arg(long)]
    pub search: Option<String>,
    /// date_desc, date_asc, amount_desc or amount_asc
    #[arg(long, default_value = "date_desc")]
    pub order: TransactionOrder,
    #[arg(long, default_value = "0")]
    pub offset: usize,
    #[arg(long, default_value = "50")]
    pub limit: usize,
}

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// Record a transaction.
    Add {
        amount: Decimal,
        description: String,
        /// income, expense or transfer
        #[arg(long = "type", default_value = "expense")]
        transaction_type: TransactionType,
        /// Category name (created if new)
        #[arg(long)]
        category: Option<String>,
        /// Account name (created if new)
        #[arg(long)]
        account: Option<String>,
        /// cash, credit_card, debit_card, bank_transfer, digital_wallet, other
        #[arg(long = "payment", default_value = "cash")]
        payment_method: PaymentMethod,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Transaction date (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List transactions.
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show one transaction.
    Show { id: i64 },
    /// Change fields of a transaction.
    Edit {
        id: i64,
        #[arg(long)]
        amount: Option<Decimal>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "type")]
        transaction_type: Option<TransactionType>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        account: Option<String>,
        #[arg(long = "payment")]
        payment_method: Option<PaymentMethod>,
        /// Replace all tags (repeatable)
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
        /// New notes (an empty value clears them)
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete a transaction.
    Delete { id: i64 },
    /// Income, expense and top categories over a period.
    Summary {
        #[arg(long = "from")]
        from_date: Option<NaiveDate>,
        #[arg(long = "to")]
        to_date: Option<NaiveDate>,
        #[arg(long)]
        account: Option<String>,
    },
    /// Export transactions to CSV.
    Export {
        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a category.
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Hex color, e.g. #10B981
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// List categories.
    List {
        /// Include deactivated categories
        #[arg(long)]
        all: bool,
    },
    /// Deactivate a category by name.
    Deactivate { name: String },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add an account.
    Add {
        name: String,
        /// bank, credit_card, cash or general
        #[arg(long = "type", default_value = "general")]
        account_type: AccountType,
        #[arg(long, default_value = "0")]
        balance: Decimal,
        #[arg(long = "credit-limit")]
        credit_limit: Option<Decimal>,
        #[arg(long = "closing-day")]
        closing_day: Option<u32>,
        #[arg(long = "due-day")]
        due_day: Option<u32>,
    },
    /// List accounts.
    List,
}

#[derive(Subcommand)]
pub enum BudgetsCommands {
    /// Create a budget for a month or a year.
    Create {
        name: String,
        /// monthly or yearly
        #[arg(long, default_value = "monthly")]
        period: PeriodType,
        #[arg(long)]
        year: Option<i32>,
        /// 1-12 (monthly budgets)
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Allocate an amount to a category.
    Allocate {
        budget_id: i64,
        category: String,
        amount: Decimal,
        #[arg(long)]
        description: Option<String>,
    },
    /// List budgets.
    List {
        #[arg(long)]
        all: bool,
    },
    /// Spent versus allocated for a budget.
    Show { id: i64 },
    /// Analyse the active budget for a period (default: this month).
    Current {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        /// Look up the yearly budget instead of a monthly one
        #[arg(long)]
        yearly: bool,
    },
    /// Delete a budget and its allocations.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum InvestmentsCommands {
    /// Add a holding.
    Add {
        name: String,
        /// stock, bond, fund, crypto, real_estate, other
        #[arg(long = "type")]
        investment_type: InvestmentType,
        /// Amount invested
        #[arg(long)]
        amount: Decimal,
        /// Current value (default: amount invested)
        #[arg(long)]
        current: Option<Decimal>,
        #[arg(long)]
        shares: Option<Decimal>,
        /// Purchase price per share
        #[arg(long)]
        price: Option<Decimal>,
        /// Purchase date (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List holdings.
    List {
        #[arg(long)]
        all: bool,
        #[arg(long = "type")]
        investment_type: Option<InvestmentType>,
    },
    /// Record the current value of a holding.
    UpdateValue {
        id: i64,
        value: Decimal,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Return and annualized return of one holding.
    Performance { id: i64 },
    /// Portfolio totals, allocation by type, best and worst performers.
    Portfolio,
    /// Record a dividend payment.
    Dividend {
        id: i64,
        amount: Decimal,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a holding and its dividends.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum GoalsCommands {
    /// Add a savings goal.
    Add {
        name: String,
        target: Decimal,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// 1 = high, 2 = medium, 3 = low
        #[arg(long, default_value = "1")]
        priority: u8,
        #[arg(long)]
        description: Option<String>,
    },
    /// List goals.
    List {
        #[arg(long)]
        all: bool,
    },
    /// Add money to a goal.
    Contribute { id: i64, amount: Decimal },
    /// Delete a goal.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum ReportsCommands {
    /// Month summary with budget, portfolio and trend (default: this month).
    Monthly {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Year summary with a month-by-month breakdown (default: this year).
    Yearly {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Income and expense per category.
    Categories {
        #[arg(long = "from")]
        from_date: NaiveDate,
        #[arg(long = "to")]
        to_date: NaiveDate,
        #[arg(long)]
        category: Option<String>,
    },
    /// Income, expense and running balance per period.
    Cashflow {
        #[arg(long = "from")]
        from_date: NaiveDate,
        #[arg(long = "to")]
        to_date: NaiveDate,
        /// daily, weekly or monthly
        #[arg(long, default_value = "daily")]
        granularity: Granularity,
    },
}
