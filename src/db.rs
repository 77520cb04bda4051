use std::path::Path;

use rusqlite::functions::FunctionFlags;
use rusqlite::types::ToSql;
use rusqlite::Connection;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, error};

use crate::error::{PocketbookError, Result};

// Money columns hold integer cents (`*_cents`) so SUM() stays exact.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    color TEXT NOT NULL DEFAULT '#6B7280',
    icon TEXT NOT NULL DEFAULT '💰',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    account_type TEXT NOT NULL DEFAULT 'general',
    balance_cents INTEGER NOT NULL DEFAULT 0,
    credit_limit_cents INTEGER,
    closing_day INTEGER CHECK (closing_day BETWEEN 1 AND 31),
    due_day INTEGER CHECK (due_day BETWEEN 1 AND 31),
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    amount_cents INTEGER NOT NULL CHECK (amount_cents >= 0),
    description TEXT NOT NULL,
    transaction_type TEXT NOT NULL CHECK (transaction_type IN ('income', 'expense', 'transfer')),
    payment_method TEXT NOT NULL DEFAULT 'cash',
    date TEXT NOT NULL,
    category_id INTEGER,
    account_id INTEGER,
    tags TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

CREATE TABLE IF NOT EXISTS budgets (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    period_type TEXT NOT NULL CHECK (period_type IN ('monthly', 'yearly')),
    year INTEGER NOT NULL,
    month INTEGER CHECK (month BETWEEN 1 AND 12),
    description TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- NULL months compare equal here so two yearly budgets for one year collide.
CREATE UNIQUE INDEX IF NOT EXISTS uq_budget_period
    ON budgets (period_type, year, COALESCE(month, 0));

CREATE TABLE IF NOT EXISTS budget_categories (
    id INTEGER PRIMARY KEY,
    budget_id INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    allocated_cents INTEGER NOT NULL CHECK (allocated_cents >= 0),
    description TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (budget_id, category_id),
    FOREIGN KEY (budget_id) REFERENCES budgets(id) ON DELETE CASCADE,
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS investments (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    investment_type TEXT NOT NULL,
    initial_cents INTEGER NOT NULL,
    current_cents INTEGER NOT NULL,
    shares TEXT,
    purchase_price_cents INTEGER,
    purchase_date TEXT NOT NULL,
    description TEXT,
    last_updated TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS dividends (
    id INTEGER PRIMARY KEY,
    investment_id INTEGER NOT NULL,
    amount_cents INTEGER NOT NULL,
    payment_date TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (investment_id) REFERENCES investments(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS goals (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    target_cents INTEGER NOT NULL,
    current_cents INTEGER NOT NULL DEFAULT 0,
    target_date TEXT,
    priority INTEGER NOT NULL DEFAULT 1 CHECK (priority BETWEEN 1 AND 3),
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    register_functions(&conn)?;
    debug!(path = %db_path.display(), "opened database");
    Ok(conn)
}

/// `fold_case(text)` lowercases with full Unicode rules; SQLite's `lower()`
/// only folds ASCII.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )?;
    Ok(())
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Run `work` inside a single SQLite transaction.
///
/// Commits when `work` returns `Ok`. On any error the transaction is rolled
/// back, the failure is logged against `operation`, and the original error is
/// returned unchanged. Dropping the guard without commit also rolls back, so a
/// panic inside `work` never leaves partial writes behind.
pub fn unit_of_work<T>(
    conn: &Connection,
    operation: &str,
    work: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    let tx = conn.unchecked_transaction()?;
    match work(&tx) {
        Ok(value) => {
            tx.commit().map_err(|e| {
                error!(operation, error = %e, "commit failed");
                PocketbookError::from(e)
            })?;
            Ok(value)
        }
        Err(e) => {
            error!(operation, error = %e, "rolling back");
            if let Err(rollback_err) = tx.rollback() {
                error!(operation, error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

/// A growing `WHERE` clause with its positional (`?`) parameters.
#[derive(Default)]
pub struct Conditions {
    clauses: Vec<String>,
    values: Vec<Box<dyn ToSql>>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause containing exactly one `?`.
    pub fn push(&mut self, clause: &str, value: impl ToSql + 'static) {
        self.clauses.push(clause.to_string());
        self.values.push(Box::new(value));
    }

    /// Add a clause whose `?` placeholders are bound, in order, to `values`.
    pub fn push_all(&mut self, clause: &str, values: Vec<Box<dyn ToSql>>) {
        self.clauses.push(clause.to_string());
        self.values.extend(values);
    }

    pub fn sql(&self) -> String {
        if self.clauses.is_empty() {
            "1 = 1".to_string()
        } else {
            self.clauses.join(" AND ")
        }
    }

    pub fn values(&self) -> Vec<&dyn ToSql> {
        self.values.iter().map(|v| v.as_ref()).collect()
    }
}

/// Convert a decimal amount to integer cents, rounding half away from zero.
pub fn to_cents(amount: Decimal) -> Result<i64> {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|c| c.to_i64())
        .ok_or_else(|| PocketbookError::validation(format!("amount out of range: {amount}")))
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub fn opt_to_cents(amount: Option<Decimal>) -> Result<Option<i64>> {
    amount.map(to_cents).transpose()
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "categories",
            "accounts",
            "transactions",
            "budgets",
            "budget_categories",
            "investments",
            "dividends",
            "goals",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_yearly_budgets_collide_on_null_month() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO budgets (name, period_type, year) VALUES ('a', 'yearly', 2025)",
            [],
        )
        .unwrap();
        let err: PocketbookError = conn
            .execute(
                "INSERT INTO budgets (name, period_type, year) VALUES ('b', 'yearly', 2025)",
                [],
            )
            .unwrap_err()
            .into();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_unit_of_work_commits_on_success() {
        let (_dir, conn) = test_db();
        unit_of_work(&conn, "insert category", |tx| {
            tx.execute("INSERT INTO categories (name) VALUES ('food')", [])?;
            Ok(())
        })
        .unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM categories", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_unit_of_work_rolls_back_on_error() {
        let (_dir, conn) = test_db();
        let result: Result<()> = unit_of_work(&conn, "insert then fail", |tx| {
            tx.execute("INSERT INTO categories (name) VALUES ('food')", [])?;
            Err(PocketbookError::validation("boom"))
        });
        assert!(result.is_err());
        let count: i64 = conn
            .query_row("SELECT count(*) FROM categories", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_cents_conversion() {
        assert_eq!(to_cents(Decimal::from_str("25.50").unwrap()).unwrap(), 2550);
        assert_eq!(to_cents(Decimal::from_str("0.005").unwrap()).unwrap(), 1);
        assert_eq!(to_cents(Decimal::from_str("-1.005").unwrap()).unwrap(), -101);
        assert_eq!(from_cents(2550), Decimal::from_str("25.50").unwrap());
        assert_eq!(from_cents(-10000).to_string(), "-100.00");
    }

    #[test]
    fn test_cents_conversion_out_of_range() {
        for amount in [Decimal::MAX, Decimal::MIN, Decimal::from(i64::MAX)] {
            let err = to_cents(amount).unwrap_err();
            assert!(matches!(err, PocketbookError::Validation(_)), "{amount}");
        }
    }
}
