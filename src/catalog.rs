//! Categories and accounts: the named references transactions and budgets point at.
//!
//! Both are resolved by their unique name. Writers that only know a name call
//! [`category_id`] / [`account_id`], which insert the row on first use and
//! return the existing id afterwards.

use regex::Regex;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use tracing::info;

use crate::db::{from_cents, opt_to_cents, to_cents, unit_of_work};
use crate::error::{PocketbookError, Result};
use crate::models::{Account, AccountType, Category};

pub const DEFAULT_COLOR: &str = "#6B7280";
pub const DEFAULT_ICON: &str = "💰";

fn clean_name(kind: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PocketbookError::validation(format!("{kind} name must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Resolve a category by name, creating it when absent.
///
/// Runs on whatever connection or open transaction it is handed, so callers
/// inside a unit of work get the insert rolled back with the rest.
pub fn category_id(conn: &Connection, name: &str) -> Result<i64> {
    let name = clean_name("category", name)?;
    let inserted = conn.execute(
        "INSERT INTO categories (name, description) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![name, format!("Category {name}")],
    )?;
    if inserted > 0 {
        info!(category = %name, "created category");
    }
    Ok(conn.query_row("SELECT id FROM categories WHERE name = ?1", [&name], |r| r.get(0))?)
}

/// Resolve an account by name, creating a `general` account when absent.
pub fn account_id(conn: &Connection, name: &str) -> Result<i64> {
    let name = clean_name("account", name)?;
    let inserted = conn.execute(
        "INSERT INTO accounts (name, account_type) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![name, AccountType::General],
    )?;
    if inserted > 0 {
        info!(account = %name, "created account");
    }
    Ok(conn.query_row("SELECT id FROM accounts WHERE name = ?1", [&name], |r| r.get(0))?)
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

const CATEGORY_COLUMNS: &str = "id, name, description, color, icon, is_active";

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        icon: row.get(4)?,
        is_active: row.get(5)?,
    })
}

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

fn validate_color(color: &str) -> Result<()> {
    let valid = Regex::new(r"^#[0-9A-Fa-f]{6}$")
        .map(|re| re.is_match(color))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(PocketbookError::validation(format!(
            "color must be a hex value like #6B7280, got '{color}'"
        )))
    }
}

/// Explicitly create a category. A duplicate name is a constraint violation.
pub fn add_category(conn: &Connection, input: NewCategory) -> Result<Category> {
    let name = clean_name("category", &input.name)?;
    let color = input.color.unwrap_or_else(|| DEFAULT_COLOR.to_string());
    validate_color(&color)?;
    let icon = input.icon.unwrap_or_else(|| DEFAULT_ICON.to_string());
    let description = input
        .description
        .unwrap_or_else(|| format!("Category {name}"));

    let id = unit_of_work(conn, "add category", |tx| {
        tx.execute(
            "INSERT INTO categories (name, description, color, icon) VALUES (?1, ?2, ?3, ?4)",
            params![name, description, color, icon],
        )?;
        Ok(tx.last_insert_rowid())
    })?;
    info!(id, category = %name, "added category");
    get_category(conn, id)?.ok_or_else(|| PocketbookError::not_found("Category", id))
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Option<Category>> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map([id], category_from_row)?;
    Ok(rows.next().transpose()?)
}

pub fn list_categories(conn: &Connection, active_only: bool) -> Result<Vec<Category>> {
    let filter = if active_only { "WHERE is_active = 1" } else { "" };
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories {filter} ORDER BY name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], category_from_row)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Mark a category inactive. Categories are never deleted because
/// transactions keep pointing at them. Returns false for an unknown name.
pub fn deactivate_category(conn: &Connection, name: &str) -> Result<bool> {
    let changed = unit_of_work(conn, "deactivate category", |tx| {
        Ok(tx.execute(
            "UPDATE categories SET is_active = 0 WHERE name = ?1",
            [name.trim()],
        )?)
    })?;
    if changed > 0 {
        info!(category = %name, "deactivated category");
    }
    Ok(changed > 0)
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

const ACCOUNT_COLUMNS: &str =
    "id, name, account_type, balance_cents, credit_limit_cents, closing_day, due_day, is_active";

fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    let credit_limit: Option<i64> = row.get(4)?;
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        account_type: row.get(2)?,
        balance: from_cents(row.get(3)?),
        credit_limit: credit_limit.map(from_cents),
        closing_day: row.get(5)?,
        due_day: row.get(6)?,
        is_active: row.get(7)?,
    })
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub credit_limit: Option<Decimal>,
    pub closing_day: Option<u32>,
    pub due_day: Option<u32>,
}

fn validate_day(field: &str, day: Option<u32>) -> Result<()> {
    match day {
        Some(d) if !(1..=31).contains(&d) => Err(PocketbookError::validation(format!(
            "{field} must be between 1 and 31, got {d}"
        ))),
        _ => Ok(()),
    }
}

pub fn add_account(conn: &Connection, input: NewAccount) -> Result<Account> {
    let name = clean_name("account", &input.name)?;
    validate_day("closing day", input.closing_day)?;
    validate_day("due day", input.due_day)?;
    let balance = to_cents(input.balance)?;
    let credit_limit = opt_to_cents(input.credit_limit)?;

    let id = unit_of_work(conn, "add account", |tx| {
        tx.execute(
            "INSERT INTO accounts (name, account_type, balance_cents, credit_limit_cents, closing_day, due_day) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                name,
                input.account_type,
                balance,
                credit_limit,
                input.closing_day,
                input.due_day
            ],
        )?;
        Ok(tx.last_insert_rowid())
    })?;
    info!(id, account = %name, "added account");
    get_account(conn, id)?.ok_or_else(|| PocketbookError::not_found("Account", id))
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Option<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map([id], account_from_row)?;
    Ok(rows.next().transpose()?)
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], account_from_row)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    #[test]
    fn test_category_id_is_idempotent() {
        let (_dir, conn) = test_db();
        let first = category_id(&conn, "food").unwrap();
        let second = category_id(&conn, "  food ").unwrap();
        assert_eq!(first, second);
        let count: i64 = conn
            .query_row("SELECT count(*) FROM categories", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_lazy_category_gets_default_description() {
        let (_dir, conn) = test_db();
        let id = category_id(&conn, "travel").unwrap();
        let cat = get_category(&conn, id).unwrap().unwrap();
        assert_eq!(cat.description.as_deref(), Some("Category travel"));
        assert_eq!(cat.color, DEFAULT_COLOR);
        assert!(cat.is_active);
    }

    #[test]
    fn test_lazy_account_is_general() {
        let (_dir, conn) = test_db();
        account_id(&conn, "wallet").unwrap();
        let accounts = list_accounts(&conn).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].account_type, AccountType::General);
        assert_eq!(accounts[0].balance, Decimal::ZERO);
    }

    #[test]
    fn test_empty_name_rejected() {
        let (_dir, conn) = test_db();
        assert!(matches!(
            category_id(&conn, "   ").unwrap_err(),
            PocketbookError::Validation(_)
        ));
    }

    #[test]
    fn test_add_category_duplicate_is_constraint_violation() {
        let (_dir, conn) = test_db();
        let input = NewCategory {
            name: "rent".into(),
            ..Default::default()
        };
        add_category(&conn, input.clone()).unwrap();
        assert!(add_category(&conn, input).unwrap_err().is_constraint_violation());
    }

    #[test]
    fn test_add_category_rejects_bad_color() {
        let (_dir, conn) = test_db();
        let err = add_category(
            &conn,
            NewCategory {
                name: "rent".into(),
                color: Some("red".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PocketbookError::Validation(_)));
    }

    #[test]
    fn test_deactivate_hides_from_active_list() {
        let (_dir, conn) = test_db();
        category_id(&conn, "food").unwrap();
        category_id(&conn, "fun").unwrap();
        assert!(deactivate_category(&conn, "fun").unwrap());
        assert!(!deactivate_category(&conn, "missing").unwrap());
        let active = list_categories(&conn, true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "food");
        assert_eq!(list_categories(&conn, false).unwrap().len(), 2);
    }

    #[test]
    fn test_add_credit_card_account() {
        let (_dir, conn) = test_db();
        let acct = add_account(
            &conn,
            NewAccount {
                name: "Visa".into(),
                account_type: AccountType::CreditCard,
                balance: Decimal::ZERO,
                credit_limit: Some(Decimal::new(300000, 2)),
                closing_day: Some(15),
                due_day: Some(10),
            },
        )
        .unwrap();
        assert_eq!(acct.credit_limit, Some(Decimal::new(3000, 0)));
        assert_eq!(acct.closing_day, Some(15));
    }

    #[test]
    fn test_add_account_rejects_bad_day() {
        let (_dir, conn) = test_db();
        let err = add_account(
            &conn,
            NewAccount {
                name: "Visa".into(),
                account_type: AccountType::CreditCard,
                balance: Decimal::ZERO,
                credit_limit: None,
                closing_day: Some(32),
                due_day: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, PocketbookError::Validation(_)));
    }
}
