//! The transaction ledger: recording, querying and summarising money movements.

use std::io::Write;

use chrono::{Local, NaiveDate};
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{account_id, category_id};
use crate::db::{from_cents, to_cents, unit_of_work, Conditions};
use crate::error::{PocketbookError, Result};
use crate::models::{PaymentMethod, Transaction, TransactionType};

pub const DEFAULT_CATEGORY: &str = "general";
pub const DEFAULT_ACCOUNT: &str = "default";
pub const DEFAULT_LIMIT: usize = 50;
pub const TOP_CATEGORY_COUNT: usize = 5;

const SELECT_TRANSACTIONS: &str = "\
    SELECT t.id, t.amount_cents, t.description, t.transaction_type, t.payment_method, t.date, \
           t.category_id, c.name, t.account_id, a.name, t.tags, t.notes, t.created_at, t.updated_at \
    FROM transactions t \
    LEFT JOIN categories c ON t.category_id = c.id \
    LEFT JOIN accounts a ON t.account_id = a.id";

fn transaction_from_row(row: &Row) -> rusqlite::Result<Transaction> {
    let tags: Option<String> = row.get(10)?;
    let tags = match tags {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?,
        None => Vec::new(),
    };
    Ok(Transaction {
        id: row.get(0)?,
        amount: from_cents(row.get(1)?),
        description: row.get(2)?,
        transaction_type: row.get(3)?,
        payment_method: row.get(4)?,
        date: row.get(5)?,
        category_id: row.get(6)?,
        category_name: row.get(7)?,
        account_id: row.get(8)?,
        account_name: row.get(9)?,
        tags,
        notes: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn tags_json(tags: &[String]) -> Result<Option<String>> {
    if tags.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(tags)?))
    }
}

fn validate_amount(amount: Decimal) -> Result<i64> {
    if amount < Decimal::ZERO {
        return Err(PocketbookError::validation(format!(
            "amount must not be negative (got {amount}); use the transaction type for direction"
        )));
    }
    to_cents(amount)
}

fn validate_description(description: &str) -> Result<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(PocketbookError::validation("description must not be empty"));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub description: String,
    pub transaction_type: TransactionType,
    pub category_name: String,
    pub account_name: String,
    pub payment_method: PaymentMethod,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    /// Defaults to today.
    pub date: Option<NaiveDate>,
}

impl NewTransaction {
    pub fn new(amount: Decimal, description: impl Into<String>, transaction_type: TransactionType) -> Self {
        Self {
            amount,
            description: description.into(),
            transaction_type,
            category_name: DEFAULT_CATEGORY.to_string(),
            account_name: DEFAULT_ACCOUNT.to_string(),
            payment_method: PaymentMethod::Cash,
            tags: Vec::new(),
            notes: None,
            date: None,
        }
    }

    pub fn category(mut self, name: impl Into<String>) -> Self {
        self.category_name = name.into();
        self
    }

    pub fn account(mut self, name: impl Into<String>) -> Self {
        self.account_name = name.into();
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Field-by-field changes; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub payment_method: Option<PaymentMethod>,
    pub tags: Option<Vec<String>>,
    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub category_name: Option<String>,
    pub account_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionOrder {
    #[default]
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
}

impl TransactionOrder {
    fn sql(&self) -> &'static str {
        match self {
            Self::DateDesc => "t.date DESC, t.id DESC",
            Self::DateAsc => "t.date ASC, t.id ASC",
            Self::AmountDesc => "t.amount_cents DESC, t.id DESC",
            Self::AmountAsc => "t.amount_cents ASC, t.id ASC",
        }
    }
}

impl std::str::FromStr for TransactionOrder {
    type Err = PocketbookError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "date_desc" => Ok(Self::DateDesc),
            "date_asc" => Ok(Self::DateAsc),
            "amount_desc" => Ok(Self::AmountDesc),
            "amount_asc" => Ok(Self::AmountAsc),
            other => Err(PocketbookError::validation(format!(
                "invalid order '{other}' (expected one of: date_desc, date_asc, amount_desc, amount_asc)"
            ))),
        }
    }
}

/// Query options for [`TransactionService::list`]. Every filter is optional
/// and they combine with AND.
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub category_name: Option<String>,
    pub account_name: Option<String>,
    /// Inclusive.
    pub start_date: Option<NaiveDate>,
    /// Inclusive.
    pub end_date: Option<NaiveDate>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    /// A transaction must carry every one of these tags.
    pub tags: Vec<String>,
    /// Case-insensitive substring of description or notes.
    pub search: Option<String>,
    pub order: TransactionOrder,
    pub offset: usize,
    pub limit: usize,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            transaction_type: None,
            category_name: None,
            account_name: None,
            start_date: None,
            end_date: None,
            min_amount: None,
            max_amount: None,
            tags: Vec::new(),
            search: None,
            order: TransactionOrder::default(),
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    pub fn category(mut self, name: impl Into<String>) -> Self {
        self.category_name = Some(name.into());
        self
    }

    pub fn account(mut self, name: impl Into<String>) -> Self {
        self.account_name = Some(name.into());
        self
    }

    pub fn date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn amount_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn order(mut self, order: TransactionOrder) -> Self {
        self.order = order;
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    fn conditions(&self) -> Result<Conditions> {
        let mut cond = Conditions::new();
        if let Some(kind) = self.transaction_type {
            cond.push("t.transaction_type = ?", kind);
        }
        if let Some(name) = &self.category_name {
            cond.push("c.name = ?", name.clone());
        }
        if let Some(name) = &self.account_name {
            cond.push("a.name = ?", name.clone());
        }
        if let Some(start) = self.start_date {
            cond.push("t.date >= ?", start);
        }
        if let Some(end) = self.end_date {
            cond.push("t.date <= ?", end);
        }
        if let Some(min) = self.min_amount {
            cond.push("t.amount_cents >= ?", to_cents(min)?);
        }
        if let Some(max) = self.max_amount {
            cond.push("t.amount_cents <= ?", to_cents(max)?);
        }
        for tag in &self.tags {
            cond.push(
                "EXISTS (SELECT 1 FROM json_each(t.tags) WHERE json_each.value = ?)",
                tag.clone(),
            );
        }
        if let Some(text) = &self.search {
            let pattern = format!("%{}%", escape_like(&text.to_lowercase()));
            cond.push_all(
                "(fold_case(t.description) LIKE ? ESCAPE '\\' OR fold_case(COALESCE(t.notes, '')) LIKE ? ESCAPE '\\')",
                vec![Box::new(pattern.clone()), Box::new(pattern)],
            );
        }
        Ok(cond)
    }
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub income_total: Decimal,
    pub expense_total: Decimal,
    /// `income_total - expense_total`.
    pub balance: Decimal,
    /// Every transaction in range, transfers included.
    pub transaction_count: i64,
    pub top_categories: Vec<CategoryTotal>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct TransactionService<'a> {
    conn: &'a Connection,
}

impl<'a> TransactionService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, input: NewTransaction) -> Result<Transaction> {
        let amount = validate_amount(input.amount)?;
        let description = validate_description(&input.description)?;
        let tags = tags_json(&clean_tags(input.tags))?;
        let date = input.date.unwrap_or_else(|| Local::now().date_naive());

        let id = unit_of_work(self.conn, "create transaction", |tx| {
            let category = category_id(tx, &input.category_name)?;
            let account = account_id(tx, &input.account_name)?;
            tx.execute(
                "INSERT INTO transactions \
                 (amount_cents, description, transaction_type, payment_method, date, category_id, account_id, tags, notes) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    amount,
                    description,
                    input.transaction_type,
                    input.payment_method,
                    date,
                    category,
                    account,
                    tags,
                    input.notes
                ],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        info!(id, amount = %input.amount, %description, "created transaction");
        self.get(id)?
            .ok_or_else(|| PocketbookError::not_found("Transaction", id))
    }

    pub fn get(&self, id: i64) -> Result<Option<Transaction>> {
        let sql = format!("{SELECT_TRANSACTIONS} WHERE t.id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map([id], transaction_from_row)?;
        Ok(rows.next().transpose()?)
    }

    pub fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let cond = filter.conditions()?;
        let sql = format!(
            "{SELECT_TRANSACTIONS} WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            cond.sql(),
            filter.order.sql()
        );
        debug!(%sql, "listing transactions");
        let limit = filter.limit as i64;
        let offset = filter.offset as i64;
        let mut values = cond.values();
        values.push(&limit as &dyn ToSql);
        values.push(&offset as &dyn ToSql);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(values.as_slice(), transaction_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Apply `changes` to transaction `id`. Returns `None` if it does not exist.
    pub fn update(&self, id: i64, changes: TransactionUpdate) -> Result<Option<Transaction>> {
        let Some(current) = self.get(id)? else {
            return Ok(None);
        };

        let amount = validate_amount(changes.amount.unwrap_or(current.amount))?;
        let description = match &changes.description {
            Some(d) => validate_description(d)?,
            None => current.description.clone(),
        };
        let tags = tags_json(&clean_tags(changes.tags.unwrap_or(current.tags)))?;
        let transaction_type = changes.transaction_type.unwrap_or(current.transaction_type);
        let payment_method = changes.payment_method.unwrap_or(current.payment_method);
        let date = changes.date.unwrap_or(current.date);
        let notes = changes.notes.unwrap_or(current.notes);

        unit_of_work(self.conn, "update transaction", |tx| {
            let category = match &changes.category_name {
                Some(name) => Some(category_id(tx, name)?),
                None => current.category_id,
            };
            let account = match &changes.account_name {
                Some(name) => Some(account_id(tx, name)?),
                None => current.account_id,
            };
            tx.execute(
                "UPDATE transactions SET amount_cents = ?1, description = ?2, transaction_type = ?3, \
                 payment_method = ?4, date = ?5, category_id = ?6, account_id = ?7, tags = ?8, notes = ?9, \
                 updated_at = datetime('now') WHERE id = ?10",
                params![
                    amount,
                    description,
                    transaction_type,
                    payment_method,
                    date,
                    category,
                    account,
                    tags,
                    notes,
                    id
                ],
            )?;
            Ok(())
        })?;

        info!(id, "updated transaction");
        self.get(id)
    }

    /// Remove transaction `id`. Returns false if it did not exist.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let removed = unit_of_work(self.conn, "delete transaction", |tx| {
            Ok(tx.execute("DELETE FROM transactions WHERE id = ?1", [id])?)
        })?;
        if removed > 0 {
            info!(id, "deleted transaction");
        }
        Ok(removed > 0)
    }

    /// Totals over an inclusive date range, optionally limited to one account.
    pub fn summary(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        account_name: Option<&str>,
    ) -> Result<TransactionSummary> {
        let mut cond = Conditions::new();
        if let Some(start) = start_date {
            cond.push("t.date >= ?", start);
        }
        if let Some(end) = end_date {
            cond.push("t.date <= ?", end);
        }
        if let Some(name) = account_name {
            cond.push("a.name = ?", name.to_string());
        }
        let clause = cond.sql();
        let values = cond.values();

        let totals_sql = format!(
            "SELECT \
             COALESCE(SUM(CASE WHEN t.transaction_type = 'income' THEN t.amount_cents END), 0), \
             COALESCE(SUM(CASE WHEN t.transaction_type = 'expense' THEN t.amount_cents END), 0), \
             COUNT(*) \
             FROM transactions t LEFT JOIN accounts a ON t.account_id = a.id \
             WHERE {clause}"
        );
        let (income, expense, count): (i64, i64, i64) =
            self.conn
                .query_row(&totals_sql, values.as_slice(), |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?;

        // Ties go to the category whose first expense was recorded earliest.
        let top_sql = format!(
            "SELECT COALESCE(c.name, 'Uncategorized'), SUM(t.amount_cents) AS total \
             FROM transactions t \
             LEFT JOIN categories c ON t.category_id = c.id \
             LEFT JOIN accounts a ON t.account_id = a.id \
             WHERE {clause} AND t.transaction_type = 'expense' \
             GROUP BY t.category_id \
             ORDER BY total DESC, MIN(t.id) ASC \
             LIMIT {TOP_CATEGORY_COUNT}"
        );
        let mut stmt = self.conn.prepare(&top_sql)?;
        let top_categories = stmt
            .query_map(values.as_slice(), |row| {
                Ok(CategoryTotal {
                    name: row.get(0)?,
                    amount: from_cents(row.get(1)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let income_total = from_cents(income);
        let expense_total = from_cents(expense);
        Ok(TransactionSummary {
            start_date,
            end_date,
            income_total,
            expense_total,
            balance: income_total - expense_total,
            transaction_count: count,
            top_categories,
        })
    }

    /// Write the transactions matching `filter` as CSV. Returns the row count.
    pub fn export_csv<W: Write>(&self, filter: &TransactionFilter, out: W) -> Result<usize> {
        let rows = self.list(filter)?;
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record([
            "id",
            "date",
            "type",
            "amount",
            "description",
            "category",
            "account",
            "payment_method",
            "tags",
            "notes",
        ])?;
        for t in &rows {
            writer.write_record([
                t.id.to_string(),
                t.date.to_string(),
                t.transaction_type.to_string(),
                t.amount.to_string(),
                t.description.clone(),
                t.category_name.clone().unwrap_or_default(),
                t.account_name.clone().unwrap_or_default(),
                t.payment_method.to_string(),
                t.tags.join(";"),
                t.notes.clone().unwrap_or_default(),
            ])?;
        }
        writer.flush()?;
        info!(count = rows.len(), "exported transactions");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn seed(svc: &TransactionService) {
        let rows = [
            ("3000.00", "Salary", TransactionType::Income, "salary", "bank", d(2025, 1, 1), vec!["work"]),
            ("25.50", "Lunch", TransactionType::Expense, "food", "cash", d(2025, 1, 5), vec!["meal", "work"]),
            ("80.00", "Groceries", TransactionType::Expense, "food", "bank", d(2025, 1, 10), vec!["home"]),
            ("1200.00", "Rent", TransactionType::Expense, "housing", "bank", d(2025, 1, 15), vec![]),
            ("500.00", "Move to savings", TransactionType::Transfer, "savings", "bank", d(2025, 1, 20), vec![]),
            ("45.00", "Cinema", TransactionType::Expense, "fun", "cash", d(2025, 2, 2), vec!["weekend"]),
        ];
        for (amount, desc, kind, cat, acct, date, tags) in rows {
            svc.create(
                NewTransaction::new(dec(amount), desc, kind)
                    .category(cat)
                    .account(acct)
                    .date(date)
                    .tags(tags),
            )
            .unwrap();
        }
    }

    #[test]
    fn test_create_resolves_category_and_account() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        let t = svc
            .create(NewTransaction::new(dec("25.50"), "Lunch", TransactionType::Expense).category("food"))
            .unwrap();
        assert_eq!(t.amount, dec("25.50"));
        assert_eq!(t.category_name.as_deref(), Some("food"));
        assert_eq!(t.account_name.as_deref(), Some(DEFAULT_ACCOUNT));
        assert_eq!(t.payment_method, PaymentMethod::Cash);
        assert_eq!(t.date, Local::now().date_naive());
    }

    #[test]
    fn test_create_rejects_negative_amount() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        let err = svc
            .create(NewTransaction::new(dec("-1.00"), "Oops", TransactionType::Expense))
            .unwrap_err();
        assert!(matches!(err, PocketbookError::Validation(_)));
        let count: i64 = conn
            .query_row("SELECT count(*) FROM categories", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0, "validation must fail before any write");
    }

    #[test]
    fn test_create_keeps_tag_order() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        let t = svc
            .create(
                NewTransaction::new(dec("10"), "Taxi", TransactionType::Expense)
                    .tags(["zeta", " alpha ", ""]),
            )
            .unwrap();
        assert_eq!(t.tags, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_lunch_scenario() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        svc.create(
            NewTransaction::new(dec("25.50"), "Lunch", TransactionType::Expense)
                .category("food")
                .date(d(2025, 3, 14)),
        )
        .unwrap();

        let found = svc.list(&TransactionFilter::new().category("food")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].amount, dec("25.50"));

        let summary = svc.summary(Some(d(2025, 3, 1)), Some(d(2025, 3, 31)), None).unwrap();
        assert_eq!(summary.expense_total, dec("25.50"));
        assert_eq!(summary.income_total, dec("0.00"));
        assert_eq!(summary.balance, dec("-25.50"));
    }

    #[test]
    fn test_list_filters_by_type_and_account() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        seed(&svc);
        let expenses = svc
            .list(&TransactionFilter::new().kind(TransactionType::Expense).account("cash"))
            .unwrap();
        let descs: Vec<_> = expenses.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descs, vec!["Cinema", "Lunch"]);
    }

    #[test]
    fn test_list_date_range_is_inclusive() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        seed(&svc);
        let rows = svc
            .list(&TransactionFilter::new().date_range(d(2025, 1, 5), d(2025, 1, 15)))
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_list_amount_range_is_inclusive() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        seed(&svc);
        let rows = svc
            .list(&TransactionFilter::new().amount_range(Some(dec("45.00")), Some(dec("500.00"))))
            .unwrap();
        let mut descs: Vec<_> = rows.iter().map(|t| t.description.clone()).collect();
        descs.sort();
        assert_eq!(descs, vec!["Cinema", "Groceries", "Move to savings"]);
    }

    #[test]
    fn test_list_tags_must_all_match() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        seed(&svc);
        let work = svc.list(&TransactionFilter::new().tag("work")).unwrap();
        assert_eq!(work.len(), 2);
        let both = svc
            .list(&TransactionFilter::new().tag("work").tag("meal"))
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].description, "Lunch");
    }

    #[test]
    fn test_list_search_is_case_insensitive_over_notes() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        svc.create(
            NewTransaction::new(dec("12"), "Coffee", TransactionType::Expense).notes("with ANNA"),
        )
        .unwrap();
        svc.create(NewTransaction::new(dec("3"), "Bus", TransactionType::Expense))
            .unwrap();
        assert_eq!(svc.list(&TransactionFilter::new().search("anna")).unwrap().len(), 1);
        assert_eq!(svc.list(&TransactionFilter::new().search("COFF")).unwrap().len(), 1);
        assert_eq!(svc.list(&TransactionFilter::new().search("100%")).unwrap().len(), 0);
    }

    #[test]
    fn test_list_search_folds_non_ascii_case() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        svc.create(NewTransaction::new(dec("900"), "École fees", TransactionType::Expense))
            .unwrap();
        svc.create(
            NewTransaction::new(dec("40"), "Books", TransactionType::Expense).notes("ÜBER store"),
        )
        .unwrap();
        let hits = svc.list(&TransactionFilter::new().search("école")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].description, "École fees");
        assert_eq!(svc.list(&TransactionFilter::new().search("über")).unwrap().len(), 1);
    }

    #[test]
    fn test_list_ordering_and_pagination() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        seed(&svc);
        let by_amount = svc
            .list(&TransactionFilter::new().order(TransactionOrder::AmountDesc))
            .unwrap();
        assert_eq!(by_amount[0].description, "Salary");
        assert_eq!(by_amount.last().unwrap().description, "Lunch");

        let page = svc
            .list(&TransactionFilter::new().order(TransactionOrder::DateAsc).page(1, 2))
            .unwrap();
        let descs: Vec<_> = page.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descs, vec!["Lunch", "Groceries"]);
    }

    #[test]
    fn test_update_changes_only_given_fields() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        let t = svc
            .create(
                NewTransaction::new(dec("25.50"), "Lunch", TransactionType::Expense)
                    .category("food")
                    .notes("team"),
            )
            .unwrap();
        let updated = svc
            .update(
                t.id,
                TransactionUpdate {
                    amount: Some(dec("30.00")),
                    category_name: Some("dining".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.amount, dec("30.00"));
        assert_eq!(updated.category_name.as_deref(), Some("dining"));
        assert_eq!(updated.description, "Lunch");
        assert_eq!(updated.notes.as_deref(), Some("team"));
    }

    #[test]
    fn test_update_missing_returns_none() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        assert!(svc.update(999, TransactionUpdate::default()).unwrap().is_none());
    }

    #[test]
    fn test_update_can_clear_notes() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        let t = svc
            .create(NewTransaction::new(dec("8"), "Taxi", TransactionType::Expense).notes("airport"))
            .unwrap();
        let cleared = svc
            .update(t.id, TransactionUpdate { notes: Some(None), ..Default::default() })
            .unwrap()
            .unwrap();
        assert_eq!(cleared.notes, None);
        assert_eq!(cleared.description, "Taxi");
    }

    #[test]
    fn test_delete() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        let t = svc
            .create(NewTransaction::new(dec("5"), "Snack", TransactionType::Expense))
            .unwrap();
        assert!(svc.delete(t.id).unwrap());
        assert!(!svc.delete(t.id).unwrap());
        assert!(svc.get(t.id).unwrap().is_none());
    }

    #[test]
    fn test_summary_balance_identity() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        seed(&svc);
        for (start, end, acct) in [
            (None, None, None),
            (Some(d(2025, 1, 1)), Some(d(2025, 1, 31)), None),
            (None, None, Some("bank")),
            (Some(d(2025, 2, 1)), None, Some("cash")),
        ] {
            let s = svc.summary(start, end, acct).unwrap();
            assert_eq!(s.balance, s.income_total - s.expense_total);
        }
    }

    #[test]
    fn test_summary_totals_and_top_categories() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        seed(&svc);
        let s = svc.summary(Some(d(2025, 1, 1)), Some(d(2025, 1, 31)), None).unwrap();
        assert_eq!(s.income_total, dec("3000.00"));
        assert_eq!(s.expense_total, dec("1305.50"));
        assert_eq!(s.balance, dec("1694.50"));
        assert_eq!(s.transaction_count, 5);
        let names: Vec<_> = s.top_categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["housing", "food"]);
        assert_eq!(s.top_categories[1].amount, dec("105.50"));
    }

    #[test]
    fn test_summary_ties_keep_first_seen_category() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        for cat in ["zoo", "apple", "mango"] {
            svc.create(NewTransaction::new(dec("10"), "x", TransactionType::Expense).category(cat))
                .unwrap();
        }
        let s = svc.summary(None, None, None).unwrap();
        let names: Vec<_> = s.top_categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["zoo", "apple", "mango"]);
    }

    #[test]
    fn test_summary_caps_top_categories_at_five() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        for (i, cat) in ["a", "b", "c", "d", "e", "f", "g"].iter().enumerate() {
            svc.create(
                NewTransaction::new(Decimal::from(i as i64 + 1), "x", TransactionType::Expense).category(*cat),
            )
            .unwrap();
        }
        let s = svc.summary(None, None, None).unwrap();
        assert_eq!(s.top_categories.len(), TOP_CATEGORY_COUNT);
        assert_eq!(s.top_categories[0].name, "g");
    }

    #[test]
    fn test_export_csv() {
        let (_dir, conn) = test_db();
        let svc = TransactionService::new(&conn);
        seed(&svc);
        let mut buf = Vec::new();
        let count = svc
            .export_csv(&TransactionFilter::new().category("food").order(TransactionOrder::DateAsc), &mut buf)
            .unwrap();
        assert_eq!(count, 2);
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "id,date,type,amount,description,category,account,payment_method,tags,notes");
        assert!(lines[1].contains("2025-01-05,expense,25.50,Lunch,food,cash,cash,meal;work"), "got: {}", lines[1]);
    }
}
