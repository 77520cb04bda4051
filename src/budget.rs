use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::catalog::category_id;
use crate::db::{from_cents, to_cents, unit_of_work};
use crate::error::{PocketbookError, Result};
use crate::models::{percent_of, Budget, BudgetCategory, PeriodType, TransactionType};
use crate::period::{month_start, next_month, validate_month, year_start};

const BUDGET_COLUMNS: &str = "id, name, period_type, year, month, description, is_active";

fn budget_from_row(row: &Row) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: row.get(0)?,
        name: row.get(1)?,
        period_type: row.get(2)?,
        year: row.get(3)?,
        month: row.get(4)?,
        description: row.get(5)?,
        is_active: row.get(6)?,
    })
}

fn allocation_from_row(row: &Row) -> rusqlite::Result<BudgetCategory> {
    Ok(BudgetCategory {
        id: row.get(0)?,
        budget_id: row.get(1)?,
        category_id: row.get(2)?,
        category_name: row.get(3)?,
        allocated_amount: from_cents(row.get(4)?),
        description: row.get(5)?,
    })
}

/// Spent-versus-allocated figures for one category, or for a whole budget.
#[derive(Debug, Clone, Serialize)]
pub struct SpendingLine {
    pub allocated: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
    pub percentage_used: Decimal,
    pub is_over_budget: bool,
}

impl SpendingLine {
    fn new(allocated: Decimal, spent: Decimal) -> Self {
        Self {
            allocated,
            spent,
            remaining: allocated - spent,
            percentage_used: percent_of(spent, allocated),
            is_over_budget: spent > allocated,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySpending {
    pub category_name: String,
    #[serde(flatten)]
    pub line: SpendingLine,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetAnalysis {
    pub budget: Budget,
    /// Inclusive.
    pub start_date: NaiveDate,
    /// Exclusive: the first day after the budget period.
    pub end_date: NaiveDate,
    pub categories: Vec<CategorySpending>,
    pub totals: SpendingLine,
}

#[derive(Debug, Clone, Default)]
pub struct BudgetUpdate {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// The half-open `[start, end)` window a budget covers.
pub fn budget_window(budget: &Budget) -> Result<(NaiveDate, NaiveDate)> {
    match (budget.period_type, budget.month) {
        (PeriodType::Monthly, Some(month)) => {
            let (ny, nm) = next_month(budget.year, month);
            Ok((month_start(budget.year, month)?, month_start(ny, nm)?))
        }
        (PeriodType::Monthly, None) => Err(PocketbookError::validation(format!(
            "monthly budget {} has no month",
            budget.id
        ))),
        (PeriodType::Yearly, _) => Ok((year_start(budget.year)?, year_start(budget.year + 1)?)),
    }
}

pub struct BudgetService<'a> {
    conn: &'a Connection,
}

impl<'a> BudgetService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a budget for one period. A second budget for the same period
    /// fails with a constraint violation from the unique index.
    pub fn create(
        &self,
        name: &str,
        period_type: PeriodType,
        year: i32,
        month: Option<u32>,
        description: Option<&str>,
    ) -> Result<Budget> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PocketbookError::validation("budget name must not be empty"));
        }
        let month = match period_type {
            PeriodType::Monthly => {
                let m = month.ok_or_else(|| {
                    PocketbookError::validation("monthly budgets require a month (1-12)")
                })?;
                Some(validate_month(m)?)
            }
            PeriodType::Yearly => None,
        };

        let id = unit_of_work(self.conn, "create budget", |tx| {
            tx.execute(
                "INSERT INTO budgets (name, period_type, year, month, description) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, period_type, year, month, description],
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        info!(id, budget = %name, %period_type, year, "created budget");
        self.require(id)
    }

    /// Allocate `allocated` to a category within a budget, creating the
    /// category on first use.
    pub fn add_category(
        &self,
        budget_id: i64,
        category_name: &str,
        allocated: Decimal,
        description: Option<&str>,
    ) -> Result<BudgetCategory> {
        if allocated < Decimal::ZERO {
            return Err(PocketbookError::validation(format!(
                "allocated amount must not be negative, got {allocated}"
            )));
        }
        let cents = to_cents(allocated)?;
        self.require(budget_id)?;

        let id = unit_of_work(self.conn, "allocate budget category", |tx| {
            let category = category_id(tx, category_name)?;
            tx.execute(
                "INSERT INTO budget_categories (budget_id, category_id, allocated_cents, description) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![budget_id, category, cents, description],
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        info!(budget_id, category = %category_name, amount = %allocated, "allocated budget category");

        Ok(self.conn.query_row(
            "SELECT bc.id, bc.budget_id, bc.category_id, c.name, bc.allocated_cents, bc.description \
             FROM budget_categories bc JOIN categories c ON bc.category_id = c.id \
             WHERE bc.id = ?1",
            [id],
            allocation_from_row,
        )?)
    }

    pub fn allocations(&self, budget_id: i64) -> Result<Vec<BudgetCategory>> {
        let mut stmt = self.conn.prepare(
            "SELECT bc.id, bc.budget_id, bc.category_id, c.name, bc.allocated_cents, bc.description \
             FROM budget_categories bc JOIN categories c ON bc.category_id = c.id \
             WHERE bc.budget_id = ?1 ORDER BY bc.id",
        )?;
        let rows = stmt.query_map([budget_id], allocation_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn analyze(&self, budget_id: i64) -> Result<BudgetAnalysis> {
        let budget = self.require(budget_id)?;
        let (start, end) = budget_window(&budget)?;

        let mut stmt = self.conn.prepare(
            "SELECT c.name, bc.allocated_cents, \
                    COALESCE((SELECT SUM(t.amount_cents) FROM transactions t \
                              WHERE t.category_id = bc.category_id \
                                AND t.transaction_type = ?2 \
                                AND t.date >= ?3 AND t.date < ?4), 0) \
             FROM budget_categories bc JOIN categories c ON bc.category_id = c.id \
             WHERE bc.budget_id = ?1 ORDER BY bc.id",
        )?;
        let categories = stmt
            .query_map(
                params![budget_id, TransactionType::Expense, start, end],
                |row| {
                    Ok(CategorySpending {
                        category_name: row.get(0)?,
                        line: SpendingLine::new(from_cents(row.get(1)?), from_cents(row.get(2)?)),
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let allocated: Decimal = categories.iter().map(|c| c.line.allocated).sum();
        let spent: Decimal = categories.iter().map(|c| c.line.spent).sum();

        Ok(BudgetAnalysis {
            budget,
            start_date: start,
            end_date: end,
            categories,
            totals: SpendingLine::new(allocated, spent),
        })
    }

    /// The active budget for exactly this period. `month = None` only
    /// matches yearly budgets.
    pub fn current(&self, year: i32, month: Option<u32>) -> Result<Option<Budget>> {
        let sql = format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets \
             WHERE year = ?1 AND month IS ?2 AND is_active = 1 \
             ORDER BY id LIMIT 1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![year, month], budget_from_row)?;
        Ok(rows.next().transpose()?)
    }

    pub fn list(&self, active_only: bool) -> Result<Vec<Budget>> {
        let filter = if active_only { "WHERE is_active = 1" } else { "" };
        let sql = format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets {filter} ORDER BY year DESC, month DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], budget_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn get(&self, id: i64) -> Result<Option<Budget>> {
        let sql = format!("SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map([id], budget_from_row)?;
        Ok(rows.next().transpose()?)
    }

    fn require(&self, id: i64) -> Result<Budget> {
        self.get(id)?
            .ok_or_else(|| PocketbookError::not_found("Budget", id))
    }

    pub fn update(&self, id: i64, changes: BudgetUpdate) -> Result<Option<Budget>> {
        let Some(current) = self.get(id)? else {
            return Ok(None);
        };
        let name = match changes.name {
            Some(n) if n.trim().is_empty() => {
                return Err(PocketbookError::validation("budget name must not be empty"))
            }
            Some(n) => n.trim().to_string(),
            None => current.name,
        };
        let description = changes.description.unwrap_or(current.description);
        let is_active = changes.is_active.unwrap_or(current.is_active);

        unit_of_work(self.conn, "update budget", |tx| {
            tx.execute(
                "UPDATE budgets SET name = ?1, description = ?2, is_active = ?3, \
                 updated_at = datetime('now') WHERE id = ?4",
                params![name, description, is_active, id],
            )?;
            Ok(())
        })?;
        info!(id, "updated budget");
        self.get(id)
    }

    /// Delete a budget and its allocations. Returns false if it did not exist.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let removed = unit_of_work(self.conn, "delete budget", |tx| {
            tx.execute("DELETE FROM budget_categories WHERE budget_id = ?1", [id])?;
            Ok(tx.execute("DELETE FROM budgets WHERE id = ?1", [id])?)
        })?;
        if removed > 0 {
            info!(id, "deleted budget");
        }
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::ledger::{NewTransaction, TransactionService};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn spend(conn: &Connection, amount: i64, category: &str, date: NaiveDate) {
        TransactionService::new(conn)
            .create(
                NewTransaction::new(Decimal::from(amount), "spend", TransactionType::Expense)
                    .category(category)
                    .date(date),
            )
            .unwrap();
    }

    #[test]
    fn test_create_monthly_requires_valid_month() {
        let (_dir, conn) = test_db();
        let svc = BudgetService::new(&conn);
        for month in [None, Some(0), Some(13)] {
            let err = svc
                .create("Bad", PeriodType::Monthly, 2025, month, None)
                .unwrap_err();
            assert!(matches!(err, PocketbookError::Validation(_)), "month {month:?}");
        }
    }

    #[test]
    fn test_create_yearly_drops_month() {
        let (_dir, conn) = test_db();
        let svc = BudgetService::new(&conn);
        let b = svc
            .create("Year", PeriodType::Yearly, 2025, Some(4), None)
            .unwrap();
        assert_eq!(b.month, None);
    }

    #[test]
    fn test_duplicate_period_is_constraint_violation() {
        let (_dir, conn) = test_db();
        let svc = BudgetService::new(&conn);
        svc.create("March", PeriodType::Monthly, 2025, Some(3), None)
            .unwrap();
        let err = svc
            .create("March again", PeriodType::Monthly, 2025, Some(3), None)
            .unwrap_err();
        assert!(err.is_constraint_violation(), "got: {err:?}");

        svc.create("Year", PeriodType::Yearly, 2025, None, None).unwrap();
        assert!(svc
            .create("Year again", PeriodType::Yearly, 2025, None, None)
            .unwrap_err()
            .is_constraint_violation());
    }

    #[test]
    fn test_add_category_to_missing_budget() {
        let (_dir, conn) = test_db();
        let svc = BudgetService::new(&conn);
        let err = svc
            .add_category(42, "food", Decimal::from(100), None)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_add_category_duplicate_pair() {
        let (_dir, conn) = test_db();
        let svc = BudgetService::new(&conn);
        let b = svc.create("May", PeriodType::Monthly, 2025, Some(5), None).unwrap();
        let alloc = svc.add_category(b.id, "food", Decimal::from(500), None).unwrap();
        assert_eq!(alloc.category_name, "food");
        assert_eq!(alloc.allocated_amount, Decimal::from(500));
        assert!(svc
            .add_category(b.id, "food", Decimal::from(10), None)
            .unwrap_err()
            .is_constraint_violation());
    }

    #[test]
    fn test_analyze_over_budget() {
        let (_dir, conn) = test_db();
        let svc = BudgetService::new(&conn);
        let b = svc.create("June", PeriodType::Monthly, 2025, Some(6), None).unwrap();
        svc.add_category(b.id, "food", Decimal::from(500), None).unwrap();
        spend(&conn, 400, "food", d(2025, 6, 3));
        spend(&conn, 200, "food", d(2025, 6, 30));
        // outside the window
        spend(&conn, 999, "food", d(2025, 7, 1));
        spend(&conn, 999, "food", d(2025, 5, 31));

        let analysis = svc.analyze(b.id).unwrap();
        assert_eq!(analysis.start_date, d(2025, 6, 1));
        assert_eq!(analysis.end_date, d(2025, 7, 1));
        let food = &analysis.categories[0].line;
        assert_eq!(food.spent, Decimal::from(600));
        assert_eq!(food.remaining, Decimal::from(-100));
        assert_eq!(food.percentage_used, Decimal::from(120));
        assert!(food.is_over_budget);
        assert!(analysis.totals.is_over_budget);
    }

    #[test]
    fn test_analyze_ignores_income_and_other_categories() {
        let (_dir, conn) = test_db();
        let svc = BudgetService::new(&conn);
        let b = svc.create("2025", PeriodType::Yearly, 2025, None, None).unwrap();
        svc.add_category(b.id, "food", Decimal::from(1000), None).unwrap();
        svc.add_category(b.id, "gifts", Decimal::ZERO, None).unwrap();
        spend(&conn, 250, "food", d(2025, 12, 31));
        spend(&conn, 80, "travel", d(2025, 2, 1));
        TransactionService::new(&conn)
            .create(
                NewTransaction::new(Decimal::from(50), "refund", TransactionType::Income)
                    .category("food")
                    .date(d(2025, 3, 1)),
            )
            .unwrap();

        let analysis = svc.analyze(b.id).unwrap();
        assert_eq!(analysis.end_date, d(2026, 1, 1));
        assert_eq!(analysis.categories.len(), 2);
        assert_eq!(analysis.categories[0].line.spent, Decimal::from(250));
        assert_eq!(analysis.categories[0].line.percentage_used, Decimal::from(25));
        assert_eq!(analysis.categories[1].line.percentage_used, Decimal::ZERO);
        assert!(!analysis.categories[1].line.is_over_budget);
        assert_eq!(analysis.totals.allocated, Decimal::from(1000));
        assert_eq!(analysis.totals.remaining, Decimal::from(750));
    }

    #[test]
    fn test_analyze_missing_budget() {
        let (_dir, conn) = test_db();
        assert!(BudgetService::new(&conn).analyze(7).unwrap_err().is_not_found());
    }

    #[test]
    fn test_current_matches_period_exactly() {
        let (_dir, conn) = test_db();
        let svc = BudgetService::new(&conn);
        let yearly = svc.create("Y", PeriodType::Yearly, 2025, None, None).unwrap();
        let march = svc.create("M", PeriodType::Monthly, 2025, Some(3), None).unwrap();

        assert_eq!(svc.current(2025, None).unwrap().unwrap().id, yearly.id);
        assert_eq!(svc.current(2025, Some(3)).unwrap().unwrap().id, march.id);
        assert!(svc.current(2025, Some(4)).unwrap().is_none());
        assert!(svc.current(2024, None).unwrap().is_none());

        svc.update(march.id, BudgetUpdate { is_active: Some(false), ..Default::default() })
            .unwrap();
        assert!(svc.current(2025, Some(3)).unwrap().is_none());
    }

    #[test]
    fn test_list_orders_newest_first() {
        let (_dir, conn) = test_db();
        let svc = BudgetService::new(&conn);
        svc.create("Jan", PeriodType::Monthly, 2025, Some(1), None).unwrap();
        svc.create("Feb", PeriodType::Monthly, 2025, Some(2), None).unwrap();
        svc.create("Dec", PeriodType::Monthly, 2024, Some(12), None).unwrap();
        let names: Vec<_> = svc.list(true).unwrap().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["Feb", "Jan", "Dec"]);
    }

    #[test]
    fn test_update_and_delete_cascade() {
        let (_dir, conn) = test_db();
        let svc = BudgetService::new(&conn);
        let b = svc.create("Aug", PeriodType::Monthly, 2025, Some(8), None).unwrap();
        svc.add_category(b.id, "food", Decimal::from(100), None).unwrap();

        let renamed = svc
            .update(b.id, BudgetUpdate { name: Some("August".into()), ..Default::default() })
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "August");
        let described = svc
            .update(b.id, BudgetUpdate { description: Some(Some("summer".into())), ..Default::default() })
            .unwrap()
            .unwrap();
        assert_eq!(described.description.as_deref(), Some("summer"));
        let cleared = svc
            .update(b.id, BudgetUpdate { description: Some(None), ..Default::default() })
            .unwrap()
            .unwrap();
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.name, "August");
        assert!(svc.update(999, BudgetUpdate::default()).unwrap().is_none());

        assert!(svc.delete(b.id).unwrap());
        assert!(!svc.delete(b.id).unwrap());
        assert!(svc.allocations(b.id).unwrap().is_empty());
    }
}
