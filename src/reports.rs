use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::budget::{BudgetAnalysis, BudgetService};
use crate::db::from_cents;
use crate::error::{PocketbookError, Result};
use crate::investment::{InvestmentService, PortfolioSummary};
use crate::ledger::{TransactionService, TransactionSummary};
use crate::period::{end_of_month, month_end, month_name, month_start, previous_month, validate_month, year_end, year_start};

/// Relative change from `old` to `new` in percent. Growth from nothing
/// counts as +100%, and no change from nothing as 0%.
pub fn percentage_change(old: Decimal, new: Decimal) -> Decimal {
    if old.is_zero() {
        if new > Decimal::ZERO {
            Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        }
    } else {
        (new - old) / old * Decimal::ONE_HUNDRED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn of(change: Decimal) -> Self {
        if change > Decimal::ZERO {
            Trend::Up
        } else if change < Decimal::ZERO {
            Trend::Down
        } else {
            Trend::Stable
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        })
    }
}

fn require_ordered(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(PocketbookError::validation(format!(
            "start date {start} is after end date {end}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Monthly / yearly
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyTrend {
    pub previous_year: i32,
    pub previous_month: u32,
    pub previous: TransactionSummary,
    pub income_change: Decimal,
    pub expense_change: Decimal,
    pub income_trend: Trend,
    pub expense_trend: Trend,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub month_name: &'static str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub transactions: TransactionSummary,
    /// Present only when an active monthly budget covers this month.
    pub budget: Option<BudgetAnalysis>,
    pub investments: PortfolioSummary,
    pub trends: MonthlyTrend,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthEntry {
    pub month: u32,
    pub month_name: &'static str,
    #[serde(flatten)]
    pub summary: TransactionSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearlyGrowth {
    pub previous: TransactionSummary,
    pub income_growth: Decimal,
    pub expense_growth: Decimal,
    pub net_growth: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearlyReport {
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub annual_summary: TransactionSummary,
    /// Always twelve entries, January first.
    pub months: Vec<MonthEntry>,
    pub investments: PortfolioSummary,
    pub growth: YearlyGrowth,
}

// ---------------------------------------------------------------------------
// Category breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CategoryLine {
    pub name: String,
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
    /// All transaction types, transfers included.
    pub transaction_count: i64,
    /// `(income + expense) / transaction_count`.
    pub average: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category_filter: Option<String>,
    pub categories: Vec<CategoryLine>,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub total_transactions: i64,
}

// ---------------------------------------------------------------------------
// Cash flow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl FromStr for Granularity {
    type Err = PocketbookError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Granularity::Daily),
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            other => Err(PocketbookError::validation(format!(
                "invalid granularity '{other}' (expected one of: daily, weekly, monthly)"
            ))),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        })
    }
}

impl Granularity {
    /// Last day of the bucket opening on `start`, before clipping.
    fn bucket_end(&self, start: NaiveDate) -> Result<NaiveDate> {
        match self {
            Granularity::Daily => Ok(start),
            Granularity::Weekly => Ok(start.checked_add_signed(Duration::days(6)).unwrap_or(NaiveDate::MAX)),
            Granularity::Monthly => end_of_month(start),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CashFlowBucket {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
    /// Cumulative net from the first bucket through this one.
    pub running_balance: Decimal,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashFlowReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub granularity: Granularity,
    pub buckets: Vec<CashFlowBucket>,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_flow: Decimal,
    pub final_balance: Decimal,
}

#[derive(Default, Clone, Copy)]
struct DayTotals {
    income: i64,
    expense: i64,
    count: i64,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct ReportService<'a> {
    conn: &'a Connection,
}

impl<'a> ReportService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn month_summary(&self, year: i32, month: u32) -> Result<TransactionSummary> {
        TransactionService::new(self.conn).summary(
            Some(month_start(year, month)?),
            Some(month_end(year, month)?),
            None,
        )
    }

    fn year_summary(&self, year: i32) -> Result<TransactionSummary> {
        TransactionService::new(self.conn).summary(Some(year_start(year)?), Some(year_end(year)?), None)
    }

    pub fn monthly(&self, year: i32, month: u32) -> Result<MonthlyReport> {
        let month = validate_month(month)?;
        let transactions = self.month_summary(year, month)?;

        let budgets = BudgetService::new(self.conn);
        let budget = match budgets.current(year, Some(month))? {
            Some(b) => Some(budgets.analyze(b.id)?),
            None => None,
        };

        let (prev_year, prev_month) = previous_month(year, month);
        let previous = self.month_summary(prev_year, prev_month)?;
        let income_change = percentage_change(previous.income_total, transactions.income_total);
        let expense_change = percentage_change(previous.expense_total, transactions.expense_total);

        Ok(MonthlyReport {
            year,
            month,
            month_name: month_name(month),
            start_date: month_start(year, month)?,
            end_date: month_end(year, month)?,
            budget,
            investments: InvestmentService::new(self.conn).portfolio_summary()?,
            trends: MonthlyTrend {
                previous_year: prev_year,
                previous_month: prev_month,
                previous,
                income_change,
                expense_change,
                income_trend: Trend::of(income_change),
                expense_trend: Trend::of(expense_change),
            },
            transactions,
        })
    }

    pub fn yearly(&self, year: i32) -> Result<YearlyReport> {
        let annual_summary = self.year_summary(year)?;
        let months = (1..=12)
            .map(|month| -> Result<MonthEntry> {
                Ok(MonthEntry {
                    month,
                    month_name: month_name(month),
                    summary: self.month_summary(year, month)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let previous = self.year_summary(year - 1)?;
        let growth = YearlyGrowth {
            income_growth: percentage_change(previous.income_total, annual_summary.income_total),
            expense_growth: percentage_change(previous.expense_total, annual_summary.expense_total),
            net_growth: percentage_change(previous.balance, annual_summary.balance),
            previous,
        };

        Ok(YearlyReport {
            year,
            start_date: year_start(year)?,
            end_date: year_end(year)?,
            annual_summary,
            months,
            investments: InvestmentService::new(self.conn).portfolio_summary()?,
            growth,
        })
    }

    /// Per-category income and expense over an inclusive date range,
    /// highest spending first.
    pub fn category_breakdown(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        category_name: Option<&str>,
    ) -> Result<CategoryReport> {
        require_ordered(start, end)?;
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(c.name, 'Uncategorized') AS name, \
                    COALESCE(SUM(CASE WHEN t.transaction_type = 'income' THEN t.amount_cents END), 0), \
                    COALESCE(SUM(CASE WHEN t.transaction_type = 'expense' THEN t.amount_cents END), 0) AS expense, \
                    COUNT(*) \
             FROM transactions t LEFT JOIN categories c ON t.category_id = c.id \
             WHERE t.date >= ?1 AND t.date <= ?2 AND (?3 IS NULL OR c.name = ?3) \
             GROUP BY t.category_id \
             ORDER BY expense DESC, name ASC",
        )?;
        let categories = stmt
            .query_map(params![start, end, category_name], |row| {
                let income = from_cents(row.get(1)?);
                let expense = from_cents(row.get(2)?);
                let count: i64 = row.get(3)?;
                Ok(CategoryLine {
                    name: row.get(0)?,
                    income,
                    expense,
                    net: income - expense,
                    transaction_count: count,
                    average: if count > 0 {
                        ((income + expense) / Decimal::from(count)).round_dp(2)
                    } else {
                        Decimal::ZERO
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(CategoryReport {
            start_date: start,
            end_date: end,
            category_filter: category_name.map(str::to_string),
            total_income: categories.iter().map(|c| c.income).sum(),
            total_expense: categories.iter().map(|c| c.expense).sum(),
            total_transactions: categories.iter().map(|c| c.transaction_count).sum(),
            categories,
        })
    }

    /// Partition `[start, end]` into contiguous buckets and carry the net
    /// forward as a running balance.
    pub fn cash_flow(&self, start: NaiveDate, end: NaiveDate, granularity: Granularity) -> Result<CashFlowReport> {
        require_ordered(start, end)?;

        let mut stmt = self.conn.prepare(
            "SELECT t.date, \
                    COALESCE(SUM(CASE WHEN t.transaction_type = 'income' THEN t.amount_cents END), 0), \
                    COALESCE(SUM(CASE WHEN t.transaction_type = 'expense' THEN t.amount_cents END), 0), \
                    COUNT(*) \
             FROM transactions t WHERE t.date >= ?1 AND t.date <= ?2 \
             GROUP BY t.date",
        )?;
        let days: BTreeMap<NaiveDate, DayTotals> = stmt
            .query_map(params![start, end], |row| {
                Ok((
                    row.get(0)?,
                    DayTotals {
                        income: row.get(1)?,
                        expense: row.get(2)?,
                        count: row.get(3)?,
                    },
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        let mut buckets = Vec::new();
        let mut running = 0i64;
        let mut cursor = start;
        while cursor <= end {
            let period_end = granularity.bucket_end(cursor)?.min(end);
            let totals = days
                .range(cursor..=period_end)
                .fold(DayTotals::default(), |acc, (_, day)| DayTotals {
                    income: acc.income + day.income,
                    expense: acc.expense + day.expense,
                    count: acc.count + day.count,
                });
            let net = totals.income - totals.expense;
            running += net;
            buckets.push(CashFlowBucket {
                period_start: cursor,
                period_end,
                income: from_cents(totals.income),
                expense: from_cents(totals.expense),
                net: from_cents(net),
                running_balance: from_cents(running),
                transaction_count: totals.count,
            });
            match period_end.succ_opt() {
                Some(next) => cursor = next,
                None => break,
            }
        }
        debug!(buckets = buckets.len(), %granularity, "built cash flow");

        let total_income: Decimal = buckets.iter().map(|b| b.income).sum();
        let total_expense: Decimal = buckets.iter().map(|b| b.expense).sum();
        Ok(CashFlowReport {
            start_date: start,
            end_date: end,
            granularity,
            total_income,
            total_expense,
            net_flow: total_income - total_expense,
            final_balance: from_cents(running),
            buckets,
        })
    }
}
