//! Investment holdings, their valuations and dividends, and portfolio analytics.
//!
//! Valuations are point-in-time: [`InvestmentService::update_value`] replaces
//! the current value and stamps `last_updated`, and no price history is kept.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::{from_cents, opt_to_cents, to_cents, unit_of_work, Conditions};
use crate::error::{PocketbookError, Result};
use crate::models::{percent_of, Dividend, Investment, InvestmentType};

pub const PERFORMER_COUNT: usize = 5;
const SHARE_DECIMALS: u32 = 6;
const DAYS_PER_YEAR: f64 = 365.25;

const INVESTMENT_COLUMNS: &str = "id, name, investment_type, initial_cents, current_cents, shares, \
     purchase_price_cents, purchase_date, description, last_updated, is_active";

fn investment_from_row(row: &Row) -> rusqlite::Result<Investment> {
    let shares: Option<String> = row.get(5)?;
    let shares = shares
        .map(|s| Decimal::from_str(&s))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    let purchase_price: Option<i64> = row.get(6)?;
    Ok(Investment {
        id: row.get(0)?,
        name: row.get(1)?,
        investment_type: row.get(2)?,
        initial_amount: from_cents(row.get(3)?),
        current_value: from_cents(row.get(4)?),
        shares,
        purchase_price: purchase_price.map(from_cents),
        purchase_date: row.get(7)?,
        description: row.get(8)?,
        last_updated: row.get(9)?,
        is_active: row.get(10)?,
    })
}

fn dividend_from_row(row: &Row) -> rusqlite::Result<Dividend> {
    Ok(Dividend {
        id: row.get(0)?,
        investment_id: row.get(1)?,
        amount: from_cents(row.get(2)?),
        payment_date: row.get(3)?,
        notes: row.get(4)?,
    })
}

fn non_negative(field: &str, amount: Decimal) -> Result<i64> {
    if amount < Decimal::ZERO {
        return Err(PocketbookError::validation(format!(
            "{field} must not be negative, got {amount}"
        )));
    }
    to_cents(amount)
}

fn shares_text(shares: Option<Decimal>) -> Result<Option<String>> {
    match shares {
        Some(s) if s < Decimal::ZERO => Err(PocketbookError::validation(format!(
            "shares must not be negative, got {s}"
        ))),
        Some(s) => Ok(Some(s.round_dp(SHARE_DECIMALS).normalize().to_string())),
        None => Ok(None),
    }
}

#[derive(Debug, Clone)]
pub struct NewInvestment {
    pub name: String,
    pub investment_type: InvestmentType,
    pub initial_amount: Decimal,
    /// Defaults to the initial amount.
    pub current_value: Option<Decimal>,
    pub shares: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    /// Defaults to today.
    pub purchase_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl NewInvestment {
    pub fn new(name: impl Into<String>, investment_type: InvestmentType, initial_amount: Decimal) -> Self {
        Self {
            name: name.into(),
            investment_type,
            initial_amount,
            current_value: None,
            shares: None,
            purchase_price: None,
            purchase_date: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvestmentUpdate {
    pub name: Option<String>,
    pub current_value: Option<Decimal>,
    pub shares: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TypeBucket {
    pub count: usize,
    pub invested: Decimal,
    pub current_value: Decimal,
    #[serde(rename = "return")]
    pub return_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Performer {
    pub id: i64,
    pub name: String,
    pub investment_type: InvestmentType,
    pub invested: Decimal,
    pub current_value: Decimal,
    pub return_amount: Decimal,
    pub return_percentage: Decimal,
}

impl From<&Investment> for Performer {
    fn from(inv: &Investment) -> Self {
        Self {
            id: inv.id,
            name: inv.name.clone(),
            investment_type: inv.investment_type,
            invested: inv.initial_amount,
            current_value: inv.current_value,
            return_amount: inv.return_amount(),
            return_percentage: inv.return_percentage(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSummary {
    pub total_invested: Decimal,
    pub current_value: Decimal,
    pub total_return: Decimal,
    pub return_percentage: Decimal,
    pub investments_count: usize,
    pub by_type: BTreeMap<InvestmentType, TypeBucket>,
    /// Best first.
    pub top_performers: Vec<Performer>,
    /// Worst first. Never overlaps `top_performers`, so it stays empty until
    /// the portfolio holds more than five investments.
    pub worst_performers: Vec<Performer>,
}

impl PortfolioSummary {
    fn from_investments(investments: &[Investment]) -> Self {
        let total_invested: Decimal = investments.iter().map(|i| i.initial_amount).sum();
        let current_value: Decimal = investments.iter().map(|i| i.current_value).sum();
        let total_return = current_value - total_invested;

        let mut by_type: BTreeMap<InvestmentType, TypeBucket> = BTreeMap::new();
        for inv in investments {
            let bucket = by_type.entry(inv.investment_type).or_default();
            bucket.count += 1;
            bucket.invested += inv.initial_amount;
            bucket.current_value += inv.current_value;
            bucket.return_amount += inv.return_amount();
        }

        let mut ranked: Vec<Performer> = investments.iter().map(Performer::from).collect();
        ranked.sort_by(|a, b| b.return_percentage.cmp(&a.return_percentage));
        let top_performers = ranked.iter().take(PERFORMER_COUNT).cloned().collect();
        let worst_start = PERFORMER_COUNT.max(ranked.len().saturating_sub(PERFORMER_COUNT));
        let worst_performers = ranked
            .get(worst_start..)
            .unwrap_or_default()
            .iter()
            .rev()
            .cloned()
            .collect();

        Self {
            total_invested,
            current_value,
            total_return,
            return_percentage: percent_of(total_return, total_invested),
            investments_count: investments.len(),
            by_type,
            top_performers,
            worst_performers,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvestmentPerformance {
    pub investment: Investment,
    pub as_of: NaiveDate,
    pub total_return: Decimal,
    pub return_percentage: Decimal,
    /// Days since purchase, never negative.
    pub holding_days: i64,
    /// Compound yearly growth in percent; zero without a positive holding
    /// period and initial amount.
    pub annualized_return: Decimal,
    pub total_dividends: Decimal,
}

/// `((current / initial) ^ (365.25 / days) - 1) * 100`.
pub fn annualized_return(initial: Decimal, current: Decimal, holding_days: i64) -> Decimal {
    if holding_days <= 0 || initial <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let (Some(initial), Some(current)) = (initial.to_f64(), current.to_f64()) else {
        return Decimal::ZERO;
    };
    let growth = (current / initial).powf(DAYS_PER_YEAR / holding_days as f64) - 1.0;
    Decimal::from_f64(growth * 100.0)
        .map(|d| d.round_dp(4))
        .unwrap_or_else(|| {
            warn!(initial, current, holding_days, "annualized return out of range");
            Decimal::ZERO
        })
}

pub struct InvestmentService<'a> {
    conn: &'a Connection,
}

impl<'a> InvestmentService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, input: NewInvestment) -> Result<Investment> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(PocketbookError::validation("investment name must not be empty"));
        }
        let initial = non_negative("initial amount", input.initial_amount)?;
        let current = match input.current_value {
            Some(v) => non_negative("current value", v)?,
            None => initial,
        };
        let purchase_price = match input.purchase_price {
            Some(p) => Some(non_negative("purchase price", p)?),
            None => None,
        };
        let shares = shares_text(input.shares)?;
        let purchase_date = input
            .purchase_date
            .unwrap_or_else(|| Local::now().date_naive());

        let id = unit_of_work(self.conn, "create investment", |tx| {
            tx.execute(
                "INSERT INTO investments \
                 (name, investment_type, initial_cents, current_cents, shares, purchase_price_cents, purchase_date, description) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    name,
                    input.investment_type,
                    initial,
                    current,
                    shares,
                    purchase_price,
                    purchase_date,
                    input.description
                ],
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        info!(id, investment = %name, kind = %input.investment_type, "created investment");
        self.require(id)
    }

    /// Newest purchases first.
    pub fn list(&self, active_only: bool, investment_type: Option<InvestmentType>) -> Result<Vec<Investment>> {
        let mut cond = Conditions::new();
        if active_only {
            cond.push("is_active = ?", true);
        }
        if let Some(kind) = investment_type {
            cond.push("investment_type = ?", kind);
        }
        let sql = format!(
            "SELECT {INVESTMENT_COLUMNS} FROM investments WHERE {} \
             ORDER BY purchase_date DESC, id DESC",
            cond.sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(cond.values().as_slice(), investment_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn get(&self, id: i64) -> Result<Option<Investment>> {
        let sql = format!("SELECT {INVESTMENT_COLUMNS} FROM investments WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map([id], investment_from_row)?;
        Ok(rows.next().transpose()?)
    }

    fn require(&self, id: i64) -> Result<Investment> {
        self.get(id)?
            .ok_or_else(|| PocketbookError::not_found("Investment", id))
    }

    /// Record a new valuation. `date` defaults to now and may not precede the
    /// purchase date. Returns `None` for an unknown id.
    pub fn update_value(&self, id: i64, value: Decimal, date: Option<NaiveDate>) -> Result<Option<Investment>> {
        let cents = non_negative("current value", value)?;
        let Some(current) = self.get(id)? else {
            return Ok(None);
        };
        let stamp: NaiveDateTime = match date {
            Some(d) if d < current.purchase_date => {
                return Err(PocketbookError::validation(format!(
                    "valuation date {d} is before the purchase date {}",
                    current.purchase_date
                )))
            }
            Some(d) => d.and_time(NaiveTime::MIN),
            None => Local::now().naive_local(),
        };

        unit_of_work(self.conn, "update investment value", |tx| {
            tx.execute(
                "UPDATE investments SET current_cents = ?1, last_updated = ?2, updated_at = datetime('now') \
                 WHERE id = ?3",
                params![cents, stamp, id],
            )?;
            Ok(())
        })?;
        info!(id, value = %value, "updated investment value");
        self.get(id)
    }

    pub fn update(&self, id: i64, changes: InvestmentUpdate) -> Result<Option<Investment>> {
        let Some(current) = self.get(id)? else {
            return Ok(None);
        };
        let name = match changes.name {
            Some(n) if n.trim().is_empty() => {
                return Err(PocketbookError::validation("investment name must not be empty"))
            }
            Some(n) => n.trim().to_string(),
            None => current.name,
        };
        let value = non_negative("current value", changes.current_value.unwrap_or(current.current_value))?;
        let shares = shares_text(changes.shares.or(current.shares))?;
        let purchase_price = opt_to_cents(changes.purchase_price.or(current.purchase_price))?;
        let description = changes.description.unwrap_or(current.description);
        let is_active = changes.is_active.unwrap_or(current.is_active);

        unit_of_work(self.conn, "update investment", |tx| {
            tx.execute(
                "UPDATE investments SET name = ?1, current_cents = ?2, shares = ?3, purchase_price_cents = ?4, \
                 description = ?5, is_active = ?6, updated_at = datetime('now') WHERE id = ?7",
                params![name, value, shares, purchase_price, description, is_active, id],
            )?;
            Ok(())
        })?;
        info!(id, "updated investment");
        self.get(id)
    }

    /// Delete an investment and its dividends. Returns false if it did not exist.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let removed = unit_of_work(self.conn, "delete investment", |tx| {
            tx.execute("DELETE FROM dividends WHERE investment_id = ?1", [id])?;
            Ok(tx.execute("DELETE FROM investments WHERE id = ?1", [id])?)
        })?;
        if removed > 0 {
            info!(id, "deleted investment");
        }
        Ok(removed > 0)
    }

    pub fn add_dividend(
        &self,
        investment_id: i64,
        amount: Decimal,
        payment_date: Option<NaiveDate>,
        notes: Option<&str>,
    ) -> Result<Dividend> {
        let cents = non_negative("dividend amount", amount)?;
        self.require(investment_id)?;
        let payment_date = payment_date.unwrap_or_else(|| Local::now().date_naive());

        let id = unit_of_work(self.conn, "add dividend", |tx| {
            tx.execute(
                "INSERT INTO dividends (investment_id, amount_cents, payment_date, notes) VALUES (?1, ?2, ?3, ?4)",
                params![investment_id, cents, payment_date, notes],
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        info!(id, investment_id, amount = %amount, "recorded dividend");
        Ok(self.conn.query_row(
            "SELECT id, investment_id, amount_cents, payment_date, notes FROM dividends WHERE id = ?1",
            [id],
            dividend_from_row,
        )?)
    }

    pub fn dividends(&self, investment_id: i64) -> Result<Vec<Dividend>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, investment_id, amount_cents, payment_date, notes FROM dividends \
             WHERE investment_id = ?1 ORDER BY payment_date, id",
        )?;
        let rows = stmt.query_map([investment_id], dividend_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn portfolio_summary(&self) -> Result<PortfolioSummary> {
        let investments = self.list(true, None)?;
        Ok(PortfolioSummary::from_investments(&investments))
    }

    pub fn performance(&self, id: i64) -> Result<InvestmentPerformance> {
        self.performance_as_of(id, Local::now().date_naive())
    }

    pub fn performance_as_of(&self, id: i64, today: NaiveDate) -> Result<InvestmentPerformance> {
        let investment = self.require(id)?;
        let holding_days = (today - investment.purchase_date).num_days().max(0);
        let total_dividends: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM dividends WHERE investment_id = ?1",
            [id],
            |r| r.get(0),
        )?;

        Ok(InvestmentPerformance {
            as_of: today,
            total_return: investment.return_amount(),
            return_percentage: investment.return_percentage(),
            holding_days,
            annualized_return: annualized_return(
                investment.initial_amount,
                investment.current_value,
                holding_days,
            ),
            total_dividends: from_cents(total_dividends),
            investment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn buy(svc: &InvestmentService, name: &str, kind: InvestmentType, initial: i64, current: i64) -> Investment {
        svc.create(NewInvestment {
            current_value: Some(Decimal::from(current)),
            purchase_date: Some(d(2024, 1, 1)),
            ..NewInvestment::new(name, kind, Decimal::from(initial))
        })
        .unwrap()
    }

    #[test]
    fn test_create_defaults_current_value() {
        let (_dir, conn) = test_db();
        let svc = InvestmentService::new(&conn);
        let inv = svc
            .create(NewInvestment::new("ACME", InvestmentType::Stock, Decimal::new(100050, 2)))
            .unwrap();
        assert_eq!(inv.current_value, Decimal::new(100050, 2));
        assert_eq!(inv.purchase_date, Local::now().date_naive());
        assert!(inv.last_updated.is_none());
    }

    #[test]
    fn test_create_keeps_fractional_shares() {
        let (_dir, conn) = test_db();
        let svc = InvestmentService::new(&conn);
        let inv = svc
            .create(NewInvestment {
                shares: Some(Decimal::from_str("0.1234567").unwrap()),
                ..NewInvestment::new("BTC", InvestmentType::Crypto, Decimal::from(500))
            })
            .unwrap();
        assert_eq!(inv.shares, Some(Decimal::from_str("0.123457").unwrap()));
    }

    #[test]
    fn test_create_rejects_negative_amount() {
        let (_dir, conn) = test_db();
        let err = InvestmentService::new(&conn)
            .create(NewInvestment::new("Bad", InvestmentType::Bond, Decimal::from(-5)))
            .unwrap_err();
        assert!(matches!(err, PocketbookError::Validation(_)));
    }

    #[test]
    fn test_portfolio_single_investment_return() {
        let (_dir, conn) = test_db();
        let svc = InvestmentService::new(&conn);
        buy(&svc, "Index", InvestmentType::Fund, 1000, 1200);
        let summary = svc.portfolio_summary().unwrap();
        assert_eq!(summary.total_invested, Decimal::from(1000));
        assert_eq!(summary.total_return, Decimal::from(200));
        assert_eq!(summary.return_percentage, Decimal::from(20));
        assert_eq!(summary.investments_count, 1);
        assert_eq!(summary.top_performers.len(), 1);
        assert!(summary.worst_performers.is_empty());
    }

    #[test]
    fn test_portfolio_empty() {
        let (_dir, conn) = test_db();
        let summary = InvestmentService::new(&conn).portfolio_summary().unwrap();
        assert_eq!(summary.return_percentage, Decimal::ZERO);
        assert!(summary.by_type.is_empty());
    }

    #[test]
    fn test_update_sets_and_clears_description() {
        let (_dir, conn) = test_db();
        let svc = InvestmentService::new(&conn);
        let inv = svc
            .create(NewInvestment {
                description: Some("retirement".into()),
                ..NewInvestment::new("Index", InvestmentType::Fund, Decimal::from(500))
            })
            .unwrap();
        let cleared = svc
            .update(inv.id, InvestmentUpdate { description: Some(None), ..Default::default() })
            .unwrap()
            .unwrap();
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.initial_amount, Decimal::from(500));

        let kept = svc
            .update(inv.id, InvestmentUpdate { name: Some("Index Fund".into()), ..Default::default() })
            .unwrap()
            .unwrap();
        assert_eq!(kept.description, None);
        assert_eq!(kept.name, "Index Fund");
    }

    #[test]
    fn test_portfolio_groups_by_type_and_skips_inactive() {
        let (_dir, conn) = test_db();
        let svc = InvestmentService::new(&conn);
        buy(&svc, "A", InvestmentType::Stock, 100, 150);
        buy(&svc, "B", InvestmentType::Stock, 200, 180);
        buy(&svc, "C", InvestmentType::Bond, 300, 310);
        let gone = buy(&svc, "D", InvestmentType::Bond, 1000, 0);
        svc.update(gone.id, InvestmentUpdate { is_active: Some(false), ..Default::default() })
            .unwrap();

        let summary = svc.portfolio_summary().unwrap();
        assert_eq!(summary.investments_count, 3);
        let stocks = &summary.by_type[&InvestmentType::Stock];
        assert_eq!(stocks.count, 2);
        assert_eq!(stocks.invested, Decimal::from(300));
        assert_eq!(stocks.return_amount, Decimal::from(30));
        assert_eq!(summary.by_type[&InvestmentType::Bond].count, 1);
    }

    #[test]
    fn test_performers_are_disjoint() {
        let (_dir, conn) = test_db();
        let svc = InvestmentService::new(&conn);
        // returns of 10%, 20%, ... 70%
        for i in 1..=7 {
            buy(&svc, &format!("inv{i}"), InvestmentType::Stock, 100, 100 + i * 10);
        }
        let summary = svc.portfolio_summary().unwrap();
        let top: Vec<_> = summary.top_performers.iter().map(|p| p.name.as_str()).collect();
        let worst: Vec<_> = summary.worst_performers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(top, vec!["inv7", "inv6", "inv5", "inv4", "inv3"]);
        assert_eq!(worst, vec!["inv1", "inv2"]);
    }

    #[test]
    fn test_update_value_sets_last_updated() {
        let (_dir, conn) = test_db();
        let svc = InvestmentService::new(&conn);
        let inv = buy(&svc, "A", InvestmentType::Stock, 100, 100);
        let updated = svc
            .update_value(inv.id, Decimal::from(130), Some(d(2024, 6, 1)))
            .unwrap()
            .unwrap();
        assert_eq!(updated.current_value, Decimal::from(130));
        assert_eq!(updated.last_updated.unwrap().date(), d(2024, 6, 1));
        assert!(svc.update_value(999, Decimal::ONE, None).unwrap().is_none());
    }

    #[test]
    fn test_update_value_rejects_date_before_purchase() {
        let (_dir, conn) = test_db();
        let svc = InvestmentService::new(&conn);
        let inv = buy(&svc, "A", InvestmentType::Stock, 100, 100);
        let err = svc
            .update_value(inv.id, Decimal::from(90), Some(d(2023, 12, 31)))
            .unwrap_err();
        assert!(matches!(err, PocketbookError::Validation(_)));
    }

    #[test]
    fn test_performance_annualized() {
        let (_dir, conn) = test_db();
        let svc = InvestmentService::new(&conn);
        let inv = buy(&svc, "A", InvestmentType::Stock, 1000, 1100);
        let perf = svc.performance_as_of(inv.id, d(2024, 12, 31)).unwrap();
        assert_eq!(perf.holding_days, 365);
        assert_eq!(perf.total_return, Decimal::from(100));
        assert_eq!(perf.return_percentage, Decimal::from(10));
        // one day short of a year compounds slightly above 10%
        assert!(perf.annualized_return > Decimal::from(10));
        assert!(perf.annualized_return < Decimal::new(1003, 2));
    }

    #[test]
    fn test_performance_before_purchase_clamps_to_zero() {
        let (_dir, conn) = test_db();
        let svc = InvestmentService::new(&conn);
        let inv = buy(&svc, "A", InvestmentType::Stock, 1000, 1500);
        let perf = svc.performance_as_of(inv.id, d(2023, 6, 1)).unwrap();
        assert_eq!(perf.holding_days, 0);
        assert_eq!(perf.annualized_return, Decimal::ZERO);
    }

    #[test]
    fn test_performance_zero_initial() {
        assert_eq!(annualized_return(Decimal::ZERO, Decimal::from(50), 100), Decimal::ZERO);
    }

    #[test]
    fn test_performance_missing() {
        let (_dir, conn) = test_db();
        assert!(InvestmentService::new(&conn).performance(5).unwrap_err().is_not_found());
    }

    #[test]
    fn test_dividends_total_and_cascade() {
        let (_dir, conn) = test_db();
        let svc = InvestmentService::new(&conn);
        let inv = buy(&svc, "A", InvestmentType::Stock, 1000, 1000);
        svc.add_dividend(inv.id, Decimal::new(1250, 2), Some(d(2024, 3, 1)), None)
            .unwrap();
        svc.add_dividend(inv.id, Decimal::new(750, 2), Some(d(2024, 6, 1)), Some("Q2"))
            .unwrap();
        assert!(svc
            .add_dividend(999, Decimal::ONE, None, None)
            .unwrap_err()
            .is_not_found());

        let perf = svc.performance_as_of(inv.id, d(2024, 7, 1)).unwrap();
        assert_eq!(perf.total_dividends, Decimal::from(20));
        assert_eq!(svc.dividends(inv.id).unwrap()[1].notes.as_deref(), Some("Q2"));

        assert!(svc.delete(inv.id).unwrap());
        assert!(svc.dividends(inv.id).unwrap().is_empty());
        assert!(!svc.delete(inv.id).unwrap());
    }

    #[test]
    fn test_list_filters_by_type() {
        let (_dir, conn) = test_db();
        let svc = InvestmentService::new(&conn);
        buy(&svc, "A", InvestmentType::Stock, 1, 1);
        buy(&svc, "B", InvestmentType::Crypto, 1, 1);
        let crypto = svc.list(true, Some(InvestmentType::Crypto)).unwrap();
        assert_eq!(crypto.len(), 1);
        assert_eq!(crypto[0].name, "B");
        assert_eq!(svc.list(false, None).unwrap().len(), 2);
    }
}
