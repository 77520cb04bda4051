use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use tracing::info;

use crate::db::{from_cents, to_cents, unit_of_work};
use crate::error::{PocketbookError, Result};
use crate::models::Goal;

const GOAL_COLUMNS: &str =
    "id, name, description, target_cents, current_cents, target_date, priority, is_active";

fn goal_from_row(row: &Row) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        target_amount: from_cents(row.get(3)?),
        current_amount: from_cents(row.get(4)?),
        target_date: row.get(5)?,
        priority: row.get(6)?,
        is_active: row.get(7)?,
    })
}

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub name: String,
    pub description: Option<String>,
    pub target_amount: Decimal,
    pub target_date: Option<NaiveDate>,
    /// 1 = high, 2 = medium, 3 = low.
    pub priority: u8,
}

impl NewGoal {
    pub fn new(name: impl Into<String>, target_amount: Decimal) -> Self {
        Self {
            name: name.into(),
            description: None,
            target_amount,
            target_date: None,
            priority: 1,
        }
    }
}

pub struct GoalService<'a> {
    conn: &'a Connection,
}

impl<'a> GoalService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, input: NewGoal) -> Result<Goal> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(PocketbookError::validation("goal name must not be empty"));
        }
        if input.target_amount <= Decimal::ZERO {
            return Err(PocketbookError::validation(format!(
                "goal target must be positive, got {}",
                input.target_amount
            )));
        }
        if !(1..=3).contains(&input.priority) {
            return Err(PocketbookError::validation(format!(
                "priority must be 1 (high), 2 (medium) or 3 (low), got {}",
                input.priority
            )));
        }
        let target = to_cents(input.target_amount)?;

        let id = unit_of_work(self.conn, "create goal", |tx| {
            tx.execute(
                "INSERT INTO goals (name, description, target_cents, target_date, priority) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, input.description, target, input.target_date, input.priority],
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        info!(id, goal = %name, target = %input.target_amount, "created goal");
        self.get(id)?
            .ok_or_else(|| PocketbookError::not_found("Goal", id))
    }

    pub fn get(&self, id: i64) -> Result<Option<Goal>> {
        let sql = format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map([id], goal_from_row)?;
        Ok(rows.next().transpose()?)
    }

    /// Highest priority first, then earliest target date; undated goals last.
    pub fn list(&self, active_only: bool) -> Result<Vec<Goal>> {
        let filter = if active_only { "WHERE is_active = 1" } else { "" };
        let sql = format!(
            "SELECT {GOAL_COLUMNS} FROM goals {filter} \
             ORDER BY priority, target_date IS NULL, target_date, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], goal_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Add `amount` to a goal's saved total. Returns `None` for an unknown id.
    pub fn contribute(&self, id: i64, amount: Decimal) -> Result<Option<Goal>> {
        if amount <= Decimal::ZERO {
            return Err(PocketbookError::validation(format!(
                "contribution must be positive, got {amount}"
            )));
        }
        let cents = to_cents(amount)?;
        let changed = unit_of_work(self.conn, "contribute to goal", |tx| {
            Ok(tx.execute(
                "UPDATE goals SET current_cents = current_cents + ?1, updated_at = datetime('now') \
                 WHERE id = ?2",
                params![cents, id],
            )?)
        })?;
        if changed == 0 {
            return Ok(None);
        }
        info!(id, amount = %amount, "contributed to goal");
        self.get(id)
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        let removed = unit_of_work(self.conn, "delete goal", |tx| {
            Ok(tx.execute("DELETE FROM goals WHERE id = ?1", [id])?)
        })?;
        if removed > 0 {
            info!(id, "deleted goal");
        }
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_contribute_tracks_progress() {
        let (_dir, conn) = test_db();
        let svc = GoalService::new(&conn);
        let goal = svc.create(NewGoal::new("Laptop", Decimal::from(2000))).unwrap();
        assert_eq!(goal.progress_percentage(), Decimal::ZERO);

        svc.contribute(goal.id, Decimal::from(300)).unwrap();
        let goal = svc.contribute(goal.id, Decimal::from(200)).unwrap().unwrap();
        assert_eq!(goal.current_amount, Decimal::from(500));
        assert_eq!(goal.progress_percentage(), Decimal::from(25));
        assert!(svc.contribute(999, Decimal::ONE).unwrap().is_none());
    }

    #[test]
    fn test_create_validates_input() {
        let (_dir, conn) = test_db();
        let svc = GoalService::new(&conn);
        assert!(svc.create(NewGoal::new("Zero", Decimal::ZERO)).is_err());
        let bad_priority = NewGoal {
            priority: 4,
            ..NewGoal::new("Trip", Decimal::from(100))
        };
        assert!(matches!(
            svc.create(bad_priority).unwrap_err(),
            PocketbookError::Validation(_)
        ));
    }

    #[test]
    fn test_list_orders_by_priority_then_date() {
        let (_dir, conn) = test_db();
        let svc = GoalService::new(&conn);
        for (name, priority, date) in [
            ("low", 3, Some(d(2025, 1, 1))),
            ("high-late", 1, Some(d(2026, 1, 1))),
            ("high-undated", 1, None),
            ("high-soon", 1, Some(d(2025, 6, 1))),
        ] {
            svc.create(NewGoal {
                priority,
                target_date: date,
                ..NewGoal::new(name, Decimal::from(100))
            })
            .unwrap();
        }
        let names: Vec<_> = svc.list(true).unwrap().into_iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["high-soon", "high-late", "high-undated", "low"]);
    }

    #[test]
    fn test_delete() {
        let (_dir, conn) = test_db();
        let svc = GoalService::new(&conn);
        let goal = svc.create(NewGoal::new("Car", Decimal::from(5000))).unwrap();
        assert!(svc.delete(goal.id).unwrap());
        assert!(!svc.delete(goal.id).unwrap());
    }
}
