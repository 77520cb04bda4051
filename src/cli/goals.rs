use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{print_json, Context, GoalsCommands};
use crate::error::{PocketbookError, Result};
use crate::fmt::{money, pct};
use crate::goal::{GoalService, NewGoal};

fn priority_label(priority: u8) -> &'static str {
    match priority {
        1 => "high",
        2 => "medium",
        _ => "low",
    }
}

pub fn dispatch(ctx: &Context, command: GoalsCommands) -> Result<()> {
    let conn = ctx.connect()?;
    let svc = GoalService::new(&conn);
    match command {
        GoalsCommands::Add {
            name,
            target,
            date,
            priority,
            description,
        } => {
            let goal = svc.create(NewGoal {
                description,
                target_date: date,
                priority,
                ..NewGoal::new(name, target)
            })?;
            if ctx.json {
                return print_json(&goal);
            }
            println!("Added goal #{}: {} ({})", goal.id, goal.name, money(goal.target_amount));
        }
        GoalsCommands::List { all } => {
            let goals = svc.list(!all)?;
            if ctx.json {
                return print_json(&goals);
            }
            let mut table = Table::new();
            table.set_header(vec!["ID", "Name", "Priority", "Target", "Saved", "Progress", "Due"]);
            for g in &goals {
                let progress = pct(g.progress_percentage());
                let progress = if g.current_amount >= g.target_amount {
                    progress.green()
                } else {
                    progress.normal()
                };
                table.add_row(vec![
                    Cell::new(g.id),
                    Cell::new(&g.name),
                    Cell::new(priority_label(g.priority)),
                    Cell::new(money(g.target_amount)),
                    Cell::new(money(g.current_amount)),
                    Cell::new(progress),
                    Cell::new(g.target_date.map(|d| d.to_string()).unwrap_or_default()),
                ]);
            }
            println!("Goals\n{table}");
        }
        GoalsCommands::Contribute { id, amount } => {
            let goal = svc
                .contribute(id, amount)?
                .ok_or_else(|| PocketbookError::not_found("Goal", id))?;
            if ctx.json {
                return print_json(&goal);
            }
            println!(
                "{}: {} of {} ({}), {} to go",
                goal.name,
                money(goal.current_amount),
                money(goal.target_amount),
                pct(goal.progress_percentage()),
                money(goal.remaining())
            );
        }
        GoalsCommands::Delete { id } => {
            if !svc.delete(id)? {
                return Err(PocketbookError::not_found("Goal", id));
            }
            println!("Deleted goal #{id}");
        }
    }
    Ok(())
}
