use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::catalog::{add_category, deactivate_category, list_categories, NewCategory};
use crate::cli::{print_json, CategoriesCommands, Context};
use crate::error::{PocketbookError, Result};

pub fn dispatch(ctx: &Context, command: CategoriesCommands) -> Result<()> {
    match command {
        CategoriesCommands::Add {
            name,
            description,
            color,
            icon,
        } => add(
            ctx,
            NewCategory {
                name,
                description,
                color,
                icon,
            },
        ),
        CategoriesCommands::List { all } => list(ctx, !all),
        CategoriesCommands::Deactivate { name } => deactivate(ctx, &name),
    }
}

fn add(ctx: &Context, input: NewCategory) -> Result<()> {
    let conn = ctx.connect()?;
    let category = add_category(&conn, input)?;
    if ctx.json {
        return print_json(&category);
    }
    println!("Added category: {} {}", category.icon, category.name);
    Ok(())
}

fn list(ctx: &Context, active_only: bool) -> Result<()> {
    let conn = ctx.connect()?;
    let categories = list_categories(&conn, active_only)?;
    if ctx.json {
        return print_json(&categories);
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "", "Name", "Description", "Color", "Status"]);
    for c in &categories {
        let status = if c.is_active {
            "active".green()
        } else {
            "inactive".dimmed()
        };
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(&c.icon),
            Cell::new(&c.name),
            Cell::new(c.description.as_deref().unwrap_or("")),
            Cell::new(&c.color),
            Cell::new(status),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}

fn deactivate(ctx: &Context, name: &str) -> Result<()> {
    let conn = ctx.connect()?;
    if !deactivate_category(&conn, name)? {
        return Err(PocketbookError::not_found("Category", name));
    }
    println!("Deactivated category: {name}");
    Ok(())
}
