//! Calendar arithmetic shared by budgets and reports.

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{PocketbookError, Result};

pub fn validate_month(month: u32) -> Result<u32> {
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(PocketbookError::validation(format!(
            "month must be between 1 and 12, got {month}"
        )))
    }
}

pub fn month_start(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, validate_month(month)?, 1)
        .ok_or_else(|| PocketbookError::validation(format!("invalid date: {year}-{month:02}")))
}

/// The (year, month) after the given one, wrapping December into January.
pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// The (year, month) before the given one, wrapping January into December.
pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Last calendar day of the month.
pub fn month_end(year: i32, month: u32) -> Result<NaiveDate> {
    let month = validate_month(month)?;
    if month == 12 {
        return NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| PocketbookError::validation(format!("invalid date: {year}-12")));
    }
    Ok(month_start(year, month + 1)? - Duration::days(1))
}

/// Last calendar day of the month containing `date`.
pub fn end_of_month(date: NaiveDate) -> Result<NaiveDate> {
    month_end(date.year(), date.month())
}

pub fn year_start(year: i32) -> Result<NaiveDate> {
    month_start(year, 1)
}

pub fn year_end(year: i32) -> Result<NaiveDate> {
    month_end(year, 12)
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "",
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        PocketbookError::validation(format!("invalid date '{value}' (expected YYYY-MM-DD)"))
    })
}
