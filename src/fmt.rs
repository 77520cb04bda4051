use std::sync::OnceLock;

use rust_decimal::{Decimal, RoundingStrategy};

static CURRENCY_SYMBOL: OnceLock<String> = OnceLock::new();

/// Display prefix for an ISO currency code. Codes without a common symbol
/// print as the code itself: `CHF 12.00`.
pub fn currency_symbol(code: &str) -> String {
    match code.trim().to_ascii_uppercase().as_str() {
        "USD" | "CAD" | "AUD" | "NZD" | "MXN" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "JPY" | "CNY" => "¥".to_string(),
        "INR" => "₹".to_string(),
        "KRW" => "₩".to_string(),
        other => format!("{other} "),
    }
}

/// Set the symbol [`money`] uses for the rest of the process. Only the
/// first call takes effect.
pub fn set_currency(code: &str) {
    let _ = CURRENCY_SYMBOL.set(currency_symbol(code));
}

/// Format an amount in the configured currency (dollars by default): $1,234.56
pub fn money(val: Decimal) -> String {
    money_with(val, CURRENCY_SYMBOL.get().map_or("$", String::as_str))
}

/// Format an amount with thousands separators behind `symbol`.
pub fn money_with(val: Decimal, symbol: &str) -> String {
    let rounded = val.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let cents = format!("{:.2}", rounded.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((&cents, "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-{symbol}{with_commas}.{dec_part}")
    } else {
        format!("{symbol}{with_commas}.{dec_part}")
    }
}

/// One-decimal percentage: 12.5%
pub fn pct(val: Decimal) -> String {
    format!(
        "{:.1}%",
        val.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Percentage with an explicit sign, for period-over-period changes.
pub fn signed_pct(val: Decimal) -> String {
    if val > Decimal::ZERO {
        format!("+{}", pct(val))
    } else {
        pct(val)
    }
}
