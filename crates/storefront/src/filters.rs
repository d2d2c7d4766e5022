//! Custom Askama template filters.

use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;
use wholesale_core::Price;

/// Formats a decimal amount as money with two places.
///
/// Non-numeric input is passed through unchanged.
///
/// Usage in templates: `{{ total|money }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(Decimal::from_str(raw.trim()).map_or(raw, |amount| Price::new(amount).to_string()))
}

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}
