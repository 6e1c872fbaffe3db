//! Decimal arithmetic utilities for funding rate calculations.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// Hours in a (non-leap) year, the annualization base used everywhere.
pub const HOURS_PER_YEAR: Decimal = dec!(8760);

/// Number of funding periods per year for a given interval in hours.
///
/// `None` for non-positive intervals, or one so small the count overflows.
pub fn periods_per_year(interval_hours: Decimal) -> Option<Decimal> {
    if interval_hours <= Decimal::ZERO {
        return None;
    }
    HOURS_PER_YEAR.checked_div(interval_hours)
}

/// Safe division that returns zero if divisor is zero (or negative).
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Convert a decimal fraction (0.0001) to percent (0.01).
///
/// `None` when the result is out of `Decimal` range.
pub fn to_percent(fraction: Decimal) -> Option<Decimal> {
    fraction.checked_mul(dec!(100))
}

/// Convert percent (0.01) to a decimal fraction (0.0001).
pub fn from_percent(percent: Decimal) -> Decimal {
    percent / dec!(100)
}

/// Round half away from zero to `dp` places for display.
pub fn round_display(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a decimal from plain (`"0.0001"`) or scientific (`"1e-4"`) notation.
///
/// Empty strings and anything non-numeric (`"NaN"`, `"inf"`) yield `None`.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Deserialize an optional decimal that venues send either as a JSON string
/// or as a JSON number. Null, missing and unparseable values become `None`.
pub fn deserialize_flexible_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_json))
}

/// Read a decimal out of an arbitrary JSON value (string or number).
pub fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => parse_decimal(s),
        serde_json::Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    }
}
