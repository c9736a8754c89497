//! Lenient coercion of form input.
//!
//! A half-typed field must never block a recompute: unparsable or negative
//! percentages become zero and durations never drop below one month. The
//! strict checks live in the `validate_*` functions and run at save time.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

/// Replace a negative amount with zero.
pub fn non_negative(value: Decimal) -> Decimal {
    if value.is_sign_negative() {
        Decimal::ZERO
    } else {
        value
    }
}

/// Parse a decimal amount, accepting a comma as the decimal separator.
/// Blank or unparsable input yields zero.
pub fn parse_amount(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }
    let normalized = trimmed.replace(',', ".");
    match Decimal::from_str(&normalized) {
        Ok(v) => v,
        Err(_) => {
            debug!(raw, "unparsable amount coerced to zero");
            Decimal::ZERO
        }
    }
}

/// Parse a percentage; unparsable or negative input yields zero.
/// There is no upper bound.
pub fn parse_percentage(raw: &str) -> Decimal {
    non_negative(parse_amount(raw))
}

/// Convert a float coming from a loosely typed source; NaN, infinities and
/// negative values become zero.
pub fn percentage_from_f64(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    non_negative(Decimal::from_f64(value).unwrap_or(Decimal::ZERO))
}

/// Parse a duration in whole months, never below one.
pub fn parse_duration_months(raw: &str) -> u32 {
    raw.trim().parse::<u32>().unwrap_or(1).max(1)
}

/// Clamp a duration to the one-month minimum.
pub fn clamp_duration_months(months: u32) -> u32 {
    months.max(1)
}
