//! Cheesecoin amounts
//!
//! Every balance, tax and loan figure is an integer count of hundredths of a
//! cheesecoin. Rates are kept as [`Decimal`] so percentage arithmetic is exact
//! up to the final rounding step.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Amount in minor units (1 cheesecoin = 100)
pub type Amount = i64;

/// Minor units per cheesecoin
pub const MINOR_UNITS: Amount = 100;

/// Currency suffix used when rendering amounts
pub const CURRENCY_SUFFIX: &str = "cc";

/// Render an amount as a two decimal place cheesecoin string, e.g. `12.34cc`
pub fn format_cheesecoins(amount: Amount) -> String {
    format!("{}{}", Decimal::new(amount, 2), CURRENCY_SUFFIX)
}

/// Convert a floating point cheesecoin value into minor units
///
/// Rounds to the nearest hundredth. Returns `None` for values that are not
/// finite or do not fit in an [`Amount`].
pub fn cheesecoins_from_float(value: f64) -> Option<Amount> {
    let scaled = (value * MINOR_UNITS as f64).round();
    if scaled.is_finite() && scaled.abs() < Amount::MAX as f64 {
        Some(scaled as Amount)
    } else {
        None
    }
}

/// `ceil(amount * rate / 100)`
///
/// Returns `None` when the result does not fit in an [`Amount`].
pub fn ceil_percent(amount: Amount, rate: Decimal) -> Option<Amount> {
    Decimal::from(amount)
        .checked_mul(rate)?
        .checked_div(Decimal::ONE_HUNDRED)?
        .ceil()
        .to_i64()
}

/// `trunc(amount * multiplier)`, used for casino winnings
pub fn trunc_multiple(amount: Amount, multiplier: Decimal) -> Option<Amount> {
    Decimal::from(amount)
        .checked_mul(multiplier)?
        .trunc()
        .to_i64()
}
