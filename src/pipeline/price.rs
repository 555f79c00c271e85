//! Price normalisation for Brazilian-real tags (`R$ 1.234,56`).
//!
//! Rounding: totals are rounded to cents half away from zero
//! (`f64::round`), applied once to the sum rather than per item.

use crate::error::ItemError;
use crate::output::LabelRecord;
use once_cell::sync::Lazy;
use regex::Regex;

const CURRENCY_PREFIX: &str = "R$";

static RE_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());

/// Convert a localised price string to a number.
///
/// `"R$ 12,34"` → `12.34`, `"R$ 1.299,00"` → `1299.0`. Text that is not a
/// plain price (`"R$ 12,34 cada"`, `"não informado"`) is a
/// [`ItemError::Format`]; it is never coerced to zero.
pub fn to_numeric(price_text: &str) -> Result<f64, ItemError> {
    let format_error = || ItemError::Format {
        price_text: price_text.to_string(),
    };

    let compact: String = price_text
        .trim()
        .trim_start_matches(CURRENCY_PREFIX)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let normalised = if compact.contains(',') {
        // Decimal comma: any dots are thousands separators.
        compact.replace('.', "").replacen(',', ".", 1)
    } else {
        compact
    };

    if !RE_DECIMAL.is_match(&normalised) {
        return Err(format_error());
    }
    normalised.parse::<f64>().map_err(|_| format_error())
}

/// Format a value with exactly two decimals and a decimal comma, no symbol.
///
/// `24.9` → `"24,90"`. The currency symbol is the presentation layer's job.
pub fn to_display(value: f64) -> String {
    format!("{value:.2}").replace('.', ",")
}

/// Round to cents, half away from zero.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sum of all record prices, rounded to cents. Empty input → `0.0`.
pub fn total(records: &[LabelRecord]) -> f64 {
    // `Sum for f64` starts from -0.0, which would display as "-0,00".
    round_cents(records.iter().fold(0.0, |acc, r| acc + r.price_value))
}
