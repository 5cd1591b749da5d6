//! Token amount conversion
//!
//! Amounts are carried as u64 base units everywhere. Human decimal strings
//! ("10.5") are converted with integer arithmetic only.

use crate::error::{EscrowError, Result};

/// Largest supported decimals value (10^19 is the largest power of ten in u64).
pub const MAX_DECIMALS: u8 = 19;

/// Parses a decimal string of base units (e.g. `"10000000"`).
pub fn parse_base_units(field: &str, value: &str) -> Result<u64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EscrowError::InvalidInput(format!("Missing field: {}", field)));
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EscrowError::InvalidInput(format!(
            "Invalid {}: '{}' is not a non-negative integer",
            field, trimmed
        )));
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| EscrowError::InvalidInput(format!("Invalid {}: '{}' exceeds u64", field, trimmed)))
}

/// Converts a human decimal amount into base units for a token with `decimals`.
///
/// # Arguments
///
/// * `ui` - Decimal string such as `"10"`, `"10.5"`, or `"0.000001"`
/// * `decimals` - Token decimals
///
/// # Returns
///
/// * `Ok(u64)` - Exact base-unit amount
/// * `Err(EscrowError::InvalidInput)` - Malformed, too precise, or overflowing value
pub fn ui_to_base_units(ui: &str, decimals: u8) -> Result<u64> {
    if decimals > MAX_DECIMALS {
        return Err(EscrowError::Internal(format!(
            "token decimals {} exceed {}",
            decimals, MAX_DECIMALS
        )));
    }

    let trimmed = ui.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(EscrowError::InvalidInput(format!(
            "Invalid uiAmount: '{}' is not a decimal number",
            trimmed
        )));
    }

    // Trailing zeros carry no precision.
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(EscrowError::InvalidInput(format!(
            "Invalid uiAmount: '{}' has more than {} fractional digits",
            trimmed, decimals
        )));
    }

    let overflow = || {
        EscrowError::InvalidInput(format!("Invalid uiAmount: '{}' exceeds u64 base units", trimmed))
    };

    let scale = 10u64.pow(decimals as u32);
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().map_err(|_| overflow())?
    };
    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        padded.parse::<u64>().map_err(|_| overflow())?
    };

    whole_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or_else(overflow)
}

/// Formats base units as a human decimal string without trailing zeros.
pub fn format_base_units(amount: u64, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let digits = format!("{:0>width$}", amount, width = decimals as usize + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals as usize);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}
