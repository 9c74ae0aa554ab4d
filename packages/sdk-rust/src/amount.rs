//! User-typed decimal amounts ↔ fixed-point integers in a token's smallest
//! unit.
//!
//! Parsing is strict: whatever the user typed must map to exactly one
//! integer, otherwise the amount is rejected with [`Error::InvalidAmount`].

use alloy::primitives::{utils::format_units, U256};

use crate::error::{Error, Result};

/// Parse a non-negative decimal string into smallest units.
///
/// Accepts `"10"`, `"10.5"`, `".5"` and `"5."`; surrounding whitespace is
/// ignored. Zero is accepted here; use [`parse_positive`] when the amount
/// must be actionable.
pub fn parse_amount(input: &str, decimals: u8) -> Result<U256> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::InvalidAmount("amount is empty".into()));
    }

    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(Error::InvalidAmount(format!("'{s}' is not a number")));
    }
    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || !is_digits(frac) {
        return Err(Error::InvalidAmount(format!("'{s}' is not a number")));
    }
    if frac.len() > decimals as usize {
        return Err(Error::InvalidAmount(format!(
            "'{s}' has more than {decimals} decimal places"
        )));
    }

    let digits = format!("{whole}{frac:0<width$}", width = decimals as usize);
    U256::from_str_radix(&digits, 10)
        .map_err(|_| Error::InvalidAmount(format!("'{s}' is out of range")))
}

/// Parse an amount that must be strictly positive.
pub fn parse_positive(input: &str, decimals: u8) -> Result<U256> {
    let value = parse_amount(input, decimals)?;
    if value.is_zero() {
        return Err(Error::InvalidAmount("amount must be greater than zero".into()));
    }
    Ok(value)
}

/// Format smallest units as a minimal decimal string (`"10"`, `"1.5"`).
///
/// The result parses back to `value` with [`parse_amount`].
pub fn format_amount(value: U256, decimals: u8) -> String {
    let formatted = format_units(value, decimals).unwrap_or_else(|_| value.to_string());
    if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        formatted
    }
}

/// Short balance label: at most 8 characters, `"0.00"` for an empty balance.
pub fn display_amount(value: U256, decimals: u8) -> String {
    if value.is_zero() {
        return "0.00".into();
    }
    format_amount(value, decimals).chars().take(8).collect()
}
