use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// Convert a portal amount such as `"1.234,56 €"` into a decimal.
///
/// Only digits, the comma and a leading minus sign are kept: the comma is the
/// decimal point and dots are thousands grouping.
pub fn normalize(input: &str) -> Result<Decimal> {
    let format_error = || Error::Format {
        input: input.to_string(),
    };

    let mut canonical = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '0'..='9' => canonical.push(c),
            ',' => canonical.push('.'),
            '-' if !canonical.chars().any(|d| d.is_ascii_digit()) => canonical = "-".into(),
            _ => {}
        }
    }

    if !canonical.chars().any(|c| c.is_ascii_digit()) {
        return Err(format_error());
    }
    Decimal::from_str(&canonical).map_err(|_| format_error())
}
