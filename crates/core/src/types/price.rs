//! Decimal price parsing and display.
//!
//! The commerce API serializes every monetary amount as a decimal string with
//! two fractional digits (`"10.00"`). Amounts are kept as [`Decimal`] end to
//! end so cart totals never accumulate binary floating point error.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Errors that can occur when parsing a price.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// The input string is empty.
    #[error("price cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("price is not a decimal number: {0}")]
    NotDecimal(String),
    /// The amount is below zero.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
}

/// Parse a price string as sent by the commerce API.
///
/// # Errors
///
/// Returns an error if the input is empty, not a decimal, or negative.
///
/// # Examples
///
/// ```
/// use nexus_market_core::parse_price;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_price("10.00").unwrap(), Decimal::new(1000, 2));
/// assert!(parse_price("ten").is_err());
/// ```
pub fn parse_price(s: &str) -> Result<Decimal, PriceError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(PriceError::Empty);
    }

    let amount =
        Decimal::from_str(trimmed).map_err(|_| PriceError::NotDecimal(trimmed.to_owned()))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PriceError::Negative(amount));
    }

    Ok(amount)
}

/// Format an amount for display (e.g., `$19.99`).
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    format!(
        "${:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_valid() {
        assert_eq!(parse_price("10.00").unwrap(), Decimal::new(1000, 2));
        assert_eq!(parse_price(" 3.5 ").unwrap(), Decimal::new(35, 1));
        assert_eq!(parse_price("0").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_parse_price_rejects_garbage() {
        assert_eq!(parse_price(""), Err(PriceError::Empty));
        assert!(matches!(parse_price("abc"), Err(PriceError::NotDecimal(_))));
        assert!(matches!(parse_price("-1.00"), Err(PriceError::Negative(_))));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::new(2000, 2)), "$20.00");
        assert_eq!(format_money(Decimal::new(5, 0)), "$5.00");
        assert_eq!(format_money(Decimal::new(12345, 3)), "$12.35");
    }
}
