//! Money parsing and formatting.
//!
//! Amounts are exact decimals end to end. Client input arrives as a string,
//! is parsed once at intake, and is never rounded anywhere in the transfer
//! path. All conversions go through this module.

use rust_decimal::Decimal;

use crate::error::PaymentError;

/// Parse a client-provided amount string into an exact decimal.
///
/// Rejects malformed input and any amount not strictly greater than zero.
pub fn parse_amount(amount_str: &str) -> Result<Decimal, PaymentError> {
    let amount: Decimal = amount_str
        .trim()
        .parse()
        .map_err(|_| PaymentError::InvalidAmount(amount_str.to_string()))?;

    if amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidAmount(amount_str.to_string()));
    }

    Ok(amount)
}

/// Format an amount for external payloads (plain decimal, no exponent).
pub fn format_amount(amount: &Decimal) -> String {
    amount.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_valid_amounts() {
        assert_eq!(parse_amount("40").unwrap(), dec!(40));
        assert_eq!(parse_amount("0.01").unwrap(), dec!(0.01));
        assert_eq!(parse_amount(" 123.456 ").unwrap(), dec!(123.456));
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        assert!(matches!(parse_amount("0"), Err(PaymentError::InvalidAmount(_))));
        assert!(matches!(parse_amount("-5"), Err(PaymentError::InvalidAmount(_))));
        assert!(matches!(parse_amount("0.00"), Err(PaymentError::InvalidAmount(_))));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(parse_amount("abc"), Err(PaymentError::InvalidAmount(_))));
        assert!(matches!(parse_amount(""), Err(PaymentError::InvalidAmount(_))));
        assert!(matches!(parse_amount("1.2.3"), Err(PaymentError::InvalidAmount(_))));
    }

    #[test]
    fn test_format_is_plain() {
        assert_eq!(format_amount(&dec!(40.00)), "40.00");
        assert_eq!(format_amount(&dec!(0.5)), "0.5");
    }
}
