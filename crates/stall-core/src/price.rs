//! Price parsing.
//!
//! Prices arrive as free text from forms. Both `.` and `,` are accepted as the
//! decimal separator; the result is a normalized, non-negative [`Decimal`].

use std::str::FromStr as _;

use rust_decimal::Decimal;

use crate::{Error, Result};

/// Parse a user-entered price such as `"29,90"` or `" 12.5 "`.
pub fn parse_price(raw: &str) -> Result<Decimal> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(Error::InvalidPrice(raw.to_owned()));
  }

  let dotted = trimmed.replacen(',', ".", 1);
  let value =
    Decimal::from_str(&dotted).map_err(|_| Error::InvalidPrice(raw.to_owned()))?;

  if value.is_sign_negative() && !value.is_zero() {
    return Err(Error::InvalidPrice(raw.to_owned()));
  }

  // `-0` parses with a negative sign; store it as plain zero.
  Ok(value.abs().normalize())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn comma_separator_is_normalized() {
    let price = parse_price("29,90").unwrap();
    assert_eq!(price, Decimal::from_str("29.90").unwrap());
    assert_eq!(price.to_string(), "29.9");
  }

  #[test]
  fn surrounding_whitespace_is_ignored() {
    assert_eq!(parse_price("  12.50 ").unwrap().to_string(), "12.5");
  }

  #[test]
  fn zero_is_allowed() {
    assert!(parse_price("0").unwrap().is_zero());
    assert!(parse_price("-0").unwrap().is_zero());
  }

  #[test]
  fn negative_is_rejected() {
    assert!(matches!(parse_price("-1"), Err(Error::InvalidPrice(_))));
  }

  #[test]
  fn garbage_is_rejected() {
    assert!(parse_price("").is_err());
    assert!(parse_price("abc").is_err());
    assert!(parse_price("1,000.50").is_err());
  }
}
