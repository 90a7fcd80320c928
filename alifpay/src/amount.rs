//! Monetary amounts that keep their original text.
//!
//! The gateway signs amounts as the exact string that travels in the request,
//! so an amount is never reformatted once it has been accepted: `"2.90"` stays
//! `"2.90"` and is never turned into `2.9`.
//!
//! Accepted text is plain digits with an optional fraction of at most
//! [`MAX_FRACTION_DIGITS`] digits. Signs, exponents, separators and bare dots
//! are refused because the gateway would echo a different text back.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::{GatewayError, Result};

/// Maximum digits after the decimal point (diram precision).
pub const MAX_FRACTION_DIGITS: usize = 2;

/// Decimal amount carried as its textual representation.
///
/// # Examples
///
/// ```
/// use alifpay::Amount;
///
/// let amount = Amount::new("2.99").unwrap();
/// assert_eq!(amount.as_str(), "2.99");
///
/// assert!(Amount::new("two dollars").is_err());
/// assert!(Amount::new("-1.00").is_err());
/// assert!(Amount::new("1e2").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Amount(String);

impl Amount {
    /// Validates `text` as a plain non-negative decimal and keeps it verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] if `text` is not of the form
    /// `digits[.digits]` with at most [`MAX_FRACTION_DIGITS`] fraction digits.
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for constructors"
    )]
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if !is_plain_decimal(&text) {
            return Err(GatewayError::InvalidInput(format!(
                "invalid amount '{text}': expected digits with at most \
                 {MAX_FRACTION_DIGITS} fraction digits"
            )));
        }
        Decimal::from_str(&text)
            .map_err(|e| GatewayError::InvalidInput(format!("invalid amount '{text}': {e}")))?;
        Ok(Self(text))
    }

    /// Returns the amount exactly as it will be signed and sent.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the numeric value of the amount.
    ///
    /// Only for comparisons and bookkeeping; never sign this value.
    #[must_use]
    pub fn value(&self) -> Decimal {
        // Validated in `new`.
        Decimal::from_str(&self.0).unwrap_or_default()
    }
}

fn is_plain_decimal(text: &str) -> bool {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text, None),
    };

    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    digits(whole)
        && fraction.is_none_or(|fraction| digits(fraction) && fraction.len() <= MAX_FRACTION_DIGITS)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Amount {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    /// Accepts a JSON string or a JSON number.
    ///
    /// Numbers keep their source text (`12.00` stays `12.00`) because
    /// `serde_json` is built with `arbitrary_precision`.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(text) => text,
            serde_json::Value::Number(number) => number.to_string(),
            other => {
                return Err(de::Error::invalid_type(
                    de::Unexpected::Other(&other.to_string()),
                    &"a decimal amount as string or number",
                ));
            }
        };
        Self::new(text).map_err(de::Error::custom)
    }
}
