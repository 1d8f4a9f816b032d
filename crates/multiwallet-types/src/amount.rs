//! Amount parsing and string encoding for big-integer balances.
//!
//! Chains hand amounts over as decimal strings, `0x`-prefixed hex strings or
//! (for small values) plain JSON integers. Everything is normalized into
//! [`BigUint`]; anything else is a [`ParseError`].

use multiwallet_error::ParseError;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// An amount exactly as it arrived on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    /// JSON integer
    Number(u64),
    /// Decimal or `0x` hex string
    Text(String),
}

impl RawAmount {
    /// Parses the amount, naming `field` in the error
    pub fn parse(&self, field: &str) -> Result<BigUint, ParseError> {
        match self {
            RawAmount::Number(n) => Ok(BigUint::from(*n)),
            RawAmount::Text(s) => parse_amount(field, s),
        }
    }
}

impl From<&str> for RawAmount {
    fn from(s: &str) -> Self {
        RawAmount::Text(s.to_string())
    }
}

impl From<u64> for RawAmount {
    fn from(n: u64) -> Self {
        RawAmount::Number(n)
    }
}

/// Parses a decimal or `0x`-prefixed hex string into a [`BigUint`].
///
/// Empty strings, signs, whitespace and digit separators are rejected.
pub fn parse_amount(field: &str, raw: &str) -> Result<BigUint, ParseError> {
    let (digits, radix) = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (raw, 10),
    };

    if digits.is_empty() {
        return Err(ParseError::new(field, raw, "empty amount"));
    }

    let valid = if radix == 16 {
        digits.bytes().all(|b| b.is_ascii_hexdigit())
    } else {
        digits.bytes().all(|b| b.is_ascii_digit())
    };
    if !valid {
        return Err(ParseError::new(field, raw, format!("not a base-{} unsigned integer", radix)));
    }

    BigUint::parse_bytes(digits.as_bytes(), radix)
        .ok_or_else(|| ParseError::new(field, raw, "unparseable amount"))
}

/// Serde adapter that stores a [`BigUint`] as a decimal string.
pub mod amount_string {
    use super::parse_amount;
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes as a decimal string
    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    /// Deserializes from a decimal/hex string or integer
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let raw = super::RawAmount::deserialize(deserializer)?;
        match raw {
            super::RawAmount::Number(n) => Ok(BigUint::from(n)),
            super::RawAmount::Text(s) => parse_amount("amount", &s).map_err(serde::de::Error::custom),
        }
    }
}
