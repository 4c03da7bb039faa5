//! Overlay Node Addresses
//!
//! Every participant of the overlay is identified by a point in a 160-bit
//! ring. An address has three interchangeable forms:
//!
//! - **Number**: an unsigned integer in `0..2^160`
//! - **Bytes**: the 20-byte big-endian encoding of the number
//! - **Text**: `brunet:node:` followed by the RFC 4648 base-32 encoding of
//!   the bytes (always 32 characters, no padding)
//!
//! An [`Address`] keeps all three forms side by side and they never disagree.
//! Equality and ordering look only at the number.
//!
//! # Example
//!
//! ```
//! use resdisc_common::address::Address;
//!
//! let addr = Address::parse("42").unwrap();
//! let same = Address::parse(addr.as_str()).unwrap();
//! assert_eq!(addr, same);
//!
//! let end = addr.wrapping_sub(2);
//! assert!(end < addr);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use data_encoding::BASE32;
use num_bigint::{BigInt, BigUint, Sign};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ResdiscError, Result};

/// Literal tag every textual node address starts with.
pub const ADDRESS_PREFIX: &str = "brunet:node:";

/// Width of the binary address form in bytes (160 bits).
pub const ADDRESS_BYTES: usize = 20;

/// Length of the base-32 payload following [`ADDRESS_PREFIX`].
pub const ADDRESS_TEXT_PAYLOAD: usize = 32;

/// Encodes `value` as a `width`-byte big-endian byte string.
///
/// # Errors
///
/// Returns [`ResdiscError::OutOfRange`] if `value` needs more than `width`
/// bytes. The value is never truncated.
pub fn encode_int_to_bytes(value: &BigUint, width: usize) -> Result<Vec<u8>> {
    let significant = if value.bits() == 0 {
        Vec::new()
    } else {
        value.to_bytes_be()
    };

    if significant.len() > width {
        return Err(ResdiscError::OutOfRange(format!(
            "{} does not fit in {} bytes",
            value, width
        )));
    }

    let mut out = vec![0u8; width];
    out[width - significant.len()..].copy_from_slice(&significant);
    Ok(out)
}

/// Interprets `bytes` as a big-endian unsigned integer.
pub fn decode_bytes_to_int(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// How an address argument should be interpreted.
///
/// Decimal digits with an optional `+` or `-` sign are a number, even when
/// the number turns out to be out of range; anything else is treated as the
/// text form and validated by [`Address::from_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressForm<'a> {
    Numeric(BigInt),
    Text(&'a str),
}

impl<'a> AddressForm<'a> {
    pub fn classify(arg: &'a str) -> Self {
        let trimmed = arg.trim();
        let (sign, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (Sign::Minus, rest),
            None => (Sign::Plus, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            // All-digit strings always parse
            if let Ok(magnitude) = digits.parse::<BigUint>() {
                return AddressForm::Numeric(BigInt::from_biguint(sign, magnitude));
            }
        }
        AddressForm::Text(arg)
    }
}

/// A node address in the 160-bit overlay identifier space.
#[derive(Clone)]
pub struct Address {
    num: BigUint,
    bytes: [u8; ADDRESS_BYTES],
    text: String,
}

impl Address {
    /// Builds an address from its numeric value.
    ///
    /// # Errors
    ///
    /// Returns [`ResdiscError::OutOfRange`] if `num >= 2^160`.
    pub fn from_number(num: impl Into<BigUint>) -> Result<Self> {
        let num = num.into();
        let encoded = encode_int_to_bytes(&num, ADDRESS_BYTES)?;

        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes.copy_from_slice(&encoded);

        Ok(Self {
            text: format!("{}{}", ADDRESS_PREFIX, BASE32.encode(&bytes)),
            num,
            bytes,
        })
    }

    /// Builds an address from its 20-byte big-endian form. Always succeeds.
    pub fn from_bytes(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self {
            num: decode_bytes_to_int(&bytes),
            text: format!("{}{}", ADDRESS_PREFIX, BASE32.encode(&bytes)),
            bytes,
        }
    }

    /// Parses the canonical text form `brunet:node:<32 base-32 chars>`.
    ///
    /// # Errors
    ///
    /// Returns [`ResdiscError::Format`] when the prefix is missing, the
    /// payload has the wrong length, or the payload is not valid base-32.
    pub fn from_text(text: &str) -> Result<Self> {
        let payload = text.strip_prefix(ADDRESS_PREFIX).ok_or_else(|| {
            ResdiscError::Format(format!(
                "'{}' does not start with '{}'",
                text, ADDRESS_PREFIX
            ))
        })?;

        if payload.len() != ADDRESS_TEXT_PAYLOAD {
            return Err(ResdiscError::Format(format!(
                "'{}' has a {}-character payload, expected {}",
                text,
                payload.len(),
                ADDRESS_TEXT_PAYLOAD
            )));
        }

        let decoded = BASE32.decode(payload.as_bytes())?;
        let bytes: [u8; ADDRESS_BYTES] = decoded.as_slice().try_into().map_err(|_| {
            ResdiscError::Format(format!(
                "'{}' decodes to {} bytes, expected {}",
                text,
                decoded.len(),
                ADDRESS_BYTES
            ))
        })?;

        Ok(Self::from_bytes(bytes))
    }

    /// Parses either a decimal number or a text address.
    ///
    /// The numeric interpretation is tried first, so `"42"`, `"+42"` and
    /// `Address::from_number(42u32)` are the same address.
    ///
    /// # Errors
    ///
    /// Returns [`ResdiscError::OutOfRange`] for negative numbers and numbers
    /// of `2^160` or more, and [`ResdiscError::Format`] for malformed text.
    pub fn parse(arg: &str) -> Result<Self> {
        match AddressForm::classify(arg) {
            AddressForm::Numeric(num) => {
                let magnitude = num.to_biguint().ok_or_else(|| {
                    ResdiscError::OutOfRange(format!("{} is negative", num))
                })?;
                Self::from_number(magnitude)
            }
            AddressForm::Text(text) => Self::from_text(text),
        }
    }

    /// Subtracts `k` modulo `2^160`, walking backwards around the ring.
    pub fn wrapping_sub(&self, k: u64) -> Self {
        let modulus = BigUint::from(1u8) << (ADDRESS_BYTES * 8);
        let k = BigUint::from(k) % &modulus;
        let num = (&self.num + &modulus - k) % &modulus;

        // num < 2^160, so its big-endian form fits in ADDRESS_BYTES
        let significant = num.to_bytes_be();
        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes[ADDRESS_BYTES - significant.len()..].copy_from_slice(&significant);

        Self::from_bytes(bytes)
    }

    pub fn number(&self) -> &BigUint {
        &self.num
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.bytes
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.num == other.num
    }
}

impl Eq for Address {}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        self.num.cmp(&other.num)
    }
}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.num.hash(state);
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.text)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Address {
    type Err = ResdiscError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Address::from_text(&text).map_err(serde::de::Error::custom)
    }
}
