//! Normalized scalar values shared by desired config and chain reads.
//!
//! Chains report the same quantity in different shapes: fixed-width
//! integers, arbitrary-precision decimal strings, `0x` hex strings. Every
//! numeric field is parsed into `Uint` so that comparison is by value, and
//! every byte string into `Bytes` / `Bytes32` so comparison is by content.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("'{0}' is not an unsigned integer")]
    NotUint(String),
    #[error("'{0}' does not fit into 128 bits")]
    Overflow(String),
    #[error("invalid hex '{input}': {reason}")]
    Hex { input: String, reason: String },
    #[error("expected at most 32 bytes, got {0}")]
    TooLong(usize),
}

// ---------------------------------------------------------------------------
// Uint
// ---------------------------------------------------------------------------

/// An unsigned integer normalized to `u128`.
///
/// Deserializes from a JSON/YAML integer, a decimal string or a `0x` hex
/// string. Serializes as a plain integer when it fits into `u64`, otherwise
/// as a decimal string so nothing is lost in JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uint(pub u128);

impl Uint {
    pub const ZERO: Uint = Uint(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn to_be_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl From<u64> for Uint {
    fn from(v: u64) -> Self {
        Uint(v as u128)
    }
}

impl From<u32> for Uint {
    fn from(v: u32) -> Self {
        Uint(v as u128)
    }
}

impl From<u128> for Uint {
    fn from(v: u128) -> Self {
        Uint(v)
    }
}

impl fmt::Display for Uint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Uint {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().replace('_', "");
        let parsed = if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            if hex.is_empty() {
                return Ok(Uint::ZERO);
            }
            u128::from_str_radix(hex, 16)
        } else {
            trimmed.parse::<u128>()
        };
        parsed.map(Uint).map_err(|e| match e.kind() {
            std::num::IntErrorKind::PosOverflow => ValueError::Overflow(s.to_string()),
            _ => ValueError::NotUint(s.to_string()),
        })
    }
}

impl Serialize for Uint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match u64::try_from(self.0) {
            Ok(v) => serializer.serialize_u64(v),
            Err(_) => serializer.serialize_str(&self.0.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Uint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UintVisitor;

        impl<'de> Visitor<'de> for UintVisitor {
            type Value = Uint;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an unsigned integer, a decimal string or a 0x hex string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Uint, E> {
                Ok(Uint::from(v))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<Uint, E> {
                Ok(Uint(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Uint, E> {
                u64::try_from(v)
                    .map(Uint::from)
                    .map_err(|_| E::custom(format!("negative value {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Uint, E> {
                v.parse().map_err(E::custom)
            }

            // JSON integers past u64::MAX arrive here with their precision
            // already lost.
            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Uint, E> {
                Err(E::custom(format!(
                    "{} is not an exact unsigned integer; quote integers above 18446744073709551615 as strings",
                    v
                )))
            }
        }

        deserializer.deserialize_any(UintVisitor)
    }
}

// ---------------------------------------------------------------------------
// Bytes
// ---------------------------------------------------------------------------

/// A variable-length byte string, `0x`-hex on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Bytes(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl FromStr for Bytes {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(Bytes)
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Bytes32
// ---------------------------------------------------------------------------

/// A fixed-width 32-byte word, the cross-chain representation of a peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bytes32(pub [u8; 32]);

impl Bytes32 {
    pub const ZERO: Bytes32 = Bytes32([0u8; 32]);

    /// Left-pads `bytes` with zeros to 32 bytes.
    pub fn left_pad(bytes: &[u8]) -> Result<Self, ValueError> {
        if bytes.len() > 32 {
            return Err(ValueError::TooLong(bytes.len()));
        }
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(bytes);
        Ok(Bytes32(out))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Bytes32 {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bytes32::left_pad(&decode_hex(s)?)
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Bytes32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Bytes32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Decodes `0x`-prefixed (or bare) hex. Odd-length input gets a leading zero.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, ValueError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let padded;
    let digits = if digits.len() % 2 == 1 {
        padded = format!("0{}", digits);
        padded.as_str()
    } else {
        digits
    };
    hex::decode(digits).map_err(|e| ValueError::Hex {
        input: s.to_string(),
        reason: e.to_string(),
    })
}
