//! Declared decoding rules for the temperature field of a probe payload.
//!
//! A rule names where the 16-bit raw value lives, how to interpret its bits
//! and how many raw units make one degree Celsius. Rules are plain data so a
//! deployment can swap them from configuration once a device's real layout is
//! known.

use crate::{PayloadError, Result};
use serde::{Deserialize, Serialize};

/// Size of the raw temperature field in bytes.
pub const FIELD_SIZE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signedness {
    #[default]
    Unsigned,
    Signed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

/// Location, interpretation and scale of a 16-bit temperature field.
///
/// The value is `raw / divisor`, so the placeholder's tenths of a degree use a
/// divisor of 10.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodeRule {
    /// Byte offset of the field inside the payload
    pub offset: usize,
    #[serde(default)]
    pub signedness: Signedness,
    #[serde(default)]
    pub byte_order: ByteOrder,
    /// Raw integer units per degree Celsius
    #[serde(default = "default_divisor")]
    pub divisor: f64,
    /// Shortest payload this rule accepts; never less than `offset + 2`
    #[serde(default)]
    pub min_len: usize,
}

fn default_divisor() -> f64 {
    10.0
}

impl DecodeRule {
    /// Provisional MeatStick layout: bytes 2-3, unsigned big-endian, tenths of
    /// a degree, payload of at least 4 bytes.
    pub const PLACEHOLDER: Self = Self {
        offset: 2,
        signedness: Signedness::Unsigned,
        byte_order: ByteOrder::BigEndian,
        divisor: 10.0,
        min_len: 4,
    };

    pub const fn new(offset: usize, signedness: Signedness, divisor: f64) -> Self {
        Self {
            offset,
            signedness,
            byte_order: ByteOrder::BigEndian,
            divisor,
            min_len: 0,
        }
    }

    pub const fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub const fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    /// Minimum payload length this rule needs.
    pub fn required_len(&self) -> usize {
        let field_end = self.offset.saturating_add(FIELD_SIZE);
        field_end.max(self.min_len)
    }

    /// Extract the field and scale it to degrees Celsius.
    ///
    /// Short payloads yield `InsufficientData`; the rule never indexes past
    /// the end of `payload`.
    pub fn apply(&self, payload: &[u8]) -> Result<f64> {
        let required = self.required_len();
        if payload.len() < required {
            return Err(PayloadError::InsufficientData {
                expected: required,
                actual: payload.len(),
            });
        }

        let bytes = match payload.get(self.offset..self.offset + FIELD_SIZE) {
            Some(&[a, b]) => [a, b],
            _ => {
                return Err(PayloadError::InsufficientData {
                    expected: required,
                    actual: payload.len(),
                })
            }
        };

        let raw = match (self.signedness, self.byte_order) {
            (Signedness::Unsigned, ByteOrder::BigEndian) => f64::from(u16::from_be_bytes(bytes)),
            (Signedness::Unsigned, ByteOrder::LittleEndian) => f64::from(u16::from_le_bytes(bytes)),
            (Signedness::Signed, ByteOrder::BigEndian) => f64::from(i16::from_be_bytes(bytes)),
            (Signedness::Signed, ByteOrder::LittleEndian) => f64::from(i16::from_le_bytes(bytes)),
        };

        Ok(raw / self.divisor)
    }
}

impl Default for DecodeRule {
    fn default() -> Self {
        Self::PLACEHOLDER
    }
}
