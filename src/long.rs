//! 64-bit integers as two 32-bit halves.
//!
//! The wire layer never assumes host 64-bit integer support: varint emission
//! and the zigzag transform operate directly on `(lo, hi)` pairs. Conversions
//! to and from decimal strings and floats route through native 64-bit
//! integers, which every Rust host has.

// This module uses `as` casts which have been thoroughly reviewed for correctness.
#![allow(clippy::as_conversions)]

use alloc::string::{String, ToString};
use core::fmt;

use crate::error::InvalidLongValue;

/// Signed 64-bit integer stored as two 32-bit halves, two's complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Long64 {
    lo: u32,
    hi: u32,
}

/// Unsigned 64-bit integer stored as two 32-bit halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ULong64 {
    lo: u32,
    hi: u32,
}

impl Long64 {
    pub const ZERO: Long64 = Long64 { lo: 0, hi: 0 };

    /// Assemble from raw halves, e.g. straight off a varint decode.
    #[inline]
    pub const fn from_parts(lo: u32, hi: u32) -> Self {
        Long64 { lo, hi }
    }

    /// The raw halves, e.g. for varint emission.
    #[inline]
    pub const fn into_parts(self) -> (u32, u32) {
        (self.lo, self.hi)
    }

    /// The sign bit lives in the top of the high half.
    #[inline]
    pub const fn is_negative(self) -> bool {
        self.hi >> 31 == 1
    }

    #[inline]
    pub const fn to_i64(self) -> i64 {
        (((self.hi as u64) << 32) | self.lo as u64) as i64
    }

    /// Approximate above 2^53; by contract this never fails, the caller
    /// asserts the value fits a double's mantissa.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.to_i64() as f64
    }

    /// Construct from a double. Fails on non-finite, non-integer, or
    /// out-of-range inputs.
    pub fn try_from_f64(value: f64) -> Result<Self, InvalidLongValue> {
        if !value.is_finite() {
            return Err(InvalidLongValue {
                reason: "float is not finite",
            });
        }
        if value % 1.0 != 0.0 {
            return Err(InvalidLongValue {
                reason: "float is not an integer",
            });
        }
        // 2^63 is exactly representable as f64, so the exclusive upper
        // bound is exact; -2^63 is in range.
        if value < -9_223_372_036_854_775_808.0 || value >= 9_223_372_036_854_775_808.0 {
            return Err(InvalidLongValue {
                reason: "float exceeds the signed 64-bit range",
            });
        }
        Ok(Long64::from(value as i64))
    }

    /// Zigzag transform, mapping small magnitudes of either sign to small
    /// unsigned values. Operates on the halves: the arithmetic-shifted sign
    /// mask is XORed into the left-shifted value.
    #[inline]
    pub const fn zigzag_encode(self) -> ULong64 {
        let sign = ((self.hi as i32) >> 31) as u32;
        let lo = (self.lo << 1) ^ sign;
        let hi = ((self.hi << 1) | (self.lo >> 31)) ^ sign;
        ULong64 { lo, hi }
    }

    /// Surface this value the way the field descriptor asked for it.
    pub fn to_value(self, long_type: LongType) -> LongValue {
        match long_type {
            LongType::String => LongValue::String(self.to_string()),
            LongType::Number => LongValue::Number(self.to_f64()),
            LongType::Big => LongValue::I64(self.to_i64()),
        }
    }

    /// Recover the wire representation from a surfaced value.
    pub fn from_value(value: &LongValue) -> Result<Self, InvalidLongValue> {
        match value {
            LongValue::String(s) => Long64::try_from(s.as_str()),
            LongValue::Number(n) => Long64::try_from_f64(*n),
            LongValue::I64(v) => Ok(Long64::from(*v)),
            LongValue::U64(v) => {
                if *v > i64::MAX as u64 {
                    Err(InvalidLongValue {
                        reason: "unsigned value exceeds the signed 64-bit range",
                    })
                } else {
                    Ok(Long64::from(*v as i64))
                }
            }
        }
    }
}

impl From<i64> for Long64 {
    #[inline]
    fn from(value: i64) -> Self {
        let bits = value as u64;
        Long64 {
            lo: (bits & 0xffff_ffff) as u32,
            hi: (bits >> 32) as u32,
        }
    }
}

impl TryFrom<&str> for Long64 {
    type Error = InvalidLongValue;

    fn try_from(value: &str) -> Result<Self, InvalidLongValue> {
        let parsed: i64 = value.parse().map_err(|_| InvalidLongValue {
            reason: "not a decimal signed 64-bit integer",
        })?;
        Ok(Long64::from(parsed))
    }
}

impl fmt::Display for Long64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_i64(), f)
    }
}

impl ULong64 {
    pub const ZERO: ULong64 = ULong64 { lo: 0, hi: 0 };

    #[inline]
    pub const fn from_parts(lo: u32, hi: u32) -> Self {
        ULong64 { lo, hi }
    }

    #[inline]
    pub const fn into_parts(self) -> (u32, u32) {
        (self.lo, self.hi)
    }

    #[inline]
    pub const fn to_u64(self) -> u64 {
        ((self.hi as u64) << 32) | self.lo as u64
    }

    /// Approximate above 2^53; never fails.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.to_u64() as f64
    }

    pub fn try_from_f64(value: f64) -> Result<Self, InvalidLongValue> {
        if !value.is_finite() {
            return Err(InvalidLongValue {
                reason: "float is not finite",
            });
        }
        if value % 1.0 != 0.0 {
            return Err(InvalidLongValue {
                reason: "float is not an integer",
            });
        }
        if value < 0.0 || value >= 18_446_744_073_709_551_616.0 {
            return Err(InvalidLongValue {
                reason: "float exceeds the unsigned 64-bit range",
            });
        }
        Ok(ULong64::from(value as u64))
    }

    /// Inverse of [`Long64::zigzag_encode`].
    #[inline]
    pub const fn zigzag_decode(self) -> Long64 {
        // All-ones when the original value was negative.
        let mask = 0u32.wrapping_sub(self.lo & 1);
        let lo = ((self.lo >> 1) | (self.hi << 31)) ^ mask;
        let hi = (self.hi >> 1) ^ mask;
        Long64 { lo, hi }
    }

    pub fn to_value(self, long_type: LongType) -> LongValue {
        match long_type {
            LongType::String => LongValue::String(self.to_string()),
            LongType::Number => LongValue::Number(self.to_f64()),
            LongType::Big => LongValue::U64(self.to_u64()),
        }
    }

    pub fn from_value(value: &LongValue) -> Result<Self, InvalidLongValue> {
        match value {
            LongValue::String(s) => ULong64::try_from(s.as_str()),
            LongValue::Number(n) => ULong64::try_from_f64(*n),
            LongValue::U64(v) => Ok(ULong64::from(*v)),
            LongValue::I64(v) => {
                if *v < 0 {
                    Err(InvalidLongValue {
                        reason: "negative value in an unsigned 64-bit field",
                    })
                } else {
                    Ok(ULong64::from(*v as u64))
                }
            }
        }
    }
}

impl From<u64> for ULong64 {
    #[inline]
    fn from(value: u64) -> Self {
        ULong64 {
            lo: (value & 0xffff_ffff) as u32,
            hi: (value >> 32) as u32,
        }
    }
}

impl TryFrom<&str> for ULong64 {
    type Error = InvalidLongValue;

    fn try_from(value: &str) -> Result<Self, InvalidLongValue> {
        let parsed: u64 = value.parse().map_err(|_| InvalidLongValue {
            reason: "not a decimal unsigned 64-bit integer",
        })?;
        Ok(ULong64::from(parsed))
    }
}

impl fmt::Display for ULong64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_u64(), f)
    }
}

/// How 64-bit integers are surfaced in decoded values.
///
/// The choice is per field and deterministic: a descriptor with
/// `LongType::String` always yields [`LongValue::String`], and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LongType {
    /// Decimal string.
    String,
    /// Host double; the caller asserts the value fits a 53-bit mantissa.
    Number,
    /// Native 64-bit integer.
    #[default]
    Big,
}

/// A surfaced 64-bit integer, shaped by the field's [`LongType`].
#[derive(Debug, Clone, PartialEq)]
pub enum LongValue {
    String(String),
    Number(f64),
    I64(i64),
    U64(u64),
}

impl LongValue {
    /// The zero value of a signed 64-bit field with the given surface.
    pub fn zero_signed(long_type: LongType) -> LongValue {
        match long_type {
            LongType::String => LongValue::String("0".to_string()),
            LongType::Number => LongValue::Number(0.0),
            LongType::Big => LongValue::I64(0),
        }
    }

    /// The zero value of an unsigned 64-bit field with the given surface.
    pub fn zero_unsigned(long_type: LongType) -> LongValue {
        match long_type {
            LongType::String => LongValue::String("0".to_string()),
            LongType::Number => LongValue::Number(0.0),
            LongType::Big => LongValue::U64(0),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            LongValue::String(s) => s == "0",
            LongValue::Number(n) => *n == 0.0,
            LongValue::I64(v) => *v == 0,
            LongValue::U64(v) => *v == 0,
        }
    }
}
