//! Wire-level building blocks: wire types and field tags.
//!
//! Follows the specification from <https://protobuf.dev/programming-guides/encoding>
//! under the "Message Structure" section. A field tag on the wire is
//! `(field_number << 3) | wire_type`, encoded as a 32-bit varint.

use crate::error::DecodeError;
use crate::util::unlikely;

/// Minimum value of a protobuf field number.
pub const MINIMUM_TAG_VAL: u32 = 1;
/// Maximum value of a protobuf field number.
pub const MAXIMUM_TAG_VAL: u32 = (1 << 29) - 1;

/// Denotes the type of a field in an encoded protobuf message.
///
/// Protobuf messages are a series of key-value pairs. When encoded, each pair
/// is a record consisting of a field number, a [`WireType`], and a payload;
/// the [`WireType`] indicates how large the proceeding payload is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable length integer.
    ///
    /// Used for: `int32`, `int64`, `uint32`, `uint64`, `sint32`, `sint64`, `bool`, `enum`.
    Varint = 0,
    /// 64-bit value, 8 bytes little-endian.
    ///
    /// Used for: `fixed64`, `sfixed64`, `double`.
    Bit64 = 1,
    /// Variable length field.
    ///
    /// Used for: `string`, `bytes`, `message`, packed `repeated` fields.
    LengthDelimited = 2,
    /// Group start (deprecated). Decodes, but every consuming operation
    /// rejects it.
    StartGroup = 3,
    /// Group end (deprecated).
    EndGroup = 4,
    /// 32-bit value, 4 bytes little-endian.
    ///
    /// Used for: `fixed32`, `sfixed32`, `float`.
    Bit32 = 5,
}

impl WireType {
    /// Maximum raw value a [`WireType`] can be.
    const MAX_VAL: u8 = 5;

    /// Try to decode a [`WireType`] from the provided raw value.
    #[inline(always)]
    pub(crate) fn try_from_val(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Bit64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Bit32),
            _ => Err(DecodeError::invalid_wire_type(value)),
        }
    }

    /// Return the raw value for this [`WireType`].
    #[inline(always)]
    #[allow(clippy::as_conversions)]
    pub const fn into_val(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    #[inline(always)]
    fn try_from(value: u8) -> Result<Self, DecodeError> {
        WireType::try_from_val(value)
    }
}

/// Combine a field number and wire type into a raw tag value.
///
/// Hot path for encoding - called for every field in every message.
#[inline(always)]
pub fn make_tag(field_no: u32, wire_type: WireType) -> u32 {
    debug_assert!((MINIMUM_TAG_VAL..=MAXIMUM_TAG_VAL).contains(&field_no));
    (field_no << 3) | u32::from(wire_type.into_val())
}

/// Split a raw tag into its field number and wire type, validating both.
///
/// Hot path for decoding - called for every field in every message.
#[inline]
pub fn split_tag(raw: u32) -> Result<(u32, WireType), DecodeError> {
    let wire_type_raw = raw & 0b111;
    if unlikely(wire_type_raw > u32::from(WireType::MAX_VAL)) {
        // The truncation cannot lose bits, the value was just masked to 3.
        #[allow(clippy::as_conversions)]
        return Err(DecodeError::invalid_wire_type(wire_type_raw as u8));
    }

    let field_no = raw >> 3;
    if unlikely(field_no == 0 || field_no > MAXIMUM_TAG_VAL) {
        return Err(DecodeError::invalid_tag("field number out of range"));
    }

    // The mask above leaves only valid discriminants.
    #[allow(clippy::as_conversions)]
    let wire_type = WireType::try_from_val(wire_type_raw as u8)?;
    Ok((field_no, wire_type))
}
