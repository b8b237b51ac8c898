//! Error types for decoding, encoding, and 64-bit integer construction.

use alloc::string::String;
use core::fmt;

use crate::wire::WireType;

/// Error raised while decoding a protobuf wire stream.
///
/// Every error is raised synchronously at the point of detection and unwinds
/// the whole decode; no partial message is handed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A field key carried a wire type value outside `0..=5`.
    InvalidWireType { value: u8 },
    /// A field key carried a tag of zero or above `2^29 - 1`.
    InvalidTag { reason: &'static str },
    /// A varint ran past ten bytes or encoded bits beyond 64.
    MalformedVarint,
    /// A primitive read ran past the end of the buffer.
    UnexpectedEndOfBuffer,
    /// The deprecated group encoding (wire types 3 and 4) is not supported.
    GroupEncoding,
    /// A `string` field held bytes that are not valid UTF-8.
    InvalidUtf8,
    /// A length prefix exceeds the platform's addressable memory.
    LengthOverflow { value: u64 },
    /// An unrecognized field was hit while [`UnknownFieldPolicy::Throw`] is
    /// in effect.
    ///
    /// [`UnknownFieldPolicy::Throw`]: crate::reflect::UnknownFieldPolicy::Throw
    UnknownField {
        type_name: String,
        field_no: u32,
        wire_type: WireType,
    },
    /// A map entry sub-message contained a field number other than 1 or 2.
    MalformedMapEntry { type_name: String, field_no: u32 },
    /// The caller broke an API invariant, e.g. a repeated-field target that
    /// was not preinitialized as an empty list.
    ProgrammingError { reason: &'static str },
}

impl DecodeError {
    #[cold]
    pub(crate) fn invalid_wire_type(value: u8) -> Self {
        DecodeError::InvalidWireType { value }
    }

    #[cold]
    pub(crate) fn invalid_tag(reason: &'static str) -> Self {
        DecodeError::InvalidTag { reason }
    }

    #[cold]
    pub(crate) fn malformed_varint() -> Self {
        DecodeError::MalformedVarint
    }

    #[cold]
    pub(crate) fn unexpected_end_of_buffer() -> Self {
        DecodeError::UnexpectedEndOfBuffer
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidWireType { value } => {
                write!(f, "invalid 'wire type' value: {value}")
            }
            DecodeError::InvalidTag { reason } => {
                write!(f, "invalid tag: '{reason}'")
            }
            DecodeError::MalformedVarint => {
                write!(f, "malformed varint")
            }
            DecodeError::UnexpectedEndOfBuffer => {
                write!(f, "unexpected end of buffer")
            }
            DecodeError::GroupEncoding => {
                write!(f, "deprecated group encoding not supported")
            }
            DecodeError::InvalidUtf8 => {
                write!(f, "invalid UTF-8 in string field")
            }
            DecodeError::LengthOverflow { value } => {
                write!(
                    f,
                    "length prefix {value} exceeds platform addressable memory"
                )
            }
            DecodeError::UnknownField {
                type_name,
                field_no,
                wire_type,
            } => {
                write!(
                    f,
                    "unknown field {field_no} (wire type {wire_type:?}) in message '{type_name}'"
                )
            }
            DecodeError::MalformedMapEntry {
                type_name,
                field_no,
            } => {
                write!(
                    f,
                    "map entry of '{type_name}' contains invalid field number {field_no}"
                )
            }
            DecodeError::ProgrammingError { reason } => {
                write!(f, "programming error: '{reason}'")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Error raised while encoding a message to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// `join()` was called on a writer with no open fork.
    EmptyForkStack,
    /// A stored 64-bit surface value (decimal string or float) does not
    /// represent a 64-bit integer.
    InvalidLongValue { reason: &'static str },
    /// A stored value does not match the shape its field descriptor demands.
    ValueMismatch { expected: &'static str },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::EmptyForkStack => {
                write!(f, "join() called without a matching fork()")
            }
            EncodeError::InvalidLongValue { reason } => {
                write!(f, "invalid 64-bit integer value: '{reason}'")
            }
            EncodeError::ValueMismatch { expected } => {
                write!(
                    f,
                    "value does not match field descriptor, expected {expected}"
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Error raised when constructing a [`Long64`] or [`ULong64`] from a decimal
/// string or a float that cannot represent a 64-bit integer.
///
/// [`Long64`]: crate::long::Long64
/// [`ULong64`]: crate::long::ULong64
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLongValue {
    pub reason: &'static str,
}

impl fmt::Display for InvalidLongValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid 64-bit integer value: '{}'", self.reason)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidLongValue {}

impl From<InvalidLongValue> for EncodeError {
    fn from(err: InvalidLongValue) -> Self {
        EncodeError::InvalidLongValue { reason: err.reason }
    }
}
