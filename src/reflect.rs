//! Descriptor-driven encode and decode.

mod read;
mod write;

pub use read::ReflectionBinaryReader;
pub use write::ReflectionBinaryWriter;

use crate::value::MessageValue;
use crate::wire::WireType;

/// Callback observing a skipped unknown field:
/// `(type_name, target, field_no, wire_type, raw_value_bytes)`.
pub type UnknownFieldHandler =
    fn(type_name: &str, target: &mut MessageValue, field_no: u32, wire_type: WireType, data: &[u8]);

/// What the reader does with a field number its descriptor does not know.
#[derive(Debug, Clone, Copy, Default)]
pub enum UnknownFieldPolicy {
    /// Fail the decode with [`DecodeError::UnknownField`].
    ///
    /// [`DecodeError::UnknownField`]: crate::error::DecodeError::UnknownField
    Throw,
    /// Skip the value and forget it.
    Discard,
    /// Skip the value and record its raw bytes in the target's
    /// unknown-field store, so re-serialization is lossless.
    #[default]
    Keep,
    /// Skip the value and hand it to the callback.
    Custom(UnknownFieldHandler),
}

/// Options for [`ReflectionBinaryReader::read`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    pub read_unknown_field: UnknownFieldPolicy,
}

/// Options for [`ReflectionBinaryWriter::write`].
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Re-emit stored unknown fields after the known ones, preserving their
    /// recorded wire types and order.
    pub write_unknown_fields: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            write_unknown_fields: true,
        }
    }
}
