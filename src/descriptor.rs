//! Runtime message descriptors.
//!
//! The codec is driven entirely by these descriptors: a [`MessageInfo`] names
//! a message type and lists its [`FieldInfo`]s, and the reflection reader and
//! writer interpret the wire against them. Descriptors are immutable once
//! built and shared by reference.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use once_cell::race::OnceBox;

use crate::long::LongType;
use crate::wire::WireType;

/// The proto3 scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Bytes,
    Uint32,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
}

impl ScalarType {
    /// The wire type this scalar encodes with.
    pub fn wire_type(self) -> WireType {
        match self {
            ScalarType::Double | ScalarType::Fixed64 | ScalarType::Sfixed64 => WireType::Bit64,
            ScalarType::Float | ScalarType::Fixed32 | ScalarType::Sfixed32 => WireType::Bit32,
            ScalarType::String | ScalarType::Bytes => WireType::LengthDelimited,
            ScalarType::Int64
            | ScalarType::Uint64
            | ScalarType::Int32
            | ScalarType::Uint32
            | ScalarType::Sint32
            | ScalarType::Sint64
            | ScalarType::Bool => WireType::Varint,
        }
    }

    /// Whether a repeated field of this scalar may use the packed encoding.
    /// Everything numeric packs; `string` and `bytes` never do.
    pub(crate) fn is_packable(self) -> bool {
        !matches!(self, ScalarType::String | ScalarType::Bytes)
    }

    /// Valid map key kinds per the proto3 spec: integral types, bool, string.
    pub(crate) fn is_valid_map_key(self) -> bool {
        !matches!(
            self,
            ScalarType::Double | ScalarType::Float | ScalarType::Bytes
        )
    }
}

/// Repetition of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    /// Singular.
    #[default]
    No,
    /// Repeated; the writer emits one length-delimited packed record.
    Packed,
    /// Repeated; the writer emits one tagged record per element.
    Unpacked,
}

/// Lazy reference to a nested message descriptor.
///
/// A thunk rather than a direct reference so schemas may be cyclic; the
/// target is resolved at first use. The resolution is idempotent and safe to
/// race from multiple threads.
#[derive(Clone, Copy)]
pub struct MessageRef(fn() -> &'static MessageInfo);

impl MessageRef {
    pub const fn new(resolve: fn() -> &'static MessageInfo) -> Self {
        MessageRef(resolve)
    }

    /// Resolve the nested descriptor.
    #[inline]
    pub fn get(&self) -> &'static MessageInfo {
        (self.0)()
    }
}

impl fmt::Debug for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Resolving here could recurse through a cyclic schema.
        f.write_str("MessageRef(..)")
    }
}

/// What a field holds.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Scalar {
        scalar: ScalarType,
        /// Only meaningful for the 64-bit integer scalars.
        long: LongType,
    },
    /// Open enums travel as `int32` on the wire.
    Enum,
    Message {
        message: MessageRef,
    },
    Map {
        key: ScalarType,
        value: MapValueInfo,
    },
}

/// The value side of a map field.
#[derive(Debug, Clone, Copy)]
pub enum MapValueInfo {
    Scalar { scalar: ScalarType, long: LongType },
    Enum,
    Message { message: MessageRef },
}

/// Descriptor of a single field.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Field number, unique within the message, `1 ..= 2^29 - 1`.
    pub no: u32,
    /// Name as it appears in the schema.
    pub name: String,
    /// Attribute name in decoded messages. Defaults to `name`.
    pub local_name: String,
    pub kind: FieldKind,
    pub repeat: Repeat,
    /// Group name when this field is a member of a oneof.
    pub oneof: Option<String>,
}

impl FieldInfo {
    fn new(no: u32, name: &str, kind: FieldKind) -> Self {
        FieldInfo {
            no,
            name: name.to_string(),
            local_name: name.to_string(),
            kind,
            repeat: Repeat::No,
            oneof: None,
        }
    }

    pub fn scalar(no: u32, name: &str, scalar: ScalarType) -> Self {
        FieldInfo::new(
            no,
            name,
            FieldKind::Scalar {
                scalar,
                long: LongType::default(),
            },
        )
    }

    pub fn enumeration(no: u32, name: &str) -> Self {
        FieldInfo::new(no, name, FieldKind::Enum)
    }

    pub fn message(no: u32, name: &str, resolve: fn() -> &'static MessageInfo) -> Self {
        FieldInfo::new(
            no,
            name,
            FieldKind::Message {
                message: MessageRef::new(resolve),
            },
        )
    }

    pub fn map(no: u32, name: &str, key: ScalarType, value: MapValueInfo) -> Self {
        debug_assert!(key.is_valid_map_key(), "invalid map key type {key:?}");
        FieldInfo::new(no, name, FieldKind::Map { key, value })
    }

    /// Mark the field repeated.
    pub fn repeated(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Put the field into a oneof group.
    pub fn in_oneof(mut self, group: &str) -> Self {
        self.oneof = Some(group.to_string());
        self
    }

    /// Override the in-memory attribute name.
    pub fn with_local_name(mut self, local_name: &str) -> Self {
        self.local_name = local_name.to_string();
        self
    }

    /// Choose how a 64-bit scalar is surfaced. No effect on other kinds.
    pub fn with_long(mut self, long: LongType) -> Self {
        if let FieldKind::Scalar { long: slot, .. } = &mut self.kind {
            *slot = long;
        }
        self
    }
}

/// Descriptor of a message type.
pub struct MessageInfo {
    pub type_name: String,
    pub fields: Vec<FieldInfo>,
    /// Field-number lookup, built on first use and published atomically.
    index: OnceBox<BTreeMap<u32, usize>>,
}

impl MessageInfo {
    pub fn new(type_name: &str, fields: Vec<FieldInfo>) -> Self {
        MessageInfo {
            type_name: type_name.to_string(),
            fields,
            index: OnceBox::new(),
        }
    }

    /// Look up a field descriptor by field number.
    pub fn field_by_number(&self, no: u32) -> Option<&FieldInfo> {
        let index = self.index.get_or_init(|| {
            Box::new(
                self.fields
                    .iter()
                    .enumerate()
                    .map(|(idx, field)| (field.no, idx))
                    .collect(),
            )
        });
        index.get(&no).map(|&idx| &self.fields[idx])
    }
}

impl fmt::Debug for MessageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageInfo")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}
