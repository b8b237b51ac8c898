//! Dynamic message values.
//!
//! Decoded messages are a tree of [`Value`]s keyed by attribute name. The
//! reflection reader populates a caller-supplied [`MessageValue`] in place;
//! the reflection writer walks one against its descriptor. The original
//! runtime stored fields on host objects; here the tree is explicit.

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use bytes::Bytes;

use crate::descriptor::{FieldKind, MessageInfo, Repeat, ScalarType};
use crate::long::{LongType, LongValue};
use crate::wire::WireType;

/// A map key. Proto3 restricts keys to integral types, bool, and string,
/// all of which order totally, so map containers are `BTreeMap`s.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    String(String),
}

impl MapKey {
    /// The zero key substituted when a map entry omits its key field.
    pub(crate) fn zero(scalar: ScalarType) -> MapKey {
        match scalar {
            ScalarType::Bool => MapKey::Bool(false),
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => MapKey::I32(0),
            ScalarType::Uint32 | ScalarType::Fixed32 => MapKey::U32(0),
            ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => MapKey::I64(0),
            ScalarType::Uint64 | ScalarType::Fixed64 => MapKey::U64(0),
            _ => MapKey::String(String::new()),
        }
    }
}

/// One decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I32(i32),
    U32(u32),
    F32(f32),
    F64(f64),
    /// A 64-bit integer, surfaced per the field's [`LongType`].
    Long(LongValue),
    String(String),
    Bytes(Bytes),
    /// Enum values travel as `int32`.
    Enum(i32),
    Message(MessageValue),
    /// Repeated field contents.
    List(Vec<Value>),
    Map(BTreeMap<MapKey, Value>),
    /// A oneof group slot.
    Oneof(OneofValue),
}

impl Value {
    /// The zero value of a scalar field, honoring the long surface.
    pub(crate) fn zero_scalar(scalar: ScalarType, long: LongType) -> Value {
        match scalar {
            ScalarType::Double => Value::F64(0.0),
            ScalarType::Float => Value::F32(0.0),
            ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => {
                Value::Long(LongValue::zero_signed(long))
            }
            ScalarType::Uint64 | ScalarType::Fixed64 => {
                Value::Long(LongValue::zero_unsigned(long))
            }
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => Value::I32(0),
            ScalarType::Uint32 | ScalarType::Fixed32 => Value::U32(0),
            ScalarType::Bool => Value::Bool(false),
            ScalarType::String => Value::String(String::new()),
            ScalarType::Bytes => Value::Bytes(Bytes::new()),
        }
    }

    /// Whether this is the proto3 default for its shape. Singular fields
    /// holding their default are not emitted on the wire.
    pub fn is_default(&self) -> bool {
        match self {
            Value::Bool(v) => !v,
            Value::I32(v) => *v == 0,
            Value::U32(v) => *v == 0,
            Value::F32(v) => *v == 0.0,
            Value::F64(v) => *v == 0.0,
            Value::Long(v) => v.is_zero(),
            Value::String(v) => v.is_empty(),
            Value::Bytes(v) => v.is_empty(),
            Value::Enum(v) => *v == 0,
            Value::Message(_) => false,
            Value::List(v) => v.is_empty(),
            Value::Map(v) => v.is_empty(),
            Value::Oneof(v) => v.oneof_kind.is_none(),
        }
    }
}

/// A oneof group as a tagged union: the discriminant names the selected
/// member, the payload is its value. Mutual exclusion is enforced on every
/// write - selecting a member discards any sibling payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OneofValue {
    /// `local_name` of the selected member, `None` when the group is unset.
    pub oneof_kind: Option<String>,
    pub value: Option<Box<Value>>,
}

impl OneofValue {
    pub fn unset() -> Self {
        OneofValue::default()
    }

    pub fn selected(local_name: &str, value: Value) -> Self {
        OneofValue {
            oneof_kind: Some(local_name.to_owned()),
            value: Some(Box::new(value)),
        }
    }
}

/// One unrecognized field, kept for lossless re-serialization.
///
/// `data` is the raw value bytes as they appeared after the tag, length
/// prefix included for length-delimited values, so emitting
/// `tag(no, wire_type)` followed by `data` reproduces the original record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    pub no: u32,
    pub wire_type: WireType,
    pub data: Bytes,
}

/// Per-message storage of unrecognized fields, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnknownFieldStore {
    entries: Vec<UnknownField>,
}

impl UnknownFieldStore {
    /// Record a field. Never fails.
    pub fn push(&mut self, field: UnknownField) {
        self.entries.push(field);
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnknownField> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A decoded message: field values keyed by `local_name` (oneof groups by
/// their group name), plus the unknown-field store.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageValue {
    type_name: String,
    fields: BTreeMap<String, Value>,
    unknown: UnknownFieldStore,
}

impl MessageValue {
    /// Create a message with its containers preinitialized from the
    /// descriptor: zero values for singular scalars and enums, empty lists
    /// for repeated fields, empty maps for map fields, unset records for
    /// oneof groups. Singular message fields start absent.
    pub fn new(info: &MessageInfo) -> Self {
        let mut fields = BTreeMap::new();
        for field in &info.fields {
            if let Some(group) = &field.oneof {
                fields
                    .entry(group.clone())
                    .or_insert_with(|| Value::Oneof(OneofValue::unset()));
                continue;
            }
            let value = match (&field.kind, field.repeat) {
                (FieldKind::Map { .. }, _) => Value::Map(BTreeMap::new()),
                (_, Repeat::Packed | Repeat::Unpacked) => Value::List(Vec::new()),
                (FieldKind::Scalar { scalar, long }, Repeat::No) => {
                    Value::zero_scalar(*scalar, *long)
                }
                (FieldKind::Enum, Repeat::No) => Value::Enum(0),
                (FieldKind::Message { .. }, Repeat::No) => continue,
            };
            fields.insert(field.local_name.clone(), value);
        }
        MessageValue {
            type_name: info.type_name.clone(),
            fields,
            unknown: UnknownFieldStore::default(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn unknown_fields(&self) -> &UnknownFieldStore {
        &self.unknown
    }

    pub fn unknown_fields_mut(&mut self) -> &mut UnknownFieldStore {
        &mut self.unknown
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use std::sync::LazyLock;

    use super::{MessageValue, OneofValue, Value};
    use crate::descriptor::{FieldInfo, MapValueInfo, MessageInfo, Repeat, ScalarType};
    use crate::long::{LongType, LongValue};

    static SAMPLE: LazyLock<MessageInfo> = LazyLock::new(|| {
        MessageInfo::new(
            "test.Sample",
            vec![
                FieldInfo::scalar(1, "count", ScalarType::Int32),
                FieldInfo::scalar(2, "total", ScalarType::Int64).with_long(LongType::String),
                FieldInfo::scalar(3, "tags", ScalarType::String).repeated(Repeat::Unpacked),
                FieldInfo::map(
                    4,
                    "attrs",
                    ScalarType::String,
                    MapValueInfo::Scalar {
                        scalar: ScalarType::Int32,
                        long: LongType::Big,
                    },
                ),
                FieldInfo::scalar(5, "id", ScalarType::String).in_oneof("selector"),
                FieldInfo::scalar(6, "ordinal", ScalarType::Int32).in_oneof("selector"),
                FieldInfo::message(7, "nested", || &*SAMPLE),
            ],
        )
    });

    #[test]
    fn test_preinitialized_containers() {
        let msg = MessageValue::new(&SAMPLE);

        assert_eq!(msg.get("count"), Some(&Value::I32(0)));
        assert_eq!(
            msg.get("total"),
            Some(&Value::Long(LongValue::String("0".into())))
        );
        assert_eq!(msg.get("tags"), Some(&Value::List(vec![])));
        assert!(matches!(msg.get("attrs"), Some(Value::Map(m)) if m.is_empty()));
        assert_eq!(msg.get("selector"), Some(&Value::Oneof(OneofValue::unset())));
        // Singular messages start absent.
        assert_eq!(msg.get("nested"), None);
    }

    #[test]
    fn test_defaults() {
        let msg = MessageValue::new(&SAMPLE);
        for (_, value) in msg.fields() {
            assert!(value.is_default());
        }
        assert!(!Value::I32(5).is_default());
        assert!(!Value::Oneof(OneofValue::selected("id", Value::String("x".into()))).is_default());
    }
}
