//! Descriptor-driven decoding.

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::vec::Vec;

use super::{ReadOptions, UnknownFieldPolicy};
use crate::descriptor::{FieldInfo, FieldKind, MapValueInfo, MessageInfo, Repeat, ScalarType};
use crate::error::DecodeError;
use crate::long::LongType;
use crate::reader::BinaryRead;
use crate::value::{MapKey, MessageValue, OneofValue, UnknownField, Value};
use crate::wire::WireType;

/// Decodes wire bytes into a [`MessageValue`], driven by a [`MessageInfo`].
///
/// Holds only the immutable descriptor; one instance may be shared across
/// threads, with each concurrent decode using its own cursor and target.
#[derive(Debug, Clone, Copy)]
pub struct ReflectionBinaryReader {
    info: &'static MessageInfo,
}

impl ReflectionBinaryReader {
    pub fn new(info: &'static MessageInfo) -> Self {
        ReflectionBinaryReader { info }
    }

    /// Decode from the cursor into `target`, in place.
    ///
    /// Reads until the cursor's end, or until `length` more bytes when
    /// given (used for length-prefixed sub-regions). Decoding into an
    /// already-populated target follows the proto3 merge semantics:
    /// scalars overwrite, repeated fields append, nested messages merge
    /// recursively, map entries overwrite by key.
    pub fn read<R: BinaryRead>(
        &self,
        reader: &mut R,
        target: &mut MessageValue,
        options: &ReadOptions,
        length: Option<usize>,
    ) -> Result<(), DecodeError> {
        read_message(self.info, reader, target, options, length)
    }
}

fn read_message<R: BinaryRead>(
    info: &'static MessageInfo,
    reader: &mut R,
    target: &mut MessageValue,
    options: &ReadOptions,
    length: Option<usize>,
) -> Result<(), DecodeError> {
    let end = match length {
        None => reader.len(),
        Some(len) => sub_end(reader, len)?,
    };

    while reader.pos() < end {
        let (field_no, wire_type) = reader.tag()?;
        match info.field_by_number(field_no) {
            Some(field) => read_field(info, reader, target, field, wire_type, options)?,
            None => read_unknown_field(info, reader, target, field_no, wire_type, options)?,
        }
    }
    Ok(())
}

fn read_unknown_field<R: BinaryRead>(
    info: &MessageInfo,
    reader: &mut R,
    target: &mut MessageValue,
    field_no: u32,
    wire_type: WireType,
    options: &ReadOptions,
) -> Result<(), DecodeError> {
    match options.read_unknown_field {
        UnknownFieldPolicy::Throw => Err(DecodeError::UnknownField {
            type_name: info.type_name.clone(),
            field_no,
            wire_type,
        }),
        UnknownFieldPolicy::Discard => {
            reader.skip(wire_type)?;
            Ok(())
        }
        UnknownFieldPolicy::Keep => {
            let data = reader.skip(wire_type)?;
            target.unknown_fields_mut().push(UnknownField {
                no: field_no,
                wire_type,
                data,
            });
            Ok(())
        }
        UnknownFieldPolicy::Custom(handler) => {
            let data = reader.skip(wire_type)?;
            handler(&info.type_name, target, field_no, wire_type, &data);
            Ok(())
        }
    }
}

fn read_field<R: BinaryRead>(
    info: &MessageInfo,
    reader: &mut R,
    target: &mut MessageValue,
    field: &FieldInfo,
    wire_type: WireType,
    options: &ReadOptions,
) -> Result<(), DecodeError> {
    match &field.kind {
        FieldKind::Scalar { scalar, long } => read_scalar_field(
            reader,
            target,
            field,
            ScalarKind::Scalar(*scalar, *long),
            wire_type,
        ),
        FieldKind::Enum => {
            read_scalar_field(reader, target, field, ScalarKind::Enum, wire_type)
        }
        FieldKind::Message { message } => {
            read_message_field(reader, target, field, message.get(), options)
        }
        FieldKind::Map { key, value } => {
            read_map_field(info, reader, target, field, *key, value, options)
        }
    }
}

/// Scalars and enums read identically except for the stored shape; enums
/// travel as `int32`.
#[derive(Clone, Copy)]
enum ScalarKind {
    Scalar(ScalarType, LongType),
    Enum,
}

impl ScalarKind {
    fn is_packable(self) -> bool {
        match self {
            ScalarKind::Scalar(scalar, _) => scalar.is_packable(),
            ScalarKind::Enum => true,
        }
    }

    fn read_one<R: BinaryRead>(self, reader: &mut R) -> Result<Value, DecodeError> {
        match self {
            ScalarKind::Scalar(scalar, long) => read_scalar_value(reader, scalar, long),
            ScalarKind::Enum => Ok(Value::Enum(reader.int32()?)),
        }
    }
}

fn read_scalar_value<R: BinaryRead>(
    reader: &mut R,
    scalar: ScalarType,
    long: LongType,
) -> Result<Value, DecodeError> {
    Ok(match scalar {
        ScalarType::Double => Value::F64(reader.double()?),
        ScalarType::Float => Value::F32(reader.float()?),
        ScalarType::Int64 => Value::Long(reader.int64()?.to_value(long)),
        ScalarType::Uint64 => Value::Long(reader.uint64()?.to_value(long)),
        ScalarType::Int32 => Value::I32(reader.int32()?),
        ScalarType::Fixed64 => Value::Long(reader.fixed64()?.to_value(long)),
        ScalarType::Fixed32 => Value::U32(reader.fixed32()?),
        ScalarType::Bool => Value::Bool(reader.boolean()?),
        ScalarType::String => Value::String(reader.string()?),
        ScalarType::Bytes => Value::Bytes(reader.bytes()?),
        ScalarType::Uint32 => Value::U32(reader.uint32()?),
        ScalarType::Sfixed32 => Value::I32(reader.sfixed32()?),
        ScalarType::Sfixed64 => Value::Long(reader.sfixed64()?.to_value(long)),
        ScalarType::Sint32 => Value::I32(reader.sint32()?),
        ScalarType::Sint64 => Value::Long(reader.sint64()?.to_value(long)),
    })
}

fn read_scalar_field<R: BinaryRead>(
    reader: &mut R,
    target: &mut MessageValue,
    field: &FieldInfo,
    kind: ScalarKind,
    wire_type: WireType,
) -> Result<(), DecodeError> {
    if matches!(field.repeat, Repeat::No) {
        let value = kind.read_one(reader)?;
        if let Some(group) = &field.oneof {
            let oneof = select_oneof(target, group, &field.local_name)?;
            oneof.value = Some(Box::new(value));
        } else {
            target.set(field.local_name.clone(), value);
        }
        return Ok(());
    }

    // Accept both forms regardless of what the descriptor prefers on write:
    // a length-delimited record for a packable scalar is the packed form.
    if wire_type == WireType::LengthDelimited && kind.is_packable() {
        let len = reader.len_prefix()?;
        let end = sub_end(reader, len)?;
        let list = repeated_list_mut(target, field)?;
        // Read values back to back until the region ends, appending each.
        while reader.pos() < end {
            list.push(kind.read_one(reader)?);
        }
    } else {
        let value = kind.read_one(reader)?;
        repeated_list_mut(target, field)?.push(value);
    }
    Ok(())
}

fn read_message_field<R: BinaryRead>(
    reader: &mut R,
    target: &mut MessageValue,
    field: &FieldInfo,
    nested: &'static MessageInfo,
    options: &ReadOptions,
) -> Result<(), DecodeError> {
    let len = reader.len_prefix()?;

    if !matches!(field.repeat, Repeat::No) {
        // Repeated nested messages never merge, each record is a fresh one.
        let mut value = MessageValue::new(nested);
        read_message(nested, reader, &mut value, options, Some(len))?;
        repeated_list_mut(target, field)?.push(Value::Message(value));
        return Ok(());
    }

    if let Some(group) = &field.oneof {
        let oneof = select_oneof(target, group, &field.local_name)?;
        match oneof.value.as_deref_mut() {
            // The member was already selected: merge into its payload.
            Some(Value::Message(existing)) => {
                read_message(nested, reader, existing, options, Some(len))
            }
            _ => {
                let mut value = MessageValue::new(nested);
                read_message(nested, reader, &mut value, options, Some(len))?;
                oneof.value = Some(Box::new(Value::Message(value)));
                Ok(())
            }
        }
    } else {
        match target.get_mut(&field.local_name) {
            // A singular message that appears twice on the wire merges.
            Some(Value::Message(existing)) => {
                read_message(nested, reader, existing, options, Some(len))
            }
            _ => {
                let mut value = MessageValue::new(nested);
                read_message(nested, reader, &mut value, options, Some(len))?;
                target.set(field.local_name.clone(), Value::Message(value));
                Ok(())
            }
        }
    }
}

fn read_map_field<R: BinaryRead>(
    info: &MessageInfo,
    reader: &mut R,
    target: &mut MessageValue,
    field: &FieldInfo,
    key_type: ScalarType,
    value_info: &MapValueInfo,
    options: &ReadOptions,
) -> Result<(), DecodeError> {
    let len = reader.len_prefix()?;
    let end = sub_end(reader, len)?;

    // An entry is a two-field sub-message: 1 = key, 2 = value.
    let mut key = None;
    let mut value = None;
    while reader.pos() < end {
        let (entry_no, _wire_type) = reader.tag()?;
        match entry_no {
            1 => key = Some(read_map_key(reader, key_type)?),
            2 => value = Some(read_map_value(reader, value_info, options)?),
            other => {
                return Err(DecodeError::MalformedMapEntry {
                    type_name: info.type_name.clone(),
                    field_no: other,
                })
            }
        }
    }

    // Per proto3, a missing key or value stands for its zero value.
    let key = key.unwrap_or_else(|| MapKey::zero(key_type));
    let value = value.unwrap_or_else(|| map_value_zero(value_info));

    match target.get_mut(&field.local_name) {
        Some(Value::Map(map)) => {
            // Last entry with a given key wins.
            map.insert(key, value);
            Ok(())
        }
        _ => Err(DecodeError::ProgrammingError {
            reason: "map field target was not preinitialized as an empty map",
        }),
    }
}

fn read_map_key<R: BinaryRead>(
    reader: &mut R,
    scalar: ScalarType,
) -> Result<MapKey, DecodeError> {
    Ok(match scalar {
        ScalarType::Bool => MapKey::Bool(reader.boolean()?),
        ScalarType::Int32 => MapKey::I32(reader.int32()?),
        ScalarType::Sint32 => MapKey::I32(reader.sint32()?),
        ScalarType::Sfixed32 => MapKey::I32(reader.sfixed32()?),
        ScalarType::Uint32 => MapKey::U32(reader.uint32()?),
        ScalarType::Fixed32 => MapKey::U32(reader.fixed32()?),
        ScalarType::Int64 => MapKey::I64(reader.int64()?.to_i64()),
        ScalarType::Sint64 => MapKey::I64(reader.sint64()?.to_i64()),
        ScalarType::Sfixed64 => MapKey::I64(reader.sfixed64()?.to_i64()),
        ScalarType::Uint64 => MapKey::U64(reader.uint64()?.to_u64()),
        ScalarType::Fixed64 => MapKey::U64(reader.fixed64()?.to_u64()),
        ScalarType::String => MapKey::String(reader.string()?),
        ScalarType::Double | ScalarType::Float | ScalarType::Bytes => {
            return Err(DecodeError::ProgrammingError {
                reason: "float, double, and bytes are not valid map key types",
            })
        }
    })
}

fn read_map_value<R: BinaryRead>(
    reader: &mut R,
    value_info: &MapValueInfo,
    options: &ReadOptions,
) -> Result<Value, DecodeError> {
    match value_info {
        MapValueInfo::Scalar { scalar, long } => read_scalar_value(reader, *scalar, *long),
        MapValueInfo::Enum => Ok(Value::Enum(reader.int32()?)),
        MapValueInfo::Message { message } => {
            let nested = message.get();
            let len = reader.len_prefix()?;
            let mut value = MessageValue::new(nested);
            read_message(nested, reader, &mut value, options, Some(len))?;
            Ok(Value::Message(value))
        }
    }
}

fn map_value_zero(value_info: &MapValueInfo) -> Value {
    match value_info {
        MapValueInfo::Scalar { scalar, long } => Value::zero_scalar(*scalar, *long),
        MapValueInfo::Enum => Value::Enum(0),
        MapValueInfo::Message { message } => Value::Message(MessageValue::new(message.get())),
    }
}

/// Route a oneof write through the group record, enforcing mutual exclusion.
fn select_oneof<'t>(
    target: &'t mut MessageValue,
    group: &str,
    local_name: &str,
) -> Result<&'t mut OneofValue, DecodeError> {
    let slot = target
        .get_mut(group)
        .ok_or(DecodeError::ProgrammingError {
            reason: "oneof group was not preinitialized",
        })?;
    let Value::Oneof(oneof) = slot else {
        return Err(DecodeError::ProgrammingError {
            reason: "oneof group slot does not hold a oneof record",
        });
    };
    if oneof.oneof_kind.as_deref() != Some(local_name) {
        // Selecting a different member discards the previous payload.
        oneof.oneof_kind = Some(local_name.to_owned());
        oneof.value = None;
    }
    Ok(oneof)
}

fn repeated_list_mut<'t>(
    target: &'t mut MessageValue,
    field: &FieldInfo,
) -> Result<&'t mut Vec<Value>, DecodeError> {
    match target.get_mut(&field.local_name) {
        Some(Value::List(list)) => Ok(list),
        _ => Err(DecodeError::ProgrammingError {
            reason: "repeated field target was not preinitialized as an empty list",
        }),
    }
}

/// End position of a `len`-byte sub-region starting at the cursor.
fn sub_end<R: BinaryRead>(reader: &R, len: usize) -> Result<usize, DecodeError> {
    let end = reader
        .pos()
        .checked_add(len)
        .ok_or_else(DecodeError::unexpected_end_of_buffer)?;
    if end > reader.len() {
        return Err(DecodeError::unexpected_end_of_buffer());
    }
    Ok(end)
}
