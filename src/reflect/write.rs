//! Descriptor-driven encoding.

use alloc::collections::BTreeMap;

use super::WriteOptions;
use crate::descriptor::{FieldInfo, FieldKind, MapValueInfo, MessageInfo, Repeat, ScalarType};
use crate::error::EncodeError;
use crate::long::{Long64, ULong64};
use crate::value::{MapKey, MessageValue, Value};
use crate::wire::WireType;
use crate::writer::BinaryWrite;

/// Encodes a [`MessageValue`] to the wire, driven by a [`MessageInfo`].
///
/// Fields are emitted in descriptor order, followed by any stored unknown
/// fields. Singular scalars and enums holding their proto3 default are not
/// emitted; oneof payloads always are, the selected member's tag carries
/// the presence information.
#[derive(Debug, Clone, Copy)]
pub struct ReflectionBinaryWriter {
    info: &'static MessageInfo,
}

impl ReflectionBinaryWriter {
    pub fn new(info: &'static MessageInfo) -> Self {
        ReflectionBinaryWriter { info }
    }

    pub fn write<W: BinaryWrite>(
        &self,
        message: &MessageValue,
        writer: &mut W,
        options: &WriteOptions,
    ) -> Result<(), EncodeError> {
        write_message(self.info, message, writer, options)
    }
}

fn write_message<W: BinaryWrite>(
    info: &'static MessageInfo,
    message: &MessageValue,
    writer: &mut W,
    options: &WriteOptions,
) -> Result<(), EncodeError> {
    for field in &info.fields {
        write_field(field, message, writer, options)?;
    }
    if options.write_unknown_fields {
        for unknown in message.unknown_fields().iter() {
            writer
                .tag(unknown.no, unknown.wire_type)
                .raw(unknown.data.clone());
        }
    }
    Ok(())
}

fn write_field<W: BinaryWrite>(
    field: &FieldInfo,
    message: &MessageValue,
    writer: &mut W,
    options: &WriteOptions,
) -> Result<(), EncodeError> {
    if let Some(group) = &field.oneof {
        // Walked once per member; only the selected one emits.
        let Some(Value::Oneof(oneof)) = message.get(group) else {
            return Ok(());
        };
        if oneof.oneof_kind.as_deref() != Some(field.local_name.as_str()) {
            return Ok(());
        }
        let Some(value) = oneof.value.as_deref() else {
            return Ok(());
        };
        return write_singular(field, value, writer, options, true);
    }

    let Some(value) = message.get(&field.local_name) else {
        return Ok(());
    };

    match &field.kind {
        FieldKind::Map { key, value: value_info } => {
            let Value::Map(map) = value else {
                return Err(EncodeError::ValueMismatch { expected: "map" });
            };
            write_map(field, *key, value_info, map, writer, options)
        }
        _ if !matches!(field.repeat, Repeat::No) => {
            let Value::List(list) = value else {
                return Err(EncodeError::ValueMismatch { expected: "list" });
            };
            write_repeated(field, list, writer, options)
        }
        _ => write_singular(field, value, writer, options, false),
    }
}

fn write_singular<W: BinaryWrite>(
    field: &FieldInfo,
    value: &Value,
    writer: &mut W,
    options: &WriteOptions,
    emit_default: bool,
) -> Result<(), EncodeError> {
    match &field.kind {
        FieldKind::Scalar { scalar, .. } => {
            if !emit_default && value.is_default() {
                return Ok(());
            }
            writer.tag(field.no, scalar.wire_type());
            write_scalar_value(writer, *scalar, value)
        }
        FieldKind::Enum => {
            let Value::Enum(ordinal) = value else {
                return Err(EncodeError::ValueMismatch { expected: "enum" });
            };
            if !emit_default && *ordinal == 0 {
                return Ok(());
            }
            writer.tag(field.no, WireType::Varint).int32(*ordinal);
            Ok(())
        }
        FieldKind::Message { message } => {
            let Value::Message(nested) = value else {
                return Err(EncodeError::ValueMismatch { expected: "message" });
            };
            writer.tag(field.no, WireType::LengthDelimited).fork();
            write_message(message.get(), nested, writer, options)?;
            writer.join()?;
            Ok(())
        }
        FieldKind::Map { .. } => Err(EncodeError::ValueMismatch {
            expected: "map fields cannot be oneof members",
        }),
    }
}

fn write_repeated<W: BinaryWrite>(
    field: &FieldInfo,
    list: &[Value],
    writer: &mut W,
    options: &WriteOptions,
) -> Result<(), EncodeError> {
    if list.is_empty() {
        return Ok(());
    }
    match &field.kind {
        FieldKind::Scalar { scalar, .. } => {
            // The descriptor decides the written form; readers accept both.
            if matches!(field.repeat, Repeat::Packed) && scalar.is_packable() {
                writer.tag(field.no, WireType::LengthDelimited).fork();
                for value in list {
                    write_scalar_value(writer, *scalar, value)?;
                }
                writer.join()?;
            } else {
                for value in list {
                    writer.tag(field.no, scalar.wire_type());
                    write_scalar_value(writer, *scalar, value)?;
                }
            }
            Ok(())
        }
        FieldKind::Enum => {
            if matches!(field.repeat, Repeat::Packed) {
                writer.tag(field.no, WireType::LengthDelimited).fork();
                for value in list {
                    write_enum_value(writer, value)?;
                }
                writer.join()?;
            } else {
                for value in list {
                    writer.tag(field.no, WireType::Varint);
                    write_enum_value(writer, value)?;
                }
            }
            Ok(())
        }
        FieldKind::Message { message } => {
            for value in list {
                let Value::Message(nested) = value else {
                    return Err(EncodeError::ValueMismatch { expected: "message" });
                };
                writer.tag(field.no, WireType::LengthDelimited).fork();
                write_message(message.get(), nested, writer, options)?;
                writer.join()?;
            }
            Ok(())
        }
        FieldKind::Map { .. } => Err(EncodeError::ValueMismatch {
            expected: "map fields are not stored as lists",
        }),
    }
}

fn write_map<W: BinaryWrite>(
    field: &FieldInfo,
    key_type: ScalarType,
    value_info: &MapValueInfo,
    map: &BTreeMap<MapKey, Value>,
    writer: &mut W,
    options: &WriteOptions,
) -> Result<(), EncodeError> {
    for (key, value) in map {
        // Each entry is its own length-delimited record with key = 1 and
        // value = 2, both always written.
        writer.tag(field.no, WireType::LengthDelimited).fork();
        write_map_key(writer, key_type, key)?;
        match value_info {
            MapValueInfo::Scalar { scalar, .. } => {
                writer.tag(2, scalar.wire_type());
                write_scalar_value(writer, *scalar, value)?;
            }
            MapValueInfo::Enum => {
                writer.tag(2, WireType::Varint);
                write_enum_value(writer, value)?;
            }
            MapValueInfo::Message { message } => {
                let Value::Message(nested) = value else {
                    return Err(EncodeError::ValueMismatch { expected: "message" });
                };
                writer.tag(2, WireType::LengthDelimited).fork();
                write_message(message.get(), nested, writer, options)?;
                writer.join()?;
            }
        }
        writer.join()?;
    }
    Ok(())
}

fn write_map_key<W: BinaryWrite>(
    writer: &mut W,
    key_type: ScalarType,
    key: &MapKey,
) -> Result<(), EncodeError> {
    writer.tag(1, key_type.wire_type());
    match (key_type, key) {
        (ScalarType::Bool, MapKey::Bool(v)) => writer.boolean(*v),
        (ScalarType::Int32, MapKey::I32(v)) => writer.int32(*v),
        (ScalarType::Sint32, MapKey::I32(v)) => writer.sint32(*v),
        (ScalarType::Sfixed32, MapKey::I32(v)) => writer.sfixed32(*v),
        (ScalarType::Uint32, MapKey::U32(v)) => writer.uint32(*v),
        (ScalarType::Fixed32, MapKey::U32(v)) => writer.fixed32(*v),
        (ScalarType::Int64, MapKey::I64(v)) => writer.int64(*v),
        (ScalarType::Sint64, MapKey::I64(v)) => writer.sint64(*v),
        (ScalarType::Sfixed64, MapKey::I64(v)) => writer.sfixed64(*v),
        (ScalarType::Uint64, MapKey::U64(v)) => writer.uint64(*v),
        (ScalarType::Fixed64, MapKey::U64(v)) => writer.fixed64(*v),
        (ScalarType::String, MapKey::String(v)) => writer.string(v),
        _ => {
            return Err(EncodeError::ValueMismatch {
                expected: "map key matching the descriptor",
            })
        }
    };
    Ok(())
}

fn write_enum_value<W: BinaryWrite>(writer: &mut W, value: &Value) -> Result<(), EncodeError> {
    let Value::Enum(ordinal) = value else {
        return Err(EncodeError::ValueMismatch { expected: "enum" });
    };
    writer.int32(*ordinal);
    Ok(())
}

fn write_scalar_value<W: BinaryWrite>(
    writer: &mut W,
    scalar: ScalarType,
    value: &Value,
) -> Result<(), EncodeError> {
    match (scalar, value) {
        (ScalarType::Double, Value::F64(v)) => writer.double(*v),
        (ScalarType::Float, Value::F32(v)) => writer.float(*v),
        (ScalarType::Int64, Value::Long(v)) => writer.int64(Long64::from_value(v)?),
        (ScalarType::Uint64, Value::Long(v)) => writer.uint64(ULong64::from_value(v)?),
        (ScalarType::Int32, Value::I32(v)) => writer.int32(*v),
        (ScalarType::Fixed64, Value::Long(v)) => writer.fixed64(ULong64::from_value(v)?),
        (ScalarType::Fixed32, Value::U32(v)) => writer.fixed32(*v),
        (ScalarType::Bool, Value::Bool(v)) => writer.boolean(*v),
        (ScalarType::String, Value::String(v)) => writer.string(v),
        (ScalarType::Bytes, Value::Bytes(v)) => writer.bytes(v),
        (ScalarType::Uint32, Value::U32(v)) => writer.uint32(*v),
        (ScalarType::Sfixed32, Value::I32(v)) => writer.sfixed32(*v),
        (ScalarType::Sfixed64, Value::Long(v)) => writer.sfixed64(Long64::from_value(v)?),
        (ScalarType::Sint32, Value::I32(v)) => writer.sint32(*v),
        (ScalarType::Sint64, Value::Long(v)) => writer.sint64(Long64::from_value(v)?),
        _ => {
            return Err(EncodeError::ValueMismatch {
                expected: "scalar matching the descriptor",
            })
        }
    };
    Ok(())
}
