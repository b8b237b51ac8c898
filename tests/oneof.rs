//! Integration tests for oneof routing: mutual exclusion, last-one-wins,
//! and merging when the same member repeats.

use std::sync::LazyLock;

use bytes::Bytes;
use protoflect::descriptor::{FieldInfo, MessageInfo, ScalarType};
use protoflect::reader::BinaryReader;
use protoflect::reflect::{
    ReadOptions, ReflectionBinaryReader, ReflectionBinaryWriter, WriteOptions,
};
use protoflect::value::{MessageValue, OneofValue, Value};
use protoflect::writer::{BinaryWrite, BinaryWriter};

static PAYLOAD: LazyLock<MessageInfo> = LazyLock::new(|| {
    MessageInfo::new(
        "test.Payload",
        vec![
            FieldInfo::scalar(1, "x", ScalarType::Int32),
            FieldInfo::scalar(2, "y", ScalarType::Int32),
        ],
    )
});

static WIDGET: LazyLock<MessageInfo> = LazyLock::new(|| {
    MessageInfo::new(
        "test.Widget",
        vec![
            FieldInfo::scalar(1, "quux", ScalarType::Int32).in_oneof("kind"),
            FieldInfo::scalar(2, "bar", ScalarType::String).in_oneof("kind"),
            FieldInfo::message(3, "payload", || &*PAYLOAD).in_oneof("kind"),
            FieldInfo::scalar(4, "label", ScalarType::String),
        ],
    )
});

fn encode(info: &'static MessageInfo, message: &MessageValue) -> Bytes {
    let mut writer = BinaryWriter::new();
    ReflectionBinaryWriter::new(info)
        .write(message, &mut writer, &WriteOptions::default())
        .expect("encode failed");
    writer.finish()
}

fn decode(info: &'static MessageInfo, bytes: &[u8]) -> MessageValue {
    let mut reader = BinaryReader::from_slice(bytes);
    let mut target = MessageValue::new(info);
    ReflectionBinaryReader::new(info)
        .read(&mut reader, &mut target, &ReadOptions::default(), None)
        .expect("decode failed");
    target
}

fn encode_members(members: &[(&str, Value)]) -> Bytes {
    let mut buf = Vec::new();
    for (local_name, value) in members {
        let mut message = MessageValue::new(&WIDGET);
        message.set(
            "kind",
            Value::Oneof(OneofValue::selected(local_name, value.clone())),
        );
        buf.extend_from_slice(&encode(&WIDGET, &message));
    }
    Bytes::from(buf)
}

#[test]
fn last_member_wins() {
    // A then B selects B...
    let encoded = encode_members(&[
        ("quux", Value::I32(42)),
        ("bar", Value::String("hello".into())),
    ]);
    let message = decode(&WIDGET, &encoded);
    assert_eq!(
        message.get("kind"),
        Some(&Value::Oneof(OneofValue::selected(
            "bar",
            Value::String("hello".into())
        )))
    );

    // ...and B then A selects A, with no trace of B.
    let encoded = encode_members(&[
        ("bar", Value::String("hello".into())),
        ("quux", Value::I32(42)),
    ]);
    let message = decode(&WIDGET, &encoded);
    assert_eq!(
        message.get("kind"),
        Some(&Value::Oneof(OneofValue::selected("quux", Value::I32(42))))
    );
}

#[test]
fn unset_group_stays_unset() {
    let mut message = MessageValue::new(&WIDGET);
    message.set("label", Value::String("only".into()));
    let encoded = encode(&WIDGET, &message);

    let decoded = decode(&WIDGET, &encoded);
    assert_eq!(decoded.get("kind"), Some(&Value::Oneof(OneofValue::unset())));
    assert_eq!(decoded, message);
}

#[test]
fn oneof_payload_emits_defaults() {
    // A selected member carries presence, so its default value still hits
    // the wire: field 1, varint, 0.
    let mut message = MessageValue::new(&WIDGET);
    message.set(
        "kind",
        Value::Oneof(OneofValue::selected("quux", Value::I32(0))),
    );
    let encoded = encode(&WIDGET, &message);
    assert_eq!(&encoded[..], &[0x08, 0x00]);
    assert_eq!(decode(&WIDGET, &encoded), message);
}

#[test]
fn switching_members_discards_payload() {
    // quux = 42, then the message member, then quux again: the final state
    // holds only the int, the message payload is gone.
    let mut payload = MessageValue::new(&PAYLOAD);
    payload.set("x", Value::I32(7));

    let encoded = encode_members(&[
        ("quux", Value::I32(42)),
        ("payload", Value::Message(payload)),
        ("quux", Value::I32(43)),
    ]);
    let message = decode(&WIDGET, &encoded);
    assert_eq!(
        message.get("kind"),
        Some(&Value::Oneof(OneofValue::selected("quux", Value::I32(43))))
    );
}

#[test]
fn repeated_message_member_merges() {
    // The same message member twice in a row merges, like any singular
    // message field.
    let mut first = MessageValue::new(&PAYLOAD);
    first.set("x", Value::I32(1));
    let mut second = MessageValue::new(&PAYLOAD);
    second.set("y", Value::I32(2));

    let encoded = encode_members(&[
        ("payload", Value::Message(first)),
        ("payload", Value::Message(second)),
    ]);
    let message = decode(&WIDGET, &encoded);

    let Some(Value::Oneof(oneof)) = message.get("kind") else {
        panic!("kind missing");
    };
    assert_eq!(oneof.oneof_kind.as_deref(), Some("payload"));
    let Some(payload) = oneof.value.as_deref() else {
        panic!("payload missing");
    };
    let Value::Message(payload) = payload else {
        panic!("payload is not a message");
    };
    assert_eq!(payload.get("x"), Some(&Value::I32(1)));
    assert_eq!(payload.get("y"), Some(&Value::I32(2)));
}

#[test]
fn oneof_roundtrip() {
    let mut message = MessageValue::new(&WIDGET);
    message.set(
        "kind",
        Value::Oneof(OneofValue::selected("bar", Value::String("attr".into()))),
    );
    message.set("label", Value::String("named".into()));

    let encoded = encode(&WIDGET, &message);
    assert_eq!(decode(&WIDGET, &encoded), message);
}
