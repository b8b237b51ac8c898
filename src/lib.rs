//! Reflection-driven binary codec for the protobuf proto3 wire format.
//!
//! Messages are encoded and decoded against runtime descriptors
//! ([`descriptor::MessageInfo`]) instead of per-message generated code: the
//! [`reflect::ReflectionBinaryReader`] populates a dynamic
//! [`value::MessageValue`] from a byte cursor, and the
//! [`reflect::ReflectionBinaryWriter`] walks one back out through the
//! fork-capable [`writer::BinaryWriter`].
//!
//! ```
//! use std::sync::LazyLock;
//!
//! use protoflect::descriptor::{FieldInfo, MessageInfo, ScalarType};
//! use protoflect::reader::BinaryReader;
//! use protoflect::reflect::{ReadOptions, ReflectionBinaryReader};
//! use protoflect::value::{MessageValue, Value};
//!
//! static GREETING: LazyLock<MessageInfo> = LazyLock::new(|| {
//!     MessageInfo::new(
//!         "example.Greeting",
//!         vec![FieldInfo::scalar(1, "count", ScalarType::Int32)],
//!     )
//! });
//!
//! let mut reader = BinaryReader::from_slice(&[0x08, 0x96, 0x01]);
//! let mut target = MessageValue::new(&GREETING);
//! ReflectionBinaryReader::new(&GREETING)
//!     .read(&mut reader, &mut target, &ReadOptions::default(), None)
//!     .unwrap();
//! assert_eq!(target.get("count"), Some(&Value::I32(150)));
//! ```

#![no_std]
#![deny(clippy::as_conversions)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod descriptor;
pub mod error;
pub mod long;
pub mod reader;
pub mod reflect;
pub mod value;
pub mod varint;
pub mod wire;
pub mod writer;

mod util;
