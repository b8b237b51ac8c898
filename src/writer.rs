//! Growable, fork-capable byte emitter for proto3 wire output.
//!
//! Length-delimited regions (nested messages, packed repeats, map entries)
//! need their byte length before their content. [`BinaryWriter`] solves this
//! with a fork/join bracket: `fork()` parks the bytes written so far and
//! starts collecting fresh, `join()` takes the collected region, restores the
//! parked state, and emits the region behind its length prefix.

use alloc::vec::Vec;
use bytes::{BufMut, Bytes};

use crate::error::EncodeError;
use crate::long::{Long64, ULong64};
use crate::util::CastFrom;
use crate::varint::{write_varint32, write_varint64, zigzag_encode32};
use crate::wire::{self, WireType};

#[cfg(feature = "smallvec")]
use smallvec::SmallVec;

/// Storage for completed chunks - uses SmallVec when available for inline storage.
#[cfg(feature = "smallvec")]
type ChunkVec = SmallVec<[Bytes; 8]>;

#[cfg(not(feature = "smallvec"))]
type ChunkVec = Vec<Bytes>;

/// Byte sink the encode path writes through.
///
/// All operations return `&mut Self` for chaining; [`join`] is the only
/// fallible one. 64-bit inputs accept native integers or [`Long64`] /
/// [`ULong64`] half pairs via `Into`.
///
/// [`join`]: BinaryWrite::join
pub trait BinaryWrite {
    /// Emit a field key: `(field_no << 3) | wire_type` as a varint.
    fn tag(&mut self, field_no: u32, wire_type: WireType) -> &mut Self;

    /// Append pre-encoded bytes as their own chunk, without copying.
    fn raw(&mut self, data: Bytes) -> &mut Self;

    fn uint32(&mut self, value: u32) -> &mut Self;
    fn int32(&mut self, value: i32) -> &mut Self;
    fn sint32(&mut self, value: i32) -> &mut Self;
    fn boolean(&mut self, value: bool) -> &mut Self;
    fn bytes(&mut self, data: &[u8]) -> &mut Self;
    fn string(&mut self, value: &str) -> &mut Self;
    fn float(&mut self, value: f32) -> &mut Self;
    fn double(&mut self, value: f64) -> &mut Self;
    fn fixed32(&mut self, value: u32) -> &mut Self;
    fn sfixed32(&mut self, value: i32) -> &mut Self;
    fn fixed64(&mut self, value: impl Into<ULong64>) -> &mut Self;
    fn sfixed64(&mut self, value: impl Into<Long64>) -> &mut Self;
    fn int64(&mut self, value: impl Into<Long64>) -> &mut Self;
    fn sint64(&mut self, value: impl Into<Long64>) -> &mut Self;
    fn uint64(&mut self, value: impl Into<ULong64>) -> &mut Self;

    /// Open a length-delimited sub-region.
    fn fork(&mut self) -> &mut Self;

    /// Close the innermost sub-region, emitting its length prefix and
    /// content into the surrounding output.
    fn join(&mut self) -> Result<&mut Self, EncodeError>;

    /// Hand back everything written as one contiguous byte sequence and
    /// reset to a fresh state. Any open forks are discarded.
    fn finish(&mut self) -> Bytes;
}

/// Saved output state while a fork is open.
#[derive(Debug, Default)]
struct Snapshot {
    chunks: ChunkVec,
    buf: Vec<u8>,
}

/// The stock [`BinaryWrite`] implementation.
///
/// Stateful and not safe for concurrent use; either serialize access or use
/// one writer per encode operation.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    /// Completed chunks, in output order.
    chunks: ChunkVec,
    /// In-progress buffer for small typed writes.
    buf: Vec<u8>,
    /// Saved states of open forks, innermost last.
    stack: Vec<Snapshot>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        BinaryWriter::default()
    }

    /// Move the in-progress buffer into the chunk list.
    fn flush(&mut self) {
        if !self.buf.is_empty() {
            let chunk = core::mem::take(&mut self.buf);
            self.chunks.push(Bytes::from(chunk));
        }
    }

    /// Consolidate the current level into one contiguous byte sequence.
    fn consolidate(&mut self) -> Bytes {
        self.flush();
        let mut chunks = core::mem::take(&mut self.chunks);
        match chunks.len() {
            0 => Bytes::new(),
            // Single chunk: hand it back without copying.
            1 => chunks.swap_remove(0),
            _ => {
                let total = chunks.iter().map(Bytes::len).sum();
                let mut out = Vec::with_capacity(total);
                for chunk in chunks {
                    out.extend_from_slice(&chunk);
                }
                Bytes::from(out)
            }
        }
    }

    /// Emit a byte length as a varint. Lengths on the wire are `uint32`s;
    /// widening through the halves keeps the byte output identical while
    /// never truncating a host `usize`.
    fn len_varint(&mut self, len: usize) {
        let bits = u64::cast_from(len);
        #[allow(clippy::as_conversions)]
        write_varint64(
            (bits & 0xffff_ffff) as u32,
            (bits >> 32) as u32,
            &mut self.buf,
        );
    }
}

impl BinaryWrite for BinaryWriter {
    #[inline]
    fn tag(&mut self, field_no: u32, wire_type: WireType) -> &mut Self {
        self.uint32(wire::make_tag(field_no, wire_type))
    }

    fn raw(&mut self, data: Bytes) -> &mut Self {
        self.flush();
        self.chunks.push(data);
        self
    }

    #[inline]
    fn uint32(&mut self, value: u32) -> &mut Self {
        write_varint32(value, &mut self.buf);
        self
    }

    #[inline]
    fn int32(&mut self, value: i32) -> &mut Self {
        // Negative values are sign-extended to 64 bits and come out as the
        // full 10 bytes, per the proto3 encoding rules.
        let (lo, hi) = Long64::from(i64::from(value)).into_parts();
        write_varint64(lo, hi, &mut self.buf);
        self
    }

    #[inline]
    fn sint32(&mut self, value: i32) -> &mut Self {
        self.uint32(zigzag_encode32(value))
    }

    #[inline]
    fn boolean(&mut self, value: bool) -> &mut Self {
        self.buf.put_u8(u8::from(value));
        self
    }

    fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.len_varint(data.len());
        self.buf.extend_from_slice(data);
        self
    }

    #[inline]
    fn string(&mut self, value: &str) -> &mut Self {
        self.bytes(value.as_bytes())
    }

    #[inline]
    fn float(&mut self, value: f32) -> &mut Self {
        self.buf.put_f32_le(value);
        self
    }

    #[inline]
    fn double(&mut self, value: f64) -> &mut Self {
        self.buf.put_f64_le(value);
        self
    }

    #[inline]
    fn fixed32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32_le(value);
        self
    }

    #[inline]
    fn sfixed32(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32_le(value);
        self
    }

    #[inline]
    fn fixed64(&mut self, value: impl Into<ULong64>) -> &mut Self {
        let (lo, hi) = value.into().into_parts();
        self.buf.put_u32_le(lo);
        self.buf.put_u32_le(hi);
        self
    }

    #[inline]
    fn sfixed64(&mut self, value: impl Into<Long64>) -> &mut Self {
        let (lo, hi) = value.into().into_parts();
        self.buf.put_u32_le(lo);
        self.buf.put_u32_le(hi);
        self
    }

    #[inline]
    fn int64(&mut self, value: impl Into<Long64>) -> &mut Self {
        let (lo, hi) = value.into().into_parts();
        write_varint64(lo, hi, &mut self.buf);
        self
    }

    #[inline]
    fn sint64(&mut self, value: impl Into<Long64>) -> &mut Self {
        let (lo, hi) = value.into().zigzag_encode().into_parts();
        write_varint64(lo, hi, &mut self.buf);
        self
    }

    #[inline]
    fn uint64(&mut self, value: impl Into<ULong64>) -> &mut Self {
        let (lo, hi) = value.into().into_parts();
        write_varint64(lo, hi, &mut self.buf);
        self
    }

    fn fork(&mut self) -> &mut Self {
        self.stack.push(Snapshot {
            chunks: core::mem::take(&mut self.chunks),
            buf: core::mem::take(&mut self.buf),
        });
        self
    }

    fn join(&mut self) -> Result<&mut Self, EncodeError> {
        let Some(prev) = self.stack.pop() else {
            return Err(EncodeError::EmptyForkStack);
        };
        let content = self.consolidate();
        self.chunks = prev.chunks;
        self.buf = prev.buf;
        self.len_varint(content.len());
        Ok(self.raw(content))
    }

    fn finish(&mut self) -> Bytes {
        let out = self.consolidate();
        self.buf.clear();
        self.stack.clear();
        out
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;
    use bytes::Bytes;
    use proptest::prelude::*;

    use super::{BinaryWrite, BinaryWriter};
    use crate::error::EncodeError;
    use crate::wire::WireType;

    #[test]
    fn test_scenario_bytes() {
        // {field 1 (int32) = 150}
        let mut writer = BinaryWriter::new();
        writer.tag(1, WireType::Varint).int32(150);
        assert_eq!(&writer.finish()[..], &[0x08, 0x96, 0x01]);

        // {field 2 (string) = "testing"}
        let mut writer = BinaryWriter::new();
        writer.tag(2, WireType::LengthDelimited).string("testing");
        assert_eq!(
            &writer.finish()[..],
            &[0x12, 0x07, 0x74, 0x65, 0x73, 0x74, 0x69, 0x6e, 0x67]
        );

        // int32 = -1 as field 1: 10-byte sign-extended varint.
        let mut writer = BinaryWriter::new();
        writer.tag(1, WireType::Varint).int32(-1);
        assert_eq!(
            &writer.finish()[..],
            &[0x08, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]
        );

        // sint32 = -1 as field 1: zigzag.
        let mut writer = BinaryWriter::new();
        writer.tag(1, WireType::Varint).sint32(-1);
        assert_eq!(&writer.finish()[..], &[0x08, 0x01]);
    }

    #[test]
    fn test_packed_via_fork() {
        // {field 4 (repeated int32, packed) = [1, 2, 3]}
        let mut writer = BinaryWriter::new();
        writer.tag(4, WireType::LengthDelimited).fork();
        writer.int32(1).int32(2).int32(3);
        writer.join().unwrap();
        assert_eq!(&writer.finish()[..], &[0x22, 0x03, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_nested_forks() {
        // Inner region [0x01] wrapped in an outer region.
        let mut writer = BinaryWriter::new();
        writer.fork();
        writer.fork();
        writer.boolean(true);
        writer.join().unwrap();
        writer.join().unwrap();
        assert_eq!(&writer.finish()[..], &[0x02, 0x01, 0x01]);
    }

    #[test]
    fn test_join_without_fork() {
        let mut writer = BinaryWriter::new();
        assert_eq!(writer.join().map(|_| ()), Err(EncodeError::EmptyForkStack));
    }

    #[test]
    fn test_raw_interleaves_with_buffer() {
        let mut writer = BinaryWriter::new();
        writer.uint32(1);
        writer.raw(Bytes::from_static(&[0xaa, 0xbb]));
        writer.uint32(2);
        assert_eq!(&writer.finish()[..], &[0x01, 0xaa, 0xbb, 0x02]);
    }

    #[test]
    fn test_finish_resets() {
        let mut writer = BinaryWriter::new();
        writer.uint32(7);
        assert_eq!(&writer.finish()[..], &[0x07]);

        writer.uint32(9);
        assert_eq!(&writer.finish()[..], &[0x09]);
        assert!(writer.finish().is_empty());
    }

    #[test]
    fn test_fixed_width_output() {
        let mut writer = BinaryWriter::new();
        writer
            .fixed32(1)
            .sfixed32(-2)
            .fixed64(3u64)
            .sfixed64(-4i64)
            .float(1.0)
            .double(-2.0);
        let out = writer.finish();
        assert_eq!(out.len(), 4 + 4 + 8 + 8 + 4 + 8);
        assert_eq!(&out[..4], &1u32.to_le_bytes());
        assert_eq!(&out[4..8], &(-2i32).to_le_bytes());
        assert_eq!(&out[8..16], &3u64.to_le_bytes());
        assert_eq!(&out[16..24], &(-4i64).to_le_bytes());
        assert_eq!(&out[24..28], &1.0f32.to_le_bytes());
        assert_eq!(&out[28..36], &(-2.0f64).to_le_bytes());
    }

    #[test]
    fn proptest_fork_join_prepends_length() {
        proptest!(|(values: Vec<u32>)| {
            let mut plain = BinaryWriter::new();
            for value in &values {
                plain.uint32(*value);
            }
            let plain = plain.finish();

            let mut forked = BinaryWriter::new();
            forked.fork();
            for value in &values {
                forked.uint32(*value);
            }
            forked.join().unwrap();
            let forked = forked.finish();

            // fork(); W; join() == length-prefixed W.
            let mut expected = BinaryWriter::new();
            expected.uint32(u32::try_from(plain.len()).unwrap());
            let prefix = expected.finish();

            prop_assert_eq!(&forked[..prefix.len()], &prefix[..]);
            prop_assert_eq!(&forked[prefix.len()..], &plain[..]);
        });
    }
}
