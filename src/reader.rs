//! Cursor over an encoded message buffer.
//!
//! [`BinaryRead`] is the contract the reflection layer decodes through;
//! [`BinaryReader`] is the stock implementation over [`bytes::Bytes`],
//! handing out zero-copy sub-slices for `bytes` fields and skipped regions.

// This module uses `as` casts which have been thoroughly reviewed for correctness.
#![allow(clippy::as_conversions)]

use alloc::string::String;
use bytes::Bytes;

use crate::error::DecodeError;
use crate::long::{Long64, ULong64};
use crate::util::{likely, unlikely};
use crate::varint::{read_varint64, zigzag_decode32};
use crate::wire::{self, WireType};

/// Byte cursor the decode path reads through.
///
/// Every primitive advances the position by exactly the bytes it consumed.
/// Underruns fail with [`DecodeError::UnexpectedEndOfBuffer`], overlong
/// varints with [`DecodeError::MalformedVarint`]; a failed read unwinds the
/// whole decode and the cursor must not be reused.
pub trait BinaryRead {
    /// Current byte offset into the buffer.
    fn pos(&self) -> usize;

    /// Total length of the buffer.
    fn len(&self) -> usize;

    /// Bytes left to read.
    #[inline]
    fn remaining(&self) -> usize {
        self.len() - self.pos()
    }

    /// Read a field key and split it into `(field_number, wire_type)`.
    fn tag(&mut self) -> Result<(u32, WireType), DecodeError>;

    /// Skip one field value of the given wire type, returning the raw bytes
    /// consumed (for length-delimited values this includes the length
    /// prefix, so the bytes re-emit verbatim after a `tag()`).
    fn skip(&mut self, wire_type: WireType) -> Result<Bytes, DecodeError>;

    fn int32(&mut self) -> Result<i32, DecodeError>;
    fn uint32(&mut self) -> Result<u32, DecodeError>;
    fn sint32(&mut self) -> Result<i32, DecodeError>;
    fn fixed32(&mut self) -> Result<u32, DecodeError>;
    fn sfixed32(&mut self) -> Result<i32, DecodeError>;
    fn float(&mut self) -> Result<f32, DecodeError>;
    fn double(&mut self) -> Result<f64, DecodeError>;
    fn boolean(&mut self) -> Result<bool, DecodeError>;
    fn string(&mut self) -> Result<String, DecodeError>;
    fn bytes(&mut self) -> Result<Bytes, DecodeError>;

    fn int64(&mut self) -> Result<Long64, DecodeError>;
    fn sint64(&mut self) -> Result<Long64, DecodeError>;
    fn sfixed64(&mut self) -> Result<Long64, DecodeError>;
    fn uint64(&mut self) -> Result<ULong64, DecodeError>;
    fn fixed64(&mut self) -> Result<ULong64, DecodeError>;

    /// Read the length prefix of a length-delimited field.
    fn len_prefix(&mut self) -> Result<usize, DecodeError>;
}

/// The stock [`BinaryRead`] over a fully-buffered byte sequence.
#[derive(Debug, Clone)]
pub struct BinaryReader {
    buf: Bytes,
    pos: usize,
}

impl BinaryReader {
    pub fn new(buf: Bytes) -> Self {
        BinaryReader { buf, pos: 0 }
    }

    /// Convenience for borrowed input; copies the slice once.
    pub fn from_slice(data: &[u8]) -> Self {
        BinaryReader::new(Bytes::copy_from_slice(data))
    }

    /// Read a varint and return its halves.
    #[inline]
    fn varint(&mut self) -> Result<(u32, u32), DecodeError> {
        let (lo, hi, read) = read_varint64(&self.buf[self.pos..])?;
        self.pos += read;
        Ok((lo, hi))
    }

    /// Split off `n` bytes as a zero-copy sub-slice.
    #[inline]
    fn take(&mut self, n: usize) -> Result<Bytes, DecodeError> {
        if unlikely(self.remaining() < n) {
            return Err(DecodeError::unexpected_end_of_buffer());
        }
        let out = self.buf.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(out)
    }

    #[inline]
    fn fixed_4(&mut self) -> Result<[u8; 4], DecodeError> {
        if unlikely(self.remaining() < 4) {
            return Err(DecodeError::unexpected_end_of_buffer());
        }
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(out)
    }

    #[inline]
    fn fixed_8(&mut self) -> Result<[u8; 8], DecodeError> {
        if unlikely(self.remaining() < 8) {
            return Err(DecodeError::unexpected_end_of_buffer());
        }
        let mut out = [0u8; 8];
        out.copy_from_slice(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(out)
    }
}

impl BinaryRead for BinaryReader {
    #[inline]
    fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn tag(&mut self) -> Result<(u32, WireType), DecodeError> {
        let (lo, hi) = self.varint()?;
        if unlikely(hi != 0) {
            return Err(DecodeError::invalid_tag("tag exceeds 32 bits"));
        }
        wire::split_tag(lo)
    }

    fn skip(&mut self, wire_type: WireType) -> Result<Bytes, DecodeError> {
        let start = self.pos;
        match wire_type {
            WireType::Varint => {
                self.varint()?;
            }
            WireType::Bit64 => {
                self.fixed_8()?;
            }
            WireType::Bit32 => {
                self.fixed_4()?;
            }
            WireType::LengthDelimited => {
                let len = self.len_prefix()?;
                self.take(len)?;
            }
            WireType::StartGroup | WireType::EndGroup => {
                return Err(DecodeError::GroupEncoding);
            }
        }
        Ok(self.buf.slice(start..self.pos))
    }

    #[inline]
    fn int32(&mut self) -> Result<i32, DecodeError> {
        // int32 arrives sign-extended to 64 bits, the high half is dropped.
        let (lo, _hi) = self.varint()?;
        Ok(lo as i32)
    }

    #[inline]
    fn uint32(&mut self) -> Result<u32, DecodeError> {
        let (lo, _hi) = self.varint()?;
        Ok(lo)
    }

    #[inline]
    fn sint32(&mut self) -> Result<i32, DecodeError> {
        let (lo, _hi) = self.varint()?;
        Ok(zigzag_decode32(lo))
    }

    #[inline]
    fn fixed32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.fixed_4()?))
    }

    #[inline]
    fn sfixed32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.fixed_4()?))
    }

    #[inline]
    fn float(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.fixed_4()?))
    }

    #[inline]
    fn double(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.fixed_8()?))
    }

    #[inline]
    fn boolean(&mut self) -> Result<bool, DecodeError> {
        let (lo, hi) = self.varint()?;
        Ok((lo | hi) != 0)
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let data = self.bytes()?;
        match core::str::from_utf8(&data) {
            Ok(s) => Ok(String::from(s)),
            Err(_) => Err(DecodeError::InvalidUtf8),
        }
    }

    fn bytes(&mut self) -> Result<Bytes, DecodeError> {
        let len = self.len_prefix()?;
        self.take(len)
    }

    #[inline]
    fn int64(&mut self) -> Result<Long64, DecodeError> {
        let (lo, hi) = self.varint()?;
        Ok(Long64::from_parts(lo, hi))
    }

    #[inline]
    fn sint64(&mut self) -> Result<Long64, DecodeError> {
        let (lo, hi) = self.varint()?;
        Ok(ULong64::from_parts(lo, hi).zigzag_decode())
    }

    #[inline]
    fn sfixed64(&mut self) -> Result<Long64, DecodeError> {
        let bits = u64::from_le_bytes(self.fixed_8()?);
        Ok(Long64::from_parts(
            (bits & 0xffff_ffff) as u32,
            (bits >> 32) as u32,
        ))
    }

    #[inline]
    fn uint64(&mut self) -> Result<ULong64, DecodeError> {
        let (lo, hi) = self.varint()?;
        Ok(ULong64::from_parts(lo, hi))
    }

    #[inline]
    fn fixed64(&mut self) -> Result<ULong64, DecodeError> {
        let bits = u64::from_le_bytes(self.fixed_8()?);
        Ok(ULong64::from_parts(
            (bits & 0xffff_ffff) as u32,
            (bits >> 32) as u32,
        ))
    }

    #[inline]
    fn len_prefix(&mut self) -> Result<usize, DecodeError> {
        // Fast path, most lengths fit in one byte (< 128).
        let chunk = &self.buf[self.pos..];
        if likely(!chunk.is_empty() && chunk[0] < 0x80) {
            self.pos += 1;
            return Ok(usize::from(chunk[0]));
        }
        let (lo, hi) = self.varint()?;
        let value = (u64::from(hi) << 32) | u64::from(lo);
        usize::try_from(value).map_err(|_| DecodeError::LengthOverflow { value })
    }
}

#[cfg(test)]
mod tests {
    use super::{BinaryRead, BinaryReader};
    use crate::error::DecodeError;
    use crate::wire::WireType;

    #[test]
    fn test_tag_then_varint() {
        // Field 1, varint, value 150.
        let mut reader = BinaryReader::from_slice(&[0x08, 0x96, 0x01]);
        assert_eq!(reader.tag().unwrap(), (1, WireType::Varint));
        assert_eq!(reader.int32().unwrap(), 150);
        assert_eq!(reader.pos(), reader.len());
    }

    #[test]
    fn test_string_read() {
        let mut reader =
            BinaryReader::from_slice(&[0x07, 0x74, 0x65, 0x73, 0x74, 0x69, 0x6e, 0x67]);
        assert_eq!(reader.string().unwrap(), "testing");
    }

    #[test]
    fn test_invalid_utf8() {
        let mut reader = BinaryReader::from_slice(&[0x03, 0xff, 0xfe, 0xfd]);
        assert_eq!(reader.string(), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn test_sign_extended_int32() {
        let mut reader = BinaryReader::from_slice(&[
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01,
        ]);
        assert_eq!(reader.int32().unwrap(), -1);
    }

    #[test]
    fn test_fixed_reads() {
        let mut reader = BinaryReader::from_slice(&[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(reader.fixed32().unwrap(), 1);

        let mut reader = BinaryReader::from_slice(&[0x00, 0x00, 0x80, 0x3f]);
        assert_eq!(reader.float().unwrap(), 1.0);

        let mut reader =
            BinaryReader::from_slice(&[0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(reader.sfixed64().unwrap().to_i64(), -2);
    }

    #[test]
    fn test_truncated_reads() {
        let mut reader = BinaryReader::from_slice(&[0x00, 0x00]);
        assert_eq!(reader.fixed32(), Err(DecodeError::UnexpectedEndOfBuffer));
        // The failed read did not consume anything.
        assert_eq!(reader.pos(), 0);

        let mut reader = BinaryReader::from_slice(&[0x05, 0x61]);
        assert_eq!(reader.bytes(), Err(DecodeError::UnexpectedEndOfBuffer));
    }

    #[test]
    fn test_skip_returns_raw_bytes() {
        // Varint value.
        let mut reader = BinaryReader::from_slice(&[0x96, 0x01, 0x63]);
        assert_eq!(&reader.skip(WireType::Varint).unwrap()[..], &[0x96, 0x01]);
        assert_eq!(reader.pos(), 2);

        // Length-delimited value keeps its length prefix.
        let mut reader = BinaryReader::from_slice(&[0x02, 0x61, 0x62, 0x63]);
        assert_eq!(
            &reader.skip(WireType::LengthDelimited).unwrap()[..],
            &[0x02, 0x61, 0x62]
        );

        // Fixed widths.
        let mut reader = BinaryReader::from_slice(&[1, 2, 3, 4, 99]);
        assert_eq!(&reader.skip(WireType::Bit32).unwrap()[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_skip_groups_error() {
        let mut reader = BinaryReader::from_slice(&[0x00]);
        assert_eq!(
            reader.skip(WireType::StartGroup),
            Err(DecodeError::GroupEncoding)
        );
        assert_eq!(
            reader.skip(WireType::EndGroup),
            Err(DecodeError::GroupEncoding)
        );
    }
}
