//! Variable-length integer encoding over 32-bit halves.
//!
//! Protobuf varints carry up to 64 bits, 7 bits per byte, least significant
//! group first, with the high bit of each byte as a continuation flag. All
//! 64-bit values move through this module as `(lo, hi)` half pairs so the
//! hot path never depends on host 64-bit integer support.

// This module uses `as` casts which have been thoroughly reviewed for correctness.
#![allow(clippy::as_conversions)]

use crate::error::DecodeError;

/// Zigzag transform for 32-bit signed integers.
#[inline]
pub const fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Inverse of [`zigzag_encode32`].
#[inline]
pub const fn zigzag_decode32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ (-((n & 1) as i32))
}

/// Encode a 32-bit varint into the provided buffer.
///
/// Emits 1-5 bytes and returns the number of bytes written.
#[inline]
pub fn write_varint32<B: bytes::BufMut>(value: u32, buf: &mut B) -> usize {
    let mut value = value;

    // Byte 1.
    let byte = (value & 0x7f) as u8;
    value >>= 7;
    if value == 0 {
        buf.put_u8(byte);
        return 1;
    }
    buf.put_u8(byte | 0x80);

    // Byte 2.
    let byte = (value & 0x7f) as u8;
    value >>= 7;
    if value == 0 {
        buf.put_u8(byte);
        return 2;
    }
    buf.put_u8(byte | 0x80);

    // Byte 3.
    let byte = (value & 0x7f) as u8;
    value >>= 7;
    if value == 0 {
        buf.put_u8(byte);
        return 3;
    }
    buf.put_u8(byte | 0x80);

    // Byte 4.
    let byte = (value & 0x7f) as u8;
    value >>= 7;
    if value == 0 {
        buf.put_u8(byte);
        return 4;
    }
    buf.put_u8(byte | 0x80);

    // Byte 5.
    let byte = (value & 0x7f) as u8;
    value >>= 7;
    debug_assert_eq!(value, 0);
    buf.put_u8(byte);
    5
}

/// Encode a 64-bit varint given as `(lo, hi)` halves.
///
/// Emits 1-10 bytes and returns the number of bytes written. Callers writing
/// a negative `int32` must sign-extend it to 64 bits first, which makes it
/// come out as the full 10 bytes the proto3 encoding demands.
#[inline]
pub fn write_varint64<B: bytes::BufMut>(lo: u32, hi: u32, buf: &mut B) -> usize {
    let (mut lo, mut hi) = (lo, hi);
    let mut written = 1;
    loop {
        if hi == 0 && lo < 0x80 {
            buf.put_u8(lo as u8);
            return written;
        }
        buf.put_u8(((lo & 0x7f) as u8) | 0x80);
        // Shift the 64-bit quantity right by 7 across the halves.
        lo = (lo >> 7) | (hi << 25);
        hi >>= 7;
        written += 1;
    }
}

/// Decode a 64-bit varint from the front of `data`.
///
/// Returns `(lo, hi, bytes_consumed)`. Fails with
/// [`DecodeError::UnexpectedEndOfBuffer`] when the slice ends mid-varint and
/// [`DecodeError::MalformedVarint`] when the tenth byte still has its
/// continuation bit set or encodes bits beyond 2^64.
#[inline]
pub fn read_varint64(data: &[u8]) -> Result<(u32, u32, usize), DecodeError> {
    let mut lo: u32 = 0;

    // Bytes 1-4 fill the low 28 bits.
    for i in 0..4 {
        let b = *data
            .get(i)
            .ok_or_else(DecodeError::unexpected_end_of_buffer)?;
        lo |= u32::from(b & 0x7f) << (7 * i);
        if b < 0x80 {
            return Ok((lo, 0, i + 1));
        }
    }

    // Byte 5 straddles the halves: 4 bits into `lo`, 3 into `hi`.
    let b = *data
        .get(4)
        .ok_or_else(DecodeError::unexpected_end_of_buffer)?;
    lo |= u32::from(b & 0x7f) << 28;
    let mut hi = u32::from(b & 0x7f) >> 4;
    if b < 0x80 {
        return Ok((lo, hi, 5));
    }

    // Bytes 6-9 fill `hi` bits 3-30.
    for i in 5..9 {
        let b = *data
            .get(i)
            .ok_or_else(DecodeError::unexpected_end_of_buffer)?;
        hi |= u32::from(b & 0x7f) << (7 * i - 32);
        if b < 0x80 {
            return Ok((lo, hi, i + 1));
        }
    }

    // Byte 10 may only contribute the single remaining bit. Anything else
    // means the continuation bit is still set or the value overflows 64 bits.
    let b = *data
        .get(9)
        .ok_or_else(DecodeError::unexpected_end_of_buffer)?;
    if b >= 0x02 {
        return Err(DecodeError::malformed_varint());
    }
    hi |= u32::from(b) << 31;
    Ok((lo, hi, 10))
}
