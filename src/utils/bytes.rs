//! Bounds-checked little-endian reads. Offsets are relative to the slice passed in.
//!
//! The plain readers return `Option`; the `*_at` readers name the field being read and fail with
//! [`DecodeError::Truncated`].

use crate::err::DecodeError;

use byteorder::{ByteOrder, LittleEndian};

#[inline]
pub(crate) fn truncated(what: &'static str, offset: usize, need: usize, len: usize) -> DecodeError {
    DecodeError::Truncated {
        what,
        offset: offset as u64,
        need,
        have: len.saturating_sub(offset),
    }
}

fn window(buf: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    buf.get(offset..offset.checked_add(len)?)
}

/// The 4-byte marker at `offset` (e.g. `EMF+` at the start of a comment).
pub(crate) fn read_sig(buf: &[u8], offset: usize) -> Option<[u8; 4]> {
    window(buf, offset, 4)?.try_into().ok()
}

pub(crate) fn read_u32_le(buf: &[u8], offset: usize) -> Option<u32> {
    window(buf, offset, 4).map(LittleEndian::read_u32)
}

/// `len` bytes at `offset`.
pub(crate) fn slice_r<'a>(
    buf: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], DecodeError> {
    window(buf, offset, len).ok_or_else(|| truncated(what, offset, len, buf.len()))
}

pub(crate) fn u16_at(buf: &[u8], offset: usize, what: &'static str) -> Result<u16, DecodeError> {
    slice_r(buf, offset, 2, what).map(LittleEndian::read_u16)
}

pub(crate) fn u32_at(buf: &[u8], offset: usize, what: &'static str) -> Result<u32, DecodeError> {
    slice_r(buf, offset, 4, what).map(LittleEndian::read_u32)
}

pub(crate) fn i32_at(buf: &[u8], offset: usize, what: &'static str) -> Result<i32, DecodeError> {
    slice_r(buf, offset, 4, what).map(LittleEndian::read_i32)
}
