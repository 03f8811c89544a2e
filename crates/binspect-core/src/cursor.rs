//! Bounded little-endian reader over a region of the input buffer.
//!
//! Every read either succeeds completely and advances the position, or
//! returns `None` and leaves the cursor where it was. Positions reported by
//! the cursor are absolute offsets into the input buffer.

use byteorder::{ByteOrder, LittleEndian};

/// Clamp a declared `[offset, offset + size)` region to a buffer of `len` bytes.
///
/// Returns the clamped end offset. `offset` must already be `<= len`.
pub(crate) fn clamp_region(offset: u64, size: u64, len: usize) -> u64 {
    offset.saturating_add(size).min(len as u64)
}

/// Forward-only reader over a borrowed byte region
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    base: u64,
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Creates a cursor over `data`, which starts at absolute offset `base`
    pub fn new(data: &'a [u8], base: u64) -> Self {
        Self { data, base, pos: 0 }
    }

    /// Absolute offset of the next unread byte
    pub fn position(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// Bytes consumed since the cursor was created
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Bytes left in the region
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true once every byte of the region has been consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the next `n` bytes without consuming them
    pub fn peek(&self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        self.data.get(self.pos..end)
    }

    /// Consumes and returns the next `n` bytes
    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let bytes = self.peek(n)?;
        self.pos += n;
        Some(bytes)
    }

    /// Reads a single byte
    pub fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    /// Reads a little-endian `u16`
    pub fn read_u16(&mut self) -> Option<u16> {
        self.take(2).map(LittleEndian::read_u16)
    }

    /// Reads a little-endian `u32`
    pub fn read_u32(&mut self) -> Option<u32> {
        self.take(4).map(LittleEndian::read_u32)
    }

    /// Reads a little-endian `u64`
    pub fn read_u64(&mut self) -> Option<u64> {
        self.take(8).map(LittleEndian::read_u64)
    }
}
