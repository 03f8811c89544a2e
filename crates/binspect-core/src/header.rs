//! Fixed-size header decoding.
//!
//! ## Layout
//!
//! ```text
//! offset  size  field
//!      0     4  file size (u32, LE)
//!      4     4  records area size (u32, LE)
//!      8     4  details area size (u32, LE)
//!     12     4  version block; byte 2 of the block is the format version
//! ```
//!
//! The records area follows the header directly and the details area
//! follows the records area.

use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 16;

const FILE_SIZE_OFFSET: usize = 0;
const RECORDS_SIZE_OFFSET: usize = 4;
const DETAILS_SIZE_OFFSET: usize = 8;
const VERSION_BLOCK_OFFSET: usize = 12;

/// Index of the version byte inside the version block
const VERSION_INDEX: usize = 2;

/// Absolute offset of the version byte
pub const VERSION_OFFSET: usize = VERSION_BLOCK_OFFSET + VERSION_INDEX;

/// Decoded header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeaderInfo {
    /// Declared total file size
    pub file_size: u64,
    /// Declared records area size
    pub records_size: u64,
    /// Declared details area size
    pub details_size: u64,
    /// Format version
    pub version: u8,
    /// Raw version block, including the reserved bytes
    pub version_block: [u8; 4],
}

impl HeaderInfo {
    /// Offset where the records area starts
    pub fn records_offset(&self) -> u64 {
        HEADER_SIZE as u64
    }

    /// Offset where the details area starts
    pub fn details_offset(&self) -> u64 {
        self.records_offset().saturating_add(self.records_size)
    }

    /// Header plus both declared areas
    pub fn declared_total(&self) -> u64 {
        (HEADER_SIZE as u64)
            .saturating_add(self.records_size)
            .saturating_add(self.details_size)
    }

    /// Checks that the declared areas fit in the declared file size
    pub fn check_consistency(&self) -> Result<()> {
        if self.declared_total() > self.file_size {
            return Err(Error::InconsistentHeader {
                file_size: self.file_size,
                header_size: HEADER_SIZE as u64,
                records_size: self.records_size,
                details_size: self.details_size,
            });
        }
        Ok(())
    }
}

/// Decode the fixed header at the start of `buffer`.
///
/// Only extracts fields; see [`HeaderInfo::check_consistency`] for validation.
pub fn decode_header(buffer: &[u8]) -> Result<HeaderInfo> {
    if buffer.len() < HEADER_SIZE {
        return Err(Error::truncated_header(HEADER_SIZE, buffer.len()));
    }

    let mut version_block = [0u8; 4];
    version_block.copy_from_slice(&buffer[VERSION_BLOCK_OFFSET..VERSION_BLOCK_OFFSET + 4]);

    let header = HeaderInfo {
        file_size: u64::from(LittleEndian::read_u32(&buffer[FILE_SIZE_OFFSET..])),
        records_size: u64::from(LittleEndian::read_u32(&buffer[RECORDS_SIZE_OFFSET..])),
        details_size: u64::from(LittleEndian::read_u32(&buffer[DETAILS_SIZE_OFFSET..])),
        version: version_block[VERSION_INDEX],
        version_block,
    };

    trace!(?header, "Decoded header");
    Ok(header)
}
