//! Error types for the binspect-core library.
//!
//! Region-level failures are errors; malformed records inside a region are
//! not. They are counted in [`RecordStats`](crate::RecordStats) instead.

use std::fmt;
use thiserror::Error;

/// Result type alias for binspect operations
pub type Result<T> = std::result::Result<T, Error>;

/// The area of a container file a decode operation was pointed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// The fixed-size header
    Header,
    /// The records area
    Records,
    /// The details area
    Details,
}

impl Region {
    /// Returns a lowercase name for the region
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Header => "header",
            Region::Records => "records",
            Region::Details => "details",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for all decode operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Buffer is shorter than the fixed header
    #[error("truncated header: need {expected} bytes, buffer has {actual}")]
    TruncatedHeader {
        /// Required header size
        expected: usize,
        /// Actual buffer length
        actual: usize,
    },

    /// A region starts past the end of the buffer
    #[error("{region} area starts at offset {offset}, beyond buffer length {buffer_len}")]
    OutOfBounds {
        /// Region being decoded
        region: Region,
        /// Declared start offset
        offset: u64,
        /// Length of the buffer
        buffer_len: usize,
    },

    /// A details entry runs past the end of the details area
    #[error("truncated details entry at offset {offset}: needs {needed} bytes, {available} remain")]
    TruncatedDetails {
        /// Absolute offset of the entry that did not fit
        offset: u64,
        /// Bytes the entry still needed
        needed: u64,
        /// Bytes left in the region
        available: u64,
    },

    /// A details entry is structurally malformed
    #[error("invalid details entry at offset {offset}: {details}")]
    InvalidDetailEntry {
        /// Absolute offset of the entry
        offset: u64,
        /// Description of the problem
        details: String,
    },

    /// Declared area sizes do not fit in the declared file size
    #[error(
        "inconsistent header: header ({header_size} B) + records ({records_size} B) + \
         details ({details_size} B) exceed file size {file_size} B"
    )]
    InconsistentHeader {
        /// Declared file size
        file_size: u64,
        /// Fixed header size
        header_size: u64,
        /// Declared records area size
        records_size: u64,
        /// Declared details area size
        details_size: u64,
    },
}

impl Error {
    /// Creates a new truncated header error
    pub fn truncated_header(expected: usize, actual: usize) -> Self {
        Self::TruncatedHeader { expected, actual }
    }

    /// Creates a new out-of-bounds error
    pub fn out_of_bounds(region: Region, offset: u64, buffer_len: usize) -> Self {
        Self::OutOfBounds {
            region,
            offset,
            buffer_len,
        }
    }

    /// Creates a new truncated details error
    pub fn truncated_details(offset: u64, needed: u64, available: u64) -> Self {
        Self::TruncatedDetails {
            offset,
            needed,
            available,
        }
    }

    /// Creates a new invalid details entry error
    pub fn invalid_detail_entry(offset: u64, details: impl Into<String>) -> Self {
        Self::InvalidDetailEntry {
            offset,
            details: details.into(),
        }
    }

    /// Returns true if a partial result is still available alongside this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TruncatedDetails { .. }
                | Self::InvalidDetailEntry { .. }
                | Self::InconsistentHeader { .. }
        )
    }

    /// Returns the region this error belongs to
    pub fn region(&self) -> Region {
        match self {
            Self::TruncatedHeader { .. } | Self::InconsistentHeader { .. } => Region::Header,
            Self::OutOfBounds { region, .. } => *region,
            Self::TruncatedDetails { .. } | Self::InvalidDetailEntry { .. } => Region::Details,
        }
    }
}
