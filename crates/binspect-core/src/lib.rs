//! # binspect-core
//!
//! A decoder for tagged binary container files.
//!
//! A container file is laid out as:
//!
//! ```text
//! [header: 16 bytes][records area: records_size bytes][details area: details_size bytes]
//! ```
//!
//! This crate provides:
//! - Header field extraction ([`decode_header`])
//! - Tolerant scanning of the records area with aggregate statistics ([`scan_records`])
//! - Decoding of the key/value details area ([`decode_details`])
//!
//! Every decoder is a pure function over a borrowed buffer. Nothing here
//! performs I/O or keeps state between calls, so independent files can be
//! decoded from any number of threads.
//!
//! ## Architecture
//!
//! - [`header`]: Fixed header layout and decoding
//! - [`records`]: Records area scanning and the record type table
//! - [`details`]: Details area decoding
//! - [`cursor`]: Bounded little-endian reads shared by the decoders
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use binspect_core::{decode_details_from_header, decode_header, Scanner};
//! use std::fs;
//!
//! let data = fs::read("sample.bin")?;
//!
//! let header = decode_header(&data)?;
//! let scan = Scanner::new().scan_from_header(&data, &header)?;
//! println!("{} records, {} invalid", scan.stats.record_count, scan.stats.invalid_records);
//!
//! let details = decode_details_from_header(&data, &header)?;
//! for (name, value) in details.iter() {
//!     println!("{} = {}", name, value);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod cursor;
pub mod details;
pub mod error;
pub mod header;
pub mod records;

// Re-export primary types for convenience
pub use details::{decode_details, decode_details_from_header, DetailEntry, DetailValue, DetailsMap};
pub use error::{Error, Region, Result};
pub use header::{decode_header, HeaderInfo, HEADER_SIZE, VERSION_OFFSET};
pub use records::{
    scan_records, OwnedRecord, OwnedScanResult, Record, RecordStats, RecordTypeCode,
    RecordTypeTable, ScanResult, ScanStop, Scanner, ScannerConfig, StopReason,
    RECORD_PREFIX_SIZE, UNKNOWN_LABEL,
};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
