//! Records area scanning.
//!
//! The records area is a run of tagged, length-delimited records:
//!
//! ```text
//! [type: u8][length: u32 LE][payload: length - 5 bytes]
//! ```
//!
//! `length` covers the whole record, prefix included.
//!
//! ## Algorithm Overview
//!
//! 1. Clamp the declared region to the buffer
//! 2. Read the prefix at the cursor and check the declared length against
//!    the prefix size and the bytes left in the region
//! 3. Emit a [`Record`] view and advance by `length`
//! 4. On the first record whose bounds do not fit, count it as invalid and
//!    stop; there is no marker to resynchronise on
//!
//! Because `length >= RECORD_PREFIX_SIZE`, every iteration advances the
//! cursor and the scan always terminates.

mod types;

use crate::cursor::{clamp_region, ByteCursor};
use crate::error::{Error, Region, Result};
use crate::header::HeaderInfo;
use bytes::Bytes;
use byteorder::{ByteOrder, LittleEndian};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

pub use types::{RecordTypeCode, RecordTypeTable, UNKNOWN_LABEL};

/// Size of the `[type][length]` prefix of every record
pub const RECORD_PREFIX_SIZE: usize = 5;

/// A record borrowed from the scanned buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    /// Type code
    pub record_type: RecordTypeCode,
    /// Absolute offset of the record prefix
    pub offset: u64,
    /// Total length, prefix included
    pub length: u32,
    /// The whole record, prefix included
    pub data: &'a [u8],
}

impl<'a> Record<'a> {
    /// The record body after the prefix, empty if `data` is shorter than the prefix
    pub fn payload(&self) -> &'a [u8] {
        self.data.get(RECORD_PREFIX_SIZE..).unwrap_or_default()
    }

    /// Display name from the record type table
    pub fn type_name(&self) -> Option<&'static str> {
        RecordTypeTable::name(self.record_type)
    }

    /// Copies the record out of the buffer
    pub fn to_owned_record(&self) -> OwnedRecord {
        OwnedRecord {
            record_type: self.record_type,
            offset: self.offset,
            length: self.length,
            data: Bytes::copy_from_slice(self.data),
        }
    }
}

/// A record that owns its bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedRecord {
    /// Type code
    pub record_type: RecordTypeCode,
    /// Absolute offset of the record prefix
    pub offset: u64,
    /// Total length, prefix included
    pub length: u32,
    /// The whole record, prefix included
    pub data: Bytes,
}

impl OwnedRecord {
    /// The record body after the prefix, empty if `data` is shorter than the prefix
    pub fn payload(&self) -> Bytes {
        if self.data.len() < RECORD_PREFIX_SIZE {
            return Bytes::new();
        }
        self.data.slice(RECORD_PREFIX_SIZE..)
    }

    /// Display name from the record type table
    pub fn type_name(&self) -> Option<&'static str> {
        RecordTypeTable::name(self.record_type)
    }
}

/// Why a scan ended before the nominal end of the records area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Fewer bytes than a record prefix were left
    TrailingFragment {
        /// Leftover byte count
        len: u64,
    },
    /// Declared length is smaller than the record prefix
    LengthTooShort {
        /// Declared length
        declared: u32,
    },
    /// Declared length runs past the end of the region
    LengthOverrun {
        /// Declared length
        declared: u32,
        /// Bytes left in the region
        available: u64,
    },
    /// The buffer ends before the declared records area does
    RegionClamped {
        /// Length of the buffer
        buffer_len: u64,
    },
    /// The configured record limit was reached
    RecordLimit {
        /// Configured limit
        limit: usize,
    },
}

impl StopReason {
    /// Returns true if the stop was caused by a malformed record
    pub fn is_invalid_record(&self) -> bool {
        matches!(
            self,
            Self::TrailingFragment { .. } | Self::LengthTooShort { .. } | Self::LengthOverrun { .. }
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrailingFragment { len } => {
                write!(f, "{} trailing bytes are too short for a record prefix", len)
            }
            Self::LengthTooShort { declared } => write!(
                f,
                "declared length {} is shorter than the {}-byte prefix",
                declared, RECORD_PREFIX_SIZE
            ),
            Self::LengthOverrun {
                declared,
                available,
            } => write!(
                f,
                "declared length {} exceeds the {} bytes left in the area",
                declared, available
            ),
            Self::RegionClamped { buffer_len } => {
                write!(f, "buffer ends at {} before the declared area does", buffer_len)
            }
            Self::RecordLimit { limit } => write!(f, "record limit of {} reached", limit),
        }
    }
}

/// Where and why a scan stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStop {
    /// Absolute cursor offset at the stop
    pub offset: u64,
    /// Cause of the stop
    pub reason: StopReason,
}

/// Aggregate statistics for one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStats {
    /// Bytes actually consumed by valid records
    pub records_area_size: u64,
    /// Declared size of the records area
    pub nominal_size: u64,
    /// Number of valid records
    pub record_count: usize,
    /// Number of records rejected for inconsistent bounds
    pub invalid_records: usize,
    /// Valid records per type code
    pub type_count: BTreeMap<RecordTypeCode, usize>,
    /// Set when the scan ended before the nominal end
    pub stop: Option<ScanStop>,
}

impl RecordStats {
    /// Declared bytes that were not consumed
    pub fn unscanned_bytes(&self) -> u64 {
        self.nominal_size - self.records_area_size
    }

    /// Returns true if the whole declared area was consumed by valid records
    pub fn is_complete(&self) -> bool {
        self.stop.is_none() && self.records_area_size == self.nominal_size
    }
}

/// Records and statistics from one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult<'a> {
    /// Valid records in file order
    pub records: Vec<Record<'a>>,
    /// Aggregate statistics
    pub stats: RecordStats,
}

impl ScanResult<'_> {
    /// Type codes of the valid records in file order
    pub fn type_sequence(&self) -> Vec<RecordTypeCode> {
        self.records.iter().map(|r| r.record_type).collect()
    }

    /// Copies every record out of the buffer
    pub fn into_owned(self) -> OwnedScanResult {
        OwnedScanResult {
            records: self.records.iter().map(Record::to_owned_record).collect(),
            stats: self.stats,
        }
    }
}

/// A [`ScanResult`] detached from the input buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedScanResult {
    /// Valid records in file order
    pub records: Vec<OwnedRecord>,
    /// Aggregate statistics
    pub stats: RecordStats,
}

/// Configuration for the scanner
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    /// Maximum number of records to collect (0 = unlimited)
    pub max_records: usize,
}

impl ScannerConfig {
    /// Creates a new scanner config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of records to collect
    pub fn max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }
}

/// Records area scanner
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScannerConfig,
}

impl Scanner {
    /// Creates a new scanner with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Scan the records area located by a decoded header
    pub fn scan_from_header<'a>(
        &self,
        buffer: &'a [u8],
        header: &HeaderInfo,
    ) -> Result<ScanResult<'a>> {
        self.scan(buffer, header.records_offset(), header.records_size)
    }

    /// Scan `records_size` bytes of records starting at `records_offset`.
    ///
    /// Fails only if `records_offset` lies beyond the buffer. Malformed
    /// records are counted in [`RecordStats::invalid_records`].
    pub fn scan<'a>(
        &self,
        buffer: &'a [u8],
        records_offset: u64,
        records_size: u64,
    ) -> Result<ScanResult<'a>> {
        if records_offset > buffer.len() as u64 {
            return Err(Error::out_of_bounds(
                Region::Records,
                records_offset,
                buffer.len(),
            ));
        }

        let nominal_end = records_offset.saturating_add(records_size);
        let end = clamp_region(records_offset, records_size, buffer.len());
        let region = &buffer[records_offset as usize..end as usize];

        debug!(
            "Scanning records area at {} ({} bytes declared, {} available)",
            records_offset,
            records_size,
            region.len()
        );

        let mut cursor = ByteCursor::new(region, records_offset);
        let mut result = ScanResult::default();
        let mut stop = None;

        while !cursor.is_empty() {
            if self.config.max_records > 0 && result.records.len() >= self.config.max_records {
                stop = Some(StopReason::RecordLimit {
                    limit: self.config.max_records,
                });
                break;
            }

            let available = cursor.remaining() as u64;
            let Some(prefix) = cursor.peek(RECORD_PREFIX_SIZE) else {
                stop = Some(StopReason::TrailingFragment { len: available });
                break;
            };

            let record_type = prefix[0];
            let declared = LittleEndian::read_u32(&prefix[1..]);

            if (declared as usize) < RECORD_PREFIX_SIZE {
                stop = Some(StopReason::LengthTooShort { declared });
                break;
            }
            if u64::from(declared) > available {
                stop = Some(StopReason::LengthOverrun {
                    declared,
                    available,
                });
                break;
            }

            let offset = cursor.position();
            let Some(data) = cursor.take(declared as usize) else {
                break;
            };

            trace!(
                "Record type {:#04x} at {} ({} bytes)",
                record_type,
                offset,
                declared
            );

            *result.stats.type_count.entry(record_type).or_insert(0) += 1;
            result.records.push(Record {
                record_type,
                offset,
                length: declared,
                data,
            });
        }

        if stop.is_none() && end < nominal_end {
            stop = Some(StopReason::RegionClamped {
                buffer_len: buffer.len() as u64,
            });
        }

        let stats = &mut result.stats;
        stats.records_area_size = cursor.consumed() as u64;
        stats.nominal_size = records_size;
        stats.record_count = result.records.len();
        stats.stop = stop.map(|reason| ScanStop {
            offset: cursor.position(),
            reason,
        });
        if let Some(stop) = &stats.stop {
            if stop.reason.is_invalid_record() {
                stats.invalid_records += 1;
            }
            debug!("Records scan stopped at {}: {}", stop.offset, stop.reason);
        }

        debug!(
            "Scan complete: {} records, {} invalid, {}/{} bytes consumed",
            stats.record_count, stats.invalid_records, stats.records_area_size, stats.nominal_size
        );
        Ok(result)
    }
}

/// Scan a records area with the default scanner
pub fn scan_records(
    buffer: &[u8],
    records_offset: u64,
    records_size: u64,
) -> Result<ScanResult<'_>> {
    Scanner::new().scan(buffer, records_offset, records_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(record_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut data = vec![record_type];
        data.extend_from_slice(&((payload.len() + RECORD_PREFIX_SIZE) as u32).to_le_bytes());
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn test_scanner_config_builder() {
        let config = ScannerConfig::new().max_records(10);
        assert_eq!(config.max_records, 10);
    }

    #[test]
    fn test_empty_input() {
        let result = scan_records(&[], 0, 0).unwrap();
        assert!(result.records.is_empty());
        assert!(result.stats.is_complete());
    }

    #[test]
    fn test_offset_past_buffer() {
        let err = scan_records(&[0u8; 4], 5, 0).unwrap_err();
        assert_eq!(err, Error::out_of_bounds(Region::Records, 5, 4));
    }

    #[test]
    fn test_offset_at_buffer_end() {
        let result = scan_records(&[0u8; 4], 4, 0).unwrap();
        assert!(result.stats.is_complete());
    }

    #[test]
    fn test_views_and_payload() {
        let mut data = vec![0xEE; 3];
        data.extend(record(0x03, b"abc"));
        data.extend(record(0x42, b""));

        let result = scan_records(&data, 3, 13).unwrap();
        assert_eq!(result.records.len(), 2);

        let first = result.records[0];
        assert_eq!(first.offset, 3);
        assert_eq!(first.length, 8);
        assert_eq!(first.payload(), b"abc");
        assert_eq!(first.type_name(), Some("Data"));

        let second = result.records[1];
        assert_eq!(second.offset, 11);
        assert!(second.payload().is_empty());
        assert_eq!(second.type_name(), None);
        assert!(result.stats.is_complete());
    }

    #[test]
    fn test_payload_of_hand_built_record() {
        let record = Record {
            record_type: 0x01,
            offset: 0,
            length: 3,
            data: &[0x01, 0x03, 0x00],
        };
        assert!(record.payload().is_empty());
        assert!(record.to_owned_record().payload().is_empty());

        let owned = OwnedRecord {
            record_type: 0x02,
            offset: 0,
            length: 0,
            data: Bytes::new(),
        };
        assert!(owned.payload().is_empty());

        let exact = Record {
            record_type: 0x02,
            offset: 0,
            length: 5,
            data: &[0x02, 0x05, 0, 0, 0],
        };
        assert!(exact.payload().is_empty());
    }

    #[test]
    fn test_zero_length_is_invalid() {
        let mut data = record(0x01, b"ok");
        data.extend_from_slice(&[0x02, 0, 0, 0, 0, 0xFF]);

        let result = scan_records(&data, 0, data.len() as u64).unwrap();
        assert_eq!(result.stats.record_count, 1);
        assert_eq!(result.stats.invalid_records, 1);
        assert_eq!(
            result.stats.stop,
            Some(ScanStop {
                offset: 7,
                reason: StopReason::LengthTooShort { declared: 0 }
            })
        );
    }

    #[test]
    fn test_trailing_fragment() {
        let mut data = record(0x01, b"");
        data.extend_from_slice(&[0x01, 0x02]);

        let result = scan_records(&data, 0, data.len() as u64).unwrap();
        assert_eq!(result.stats.record_count, 1);
        assert_eq!(result.stats.invalid_records, 1);
        assert_eq!(result.stats.unscanned_bytes(), 2);
        assert_eq!(
            result.stats.stop.map(|s| s.reason),
            Some(StopReason::TrailingFragment { len: 2 })
        );
    }

    #[test]
    fn test_region_clamped_on_boundary() {
        let data = record(0x01, b"xy");
        let result = scan_records(&data, 0, 100).unwrap();

        assert_eq!(result.stats.record_count, 1);
        assert_eq!(result.stats.invalid_records, 0);
        assert_eq!(result.stats.records_area_size, 7);
        assert_eq!(result.stats.unscanned_bytes(), 93);
        assert_eq!(
            result.stats.stop.map(|s| s.reason),
            Some(StopReason::RegionClamped { buffer_len: 7 })
        );
    }

    #[test]
    fn test_record_limit() {
        let mut data = record(0x01, b"a");
        data.extend(record(0x02, b"b"));
        data.extend(record(0x03, b"c"));

        let scanner = Scanner::with_config(ScannerConfig::new().max_records(2));
        let result = scanner.scan(&data, 0, data.len() as u64).unwrap();

        assert_eq!(result.type_sequence(), vec![0x01, 0x02]);
        assert_eq!(result.stats.invalid_records, 0);
        assert!(!result.stats.is_complete());
        assert_eq!(
            result.stats.stop,
            Some(ScanStop {
                offset: 12,
                reason: StopReason::RecordLimit { limit: 2 }
            })
        );
    }

    #[test]
    fn test_huge_length_does_not_overflow() {
        let mut data = vec![0x01];
        data.extend_from_slice(&u32::MAX.to_le_bytes());

        let result = scan_records(&data, 0, u64::MAX).unwrap();
        assert_eq!(result.stats.record_count, 0);
        assert_eq!(result.stats.invalid_records, 1);
        assert_eq!(result.stats.records_area_size, 0);
    }

    #[test]
    fn test_into_owned() {
        let data = record(0x05, b"pixels");
        let owned = scan_records(&data, 0, data.len() as u64)
            .unwrap()
            .into_owned();

        assert_eq!(owned.records.len(), 1);
        assert_eq!(owned.records[0].payload(), Bytes::from_static(b"pixels"));
        assert_eq!(owned.records[0].type_name(), Some("Image"));
        assert_eq!(owned.stats.record_count, 1);
    }
}
