//! Details area decoding.
//!
//! The details area is a sequence of named values:
//!
//! ```text
//! [name_len: u8][name: name_len bytes][tag: u8][value]
//!
//! tag 0x01  text  [len: u16 LE][len bytes]
//! tag 0x02  u32   4 bytes LE
//! tag 0x03  u64   8 bytes LE
//! ```
//!
//! Decoding stops at the first entry that does not fit or is malformed.
//! Entries decoded before that point are kept.

use crate::cursor::{clamp_region, ByteCursor};
use crate::error::{Error, Region, Result};
use crate::header::HeaderInfo;
use std::fmt;
use tracing::{debug, trace};

const TAG_TEXT: u8 = 0x01;
const TAG_U32: u8 = 0x02;
const TAG_U64: u8 = 0x03;

/// A decoded details value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DetailValue {
    /// UTF-8 text, lossily decoded
    Text(String),
    /// Unsigned integer from a u32 or u64 slot
    Number(u64),
}

impl DetailValue {
    /// Returns the text if this is a text value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }

    /// Returns the number if this is a numeric value
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for DetailValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

/// One name/value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailEntry {
    /// Field name
    pub name: String,
    /// Field value
    pub value: DetailValue,
    /// Absolute offset of the entry
    pub offset: u64,
}

/// Decoded details area, possibly partial
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailsMap {
    /// Entries in file order
    pub entries: Vec<DetailEntry>,
    /// Declared size of the details area
    pub region_size: u64,
    /// Declared bytes not covered by decoded entries
    pub unparsed_bytes: u64,
    /// Why decoding stopped early, if it did
    pub error: Option<Error>,
}

impl DetailsMap {
    /// Looks up the first entry named `name`
    pub fn get(&self, name: &str) -> Option<&DetailValue> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
    }

    /// Iterates `(name, value)` pairs in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DetailValue)> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), &entry.value))
    }

    /// Number of decoded entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries were decoded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if the whole declared area was decoded
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.unparsed_bytes == 0
    }

    /// Returns the stored truncation error, if any
    pub fn check(&self) -> Result<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Why a single entry could not be decoded
enum EntryError {
    /// A field would end at `field_end`, past the region end
    Truncated { field_end: u64 },
    /// The entry is malformed
    Invalid(&'static str),
}

type EntryResult<T> = std::result::Result<T, EntryError>;

/// Runs one fixed-size read, mapping a short region to [`EntryError::Truncated`]
fn field<'a, T>(
    cursor: &mut ByteCursor<'a>,
    size: usize,
    read: impl FnOnce(&mut ByteCursor<'a>) -> Option<T>,
) -> EntryResult<T> {
    let field_end = cursor.position().saturating_add(size as u64);
    read(cursor).ok_or(EntryError::Truncated { field_end })
}

fn decode_entry(cursor: &mut ByteCursor<'_>) -> EntryResult<(String, DetailValue)> {
    let name_len = field(cursor, 1, ByteCursor::read_u8)? as usize;
    if name_len == 0 {
        return Err(EntryError::Invalid("empty name"));
    }
    let name = field(cursor, name_len, |c| c.take(name_len))?;
    let name = String::from_utf8_lossy(name).into_owned();

    let value = match field(cursor, 1, ByteCursor::read_u8)? {
        TAG_TEXT => {
            let len = field(cursor, 2, ByteCursor::read_u16)? as usize;
            let text = field(cursor, len, |c| c.take(len))?;
            DetailValue::Text(String::from_utf8_lossy(text).into_owned())
        }
        TAG_U32 => DetailValue::Number(u64::from(field(cursor, 4, ByteCursor::read_u32)?)),
        TAG_U64 => DetailValue::Number(field(cursor, 8, ByteCursor::read_u64)?),
        _ => return Err(EntryError::Invalid("unknown value tag")),
    };

    Ok((name, value))
}

/// Decode `details_size` bytes of entries starting at `details_offset`.
///
/// Fails only if `details_offset` lies beyond the buffer. Truncated or
/// malformed entries end decoding; the map keeps what was decoded and
/// records the cause in [`DetailsMap::error`].
pub fn decode_details(
    buffer: &[u8],
    details_offset: u64,
    details_size: u64,
) -> Result<DetailsMap> {
    if details_offset > buffer.len() as u64 {
        return Err(Error::out_of_bounds(
            Region::Details,
            details_offset,
            buffer.len(),
        ));
    }

    let end = clamp_region(details_offset, details_size, buffer.len());
    let region = &buffer[details_offset as usize..end as usize];

    debug!(
        "Decoding details area at {} ({} bytes declared, {} available)",
        details_offset,
        details_size,
        region.len()
    );

    let mut cursor = ByteCursor::new(region, details_offset);
    let mut map = DetailsMap {
        region_size: details_size,
        ..DetailsMap::default()
    };

    while !cursor.is_empty() {
        let offset = cursor.position();
        let mut attempt = cursor.clone();

        match decode_entry(&mut attempt) {
            Ok((name, value)) => {
                trace!("Detail '{}' at {}", name, offset);
                map.entries.push(DetailEntry {
                    name,
                    value,
                    offset,
                });
                cursor = attempt;
            }
            Err(EntryError::Truncated { field_end }) => {
                map.error = Some(Error::truncated_details(
                    offset,
                    field_end - offset,
                    end - offset,
                ));
                break;
            }
            Err(EntryError::Invalid(details)) => {
                map.error = Some(Error::invalid_detail_entry(offset, details));
                break;
            }
        }
    }

    let available = region.len() as u64;
    if map.error.is_none() && available < details_size {
        map.error = Some(Error::truncated_details(end, details_size - available, 0));
    }
    map.unparsed_bytes = details_size - cursor.consumed() as u64;

    match &map.error {
        Some(err) => debug!("Details decode stopped: {}", err),
        None => debug!("Details decode complete: {} entries", map.entries.len()),
    }
    Ok(map)
}

/// Decode the details area located by a decoded header
pub fn decode_details_from_header(buffer: &[u8], header: &HeaderInfo) -> Result<DetailsMap> {
    decode_details(buffer, header.details_offset(), header.details_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_entry(name: &str, value: &str) -> Vec<u8> {
        let mut data = vec![name.len() as u8];
        data.extend_from_slice(name.as_bytes());
        data.push(TAG_TEXT);
        data.extend_from_slice(&(value.len() as u16).to_le_bytes());
        data.extend_from_slice(value.as_bytes());
        data
    }

    fn u32_entry(name: &str, value: u32) -> Vec<u8> {
        let mut data = vec![name.len() as u8];
        data.extend_from_slice(name.as_bytes());
        data.push(TAG_U32);
        data.extend_from_slice(&value.to_le_bytes());
        data
    }

    #[test]
    fn test_decode_entries() {
        let mut data = u32_entry("v", 1);
        data.extend(text_entry("tz", "utc"));
        assert_eq!(data.len(), 16);

        let map = decode_details(&data, 0, 16).unwrap();
        assert!(map.is_complete());
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("v"), Some(&DetailValue::Number(1)));
        assert_eq!(map.get("tz").and_then(DetailValue::as_str), Some("utc"));
        assert_eq!(map.entries[1].offset, 7);

        let names: Vec<_> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["v", "tz"]);
    }

    #[test]
    fn test_u64_value() {
        let mut data = vec![4];
        data.extend_from_slice(b"size");
        data.push(TAG_U64);
        data.extend_from_slice(&(1u64 << 40).to_le_bytes());

        let map = decode_details(&data, 0, data.len() as u64).unwrap();
        assert_eq!(map.get("size").and_then(DetailValue::as_u64), Some(1 << 40));
    }

    #[test]
    fn test_truncated_entry_keeps_prefix() {
        let mut data = u32_entry("a", 7);
        data.extend(text_entry("title", "long value"));
        let size = data.len() as u64 - 4;

        let map = decode_details(&data, 0, size).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a"), Some(&DetailValue::Number(7)));
        assert_eq!(map.unparsed_bytes, size - 7);
        assert_eq!(map.error, Some(Error::truncated_details(7, 19, 15)));
        assert!(map.check().is_err());
    }

    #[test]
    fn test_unknown_tag() {
        let mut data = u32_entry("a", 7);
        data.extend_from_slice(&[1, b'b', 0x7F, 0, 0]);

        let map = decode_details(&data, 0, data.len() as u64).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.unparsed_bytes, 5);
        assert_eq!(
            map.error,
            Some(Error::invalid_detail_entry(7, "unknown value tag"))
        );
    }

    #[test]
    fn test_empty_name() {
        let data = [0u8; 4];
        let map = decode_details(&data, 0, 4).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.unparsed_bytes, 4);
        assert!(matches!(map.error, Some(Error::InvalidDetailEntry { offset: 0, .. })));
    }

    #[test]
    fn test_clamped_region() {
        let data = u32_entry("n", 3);
        let map = decode_details(&data, 0, 20).unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map.unparsed_bytes, 13);
        assert_eq!(map.error, Some(Error::truncated_details(7, 13, 0)));
    }

    #[test]
    fn test_unbounded_size_counts_from_offset() {
        let map = decode_details(&[0u8; 4], 4, u64::MAX).unwrap();
        assert_eq!(map.unparsed_bytes, map.region_size);
        assert_eq!(map.error, Some(Error::truncated_details(4, u64::MAX, 0)));

        let mut data = vec![0xEE, 0xEE];
        data.extend(u32_entry("n", 3));
        let map = decode_details(&data, 2, u64::MAX).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.unparsed_bytes, u64::MAX - 7);
        assert_eq!(map.error, Some(Error::truncated_details(9, u64::MAX - 7, 0)));
    }

    #[test]
    fn test_out_of_bounds() {
        let err = decode_details(&[0u8; 8], 9, 1).unwrap_err();
        assert_eq!(err, Error::out_of_bounds(Region::Details, 9, 8));
    }

    #[test]
    fn test_empty_region() {
        let map = decode_details(&[0u8; 8], 8, 0).unwrap();
        assert!(map.is_empty());
        assert!(map.is_complete());
        assert!(map.check().is_ok());
    }

    #[test]
    fn test_lossy_text() {
        let mut data = vec![1, b'k', TAG_TEXT, 2, 0];
        data.extend_from_slice(&[0xFF, b'x']);

        let map = decode_details(&data, 0, data.len() as u64).unwrap();
        assert_eq!(map.get("k"), Some(&DetailValue::Text("\u{FFFD}x".to_string())));
    }
}
