//! Closed lookup table from record type code to display name.
//!
//! The table is only used to label records. Unknown codes scan exactly like
//! known ones.

/// Numeric record type tag
pub type RecordTypeCode = u8;

/// Label used for codes without a table entry
pub const UNKNOWN_LABEL: &str = "unknown";

/// Defined record types, in code order
const KNOWN_TYPES: &[(RecordTypeCode, &str)] = &[
    (0x01, "Metadata"),
    (0x02, "Index"),
    (0x03, "Data"),
    (0x04, "Text"),
    (0x05, "Image"),
    (0x06, "Link"),
    (0x07, "Checksum"),
    (0x08, "Padding"),
    (0x10, "Extension"),
    (0xFF, "End"),
];

static TABLE: [Option<&str>; 256] = build_table(KNOWN_TYPES);

const fn build_table(pairs: &[(RecordTypeCode, &'static str)]) -> [Option<&'static str>; 256] {
    let mut table = [None; 256];
    let mut i = 0;
    while i < pairs.len() {
        table[pairs[i].0 as usize] = Some(pairs[i].1);
        i += 1;
    }
    table
}

/// Lookup functions over the static record type table
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordTypeTable;

impl RecordTypeTable {
    /// Returns the display name for `code`, if it is a defined type
    pub fn name(code: RecordTypeCode) -> Option<&'static str> {
        TABLE[code as usize]
    }

    /// Returns the display name for `code`, or [`UNKNOWN_LABEL`]
    pub fn label(code: RecordTypeCode) -> &'static str {
        Self::name(code).unwrap_or(UNKNOWN_LABEL)
    }

    /// Returns true if `code` has a table entry
    pub fn is_known(code: RecordTypeCode) -> bool {
        Self::name(code).is_some()
    }

    /// Iterates the defined `(code, name)` pairs in code order
    pub fn known() -> impl Iterator<Item = (RecordTypeCode, &'static str)> {
        KNOWN_TYPES.iter().copied()
    }
}
