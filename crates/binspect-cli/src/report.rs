//! Plain-text rendering of decoder output.

use binspect_core::{DetailsMap, HeaderInfo, RecordTypeCode, RecordTypeTable, Result, ScanResult};
use std::collections::BTreeMap;
use std::io::{self, Write};

pub(crate) fn write_file_line<W: Write>(out: &mut W, path: &std::path::Path) -> io::Result<()> {
    writeln!(out, "file \"{}\"", path.display())
}

pub(crate) fn write_header<W: Write>(out: &mut W, header: &Result<HeaderInfo>) -> io::Result<()> {
    writeln!(out, "  Header Info:")?;
    let header = match header {
        Ok(header) => header,
        Err(e) => return writeln!(out, "    error: {}", e),
    };

    writeln!(out, "    file size = {} B", header.file_size)?;
    writeln!(out, "    records area size = {} B", header.records_size)?;
    writeln!(out, "    details area size = {} B", header.details_size)?;
    writeln!(out, "    version: {}", header.version)?;
    if let Err(e) = header.check_consistency() {
        writeln!(out, "    warning: {}", e)?;
    }
    Ok(())
}

pub(crate) fn write_records<W: Write>(
    out: &mut W,
    scan: &Result<ScanResult<'_>>,
) -> io::Result<()> {
    writeln!(out, "  Records Info:")?;
    let stats = match scan {
        Ok(scan) => &scan.stats,
        Err(e) => return writeln!(out, "    error: {}", e),
    };

    writeln!(out, "    records area size = {} B", stats.records_area_size)?;
    writeln!(out, "    record count = {} Records", stats.record_count)?;
    writeln!(out, "    invalid records = {}", stats.invalid_records)?;
    if let Some(stop) = &stats.stop {
        writeln!(
            out,
            "    scan stopped at offset {} ({} of {} B unscanned): {}",
            stop.offset,
            stats.unscanned_bytes(),
            stats.nominal_size,
            stop.reason
        )?;
    }
    writeln!(out, "    Records in File:")?;
    write_type_count_table(out, &stats.type_count, "      ")
}

/// One row per type code, with the parenthesised names padded to a common width
fn write_type_count_table<W: Write>(
    out: &mut W,
    type_count: &BTreeMap<RecordTypeCode, usize>,
    indent: &str,
) -> io::Result<()> {
    let width = type_count
        .keys()
        .map(|&code| RecordTypeTable::label(code).len() + 2)
        .max()
        .unwrap_or(0);

    for (&code, count) in type_count {
        let name = format!("({})", RecordTypeTable::label(code));
        writeln!(out, "{}0x{:02x} {:<width$} = {}", indent, code, name, count)?;
    }
    Ok(())
}

pub(crate) fn write_details<W: Write>(out: &mut W, details: &Result<DetailsMap>) -> io::Result<()> {
    writeln!(out, "  Details:")?;
    let details = match details {
        Ok(details) => details,
        Err(e) => return writeln!(out, "    error: {}", e),
    };

    for (name, value) in details.iter() {
        writeln!(out, "    {} = {}", name, value)?;
    }
    if let Some(e) = &details.error {
        writeln!(out, "    warning: {} ({} B unparsed)", e, details.unparsed_bytes)?;
    }
    Ok(())
}

pub(crate) fn write_distribution<W: Write>(
    out: &mut W,
    scan: &Result<ScanResult<'_>>,
) -> io::Result<()> {
    writeln!(out, "  Record Distribution:")?;
    let scan = match scan {
        Ok(scan) => scan,
        Err(e) => return writeln!(out, "    error: {}", e),
    };

    let codes: Vec<String> = scan
        .records
        .iter()
        .map(|record| format!("0x{:02x}", record.record_type))
        .collect();
    writeln!(out, "    [{}]", codes.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use binspect_core::{decode_details, decode_header, scan_records, Error};

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_type_count_alignment() {
        let counts = BTreeMap::from([(0x01, 2), (0x02, 1), (0x42, 5)]);
        let text = render(|out| write_type_count_table(out, &counts, "  "));

        assert_eq!(
            text,
            "  0x01 (Metadata) = 2\n  0x02 (Index)    = 1\n  0x42 (unknown)  = 5\n"
        );
    }

    #[test]
    fn test_header_error() {
        let header = decode_header(&[0u8; 3]);
        let text = render(|out| write_header(out, &header));
        assert!(text.contains("error: truncated header"));
    }

    #[test]
    fn test_inconsistent_header_warning() {
        let mut data = vec![0u8; 16];
        data[0] = 8;
        let text = render(|out| write_header(out, &decode_header(&data)));
        assert!(text.contains("file size = 8 B"));
        assert!(text.contains("warning: inconsistent header"));
    }

    #[test]
    fn test_records_stop_line() {
        let data = [0x01, 0x09, 0, 0, 0, 0xAA];
        let scan = scan_records(&data, 0, 6);
        let text = render(|out| write_records(out, &scan));

        assert!(text.contains("record count = 0 Records"));
        assert!(text.contains("invalid records = 1"));
        assert!(text.contains("scan stopped at offset 0 (6 of 6 B unscanned)"));
    }

    #[test]
    fn test_details_and_distribution_errors() {
        let details = decode_details(&[], 4, 0);
        let text = render(|out| write_details(out, &details));
        assert!(text.contains("error: details area starts at offset 4"));

        let scan: Result<ScanResult<'_>> = Err(Error::truncated_header(16, 2));
        let text = render(|out| write_distribution(out, &scan));
        assert!(text.contains("error: truncated header"));
    }
}
