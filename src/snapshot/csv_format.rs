//! CSV encoding for snapshot and comparison files.

use std::path::Path;

use crate::error::{InventoryError, Result};
use super::SnapshotRow;

pub const SNAPSHOT_HEADER: [&str; 4] = ["SKU", "Name", "Stock", "Price"];

pub const COMPARISON_HEADER: [&str; 9] = [
    "Previous SKU",
    "Previous Name",
    "Previous Stock",
    "Previous Price",
    "Current SKU",
    "Current Name",
    "Current Stock",
    "Current Price",
    "Status",
];

fn writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| InventoryError::Csv(csv::Error::from(e.into_error())))
}

/// Serialize rows in the order given, header first.
pub fn render_snapshot<'a>(rows: impl IntoIterator<Item = &'a SnapshotRow>) -> Result<Vec<u8>> {
    let mut wtr = writer();
    wtr.write_record(SNAPSHOT_HEADER)?;
    for row in rows {
        wtr.write_record(row.fields())?;
    }
    finish(wtr)
}

/// Serialize a comparison table. Each record is previous, current, status.
pub fn render_comparison<'a>(
    rows: impl IntoIterator<Item = (&'a SnapshotRow, &'a SnapshotRow, &'a str)>,
) -> Result<Vec<u8>> {
    let mut wtr = writer();
    wtr.write_record(COMPARISON_HEADER)?;
    for (previous, current, status) in rows {
        let mut record: Vec<&str> = Vec::with_capacity(COMPARISON_HEADER.len());
        record.extend(previous.fields());
        record.extend(current.fields());
        record.push(status);
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Parse a snapshot file. The header must match exactly; data lines with
/// fewer than four fields, blank lines included, become empty placeholders so
/// later rows keep their position. Fields past the fourth are ignored.
pub fn parse_snapshot(bytes: &[u8], path: &Path) -> Result<Vec<SnapshotRow>> {
    let malformed = |reason: String| InventoryError::MalformedSnapshot {
        path: path.to_path_buf(),
        reason,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    if blank_lines_at(bytes, 0) > 0 {
        return Err(malformed("blank line before header".to_string()));
    }

    let mut record = csv::StringRecord::new();
    if !rdr.read_record(&mut record).map_err(|e| malformed(e.to_string()))? {
        return Err(malformed("file is empty".to_string()));
    }
    let header: Vec<&str> = record.iter().map(|f| f.trim_start_matches('\u{feff}')).collect();
    if header != SNAPSHOT_HEADER {
        return Err(malformed(format!("unexpected header '{}'", header.join(","))));
    }

    let mut rows = Vec::new();
    loop {
        // the reader skips empty lines, so count them from the raw bytes
        let consumed = rdr.position().byte() as usize;
        rows.extend((0..blank_lines_at(bytes, consumed)).map(|_| SnapshotRow::default()));

        if !rdr.read_record(&mut record).map_err(|e| malformed(e.to_string()))? {
            break;
        }
        if record.len() < SNAPSHOT_HEADER.len() {
            rows.push(SnapshotRow::default());
        } else {
            rows.push(SnapshotRow::new(&record[0], &record[1], &record[2], &record[3]));
        }
    }
    Ok(rows)
}

/// Number of empty lines starting at byte `from`, where `from` is just past a
/// record terminator (or the start of input).
fn blank_lines_at(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    // a CRLF terminator may have been consumed only up to the CR
    if i > 0 && bytes.get(i - 1) == Some(&b'\r') && bytes.get(i) == Some(&b'\n') {
        i += 1;
    }

    let mut count = 0;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => i += 2,
            b'\r' | b'\n' => i += 1,
            _ => break,
        }
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> &'static Path {
        Path::new("test.csv")
    }

    #[test]
    fn render_writes_header_and_rows() {
        let rows = vec![
            SnapshotRow::new("A", "Alpha", "5", "10"),
            SnapshotRow::new("B", "Beans, dark", "2", "20.50"),
        ];
        let bytes = render_snapshot(&rows).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "SKU,Name,Stock,Price\nA,Alpha,5,10\nB,\"Beans, dark\",2,20.50\n"
        );
    }

    #[test]
    fn empty_product_list_is_header_only() {
        let bytes = render_snapshot(&[]).unwrap();
        assert_eq!(bytes, b"SKU,Name,Stock,Price\n");
        assert!(parse_snapshot(&bytes, path()).unwrap().is_empty());
    }

    #[test]
    fn short_rows_become_placeholders_in_place() {
        let input = b"SKU,Name,Stock,Price\nA,Alpha,5,10\nbroken,line\nC,Cups,1,30,extra\n";
        let rows = parse_snapshot(input, path()).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], SnapshotRow::new("C", "Cups", "1", "30"));
    }

    #[test]
    fn blank_lines_keep_their_position() {
        let input = b"SKU,Name,Stock,Price\nA,Alpha,5,10\n\nC,Cups,1,30\n";
        let rows = parse_snapshot(input, path()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], SnapshotRow::new("A", "Alpha", "5", "10"));
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], SnapshotRow::new("C", "Cups", "1", "30"));
    }

    #[test]
    fn blank_lines_with_crlf_endings() {
        let input = b"SKU,Name,Stock,Price\r\n\r\nA,Alpha,5,10\r\nB,Beta,2,20\r\n";
        let rows = parse_snapshot(input, path()).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_empty());
        assert_eq!(rows[1], SnapshotRow::new("A", "Alpha", "5", "10"));
        assert_eq!(rows[2], SnapshotRow::new("B", "Beta", "2", "20"));
    }

    #[test]
    fn quoted_newline_is_not_a_blank_line() {
        let input = b"SKU,Name,Stock,Price\nA,\"Two\n\nlines\",5,10\nB,Beta,2,20\n";
        let rows = parse_snapshot(input, path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Two\n\nlines");
        assert_eq!(rows[1].sku, "B");
    }

    #[test]
    fn trailing_blank_line_is_a_placeholder() {
        let rows = parse_snapshot(b"SKU,Name,Stock,Price\nA,Alpha,5,10\n\n", path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].is_empty());
    }

    #[test]
    fn blank_line_before_header_is_malformed() {
        let err = parse_snapshot(b"\nSKU,Name,Stock,Price\n", path()).unwrap_err();
        assert!(matches!(err, InventoryError::MalformedSnapshot { .. }));
    }

    #[test]
    fn wrong_header_is_malformed() {
        let err = parse_snapshot(b"id,title\n1,x\n", path()).unwrap_err();
        assert!(matches!(err, InventoryError::MalformedSnapshot { .. }));
    }

    #[test]
    fn empty_file_is_malformed() {
        assert!(matches!(
            parse_snapshot(b"", path()),
            Err(InventoryError::MalformedSnapshot { .. })
        ));
    }

    #[test]
    fn comparison_header_and_status_column() {
        let prev = SnapshotRow::new("A", "Alpha", "5", "10");
        let curr = SnapshotRow::default();
        let bytes = render_comparison([(&prev, &curr, "REMOVED")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), COMPARISON_HEADER.join(","));
        assert_eq!(lines.next().unwrap(), "A,Alpha,5,10,,,,,REMOVED");
    }
}
