//! CSV interchange for spreadsheet import and export.
//!
//! The rest of the crate only deals in `RecordSet`s; this is the one place
//! that knows about delimited text.

use crate::error::{StoreError, StoreResult};
use common::model::record::{CellValue, RecordSet};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::io::Write;

/// Picks whichever of `,` `;` tab or `|` occurs most in the header line,
/// preferring the earlier one on ties.
fn detect_delimiter(header_line: &str) -> u8 {
    [b',', b';', b'\t', b'|']
        .iter()
        .rev()
        .max_by_key(|&&d| header_line.matches(d as char).count())
        .copied()
        .unwrap_or(b',')
}

fn normalize_cell(cell: &str) -> String {
    cell.replace('\u{00A0}', " ").trim().to_string()
}

/// Empty cells become null, then integer, then finite real, else text.
fn parse_cell(raw: &str) -> CellValue {
    let cell = normalize_cell(raw);
    if cell.is_empty() {
        CellValue::Null
    } else if let Ok(v) = cell.parse::<i64>() {
        CellValue::Integer(v)
    } else if let Some(v) = cell.parse::<f64>().ok().filter(|v| v.is_finite()) {
        CellValue::Real(v)
    } else {
        CellValue::Text(cell)
    }
}

pub fn records_from_csv(data: &[u8]) -> StoreResult<RecordSet> {
    let text = std::str::from_utf8(data)
        .map_err(|_| StoreError::Shape("CSV file is not valid UTF-8".into()))?;
    let text = text.trim_start_matches('\u{feff}');
    let header_line = text.lines().next().unwrap_or_default();
    if header_line.trim().is_empty() {
        return Err(StoreError::Shape("CSV file has no header row".into()));
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(detect_delimiter(header_line))
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(normalize_cell).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(parse_cell).collect());
    }
    Ok(RecordSet::with_rows(columns, rows))
}

pub fn records_to_csv<W: Write>(records: &RecordSet, out: W) -> StoreResult<()> {
    let mut writer = WriterBuilder::new().from_writer(out);
    writer.write_record(&records.columns)?;
    for row in &records.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicolon_file_with_mixed_cells() {
        let data = "\u{feff}item; qty ;price\nbolt;2;1.5\nnut;;x\n";
        let records = records_from_csv(data.as_bytes()).unwrap();
        assert_eq!(records.columns, vec!["item", "qty", "price"]);
        assert_eq!(
            records.rows,
            vec![
                vec!["bolt".into(), 2i64.into(), 1.5.into()],
                vec!["nut".into(), CellValue::Null, "x".into()],
            ]
        );
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = records_from_csv(b"a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, StoreError::Csv(_)));
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(matches!(records_from_csv(b""), Err(StoreError::Shape(_))));
    }

    #[test]
    fn export_quotes_delimiters() {
        let records = RecordSet::with_rows(
            vec!["name".into(), "qty".into()],
            vec![vec!["a, b".into(), 3i64.into()], vec![CellValue::Null, 1.5.into()]],
        );
        let mut out = Vec::new();
        records_to_csv(&records, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "name,qty\n\"a, b\",3\n,1.5\n");
    }
}
