//! Content fingerprints for cheap change detection.
//!
//! Not a security primitive: MD5 is only used to tell whether a table
//! changed between two polls.

use common::model::record::RecordSet;
use md5::Context;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 16]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

/// Digest of column names and every cell, in order. Each piece is written
/// with its kind and byte length, so `["ab", "c"]` and `["a", "bc"]` (or the
/// integer `1` and the text `"1"`) never render the same.
pub fn fingerprint(records: &RecordSet) -> Fingerprint {
    let mut ctx = Context::new();
    ctx.consume(format!("columns:{}\n", records.columns.len()));
    for column in &records.columns {
        feed(&mut ctx, "column", column);
    }
    for row in &records.rows {
        ctx.consume(format!("row:{}\n", row.len()));
        for cell in row {
            feed(&mut ctx, cell.kind(), &cell.to_string());
        }
    }
    Fingerprint(ctx.finalize().0)
}

fn feed(ctx: &mut Context, tag: &str, text: &str) {
    ctx.consume(format!("{}:{}:", tag, text.len()));
    ctx.consume(text.as_bytes());
    ctx.consume(b"\n");
}

/// Last fingerprint seen per data source.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    last_seen: HashMap<String, Fingerprint>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `current` for `source` and reports whether it differs from
    /// the previous value. The first observation of a source always counts
    /// as a change.
    pub fn observe(&mut self, source: &str, current: Fingerprint) -> bool {
        match self.last_seen.get(source) {
            Some(previous) if *previous == current => false,
            _ => {
                self.last_seen.insert(source.to_string(), current);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::record::CellValue;

    fn one_row(value: CellValue) -> RecordSet {
        RecordSet::with_rows(vec!["col1".into()], vec![vec![value]])
    }

    #[test]
    fn stable_for_unchanged_content() {
        let set = one_row("a".into());
        assert_eq!(fingerprint(&set), fingerprint(&set.clone()));
    }

    #[test]
    fn any_cell_change_changes_digest() {
        assert_ne!(fingerprint(&one_row("a".into())), fingerprint(&one_row("b".into())));
        assert_ne!(
            fingerprint(&one_row(CellValue::Integer(1))),
            fingerprint(&one_row("1".into()))
        );
        assert_ne!(
            fingerprint(&one_row(CellValue::Null)),
            fingerprint(&one_row("".into()))
        );
    }

    #[test]
    fn cell_boundaries_are_unambiguous() {
        let a = RecordSet::with_rows(
            vec!["x".into(), "y".into()],
            vec![vec!["ab".into(), "c".into()]],
        );
        let b = RecordSet::with_rows(
            vec!["x".into(), "y".into()],
            vec![vec!["a".into(), "bc".into()]],
        );
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn column_order_matters() {
        let a = RecordSet::new(vec!["x".into(), "y".into()]);
        let b = RecordSet::new(vec!["y".into(), "x".into()]);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn empty_table_differs_from_one_row() {
        let empty = RecordSet::default();
        assert_ne!(fingerprint(&empty), fingerprint(&one_row("a".into())));
    }

    #[test]
    fn tracker_reports_first_sight_and_changes_only() {
        let mut tracker = ChangeTracker::new();
        let a = fingerprint(&one_row("a".into()));
        let b = fingerprint(&one_row("b".into()));

        assert!(tracker.observe("test1", a));
        assert!(!tracker.observe("test1", a));
        assert!(tracker.observe("test2", a));
        assert!(tracker.observe("test1", b));
        assert!(!tracker.observe("test1", b));
        assert!(!tracker.observe("test2", a));
        assert_eq!(fingerprint(&RecordSet::default()).to_string().len(), 32);
    }
}
