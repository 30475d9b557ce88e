use crate::model::record::RecordSet;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Summary of one day of backup rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub date: NaiveDate,
    pub rows: usize,
    pub last_taken_at: NaiveDateTime,
}

/// Backup rows of a single date, over every column the backup table knows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub records: RecordSet,
}

/// Outcome of a snapshot or import write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotReceipt {
    pub taken_at: NaiveDateTime,
    pub rows: usize,
    /// Rows of the same date removed by the write. Always zero for imports.
    pub replaced: usize,
}
