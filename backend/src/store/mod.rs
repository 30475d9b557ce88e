//! Per-source SQLite persistence.
//!
//! Every data source lives in its own database file holding three tables:
//! - `daily_data`: the working table, replaced wholesale by `RecordStore::replace_all`.
//! - `backup_data`: dated snapshots written by `BackupEngine`.
//! - `audit_log`: append-only action log read through `AuditLog`.
//!
//! A `StoreHandle` owns exactly one connection. Request handlers and background
//! tasks each open their own handle, and all writers to a table serialize
//! through SQLite transactions. WAL mode keeps readers from blocking on the
//! single writer.

pub mod audit;
pub mod backup;
pub mod fingerprint;
pub mod query;
pub mod records;
pub mod report;
mod schema;

use crate::error::{StoreError, StoreResult};
use audit::AuditLog;
use backup::BackupEngine;
use chrono::NaiveDateTime;
use records::RecordStore;
use rusqlite::{params, Connection};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixed-width so text comparison in SQL matches chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub struct StoreHandle {
    conn: Connection,
    source: String,
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl StoreHandle {
    pub fn open(path: &Path, source: &str) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::prepare(conn, source)
    }

    pub fn open_in_memory(source: &str) -> StoreResult<Self> {
        Self::prepare(Connection::open_in_memory()?, source)
    }

    fn prepare(conn: Connection, source: &str) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        log::debug!("Opened store '{}' (journal_mode={})", source, mode);
        audit::init_schema(&conn)?;
        Ok(Self {
            conn,
            source: source.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn records(&mut self) -> RecordStore<'_> {
        RecordStore::new(&mut self.conn)
    }

    pub fn backups(&mut self) -> BackupEngine<'_> {
        BackupEngine::new(&mut self.conn)
    }

    pub fn audit(&self) -> AuditLog<'_> {
        AuditLog::new(&self.conn)
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Writes a consistent copy of the whole database to `dest`.
    pub fn export_to(&self, dest: &Path) -> StoreResult<()> {
        if dest.exists() {
            return Err(StoreError::InvalidRequest(format!(
                "export target {} already exists",
                dest.display()
            )));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        self.conn
            .execute("VACUUM INTO ?1", params![dest.to_string_lossy()])?;
        log::info!("Exported store '{}' to {}", self.source, dest.display());
        Ok(())
    }
}

pub(crate) fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, optionally with fractional seconds and
/// with `T` as the separator (the JSON form of `NaiveDateTime`).
pub fn parse_timestamp(raw: &str) -> StoreResult<NaiveDateTime> {
    let raw = raw.trim();
    let normalized = raw.replacen('T', " ", 1);
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S"))
        .map_err(|_| {
            StoreError::InvalidRequest(format!(
                "timestamp '{}' is not in YYYY-MM-DD HH:MM:SS format",
                raw
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use common::model::record::RecordSet;

    #[test]
    fn timestamps_round_trip_with_and_without_fraction() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_milli_opt(9, 30, 0, 120)
            .unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(at)).unwrap(), at);
        assert_eq!(
            parse_timestamp("2024-01-01 09:30:00").unwrap(),
            at.with_nanosecond(0).unwrap()
        );
        assert_eq!(parse_timestamp("2024-01-01T09:30:00.120").unwrap(), at);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn export_copies_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut handle = StoreHandle::open(&dir.path().join("test1.db"), "test1").unwrap();
        handle
            .records()
            .replace_all(&RecordSet::with_rows(
                vec!["col1".into()],
                vec![vec!["a".into()]],
            ))
            .unwrap();

        let dest = dir.path().join("exports").join("copy.db");
        handle.export_to(&dest).unwrap();
        let mut copy = StoreHandle::open(&dest, "copy").unwrap();
        assert_eq!(copy.records().load().unwrap().len(), 1);

        assert!(matches!(
            handle.export_to(&dest),
            Err(StoreError::InvalidRequest(_))
        ));
    }
}
