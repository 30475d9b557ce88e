//! Dated snapshots of the working table.
//!
//! `backup_data` holds every column ever snapshotted (TEXT, widened on
//! demand, never narrowed) plus `snapshot_taken_at`. Automated snapshots are
//! idempotent per calendar day; historical imports only ever append.

use crate::error::{StoreError, StoreResult};
use crate::store::records::read_working_table;
use crate::store::schema::{
    insert_rows, quote_ident, select_cells, table_columns, table_exists, user_columns,
    validate_columns, ColumnDescriptor, ROW_ID, SNAPSHOT_TAKEN_AT,
};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use common::model::record::RecordSet;
use common::model::snapshot::{Snapshot, SnapshotReceipt, SnapshotSummary};
use rusqlite::{params, Connection};
use std::collections::HashSet;

pub const BACKUP_TABLE: &str = "backup_data";

const SNAPSHOT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct BackupEngine<'a> {
    conn: &'a mut Connection,
}

impl<'a> BackupEngine<'a> {
    pub(crate) fn new(conn: &'a mut Connection) -> Self {
        Self { conn }
    }

    /// Writes `records` as the snapshot for `as_of`'s date, replacing any
    /// rows already tagged with that date. Delete and insert share one
    /// transaction, so readers see either the old day or the new one.
    pub fn snapshot_now(
        &mut self,
        records: &RecordSet,
        as_of: NaiveDateTime,
    ) -> StoreResult<SnapshotReceipt> {
        validate_columns(&records.columns)?;
        let taken_at = as_of.format(SNAPSHOT_FORMAT).to_string();
        let day = as_of.date().to_string();

        let tx = self.conn.transaction()?;
        widen(&tx, &records.columns)?;
        let replaced = tx.execute(
            &format!(
                "DELETE FROM {} WHERE date({}) = ?1",
                quote_ident(BACKUP_TABLE),
                quote_ident(SNAPSHOT_TAKEN_AT)
            ),
            params![day],
        )?;
        let rows = insert_rows(
            &tx,
            BACKUP_TABLE,
            &records.columns,
            &records.rows,
            Some((SNAPSHOT_TAKEN_AT, &taken_at)),
        )?;
        tx.commit()?;

        log::info!(
            "Snapshot for {} written: {} rows ({} replaced)",
            day,
            rows,
            replaced
        );
        Ok(SnapshotReceipt {
            taken_at: as_of.with_nanosecond(0).unwrap_or(as_of),
            rows,
            replaced,
        })
    }

    /// Snapshots whatever the working table currently holds.
    pub fn snapshot_working_table(&mut self, as_of: NaiveDateTime) -> StoreResult<SnapshotReceipt> {
        let records = read_working_table(self.conn, None)?;
        self.snapshot_now(&records, as_of)
    }

    /// Appends `records` tagged with a caller-chosen time. Rows already
    /// tagged with the same date are kept.
    pub fn import_snapshot(
        &mut self,
        records: &RecordSet,
        as_of: NaiveDateTime,
    ) -> StoreResult<SnapshotReceipt> {
        validate_columns(&records.columns)?;
        let taken_at = as_of.format(SNAPSHOT_FORMAT).to_string();

        let tx = self.conn.transaction()?;
        widen(&tx, &records.columns)?;
        let rows = insert_rows(
            &tx,
            BACKUP_TABLE,
            &records.columns,
            &records.rows,
            Some((SNAPSHOT_TAKEN_AT, &taken_at)),
        )?;
        tx.commit()?;

        log::info!("Imported {} historical rows tagged {}", rows, taken_at);
        Ok(SnapshotReceipt {
            taken_at: as_of.with_nanosecond(0).unwrap_or(as_of),
            rows,
            replaced: 0,
        })
    }

    /// One entry per snapshot date, newest first.
    pub fn list_snapshots(&self) -> StoreResult<Vec<SnapshotSummary>> {
        if !table_exists(self.conn, BACKUP_TABLE)? {
            return Ok(Vec::new());
        }
        let taken = quote_ident(SNAPSHOT_TAKEN_AT);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT date({taken}) AS day, COUNT(*), MAX({taken}) FROM {} \
             WHERE date({taken}) IS NOT NULL GROUP BY day ORDER BY day DESC",
            quote_ident(BACKUP_TABLE)
        ))?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(day, rows, last)| {
                Ok(SnapshotSummary {
                    date: parse_day(&day)?,
                    rows: rows as usize,
                    last_taken_at: NaiveDateTime::parse_from_str(&last, SNAPSHOT_FORMAT)
                        .map_err(|_| {
                            StoreError::Shape(format!("bad snapshot timestamp '{}'", last))
                        })?,
                })
            })
            .collect()
    }

    /// Rows of the given date over every backup column, in insertion order.
    /// Columns added after those rows were written read as null.
    pub fn load_snapshot(&self, date: NaiveDate) -> StoreResult<Option<Snapshot>> {
        if !table_exists(self.conn, BACKUP_TABLE)? {
            return Ok(None);
        }
        let columns = user_columns(self.conn, BACKUP_TABLE)?;
        let mut select: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        if select.is_empty() {
            select.push("NULL".to_string());
        }
        let rows = select_cells(
            self.conn,
            &format!(
                "SELECT {} FROM {} WHERE date({}) = ?1 ORDER BY {}",
                select.join(", "),
                quote_ident(BACKUP_TABLE),
                quote_ident(SNAPSHOT_TAKEN_AT),
                quote_ident(ROW_ID)
            ),
            columns.len(),
            params![date.to_string()],
        )?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(Snapshot {
            date,
            records: RecordSet::with_rows(columns, rows),
        }))
    }
}

/// Creates `backup_data` on first use and adds any column it does not know
/// yet. Existing columns are never dropped or retyped.
fn widen(conn: &Connection, columns: &[String]) -> StoreResult<()> {
    let existing = table_columns(conn, BACKUP_TABLE)?;
    if existing.is_empty() {
        let mut definitions = vec![format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT",
            quote_ident(ROW_ID)
        )];
        definitions.extend(columns.iter().map(|c| ColumnDescriptor::text(c).definition()));
        definitions.push(format!("{} TEXT", quote_ident(SNAPSHOT_TAKEN_AT)));
        conn.execute(
            &format!(
                "CREATE TABLE {} ({})",
                quote_ident(BACKUP_TABLE),
                definitions.join(", ")
            ),
            [],
        )?;
        return Ok(());
    }

    let known: HashSet<String> = existing.iter().map(|c| c.to_lowercase()).collect();
    for column in columns.iter().filter(|c| !known.contains(&c.to_lowercase())) {
        log::info!("Widening {} with column '{}'", BACKUP_TABLE, column);
        conn.execute(
            &format!(
                "ALTER TABLE {} ADD COLUMN {}",
                quote_ident(BACKUP_TABLE),
                ColumnDescriptor::text(column).definition()
            ),
            [],
        )?;
    }
    Ok(())
}

fn parse_day(raw: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| StoreError::Shape(format!("bad snapshot date '{}'", raw)))
}
