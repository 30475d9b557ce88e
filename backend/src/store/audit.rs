//! Append-only action log.
//!
//! Timestamps are assigned by SQLite inside the INSERT, in UTC, so they are
//! taken while the writer holds the database lock: an entry that commits
//! later never carries an earlier timestamp than one already visible, and
//! local clock changes (DST) cannot move them backwards.

use crate::error::{StoreError, StoreResult};
use crate::store::{format_timestamp, parse_timestamp};
use chrono::NaiveDateTime;
use common::model::audit::AuditEntry;
use rusqlite::{params, Connection};

pub const AUDIT_TABLE: &str = "audit_log";

/// Same width as `TIMESTAMP_FORMAT`: `YYYY-MM-DD HH:MM:SS.SSS`.
const SQL_NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

pub(crate) fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            username TEXT NOT NULL,
            action TEXT NOT NULL,
            timestamp TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log (timestamp, id);",
    )?;
    Ok(())
}

/// Position of the last entry a reader has seen. Entries are ordered by
/// `(timestamp, id)`, so entries sharing a millisecond are still told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    pub timestamp: NaiveDateTime,
    pub id: i64,
}

impl From<&AuditEntry> for Watermark {
    fn from(entry: &AuditEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            id: entry.id,
        }
    }
}

pub struct AuditLog<'a> {
    conn: &'a Connection,
}

impl<'a> AuditLog<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Inserts one entry stamped with the current UTC time. `username` is
    /// stored as given and never updated afterwards.
    pub fn append(&self, user_id: i64, username: &str, action: &str) -> StoreResult<AuditEntry> {
        if action.trim().is_empty() {
            return Err(StoreError::InvalidRequest(
                "audit action must not be empty".into(),
            ));
        }
        let (id, stamp) = self.conn.query_row(
            &format!(
                "INSERT INTO audit_log (user_id, username, action, timestamp) \
                 VALUES (?1, ?2, ?3, {}) RETURNING id, timestamp",
                SQL_NOW
            ),
            params![user_id, username, action],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )?;
        Ok(AuditEntry {
            id,
            user_id,
            username: username.to_string(),
            action: action.to_string(),
            timestamp: parse_timestamp(&stamp)?,
        })
    }

    /// Entries strictly newer than `since` (everything when `None`), oldest
    /// first. Entries sharing a timestamp come back in insertion order.
    pub fn tail(&self, since: Option<NaiveDateTime>) -> StoreResult<Vec<AuditEntry>> {
        let watermark = since.map(format_timestamp).unwrap_or_default();
        self.collect(
            "SELECT id, user_id, username, action, timestamp FROM audit_log \
             WHERE timestamp > ?1 ORDER BY timestamp ASC, id ASC",
            params![watermark],
        )
    }

    /// Like `tail`, but resumes after an exact entry: later entries with the
    /// same timestamp are still returned.
    pub fn tail_after(&self, last: Option<Watermark>) -> StoreResult<Vec<AuditEntry>> {
        let Some(last) = last else {
            return self.tail(None);
        };
        self.collect(
            "SELECT id, user_id, username, action, timestamp FROM audit_log \
             WHERE timestamp > ?1 OR (timestamp = ?1 AND id > ?2) \
             ORDER BY timestamp ASC, id ASC",
            params![format_timestamp(last.timestamp), last.id],
        )
    }

    /// The `limit` newest entries, newest first.
    pub fn recent(&self, limit: usize) -> StoreResult<Vec<AuditEntry>> {
        self.collect(
            "SELECT id, user_id, username, action, timestamp FROM audit_log \
             ORDER BY timestamp DESC, id DESC LIMIT ?1",
            params![limit as i64],
        )
    }

    fn collect<P: rusqlite::Params>(&self, sql: &str, params: P) -> StoreResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let raw = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(id, user_id, username, action, timestamp)| {
                Ok(AuditEntry {
                    id,
                    user_id,
                    username,
                    action,
                    timestamp: parse_timestamp(&timestamp)?,
                })
            })
            .collect()
    }
}

/// Writes an entry with a chosen timestamp, for tests that need exact times.
#[cfg(test)]
pub(crate) fn insert_at(conn: &Connection, action: &str, at: NaiveDateTime) -> AuditEntry {
    conn.execute(
        "INSERT INTO audit_log (user_id, username, action, timestamp) VALUES (1, 'admin', ?1, ?2)",
        params![action, format_timestamp(at)],
    )
    .unwrap();
    AuditEntry {
        id: conn.last_insert_rowid(),
        user_id: 1,
        username: "admin".into(),
        action: action.into(),
        timestamp: at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreHandle;
    use chrono::{NaiveDate, Utc};

    fn t(sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, sec)
            .unwrap()
    }

    fn actions(entries: &[AuditEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.action.as_str()).collect()
    }

    #[test]
    fn tail_is_strictly_newer_and_ascending() {
        let handle = StoreHandle::open_in_memory("test1").unwrap();
        let conn = handle.connection();
        // Inserted out of order on purpose.
        insert_at(conn, "third", t(3));
        insert_at(conn, "first", t(1));
        insert_at(conn, "second", t(2));

        let audit = handle.audit();
        let newer = audit.tail(Some(t(1))).unwrap();
        assert_eq!(actions(&newer), vec!["second", "third"]);

        let last = newer.last().unwrap().timestamp;
        assert!(audit.tail(Some(last)).unwrap().is_empty());
    }

    #[test]
    fn append_stamps_current_utc_time() {
        let handle = StoreHandle::open_in_memory("test1").unwrap();
        let before = Utc::now().naive_utc() - chrono::Duration::seconds(1);
        let entry = handle.audit().append(2, "clerk", "Saved to Database").unwrap();
        let after = Utc::now().naive_utc() + chrono::Duration::seconds(1);

        assert!(entry.timestamp > before && entry.timestamp < after);
        let stored = handle.audit().tail(None).unwrap();
        assert_eq!(stored, vec![entry]);
    }

    #[test]
    fn appends_never_go_backwards() {
        let handle = StoreHandle::open_in_memory("test1").unwrap();
        let audit = handle.audit();
        let entries: Vec<_> = (0..20)
            .map(|i| audit.append(1, "admin", &format!("action {}", i)).unwrap())
            .collect();
        assert!(entries
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp && w[0].id < w[1].id));
        assert_eq!(audit.tail_after(None).unwrap(), entries);
    }

    #[test]
    fn cursor_keeps_entries_of_the_same_millisecond() {
        let handle = StoreHandle::open_in_memory("test1").unwrap();
        let conn = handle.connection();
        let first = insert_at(conn, "a", t(1));

        let audit = handle.audit();
        assert!(audit.tail_after(Some(Watermark::from(&first))).unwrap().is_empty());

        insert_at(conn, "b", t(1));
        let rest = audit.tail_after(Some(Watermark::from(&first))).unwrap();
        assert_eq!(actions(&rest), vec!["b"]);
    }

    #[test]
    fn sub_second_entries_are_not_lost() {
        let handle = StoreHandle::open_in_memory("test1").unwrap();
        let conn = handle.connection();
        let first = insert_at(conn, "a", t(1));
        let later = t(1) + chrono::Duration::milliseconds(250);
        insert_at(conn, "b", later);

        let rest = handle.audit().tail(Some(first.timestamp)).unwrap();
        assert_eq!(actions(&rest), vec!["b"]);
        assert_eq!(rest[0].timestamp, later);
    }

    #[test]
    fn empty_action_is_rejected() {
        let handle = StoreHandle::open_in_memory("test1").unwrap();
        assert!(handle.audit().append(1, "admin", "  ").is_err());
        assert!(handle.audit().tail(None).unwrap().is_empty());
    }

    #[test]
    fn recent_is_newest_first() {
        let handle = StoreHandle::open_in_memory("test1").unwrap();
        for sec in 1..=5 {
            insert_at(handle.connection(), &format!("action {}", sec), t(sec));
        }
        let recent = handle.audit().recent(2).unwrap();
        assert_eq!(actions(&recent), vec!["action 5", "action 4"]);
    }
}
