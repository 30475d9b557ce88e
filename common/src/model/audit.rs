use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One immutable line of the audit log.
///
/// `username` is copied at insert time and is never refreshed when the user
/// is later renamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub action: String,
    /// UTC, millisecond precision.
    pub timestamp: NaiveDateTime,
}
