//! Backup endpoints.
//!
//! - `snapshot`: `POST /backups`, snapshot of the working table for today.
//! - `import`: `POST /backups/import`, historical rows as JSON.
//! - `upload`: `POST /backups/upload`, historical rows as a CSV file.
//! - `list`: `GET /backups`, one summary per snapshot date.
//! - `get`: `GET /backups/{date}`, the rows of one date.
//! - `status`: `GET /backups/status`, last result of the daily backup job.
//! - `export`: `POST /backups/export`, consistent copy of the whole database.

pub(super) mod export;
pub(super) mod get;
pub(super) mod import;
pub(super) mod list;
pub(super) mod snapshot;
pub(super) mod status;
pub(super) mod upload;

use crate::error::{StoreError, StoreResult};
use crate::services::Action;
use chrono::{NaiveDate, NaiveDateTime};

const IMPORT: Action = Action {
    done: "Imported Data",
    attempted: "Import Data",
};

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or a bare date
/// (taken as midnight).
fn parse_taken_at(raw: &str) -> StoreResult<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| StoreError::InvalidRequest(format!("bad snapshot time '{}'", raw)))
}
