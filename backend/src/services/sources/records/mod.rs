//! Working-table endpoints.
//!
//! - `get`: `GET /records`, the whole working table.
//! - `save`: `PUT /records`, replaces the working table in one transaction.
//! - `upload`: `PUT /records/upload`, the same from a CSV file.
//! - `view`: `GET /view`, the last view published by the refresh watcher.
//! - `export`: `GET /records/export`, the working table as CSV.
//! - `report`: `GET /report?start=&end=`, per-column summary.
//! - `query`: `POST /query`, read-only SQL console.

pub(super) mod export;
pub(super) mod get;
pub(super) mod query;
pub(super) mod report;
pub(super) mod save;
pub(super) mod upload;
pub(super) mod view;

use crate::services::Action;

const SAVE: Action = Action {
    done: "Saved to Database",
    attempted: "Save Database",
};
