//! Audit endpoints.
//!
//! - `tail`: `GET /audit?since=`, entries strictly newer than `since`.
//! - `record`: `POST /audit`, appends a client-reported action.
//! - `feed`: `GET /audit/feed`, entries already surfaced by the log poller.

pub(super) mod feed;
pub(super) mod record;
pub(super) mod tail;
