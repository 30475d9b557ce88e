//! Shared state fed by the long-running background tasks.
//!
//! Each task reports over an MPSC channel and a single updater task owns the
//! writes, so background work never holds a lock across a tick:
//! - `JobsState` / `start_job_updater`: last status of every daily backup job,
//!   read by `GET /api/sources/{source}/backups/status`.
//! - `AuditFeed` / `start_feed_renderer`: audit entries surfaced by the log
//!   pollers, logged as they arrive and kept in a bounded per-source buffer.
//! - `DataViews`: latest working-table view per source, replaced only when
//!   the refresh watcher sees a new fingerprint.

use crate::job_controller::log_poller::AuditBatch;
use chrono::{Local, NaiveDateTime, TimeZone};
use common::jobs::JobStatus;
use common::model::audit::AuditEntry;
use common::model::record::RecordSet;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Entries kept per source in the audit feed.
pub const FEED_CAPACITY: usize = 500;

#[derive(Clone)]
pub struct JobsState {
    /// Job id (`backup:<source>`) to its latest status.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,
    pub tx: mpsc::Sender<JobUpdate>,
}

#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobsState {
    pub fn new(tx: mpsc::Sender<JobUpdate>) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
        }
    }
}

/// Applies job updates until every sender is dropped.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.job_id.clone(), update.status);
    }
}

#[derive(Clone, Default)]
pub struct AuditFeed {
    entries: Arc<RwLock<HashMap<String, VecDeque<AuditEntry>>>>,
}

impl AuditFeed {
    pub async fn push(&self, batch: AuditBatch) {
        let mut feeds = self.entries.write().await;
        let feed = feeds.entry(batch.source).or_default();
        for entry in batch.entries {
            if feed.len() == FEED_CAPACITY {
                feed.pop_front();
            }
            feed.push_back(entry);
        }
    }

    /// Buffered entries for `source`, oldest first.
    pub async fn entries(&self, source: &str) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .get(source)
            .map(|feed| feed.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Renders every batch the pollers deliver: one log line per entry under the
/// `audit` target, in local time, then into the feed buffer.
pub async fn start_feed_renderer(feed: AuditFeed, mut rx: mpsc::Receiver<AuditBatch>) {
    while let Some(batch) = rx.recv().await {
        for entry in &batch.entries {
            log::info!(
                target: "audit",
                "[{}] {}: USER ID:{} ({}) {}",
                batch.source,
                Local
                    .from_utc_datetime(&entry.timestamp)
                    .format("%Y-%m-%d %H:%M:%S"),
                entry.user_id,
                entry.username,
                entry.action
            );
        }
        feed.push(batch).await;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DataView {
    pub fingerprint: String,
    pub refreshed_at: NaiveDateTime,
    pub records: RecordSet,
}

#[derive(Clone, Default)]
pub struct DataViews {
    views: Arc<RwLock<HashMap<String, DataView>>>,
}

impl DataViews {
    pub async fn publish(&self, source: String, view: DataView) {
        self.views.write().await.insert(source, view);
    }

    pub async fn get(&self, source: &str) -> Option<DataView> {
        self.views.read().await.get(source).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(id: i64) -> AuditEntry {
        AuditEntry {
            id,
            user_id: 1,
            username: "admin".into(),
            action: format!("action {}", id),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn feed_is_bounded_and_ordered() {
        let feed = AuditFeed::default();
        let entries = (0..(FEED_CAPACITY as i64 + 3)).map(entry).collect();
        feed.push(AuditBatch {
            source: "test1".into(),
            entries,
        })
        .await;

        let kept = feed.entries("test1").await;
        assert_eq!(kept.len(), FEED_CAPACITY);
        assert_eq!(kept[0].id, 3);
        assert!(feed.entries("test2").await.is_empty());
    }

    #[tokio::test]
    async fn updater_applies_reported_status() {
        let (tx, rx) = mpsc::channel(4);
        let state = JobsState::new(tx);
        tokio::spawn(start_job_updater(state.clone(), rx));
        state
            .tx
            .send(JobUpdate {
                job_id: "backup:test1".into(),
                status: JobStatus::Completed("ok".into()),
            })
            .await
            .unwrap();

        for _ in 0..100 {
            if state.jobs.read().await.contains_key("backup:test1") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(matches!(
            state.jobs.read().await.get("backup:test1"),
            Some(JobStatus::Completed(_))
        ));
    }
}
