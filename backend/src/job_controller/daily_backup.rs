//! Scheduled daily snapshot of one data source.
//!
//! The task snapshots immediately on start and then once per interval. Every
//! tick opens a fresh connection, so a store that was locked or missing on one
//! tick is simply tried again on the next. Failures are logged and reported
//! as `JobStatus::Failed`; they never end the task.

use crate::error::StoreResult;
use crate::job_controller::{shutdown_requested, ticker};
use crate::job_controller::state::JobUpdate;
use crate::store::fingerprint::{fingerprint, Fingerprint};
use crate::store::StoreHandle;
use chrono::{Local, NaiveDate, NaiveDateTime};
use common::jobs::JobStatus;
use common::model::snapshot::SnapshotReceipt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

pub fn job_id(source: &str) -> String {
    format!("backup:{}", source)
}

pub struct DailyBackup {
    source: String,
    path: PathBuf,
    /// Date and content of the last snapshot this job wrote.
    last: Option<(NaiveDate, Fingerprint)>,
}

impl DailyBackup {
    pub fn new(source: String, path: PathBuf) -> Self {
        Self {
            source,
            path,
            last: None,
        }
    }

    fn source(&self) -> &str {
        &self.source
    }

    /// Snapshots the working table as of `as_of`. Returns `None` when this
    /// job already wrote identical content for the same day.
    pub fn run_once(&mut self, as_of: NaiveDateTime) -> StoreResult<Option<SnapshotReceipt>> {
        let mut handle = StoreHandle::open(&self.path, &self.source)?;
        let records = handle.records().load()?;
        let current = (as_of.date(), fingerprint(&records));
        if self.last == Some(current) {
            log::debug!(
                "Backup of '{}' skipped: unchanged since last snapshot today",
                self.source
            );
            return Ok(None);
        }
        let receipt = handle.backups().snapshot_now(&records, as_of)?;
        self.last = Some(current);
        Ok(Some(receipt))
    }
}

pub async fn run_daily_backup(
    mut job: DailyBackup,
    interval: Duration,
    tx: mpsc::Sender<JobUpdate>,
    mut shutdown: watch::Receiver<bool>,
) {
    let id = job_id(job.source());
    let source = job.source().to_string();
    let path = job.path.clone();
    let mut ticker = ticker(interval, MissedTickBehavior::Delay);
    log::info!("Daily backup for '{}' scheduled every {:?}", source, interval);

    loop {
        tokio::select! {
            _ = shutdown_requested(&mut shutdown) => {
                log::info!("Daily backup for '{}' stopped", source);
                break;
            }
            _ = ticker.tick() => {
                let _ = tx
                    .send(JobUpdate { job_id: id.clone(), status: JobStatus::InProgress(0) })
                    .await;
                let now = Local::now().naive_local();
                let joined = tokio::task::spawn_blocking(move || {
                    let outcome = job.run_once(now);
                    (job, outcome)
                })
                .await;

                let status = match joined {
                    Ok((returned, outcome)) => {
                        job = returned;
                        match outcome {
                            Ok(Some(receipt)) => JobStatus::Completed(format!(
                                "snapshot of {} rows taken at {}",
                                receipt.rows, receipt.taken_at
                            )),
                            Ok(None) => JobStatus::Completed("unchanged, snapshot skipped".into()),
                            Err(e) => {
                                log::error!("Daily backup for '{}' failed: {}", source, e);
                                JobStatus::Failed(e.to_string())
                            }
                        }
                    }
                    Err(e) => {
                        log::error!("Daily backup for '{}' panicked: {}", source, e);
                        job = DailyBackup::new(source.clone(), path.clone());
                        JobStatus::Failed(format!("join error: {}", e))
                    }
                };
                let _ = tx.send(JobUpdate { job_id: id.clone(), status }).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::record::RecordSet;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn save(path: &std::path::Path, value: &str) {
        let mut handle = StoreHandle::open(path, "test1").unwrap();
        handle
            .records()
            .replace_all(&RecordSet::with_rows(
                vec!["col1".into()],
                vec![vec![value.into()]],
            ))
            .unwrap();
    }

    #[test]
    fn unchanged_content_is_skipped_within_a_day() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test1.db");
        save(&path, "a");

        let mut job = DailyBackup::new("test1".into(), path.clone());
        assert!(job.run_once(at(1)).unwrap().is_some());
        assert!(job.run_once(at(2)).unwrap().is_none());

        save(&path, "b");
        let receipt = job.run_once(at(3)).unwrap().unwrap();
        assert_eq!(receipt.replaced, 1);

        let mut handle = StoreHandle::open(&path, "test1").unwrap();
        let snapshot = handle
            .backups()
            .load_snapshot(at(0).date())
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.records.rows, vec![vec!["b".into()]]);
    }

    #[test]
    fn unopenable_store_reports_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the database file should be.
        let path = dir.path().join("test1.db");
        std::fs::create_dir(&path).unwrap();
        let mut job = DailyBackup::new("test1".into(), path);
        assert!(job.run_once(at(1)).is_err());
    }

    #[tokio::test]
    async fn task_reports_status_and_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test1.db");
        save(&path, "a");

        let (tx, mut rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_daily_backup(
            DailyBackup::new("test1".into(), path),
            Duration::from_secs(3600),
            tx,
            stop_rx,
        ));

        let started = rx.recv().await.unwrap();
        assert_eq!(started.job_id, "backup:test1");
        assert!(matches!(started.status, JobStatus::InProgress(0)));
        let finished = rx.recv().await.unwrap();
        assert!(matches!(finished.status, JobStatus::Completed(_)));

        stop_tx.send(true).unwrap();
        task.await.unwrap();
    }
}
