//! Watermark-based audit log polling.
//!
//! `LogPoller` remembers, per source, the timestamp and id of the last entry
//! it handed out and only ever asks the log for entries after it. Switching
//! the active source leaves every other watermark alone, so coming back to a
//! source neither skips nor repeats entries.

use crate::error::StoreResult;
use crate::job_controller::{shutdown_requested, ticker};
use crate::store::audit::{AuditLog, Watermark};
use crate::store::StoreHandle;
use common::model::audit::AuditEntry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// New entries of one source, in log order.
#[derive(Debug)]
pub struct AuditBatch {
    pub source: String,
    pub entries: Vec<AuditEntry>,
}

#[derive(Debug, Default)]
pub struct LogPoller {
    watermarks: HashMap<String, Watermark>,
    active: Option<String>,
}

impl LogPoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn switch_to(&mut self, source: &str) {
        self.active = Some(source.to_string());
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn watermark(&self, source: &str) -> Option<Watermark> {
        self.watermarks.get(source).copied()
    }

    /// Fetches entries after the source's watermark and advances it to the
    /// last one returned.
    pub fn poll(&mut self, source: &str, audit: &AuditLog<'_>) -> StoreResult<Vec<AuditEntry>> {
        let entries = audit.tail_after(self.watermark(source))?;
        if let Some(last) = entries.last() {
            self.watermarks.insert(source.to_string(), Watermark::from(last));
        }
        Ok(entries)
    }

    /// Polls the active source, if any.
    pub fn poll_active(&mut self, audit: &AuditLog<'_>) -> StoreResult<Vec<AuditEntry>> {
        match self.active.clone() {
            Some(source) => self.poll(&source, audit),
            None => Ok(Vec::new()),
        }
    }
}

/// One tick against a kept-open connection. The connection is dropped after
/// a transient failure and reopened on the next tick.
fn poll_once(
    poller: &mut LogPoller,
    handle: &mut Option<StoreHandle>,
    source: &str,
    path: &Path,
) -> StoreResult<Vec<AuditEntry>> {
    let store = match handle.take() {
        Some(store) => store,
        None => StoreHandle::open(path, source)?,
    };
    let result = poller.poll_active(&store.audit());
    match &result {
        Err(e) if e.is_transient() => {
            log::warn!("Audit poll for '{}' failed, reconnecting: {}", source, e)
        }
        _ => *handle = Some(store),
    }
    result
}

/// Polls one source's audit log every `interval` and delivers new entries to
/// `sink`. Ends on shutdown or once the receiving side is gone.
pub async fn run_log_poller(
    source: String,
    path: PathBuf,
    interval: Duration,
    sink: mpsc::Sender<AuditBatch>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut poller = LogPoller::new();
    poller.switch_to(&source);
    let mut handle: Option<StoreHandle> = None;
    let mut ticker = ticker(interval, MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_requested(&mut shutdown) => break,
            _ = ticker.tick() => {
                let tick_source = source.clone();
                let tick_path = path.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    let outcome = poll_once(&mut poller, &mut handle, &tick_source, &tick_path);
                    (poller, handle, outcome)
                })
                .await;

                let entries = match joined {
                    Ok((returned_poller, returned_handle, outcome)) => {
                        poller = returned_poller;
                        handle = returned_handle;
                        match outcome {
                            Ok(entries) => entries,
                            Err(e) => {
                                log::warn!("Audit poll for '{}' failed: {}", source, e);
                                continue;
                            }
                        }
                    }
                    Err(e) => {
                        log::error!("Audit poller for '{}' lost its state: {}", source, e);
                        break;
                    }
                };
                if entries.is_empty() {
                    continue;
                }
                let batch = AuditBatch { source: source.clone(), entries };
                if sink.send(batch).await.is_err() {
                    log::info!("Audit feed for '{}' closed", source);
                    break;
                }
            }
        }
    }
    log::debug!("Audit poller for '{}' stopped", source);
}
