//! Publishes a source's working table whenever its content changes.

use crate::error::StoreResult;
use crate::job_controller::{shutdown_requested, ticker};
use crate::job_controller::state::{DataView, DataViews};
use crate::store::fingerprint::{fingerprint, ChangeTracker, Fingerprint};
use crate::store::StoreHandle;
use common::model::record::RecordSet;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Default)]
pub struct RefreshWatcher {
    tracker: ChangeTracker,
}

impl RefreshWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the working table and returns it only if its fingerprint moved
    /// since the previous check of the same source.
    pub fn check(&mut self, store: &mut StoreHandle) -> StoreResult<Option<(Fingerprint, RecordSet)>> {
        let records = store.records().load()?;
        let current = fingerprint(&records);
        let source = store.source().to_string();
        if self.tracker.observe(&source, current) {
            Ok(Some((current, records)))
        } else {
            Ok(None)
        }
    }
}

type Changed = Vec<(String, Fingerprint, RecordSet)>;

fn check_all(
    watcher: &mut RefreshWatcher,
    handles: &mut HashMap<String, StoreHandle>,
    sources: &[(String, PathBuf)],
) -> Changed {
    let mut changed = Vec::new();
    for (source, path) in sources {
        let mut store = match handles.remove(source) {
            Some(store) => store,
            None => match StoreHandle::open(path, source) {
                Ok(store) => store,
                Err(e) => {
                    log::warn!("Refresh could not open '{}': {}", source, e);
                    continue;
                }
            },
        };
        match watcher.check(&mut store) {
            Ok(Some((fp, records))) => changed.push((source.clone(), fp, records)),
            Ok(None) => {}
            Err(e) => log::warn!("Refresh of '{}' failed: {}", source, e),
        }
        handles.insert(source.clone(), store);
    }
    changed
}

/// Checks every source once per `interval` and replaces its published view
/// when the content changed.
pub async fn run_refresh_watcher(
    sources: Vec<(String, PathBuf)>,
    interval: Duration,
    views: DataViews,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut watcher = RefreshWatcher::new();
    let mut handles: HashMap<String, StoreHandle> = HashMap::new();
    let mut ticker = ticker(interval, MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_requested(&mut shutdown) => break,
            _ = ticker.tick() => {
                let tick_sources = sources.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    let changed = check_all(&mut watcher, &mut handles, &tick_sources);
                    (watcher, handles, changed)
                })
                .await;

                let changed = match joined {
                    Ok((returned_watcher, returned_handles, changed)) => {
                        watcher = returned_watcher;
                        handles = returned_handles;
                        changed
                    }
                    Err(e) => {
                        log::error!("Refresh watcher lost its state: {}", e);
                        break;
                    }
                };
                for (source, fp, records) in changed {
                    log::debug!("Data for '{}' changed ({})", source, fp);
                    let view = DataView {
                        fingerprint: fp.to_string(),
                        refreshed_at: chrono::Local::now().naive_local(),
                        records,
                    };
                    views.publish(source, view).await;
                }
            }
        }
    }
    log::debug!("Refresh watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::record::CellValue;

    fn one_row() -> RecordSet {
        RecordSet::with_rows(
            vec!["name".into(), "qty".into()],
            vec![vec![CellValue::from("apple"), CellValue::from(3i64)]],
        )
    }

    #[test]
    fn only_a_content_change_is_reported() {
        let mut store = StoreHandle::open_in_memory("test1").unwrap();
        let mut watcher = RefreshWatcher::new();

        let (empty_fp, empty) = watcher.check(&mut store).unwrap().unwrap();
        assert!(empty.is_empty());

        store.records().replace_all(&one_row()).unwrap();
        let mut reported = Vec::new();
        for _ in 0..5 {
            if let Some((fp, _)) = watcher.check(&mut store).unwrap() {
                reported.push(fp);
            }
        }
        assert_eq!(reported.len(), 1);
        assert_ne!(reported[0], empty_fp);
    }

    #[test]
    fn sources_are_tracked_independently() {
        let mut first = StoreHandle::open_in_memory("test1").unwrap();
        let mut second = StoreHandle::open_in_memory("test2").unwrap();
        let mut watcher = RefreshWatcher::new();

        assert!(watcher.check(&mut first).unwrap().is_some());
        assert!(watcher.check(&mut second).unwrap().is_some());
        assert!(watcher.check(&mut first).unwrap().is_none());
        assert!(watcher.check(&mut second).unwrap().is_none());
    }

    #[tokio::test]
    async fn runner_publishes_changed_views() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test1.db");
        {
            let mut store = StoreHandle::open(&path, "test1").unwrap();
            store.records().replace_all(&one_row()).unwrap();
        }

        let views = DataViews::default();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_refresh_watcher(
            vec![("test1".into(), path.clone())],
            Duration::from_millis(10),
            views.clone(),
            stop_rx,
        ));

        let mut published = None;
        for _ in 0..200 {
            if let Some(view) = views.get("test1").await {
                published = Some(view);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let view = published.expect("view published");
        assert_eq!(view.records, one_row());

        stop_tx.send(true).unwrap();
        task.await.unwrap();
    }
}
