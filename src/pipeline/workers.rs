//! # Batch Executor
//!
//! Runs [`process_item`] over every work item on a fixed pool of worker
//! threads. Jobs and outcomes travel over channels; workers share nothing
//! mutable. Outcomes are collected in completion order.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use tracing::{info, warn};

use crate::constants::{CHANNEL_CAPACITY_MULTIPLIER, MIN_CHANNEL_CAPACITY, PROGRESS_LOG_INTERVAL};
use crate::tasks::WorkItem;

use super::{Outcome, PipelineContext, SkipReason, process_item};

/// Process all `items` with up to `workers` threads.
///
/// Returns exactly one outcome per submitted item. An item whose worker
/// disappeared before reporting is recorded as an exception skip.
pub fn run_batch(items: Vec<WorkItem>, workers: usize, ctx: Arc<PipelineContext>) -> Vec<Outcome> {
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }
    let worker_count = workers.max(1).min(total);
    let channel_cap = worker_count
        .saturating_mul(CHANNEL_CAPACITY_MULTIPLIER)
        .max(MIN_CHANNEL_CAPACITY);

    // stem -> (first submission index, outcomes still owed)
    let mut pending: HashMap<String, (usize, usize)> = HashMap::new();
    for (idx, item) in items.iter().enumerate() {
        pending.entry(item.stem.clone()).or_insert((idx, 0)).1 += 1;
    }

    let (job_tx, job_rx) = bounded::<WorkItem>(channel_cap);
    let (result_tx, result_rx) = unbounded::<Outcome>();

    let handles = spawn_item_workers(worker_count, ctx, job_rx, result_tx);
    let feeder = spawn_feeder(items, job_tx);
    info!("batch started items={} workers={}", total, handles.len());

    let mut outcomes = Vec::with_capacity(total);
    for outcome in result_rx.iter() {
        let owed = match pending.get_mut(&outcome.stem) {
            Some((_, owed)) => {
                *owed -= 1;
                *owed
            }
            None => {
                warn!("unexpected outcome for {}, ignoring", outcome.stem);
                continue;
            }
        };
        if owed == 0 {
            pending.remove(&outcome.stem);
        }
        outcomes.push(outcome);
        let done = outcomes.len();
        if done % PROGRESS_LOG_INTERVAL == 0 || done == total {
            info!("progress {done}/{total}");
        }
    }

    if let Err(err) = feeder.join() {
        warn!("feeder thread panicked: {err:?}");
    }
    for handle in handles {
        if handle.join().is_err() {
            warn!("item worker panicked outside item processing");
        }
    }

    record_lost(pending, &mut outcomes);
    outcomes
}

/// Append an exception skip for every outcome still owed in `pending`.
///
/// Reached only when a worker thread dies outside `process_item` or no worker
/// could be spawned.
fn record_lost(pending: HashMap<String, (usize, usize)>, outcomes: &mut Vec<Outcome>) {
    if pending.is_empty() {
        return;
    }
    let mut lost: Vec<(String, (usize, usize))> = pending.into_iter().collect();
    lost.sort_by_key(|(_, (idx, _))| *idx);
    let reason = SkipReason::Exception("worker exited before reporting".to_string());
    for (stem, (_, owed)) in lost {
        warn!("no outcome received for {stem}");
        for _ in 0..owed {
            outcomes.push(Outcome::skip(&stem, &reason));
        }
    }
}

fn spawn_feeder(items: Vec<WorkItem>, tx: Sender<WorkItem>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for item in items {
            if let Err(err) = tx.send(item) {
                warn!("job channel closed while submitting {}", err.0.stem);
                break;
            }
        }
    })
}

/// Spawn worker threads that pull items from `rx` and send outcomes to `tx`.
pub fn spawn_item_workers(
    workers: usize,
    ctx: Arc<PipelineContext>,
    rx: Receiver<WorkItem>,
    tx: Sender<Outcome>,
) -> Vec<thread::JoinHandle<()>> {
    let mut handles = Vec::new();

    for idx in 0..workers.max(1) {
        let ctx = ctx.clone();
        let rx = rx.clone();
        let tx = tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("item-worker-{idx}"))
            .spawn(move || {
                for item in rx {
                    let outcome = process_item(&item, &ctx);
                    if let Err(err) = tx.send(outcome) {
                        warn!("result channel closed while reporting {}", err.0.stem);
                        break;
                    }
                }
            });
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(err) => warn!("failed to spawn item worker {idx}: {err}"),
        }
    }

    handles
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use crate::pipeline::ItemSettings;
    use crate::store::{RemoteStore, StoreError};

    struct NullStore;

    impl RemoteStore for NullStore {
        fn ensure_folder(&self, _folder: &str) -> Result<(), StoreError> {
            Ok(())
        }
        fn upload(&self, _local: &Path, _folder: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn context(scratch: &Path) -> Arc<PipelineContext> {
        let settings = ItemSettings {
            scratch_dir: scratch.to_path_buf(),
            container_extension: ".mat".to_string(),
            target_frames: 4,
            remote_dest: "/out".to_string(),
        };
        Arc::new(PipelineContext::new(settings, Arc::new(NullStore)))
    }

    #[test]
    fn every_item_gets_one_outcome() {
        let scratch = tempfile::tempdir().expect("tempdir");
        let items: Vec<WorkItem> = (0..25)
            .map(|i| WorkItem {
                source: PathBuf::from(format!("/nonexistent/{i}_x.zip")),
                stem: format!("{i}_x"),
            })
            .collect();

        let outcomes = run_batch(items, 4, context(scratch.path()));
        assert_eq!(outcomes.len(), 25);
        let mut stems: Vec<&str> = outcomes.iter().map(|o| o.stem.as_str()).collect();
        stems.sort();
        stems.dedup();
        assert_eq!(stems.len(), 25);
        assert!(outcomes.iter().all(|o| o.reason.starts_with("exception:")));
        assert_eq!(std::fs::read_dir(scratch.path()).expect("list").count(), 0);
    }

    #[test]
    fn unreported_items_become_exception_skips() {
        let mut pending = HashMap::new();
        pending.insert("2_b".to_string(), (1, 1));
        pending.insert("1_a".to_string(), (0, 2));
        let mut outcomes = vec![Outcome::ok("0_done")];

        record_lost(pending, &mut outcomes);
        let stems: Vec<&str> = outcomes.iter().map(|o| o.stem.as_str()).collect();
        assert_eq!(stems, vec!["0_done", "1_a", "1_a", "2_b"]);
        assert!(outcomes[1..]
            .iter()
            .all(|o| o.reason == "exception:worker exited before reporting"));
    }

    #[test]
    fn jobs_left_unclaimed_are_still_counted() {
        let scratch = tempfile::tempdir().expect("tempdir");
        let ctx = context(scratch.path());
        let items: Vec<WorkItem> = (0..3)
            .map(|i| WorkItem {
                source: PathBuf::from(format!("/nonexistent/{i}_y.zip")),
                stem: format!("{i}_y"),
            })
            .collect();
        let mut pending = HashMap::new();
        for (idx, item) in items.iter().enumerate() {
            pending.insert(item.stem.clone(), (idx, 1));
        }

        // one worker that handles a single job and then exits
        let (job_tx, job_rx) = bounded::<WorkItem>(items.len());
        let (result_tx, result_rx) = unbounded::<Outcome>();
        for item in items {
            job_tx.send(item).expect("queue");
        }
        drop(job_tx);
        let handle = thread::spawn(move || {
            if let Ok(item) = job_rx.recv() {
                let _ = result_tx.send(process_item(&item, &ctx));
            }
        });
        handle.join().expect("worker");

        let mut outcomes: Vec<Outcome> = result_rx.iter().collect();
        for outcome in &outcomes {
            pending.remove(&outcome.stem);
        }
        record_lost(pending, &mut outcomes);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| o.reason == "exception:worker exited before reporting")
                .count(),
            2
        );
    }

    #[test]
    fn empty_batch_returns_nothing() {
        let scratch = tempfile::tempdir().expect("tempdir");
        assert!(run_batch(Vec::new(), 8, context(scratch.path())).is_empty());
    }
}
