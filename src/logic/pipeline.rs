//! Multi-file Pipeline
//!
//! Snapshots are independent, so many dump files are built on a small pool
//! of scoped worker threads pulling paths from a shared queue. For training,
//! each worker folds its snapshots into a private partial model and the
//! partials are merged at the end. Merging is commutative, so the result is
//! identical to sequential training whatever the scheduling.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::thread;

use parking_lot::Mutex;

use crate::logic::baseline::BaselineModel;
use crate::logic::snapshot::{Snapshot, SnapshotConfig, SnapshotError};

/// A source that could not be turned into a snapshot
#[derive(Debug)]
pub struct SourceFailure {
    pub path: PathBuf,
    pub error: SnapshotError,
}

impl std::fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

#[derive(Debug, Default)]
pub struct TrainingSummary {
    /// Snapshots folded into the model
    pub trained: usize,
    /// Snapshots with zero valid records
    pub empty: usize,
    pub failures: Vec<SourceFailure>,
    /// Workers that panicked. Their partial models and any source they had
    /// dequeued are lost.
    pub lost_workers: usize,
}

impl TrainingSummary {
    /// Every dequeued source reached the model or a recorded failure
    pub fn is_complete(&self) -> bool {
        self.lost_workers == 0
    }
}

// ============================================================================
// WORK QUEUE
// ============================================================================

struct WorkQueue<'a> {
    items: Mutex<VecDeque<(usize, &'a Path)>>,
}

impl<'a> WorkQueue<'a> {
    fn new(paths: &'a [PathBuf]) -> Self {
        Self {
            items: Mutex::new(paths.iter().map(PathBuf::as_path).enumerate().collect()),
        }
    }

    fn next(&self) -> Option<(usize, &'a Path)> {
        self.items.lock().pop_front()
    }
}

fn worker_count(requested: usize, jobs: usize) -> usize {
    requested.max(1).min(jobs.max(1))
}

/// Join every handle, returning the finished outputs and how many panicked
fn join_workers<T>(handles: Vec<thread::ScopedJoinHandle<'_, T>>) -> (Vec<T>, usize) {
    let mut outputs = Vec::with_capacity(handles.len());
    let mut lost = 0;
    for handle in handles {
        match handle.join() {
            Ok(output) => outputs.push(output),
            Err(_) => {
                log::error!("Training worker panicked, its partial model is lost");
                lost += 1;
            }
        }
    }
    (outputs, lost)
}

// ============================================================================
// BUILD
// ============================================================================

/// Build one snapshot per path. Successful snapshots keep input order.
pub fn build_snapshots(
    paths: &[PathBuf],
    config: &SnapshotConfig,
    workers: usize,
) -> (Vec<Snapshot>, Vec<SourceFailure>) {
    let queue = WorkQueue::new(paths);
    let results: Mutex<Vec<(usize, Result<Snapshot, SnapshotError>)>> =
        Mutex::new(Vec::with_capacity(paths.len()));

    let workers = worker_count(workers, paths.len());
    log::info!("Building {} snapshots on {} workers", paths.len(), workers);

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                while let Some((index, path)) = queue.next() {
                    let result = Snapshot::from_path(path, config);
                    results.lock().push((index, result));
                }
            });
        }
    });

    let mut results = results.into_inner();
    results.sort_by_key(|(index, _)| *index);

    let mut snapshots = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (index, result) in results {
        match result {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(error) => {
                log::warn!("Skipping {}: {}", paths[index].display(), error);
                failures.push(SourceFailure {
                    path: paths[index].clone(),
                    error,
                });
            }
        }
    }

    (snapshots, failures)
}

// ============================================================================
// TRAIN
// ============================================================================

/// Build and fold every path into `model` without keeping the snapshots
pub fn train_from_paths(
    model: &mut BaselineModel,
    paths: &[PathBuf],
    config: &SnapshotConfig,
    workers: usize,
) -> TrainingSummary {
    let queue = WorkQueue::new(paths);
    let workers = worker_count(workers, paths.len());
    let scoring = model.config().clone();

    log::info!("Training on {} sources with {} workers", paths.len(), workers);

    let (outcomes, lost_workers) = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let scoring = scoring.clone();
                let queue = &queue;
                scope.spawn(move || {
                    let mut partial = BaselineModel::new("partial", scoring);
                    let mut summary = TrainingSummary::default();

                    while let Some((_, path)) = queue.next() {
                        match Snapshot::from_path(path, config) {
                            Ok(snapshot) => {
                                if partial.train_snapshot(&snapshot) > 0 {
                                    summary.trained += 1;
                                } else {
                                    summary.empty += 1;
                                }
                            }
                            Err(error) => {
                                log::warn!("Skipping {}: {}", path.display(), error);
                                summary.failures.push(SourceFailure {
                                    path: path.to_path_buf(),
                                    error,
                                });
                            }
                        }
                    }

                    (partial, summary)
                })
            })
            .collect();

        join_workers(handles)
    });

    let mut total = TrainingSummary {
        lost_workers,
        ..TrainingSummary::default()
    };
    for (partial, summary) in outcomes {
        model.merge(&partial);
        total.trained += summary.trained;
        total.empty += summary.empty;
        total.failures.extend(summary.failures);
    }
    total.failures.sort_by(|a, b| a.path.cmp(&b.path));

    log::info!(
        "Model '{}' trained on {} sources ({} empty, {} failed), {} ASes known",
        model.name,
        total.trained,
        total.empty,
        total.failures.len(),
        model.len()
    );

    if !total.is_complete() {
        log::error!("{} of {} training workers were lost", total.lost_workers, workers);
    }

    total
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scorer::ScoringConfig;

    const DUMPS: [&str; 3] = [
        "TABLE_DUMP2|1383307200|B|10.0.0.1|100|10.0.0.0/8|100 200 300\n\
         TABLE_DUMP2|1383307200|B|10.0.0.1|100|10.1.0.0/16|100 200\n",
        "TABLE_DUMP2|1383310800|B|10.0.0.1|100|10.0.0.0/8|100 200 300\n\
         TABLE_DUMP2|1383310800|B|10.0.0.1|100|10.2.0.0/16|100 400 300\n",
        "TABLE_DUMP2|1383314400|B|10.0.0.1|100|10.0.0.0/8|100 300\n",
    ];

    fn write_dumps(dir: &Path) -> Vec<PathBuf> {
        DUMPS
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let path = dir.join(format!("rib.2013110{}.1200.txt", i + 1));
                std::fs::write(&path, text).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_build_keeps_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_dumps(dir.path());

        let (snapshots, failures) = build_snapshots(&paths, &SnapshotConfig::default(), 3);
        assert!(failures.is_empty());
        let ids: Vec<&str> = snapshots.iter().map(|s| s.source_id()).collect();
        assert_eq!(ids, vec!["rib.20131101.1200.txt", "rib.20131102.1200.txt", "rib.20131103.1200.txt"]);
    }

    #[test]
    fn test_parallel_training_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_dumps(dir.path());
        let config = SnapshotConfig::default();

        let (snapshots, _) = build_snapshots(&paths, &config, 1);
        let mut sequential = BaselineModel::new("seq", ScoringConfig::default());
        sequential.train(&snapshots);

        for workers in [1, 2, 8] {
            let mut parallel = BaselineModel::new("par", ScoringConfig::default());
            let summary = train_from_paths(&mut parallel, &paths, &config, workers);

            assert_eq!(summary.trained, 3);
            assert_eq!(parallel.profiles(), sequential.profiles());
            assert_eq!(parallel.snapshots_trained(), 3);
        }
    }

    #[test]
    fn test_failures_are_contained() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = write_dumps(dir.path());
        paths.push(dir.path().join("missing.txt"));
        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "").unwrap();
        paths.push(empty);

        let mut model = BaselineModel::new("mixed", ScoringConfig::default());
        let summary = train_from_paths(&mut model, &paths, &SnapshotConfig::default(), 2);

        assert_eq!(summary.trained, 3);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].path.ends_with("missing.txt"));
        assert_eq!(model.snapshots_trained(), 3);
        assert!(summary.is_complete());
    }

    #[test]
    fn test_panicked_worker_is_counted() {
        let (outputs, lost) = thread::scope(|scope| {
            let handles = vec![
                scope.spawn(|| 1),
                scope.spawn(|| -> i32 { panic!("worker failed") }),
                scope.spawn(|| 3),
            ];
            join_workers(handles)
        });

        assert_eq!(outputs, vec![1, 3]);
        assert_eq!(lost, 1);

        let summary = TrainingSummary {
            trained: 2,
            lost_workers: lost,
            ..TrainingSummary::default()
        };
        assert!(!summary.is_complete());
    }
}
