use std::future::Future;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::{ModpackError, ModpackResult};

pub const DEFAULT_MAX_WORKERS: usize = 4;

/// What a worker does with its remaining items once any item has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep going; every item is attempted.
    #[default]
    AttemptAll,
    /// Skip items not yet started. Items already running finish normally.
    SkipAfterFailure,
}

/// Outcome of one batch item.
#[derive(Debug)]
pub enum ItemOutcome<R> {
    Completed(R),
    Failed(ModpackError),
    Skipped,
}

impl<R> ItemOutcome<R> {
    pub fn is_completed(&self) -> bool {
        matches!(self, ItemOutcome::Completed(_))
    }
}

/// Per-item outcomes of a batch, in input order.
#[derive(Debug)]
pub struct BatchReport<R> {
    outcomes: Vec<ItemOutcome<R>>,
}

impl<R> BatchReport<R> {
    pub fn outcomes(&self) -> &[ItemOutcome<R>] {
        &self.outcomes
    }

    pub fn completed(&self) -> impl Iterator<Item = &R> {
        self.outcomes.iter().filter_map(|o| match o {
            ItemOutcome::Completed(r) => Some(r),
            _ => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Failed(_)))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Skipped))
            .count()
    }

    /// All results if every item completed, otherwise the failure of the
    /// lowest-indexed failed item.
    pub fn into_result(self) -> ModpackResult<Vec<R>> {
        let mut results = Vec::with_capacity(self.outcomes.len());
        let mut skipped = 0;
        for outcome in self.outcomes {
            match outcome {
                ItemOutcome::Completed(r) => results.push(r),
                ItemOutcome::Failed(e) => return Err(e),
                ItemOutcome::Skipped => skipped += 1,
            }
        }
        if skipped > 0 {
            return Err(ModpackError::Worker(format!(
                "{skipped} items were skipped"
            )));
        }
        Ok(results)
    }
}

/// Fans a batch of independent jobs out over a small number of tokio tasks.
///
/// The item range is cut into `min(max_workers, n)` contiguous chunks, the
/// last one taking the remainder. Each task runs its chunk in order; the
/// tasks are spawned per batch and joined together before any result is
/// looked at. No retries, no cancellation.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    max_workers: usize,
    policy: FailurePolicy,
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

impl BatchScheduler {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn worker_count(&self, items: usize) -> usize {
        self.max_workers.min(items)
    }

    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, job: F) -> BatchReport<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ModpackResult<R>> + Send + 'static,
    {
        let total = items.len();
        if total == 0 {
            return BatchReport {
                outcomes: Vec::new(),
            };
        }

        let workers = self.worker_count(total);
        let ranges = chunk_ranges(total, workers);
        info!("Starting batch: {} items, {} workers", total, workers);

        let job = Arc::new(job);
        let failed = Arc::new(AtomicBool::new(false));
        let policy = self.policy;
        let mut items = items.into_iter();

        let handles: Vec<_> = ranges
            .iter()
            .map(|range| {
                let chunk: Vec<T> = items.by_ref().take(range.len()).collect();
                let job = Arc::clone(&job);
                let failed = Arc::clone(&failed);

                tokio::spawn(async move {
                    let mut outcomes = Vec::with_capacity(chunk.len());
                    for item in chunk {
                        if policy == FailurePolicy::SkipAfterFailure
                            && failed.load(Ordering::Acquire)
                        {
                            outcomes.push(ItemOutcome::Skipped);
                            continue;
                        }

                        match (*job)(item).await {
                            Ok(result) => outcomes.push(ItemOutcome::Completed(result)),
                            Err(e) => {
                                failed.store(true, Ordering::Release);
                                outcomes.push(ItemOutcome::Failed(e));
                            }
                        }
                    }
                    outcomes
                })
            })
            .collect();

        let joined = join_all(handles).await;

        let mut outcomes = Vec::with_capacity(total);
        for (range, result) in ranges.into_iter().zip(joined) {
            match result {
                Ok(chunk) => outcomes.extend(chunk),
                Err(e) => {
                    warn!("Worker for items {:?} aborted: {}", range, e);
                    outcomes.extend(
                        range.map(|_| ItemOutcome::Failed(ModpackError::Worker(e.to_string()))),
                    );
                }
            }
        }

        let report = BatchReport { outcomes };
        if report.failure_count() > 0 {
            warn!(
                "Batch finished with {} failed and {} skipped of {} items",
                report.failure_count(),
                report.skipped_count(),
                total
            );
        }
        report
    }
}

/// Split `0..total` into `workers` contiguous ranges; the last range absorbs
/// the remainder.
pub fn chunk_ranges(total: usize, workers: usize) -> Vec<Range<usize>> {
    if total == 0 || workers == 0 {
        return Vec::new();
    }

    let workers = workers.min(total);
    let size = total / workers;
    (0..workers)
        .map(|i| {
            let start = i * size;
            let end = if i == workers - 1 { total } else { start + size };
            start..end
        })
        .collect()
}
