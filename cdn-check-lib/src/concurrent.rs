//! Worker pool that classifies batches concurrently.
//!
//! The domain list is split into one contiguous batch per worker. Each worker
//! runs as its own tokio task, walks its batch in order, and returns a private
//! [`BatchTally`]. The pool joins every task before summing, so the report is
//! only ever built from finished workers.

use crate::classifier::classify;
use crate::partition::partition;
use crate::ranges::RangeSet;
use crate::resolver::Resolver;
use crate::types::{BatchTally, Report, WorkerFailure};
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Receiver of coarse progress updates.
///
/// Only worker 0 reports, with counts for its own batch. Implementations
/// must return promptly; the worker calls this between lookups.
pub trait ProgressSink: Send + Sync {
    fn update(&self, completed: usize, total: usize);
}

/// Shared cancellation signal.
///
/// Once raised, workers stop starting new lookups and count the rest of
/// their batch as skipped. Lookups already in flight run to completion or
/// time out.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Fixed-size pool of batch workers.
#[derive(Clone)]
pub struct WorkerPool {
    workers: usize,
    ranges: Arc<RangeSet>,
    resolver: Arc<dyn Resolver>,
}

impl WorkerPool {
    /// Create a pool of `workers` slots over a shared range set and resolver.
    pub fn new(workers: usize, ranges: Arc<RangeSet>, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            workers: workers.max(1),
            ranges,
            resolver,
        }
    }

    /// Classify every domain and return the summed report.
    ///
    /// Launches one task per non-empty batch. A worker that panics is
    /// recorded in [`Report::worker_failures`]; the other workers' tallies
    /// are unaffected.
    pub async fn run(
        &self,
        domains: &[String],
        progress: Option<Arc<dyn ProgressSink>>,
        cancel: CancelFlag,
    ) -> Report {
        let start_time = Instant::now();
        let batches = partition(domains, self.workers);
        let launched = batches.len();

        tracing::info!(
            domains = domains.len(),
            workers = launched,
            "starting classification"
        );

        let mut batch_lens = Vec::with_capacity(launched);
        let mut handles = Vec::with_capacity(launched);
        for (index, batch) in batches.into_iter().enumerate() {
            batch_lens.push(batch.len());
            let progress = if index == 0 { progress.clone() } else { None };
            handles.push(tokio::spawn(run_batch(
                index,
                batch,
                Arc::clone(&self.ranges),
                Arc::clone(&self.resolver),
                progress,
                cancel.clone(),
            )));
        }

        // Barrier: every slot is filled (or failed) before anything is summed.
        let outcomes = join_all(handles).await;

        let mut tallies = Vec::with_capacity(launched);
        let mut failures = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(tally) => tallies.push(tally),
                Err(e) => {
                    tracing::warn!(worker = index, error = %e, "worker crashed");
                    failures.push(WorkerFailure {
                        worker: index,
                        batch_len: batch_lens[index],
                        message: e.to_string(),
                    });
                }
            }
        }

        let report = Report::from_tallies(tallies, failures, launched)
            .with_duration(start_time.elapsed());

        tracing::info!(
            member = report.member,
            non_member = report.non_member,
            unresolved = report.unresolved,
            errors = report.errors,
            elapsed = ?report.duration,
            "classification finished"
        );
        report
    }
}

/// Classify one batch in order, owning its tally until it returns.
async fn run_batch(
    index: usize,
    batch: Vec<String>,
    ranges: Arc<RangeSet>,
    resolver: Arc<dyn Resolver>,
    progress: Option<Arc<dyn ProgressSink>>,
    cancel: CancelFlag,
) -> BatchTally {
    let total = batch.len();
    let mut tally = BatchTally::default();
    tracing::debug!(worker = index, domains = total, "worker started");

    if let Some(sink) = &progress {
        sink.update(0, total);
    }

    for (done, domain) in batch.iter().enumerate() {
        if cancel.is_cancelled() {
            tally.skipped = total - done;
            tracing::debug!(worker = index, skipped = tally.skipped, "worker cancelled");
            break;
        }

        // A panicking lookup costs one domain, not the batch.
        let lookup =
            AssertUnwindSafe(classify(domain, &ranges, resolver.as_ref())).catch_unwind();
        match lookup.await {
            Ok(Ok(outcome)) => tally.record(outcome),
            Ok(Err(e)) => {
                tracing::warn!(worker = index, error = %e, "lookup failed");
                tally.record_error(domain);
            }
            Err(_) => {
                tracing::warn!(worker = index, domain = %domain, "lookup panicked");
                tally.record_error(domain);
            }
        }

        if let Some(sink) = &progress {
            sink.update(done + 1, total);
        }
    }

    tracing::debug!(worker = index, ?tally, "worker finished");
    tally
}

/// Classify `domains` with a pool of `workers`.
///
/// Shorthand for [`WorkerPool::run`] without progress or cancellation.
pub async fn run_classification(
    domains: &[String],
    ranges: Arc<RangeSet>,
    resolver: Arc<dyn Resolver>,
    workers: usize,
) -> Report {
    WorkerPool::new(workers, ranges, resolver)
        .run(domains, None, CancelFlag::new())
        .await
}
