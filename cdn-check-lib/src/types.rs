//! Core data types for CDN classification runs.
//!
//! This module defines per-batch tallies, the final report, and the
//! configuration that drives a run.

use crate::classifier::Classification;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::time::Duration;

/// Published Cloudflare IPv4 ranges, one CIDR per line.
pub const DEFAULT_RANGES_URL: &str = "https://www.cloudflare.com/ips-v4";

/// Provider label used in report output.
pub const DEFAULT_PROVIDER: &str = "Cloudflare";

/// Upper bound on the worker pool size.
///
/// Every lookup holds a thread of tokio's blocking pool, and a lookup
/// abandoned on timeout keeps that thread until getaddrinfo returns. With
/// fewer blocking threads than workers, fresh lookups queue behind stuck
/// ones and can time out before they are sent, which counts them as
/// unresolved. Runtimes driving large pools should allow
/// [`BLOCKING_THREADS`].
pub const MAX_WORKERS: usize = 1000;

/// Blocking pool size that gives every worker room for one abandoned lookup
/// and one live one.
pub const BLOCKING_THREADS: usize = 2 * MAX_WORKERS;

/// Counts produced by one worker for its batch.
///
/// A tally is owned by its worker while the batch runs and is handed to the
/// aggregator once, by value, when the worker returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTally {
    /// Domains resolved into the provider's ranges
    pub member: usize,

    /// Domains resolved outside the provider's ranges
    pub non_member: usize,

    /// Domains that did not resolve
    pub unresolved: usize,

    /// Domains whose lookup failed unexpectedly
    pub errors: usize,

    /// Domains never looked up because the run was cancelled
    pub skipped: usize,

    /// Names behind `errors`, in batch order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failed_domains: Vec<String>,
}

impl BatchTally {
    /// Count one classification outcome.
    pub fn record(&mut self, outcome: Classification) {
        match outcome {
            Classification::Member => self.member += 1,
            Classification::NonMember => self.non_member += 1,
            Classification::Unresolved => self.unresolved += 1,
        }
    }

    /// Count one unexpected lookup failure.
    pub fn record_error(&mut self, domain: &str) {
        self.errors += 1;
        self.failed_domains.push(domain.to_string());
    }

    /// Number of domains accounted for, skipped ones included.
    pub fn total(&self) -> usize {
        self.member + self.non_member + self.unresolved + self.errors + self.skipped
    }
}

impl AddAssign for BatchTally {
    fn add_assign(&mut self, other: Self) {
        self.member += other.member;
        self.non_member += other.non_member;
        self.unresolved += other.unresolved;
        self.errors += other.errors;
        self.skipped += other.skipped;
        self.failed_domains.extend(other.failed_domains);
    }
}

impl Add for BatchTally {
    type Output = BatchTally;

    fn add(mut self, other: Self) -> Self::Output {
        self += other;
        self
    }
}

impl Sum for BatchTally {
    fn sum<I: Iterator<Item = BatchTally>>(iter: I) -> Self {
        iter.fold(BatchTally::default(), Add::add)
    }
}

/// A worker that crashed before publishing its tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerFailure {
    /// Slot index of the worker
    pub worker: usize,

    /// Number of domains in the lost batch
    pub batch_len: usize,

    /// Panic or cancellation message from the runtime
    pub message: String,
}

/// Final totals of a run.
///
/// Only built after every worker has terminated; never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub member: usize,
    pub non_member: usize,
    pub unresolved: usize,
    pub errors: usize,
    pub skipped: usize,

    /// Domains whose lookup failed unexpectedly, sorted
    pub failed_domains: Vec<String>,

    /// Workers whose batch was lost, by slot index
    pub worker_failures: Vec<WorkerFailure>,

    /// Number of workers launched
    pub workers: usize,

    /// Wall-clock duration of the run
    #[serde(skip)]
    pub duration: Duration,
}

impl Report {
    /// Sum published tallies into a report.
    ///
    /// The result does not depend on the order of `tallies`.
    pub fn from_tallies<I>(tallies: I, worker_failures: Vec<WorkerFailure>, workers: usize) -> Self
    where
        I: IntoIterator<Item = BatchTally>,
    {
        let total: BatchTally = tallies.into_iter().sum();
        let mut failed_domains = total.failed_domains;
        failed_domains.sort();

        let mut worker_failures = worker_failures;
        worker_failures.sort_by_key(|f| f.worker);

        Self {
            member: total.member,
            non_member: total.non_member,
            unresolved: total.unresolved,
            errors: total.errors,
            skipped: total.skipped,
            failed_domains,
            worker_failures,
            workers,
            duration: Duration::ZERO,
        }
    }

    /// Domains that received a classification (member, non-member, unresolved).
    pub fn classified(&self) -> usize {
        self.member + self.non_member + self.unresolved
    }

    /// Domains lost with crashed workers.
    pub fn lost(&self) -> usize {
        self.worker_failures.iter().map(|f| f.batch_len).sum()
    }

    /// Whether every domain got an answer and no worker crashed.
    pub fn is_complete(&self) -> bool {
        self.errors == 0 && self.skipped == 0 && self.worker_failures.is_empty()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Configuration for a classification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Size of the worker pool
    /// Default: 100, Range: 1-1000
    pub workers: usize,

    /// Timeout for each individual lookup
    /// Default: 5 seconds
    #[serde(skip)]
    pub lookup_timeout: Duration,

    /// Timeout for fetching the CIDR list
    /// Default: 10 seconds
    #[serde(skip)]
    pub fetch_timeout: Duration,

    /// Where the CIDR list is published
    pub ranges_url: String,

    /// Provider name used in output
    pub provider: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            workers: 100,
            lookup_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(10),
            ranges_url: DEFAULT_RANGES_URL.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
        }
    }
}

impl CheckConfig {
    /// Set the worker count, capped to `1..=MAX_WORKERS`.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    /// Set the per-lookup timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn with_ranges_url<S: Into<String>>(mut self, url: S) -> Self {
        self.ranges_url = url.into();
        self
    }

    pub fn with_provider<S: Into<String>>(mut self, provider: S) -> Self {
        self.provider = provider.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(member: usize, non_member: usize, unresolved: usize, failed: &[&str]) -> BatchTally {
        BatchTally {
            member,
            non_member,
            unresolved,
            errors: failed.len(),
            skipped: 0,
            failed_domains: failed.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_record_outcomes() {
        let mut t = BatchTally::default();
        t.record(Classification::Member);
        t.record(Classification::Member);
        t.record(Classification::NonMember);
        t.record(Classification::Unresolved);
        t.record_error("broken.example");

        assert_eq!(t.member, 2);
        assert_eq!(t.non_member, 1);
        assert_eq!(t.unresolved, 1);
        assert_eq!(t.errors, 1);
        assert_eq!(t.failed_domains, vec!["broken.example"]);
        assert_eq!(t.total(), 5);
    }

    #[test]
    fn test_report_independent_of_tally_order() {
        let a = tally(3, 1, 0, &["z.example"]);
        let b = tally(0, 4, 2, &[]);
        let c = tally(1, 1, 1, &["a.example"]);

        let forward = Report::from_tallies(vec![a.clone(), b.clone(), c.clone()], vec![], 3);
        let backward = Report::from_tallies(vec![c.clone(), b.clone(), a.clone()], vec![], 3);
        let grouped = Report::from_tallies(vec![a + (b + c)], vec![], 3);

        assert_eq!(forward, backward);
        assert_eq!(forward, grouped);
        assert_eq!(forward.member, 4);
        assert_eq!(forward.non_member, 6);
        assert_eq!(forward.unresolved, 3);
        assert_eq!(forward.failed_domains, vec!["a.example", "z.example"]);
    }

    #[test]
    fn test_empty_report() {
        let report = Report::from_tallies(Vec::new(), vec![], 0);
        assert_eq!(report, Report::default());
        assert!(report.is_complete());
        assert_eq!(report.classified(), 0);
    }

    #[test]
    fn test_lost_domains_counted_from_failures() {
        let failures = vec![
            WorkerFailure {
                worker: 4,
                batch_len: 10,
                message: "panicked".into(),
            },
            WorkerFailure {
                worker: 1,
                batch_len: 7,
                message: "panicked".into(),
            },
        ];
        let report = Report::from_tallies(vec![tally(1, 0, 0, &[])], failures, 5);
        assert_eq!(report.lost(), 17);
        assert_eq!(report.worker_failures[0].worker, 1);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_blocking_pool_covers_every_worker() {
        assert!(BLOCKING_THREADS >= 2 * CheckConfig::default().with_workers(usize::MAX).workers);
    }

    #[test]
    fn test_with_workers_clamps() {
        assert_eq!(CheckConfig::default().with_workers(0).workers, 1);
        assert_eq!(CheckConfig::default().with_workers(5000).workers, MAX_WORKERS);
        assert_eq!(CheckConfig::default().with_workers(42).workers, 42);
    }

    #[test]
    fn test_report_serializes_counts() {
        let report = Report::from_tallies(vec![tally(1, 0, 1, &[])], vec![], 1);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["member"], 1);
        assert_eq!(json["non_member"], 0);
        assert_eq!(json["unresolved"], 1);
        assert_eq!(json["workers"], 1);
    }
}
