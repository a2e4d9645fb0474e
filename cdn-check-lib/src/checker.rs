//! Main checker implementation.
//!
//! `CdnChecker` ties the pieces together: a shared range set, a resolver, and
//! a worker pool sized from [`CheckConfig`].

use crate::classifier::{classify, Classification};
use crate::concurrent::{CancelFlag, ProgressSink, WorkerPool};
use crate::error::CdnCheckError;
use crate::ranges::RangeSet;
use crate::resolver::{Resolver, SystemResolver};
use crate::sources::fetch_range_set;
use crate::types::{CheckConfig, Report};
use std::sync::Arc;

/// Classifies domains against one provider's published ranges.
///
/// The range set is built once and shared read-only by every worker.
///
/// # Example
///
/// ```rust,no_run
/// use cdn_check_lib::{CdnChecker, CheckConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = CdnChecker::from_published(CheckConfig::default()).await?;
///     let domains = vec!["example.com".to_string(), "cloudflare.com".to_string()];
///     let report = checker.check_domains(&domains).await;
///     println!("{} behind the CDN", report.member);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct CdnChecker {
    /// Configuration settings for this checker instance
    config: CheckConfig,
    /// Provider ranges, immutable for the checker's lifetime
    ranges: Arc<RangeSet>,
    /// Resolver shared by all workers
    resolver: Arc<dyn Resolver>,
}

impl CdnChecker {
    /// Create a checker using the platform resolver.
    pub fn new(config: CheckConfig, ranges: RangeSet) -> Self {
        let resolver = SystemResolver::with_timeout(config.lookup_timeout);
        Self::with_resolver(config, ranges, Arc::new(resolver))
    }

    /// Create a checker with a caller-supplied resolver.
    pub fn with_resolver(config: CheckConfig, ranges: RangeSet, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            config,
            ranges: Arc::new(ranges),
            resolver,
        }
    }

    /// Fetch the CIDR list from `config.ranges_url` and build a checker.
    ///
    /// # Errors
    ///
    /// Fails before any DNS traffic if the list cannot be fetched or
    /// contains a malformed entry.
    pub async fn from_published(config: CheckConfig) -> Result<Self, CdnCheckError> {
        let ranges = fetch_range_set(&config.ranges_url, config.fetch_timeout).await?;
        if ranges.is_empty() {
            return Err(CdnCheckError::network(format!(
                "{} returned no CIDR ranges",
                config.ranges_url
            )));
        }
        Ok(Self::new(config, ranges))
    }

    /// Classify a single domain.
    pub async fn check_domain(&self, domain: &str) -> Result<Classification, CdnCheckError> {
        classify(domain, &self.ranges, self.resolver.as_ref()).await
    }

    /// Classify a list of domains with the configured worker pool.
    pub async fn check_domains(&self, domains: &[String]) -> Report {
        self.check_domains_with(domains, None, CancelFlag::new())
            .await
    }

    /// Classify a list of domains with progress reporting and cancellation.
    ///
    /// `progress` is driven by worker 0 only.
    pub async fn check_domains_with(
        &self,
        domains: &[String],
        progress: Option<Arc<dyn ProgressSink>>,
        cancel: CancelFlag,
    ) -> Report {
        self.pool().run(domains, progress, cancel).await
    }

    fn pool(&self) -> WorkerPool {
        WorkerPool::new(
            self.config.workers,
            Arc::clone(&self.ranges),
            Arc::clone(&self.resolver),
        )
    }

    /// Get the current configuration for this checker.
    pub fn config(&self) -> &CheckConfig {
        &self.config
    }
}
