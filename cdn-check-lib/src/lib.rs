//! # CDN Check Library
//!
//! Classifies domains as hosted behind a CDN provider or not, by resolving
//! each domain to an IPv4 address and testing it against the provider's
//! published CIDR ranges.
//!
//! The work is split into contiguous batches, one per worker. Workers run
//! concurrently, each looking up its own batch in order and keeping a private
//! tally; the tallies are summed into a [`Report`] once every worker has
//! finished.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cdn_check_lib::{CdnChecker, CheckConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = CdnChecker::from_published(CheckConfig::default()).await?;
//!     let report = checker.check_domains(&["example.com".to_string()]).await;
//!
//!     println!("member: {}, non-member: {}, unresolved: {}",
//!         report.member, report.non_member, report.unresolved);
//!     Ok(())
//! }
//! ```

// Re-export main public API types and functions
pub use checker::CdnChecker;
pub use classifier::{classify, Classification};
pub use concurrent::{run_classification, CancelFlag, ProgressSink, WorkerPool};
pub use config::{
    load_env_config, load_env_config_from, parse_timeout_string, ConfigManager, DefaultsConfig,
    EnvConfig, FileConfig, OutputConfig,
};
pub use error::CdnCheckError;
pub use ip::{address_to_int, cidr_to_range, Address, Range};
pub use partition::{batch_size, partition};
pub use ranges::RangeSet;
pub use resolver::{ResolveError, Resolver, SystemResolver};
pub use sources::{
    fetch_range_list, fetch_range_set, parse_domain_list, parse_range_list, read_domain_file,
    read_range_file,
};
pub use types::{
    BatchTally, CheckConfig, Report, WorkerFailure, BLOCKING_THREADS, DEFAULT_PROVIDER,
    DEFAULT_RANGES_URL, MAX_WORKERS,
};

// Internal modules - exposed through the re-exports above
mod checker;
mod classifier;
mod concurrent;
mod config;
mod error;
mod ip;
mod partition;
mod ranges;
mod resolver;
mod sources;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, CdnCheckError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
