//! Name resolution used by the classifier.
//!
//! The classifier only needs "domain in, one IPv4 address out", so resolution
//! sits behind the [`Resolver`] trait. [`SystemResolver`] is the production
//! implementation backed by the platform resolver; tests plug in their own.

use async_trait::async_trait;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Why a lookup did not produce an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The name does not exist
    NotFound,
    /// The name exists but has no A record
    NoIpv4Address,
    /// The resolver did not answer within the configured timeout
    Timeout(Duration),
    /// Any other resolver-reported failure (SERVFAIL, refused, ...)
    Lookup(String),
    /// The resolution machinery itself broke (not a DNS answer)
    Internal(String),
}

impl ResolveError {
    /// Whether this failure is an ordinary "did not resolve" outcome.
    ///
    /// Only [`ResolveError::Internal`] is unexpected; everything else is the
    /// resolver telling us the name has no usable address.
    pub fn is_resolution_failure(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "name not found"),
            Self::NoIpv4Address => write!(f, "no IPv4 address"),
            Self::Timeout(duration) => write!(f, "lookup timed out after {:?}", duration),
            Self::Lookup(message) => write!(f, "lookup failed: {}", message),
            Self::Internal(message) => write!(f, "resolver failure: {}", message),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Capability to resolve a domain to one IPv4 address.
///
/// Implementations must be shareable across workers; one call performs at
/// most one lookup and never retries.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve_ipv4(&self, domain: &str) -> Result<Ipv4Addr, ResolveError>;
}

/// Platform resolver (`getaddrinfo`) with a per-lookup timeout.
///
/// `tokio::net::lookup_host` runs the blocking call on tokio's blocking pool,
/// so each worker suspends only inside this call. A lookup that outlives the
/// timeout is abandoned; the blocking thread finishes in the background.
#[derive(Debug, Clone)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    /// Create a resolver with the default 5 second timeout.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }

    /// Create a resolver with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve_ipv4(&self, domain: &str) -> Result<Ipv4Addr, ResolveError> {
        let lookup = tokio::net::lookup_host((domain, 0u16));

        let addrs = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(addrs)) => addrs,
            Ok(Err(e)) => return Err(map_io_error(e)),
            Err(_) => return Err(ResolveError::Timeout(self.timeout)),
        };

        addrs
            .filter_map(|sa| match sa.ip() {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            })
            .next()
            .ok_or(ResolveError::NoIpv4Address)
    }
}

/// Sort a `lookup_host` I/O error into a resolution outcome.
///
/// getaddrinfo failures surface as `io::ErrorKind::Other` (or `Uncategorized`)
/// with the gai message, so the message text is all there is to go on. A
/// panicked blocking task surfaces as a plain `Other` wrapping a `JoinError`.
fn map_io_error(err: std::io::Error) -> ResolveError {
    let message = err.to_string();
    let lower = message.to_lowercase();

    if lower.contains("panicked") || lower.contains("cancelled") {
        ResolveError::Internal(message)
    } else if lower.contains("not known")
        || lower.contains("not found")
        || lower.contains("no such host")
        || lower.contains("nodename nor servname")
    {
        ResolveError::NotFound
    } else if lower.contains("no address associated") {
        ResolveError::NoIpv4Address
    } else {
        ResolveError::Lookup(message)
    }
}
