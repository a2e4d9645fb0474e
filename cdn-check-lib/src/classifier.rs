//! Single-domain classification.
//!
//! Resolves one domain and tests the address against the range set. This is
//! the unit of work each pool worker repeats over its batch.

use crate::error::CdnCheckError;
use crate::ranges::RangeSet;
use crate::resolver::Resolver;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of classifying one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Resolved into one of the provider's ranges
    Member,
    /// Resolved, but outside every range
    NonMember,
    /// The name did not resolve to an IPv4 address
    Unresolved,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Member => write!(f, "member"),
            Classification::NonMember => write!(f, "non-member"),
            Classification::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// Classify a domain against `ranges`.
///
/// Performs exactly one lookup through `resolver`. A name that does not
/// resolve is `Ok(Classification::Unresolved)`; only a failure of the
/// resolver itself is returned as an error.
///
/// # Errors
///
/// Returns [`CdnCheckError::Lookup`] when the resolver reports an internal
/// failure rather than a DNS outcome.
pub async fn classify(
    domain: &str,
    ranges: &RangeSet,
    resolver: &dyn Resolver,
) -> Result<Classification, CdnCheckError> {
    match resolver.resolve_ipv4(domain).await {
        Ok(ip) => {
            if ranges.contains_ip(ip) {
                Ok(Classification::Member)
            } else {
                Ok(Classification::NonMember)
            }
        }
        Err(e) if e.is_resolution_failure() => {
            tracing::trace!(domain, error = %e, "unresolved");
            Ok(Classification::Unresolved)
        }
        Err(e) => Err(CdnCheckError::lookup(domain, e.to_string())),
    }
}
