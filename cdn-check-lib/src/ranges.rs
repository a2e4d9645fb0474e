//! Range membership index built from a published CIDR list.

use crate::error::CdnCheckError;
use crate::ip::{cidr_to_range, Address, Range};
use std::net::Ipv4Addr;

/// Ordered set of address ranges, built once and then only read.
///
/// Overlapping or adjacent ranges are kept as given; [`RangeSet::contains`]
/// answers with union semantics. The published lists are a few dozen
/// entries, so lookup is a linear scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<Range>,
}

impl RangeSet {
    /// Build a set from CIDR lines.
    ///
    /// Blank lines and `#` comments are skipped. Any other line that is not a
    /// valid CIDR block fails the whole build.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cdn_check_lib::{address_to_int, RangeSet};
    ///
    /// let set = RangeSet::from_cidrs(["173.245.48.0/20", "103.21.244.0/22", ""]).unwrap();
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(address_to_int("173.245.48.1").unwrap()));
    /// ```
    pub fn from_cidrs<I, S>(lines: I) -> Result<Self, CdnCheckError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ranges = Vec::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            ranges.push(cidr_to_range(line)?);
        }

        tracing::debug!(ranges = ranges.len(), "built range set");
        Ok(Self { ranges })
    }

    pub fn from_ranges(ranges: Vec<Range>) -> Self {
        Self { ranges }
    }

    /// Whether `addr` lies in any range of the set.
    pub fn contains(&self, addr: Address) -> bool {
        self.ranges.iter().any(|r| r.contains(addr))
    }

    /// Convenience wrapper over [`RangeSet::contains`] for resolver output.
    pub fn contains_ip(&self, ip: Ipv4Addr) -> bool {
        self.contains(u32::from(ip))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
