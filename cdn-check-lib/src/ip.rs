//! IPv4 arithmetic: dotted-quad parsing and CIDR-to-range conversion.
//!
//! Addresses are plain `u32` values with the most significant octet first,
//! so range membership is two integer comparisons.

use crate::error::CdnCheckError;
use std::fmt;
use std::net::Ipv4Addr;

/// An IPv4 address as a big-endian 32-bit integer.
pub type Address = u32;

/// Inclusive range of addresses derived from a CIDR block.
///
/// Invariant: `start <= end` and `end - start + 1` is a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    start: Address,
    end: Address,
}

// Every CIDR block covers at least one address.
#[allow(clippy::len_without_is_empty)]
impl Range {
    /// First address of the block (the network address).
    pub fn start(&self) -> Address {
        self.start
    }

    /// Last address of the block (the broadcast address).
    pub fn end(&self) -> Address {
        self.end
    }

    /// Whether `addr` falls inside this range, bounds included.
    pub fn contains(&self, addr: Address) -> bool {
        self.start <= addr && addr <= self.end
    }

    /// Number of addresses covered. A `/0` covers 2^32, hence `u64`.
    pub fn len(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", Ipv4Addr::from(self.start), Ipv4Addr::from(self.end))
    }
}

/// Convert a dotted-quad string to its integer value.
///
/// Requires exactly four decimal octets in `0..=255`. Leading zeros are
/// accepted (`"010.0.0.1"` is `10.0.0.1`), signs and whitespace are not.
///
/// # Example
///
/// ```rust
/// use cdn_check_lib::address_to_int;
///
/// assert_eq!(address_to_int("127.0.0.1").unwrap(), 2130706433);
/// ```
pub fn address_to_int(ip: &str) -> Result<Address, CdnCheckError> {
    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(CdnCheckError::invalid_address(
            ip,
            format!("expected 4 octets, found {}", octets.len()),
        ));
    }

    let mut value: Address = 0;
    for octet in octets {
        if octet.is_empty() || octet.len() > 3 || !octet.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CdnCheckError::invalid_address(
                ip,
                format!("'{}' is not a decimal octet", octet),
            ));
        }
        // At most three digits, so this cannot overflow u16.
        let parsed: u16 = octet
            .parse()
            .map_err(|_| CdnCheckError::invalid_address(ip, format!("bad octet '{}'", octet)))?;
        if parsed > 255 {
            return Err(CdnCheckError::invalid_address(
                ip,
                format!("octet {} is out of range 0-255", parsed),
            ));
        }
        value = (value << 8) | Address::from(parsed);
    }

    Ok(value)
}

/// Convert a CIDR literal (`a.b.c.d/n`) to the inclusive range it covers.
///
/// The start is the given address masked to its network address, so a block
/// written with host bits set (`127.0.0.5/24`) still covers `127.0.0.0/24`.
pub fn cidr_to_range(cidr: &str) -> Result<Range, CdnCheckError> {
    let cidr = cidr.trim();
    let (ip, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| CdnCheckError::invalid_cidr(cidr, "missing '/' prefix length"))?;

    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CdnCheckError::invalid_cidr(
            cidr,
            format!("prefix length '{}' is not a number", prefix),
        ));
    }
    let prefix: u32 = prefix
        .parse()
        .map_err(|_| CdnCheckError::invalid_cidr(cidr, "prefix length must be 0-32"))?;
    if prefix > 32 {
        return Err(CdnCheckError::invalid_cidr(
            cidr,
            "prefix length must be 0-32",
        ));
    }

    let addr = address_to_int(ip).map_err(|e| CdnCheckError::invalid_cidr(cidr, e.to_string()))?;

    let host_mask: Address = u32::MAX.checked_shr(prefix).unwrap_or(0);
    let start = addr & !host_mask;
    if start != addr {
        tracing::debug!(
            cidr,
            network = %Ipv4Addr::from(start),
            "host bits set in CIDR block, using network address"
        );
    }

    Ok(Range {
        start,
        end: start | host_mask,
    })
}
