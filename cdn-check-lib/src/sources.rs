//! Input sources: the published CIDR list and the domain list.
//!
//! These are thin I/O wrappers. The CIDR list is fetched over HTTPS (or read
//! from disk) and handed to [`RangeSet::from_cidrs`]; the domain list is a
//! CSV-like file whose first line is a header.

use crate::error::CdnCheckError;
use crate::ranges::RangeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Fetch the CIDR list at `url` and build a range set from it.
///
/// The request is sent with an empty `User-Agent`, which the published
/// endpoints accept. Any transport failure or non-success status is a
/// network error; a malformed body is an invalid CIDR error.
pub async fn fetch_range_set(url: &str, timeout: Duration) -> Result<RangeSet, CdnCheckError> {
    let body = fetch_range_list(url, timeout).await?;
    parse_range_list(&body)
}

/// Download the raw CIDR list body.
pub async fn fetch_range_list(url: &str, timeout: Duration) -> Result<String, CdnCheckError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent("")
        .build()
        .map_err(|e| {
            CdnCheckError::network_with_source("Failed to create HTTP client", e.to_string())
        })?;

    tracing::debug!(url, "fetching CIDR list");

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            CdnCheckError::timeout(format!("fetching {}", url), timeout)
        } else {
            CdnCheckError::network_with_source(format!("Failed to fetch {}", url), e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(CdnCheckError::network(format!(
            "{} returned HTTP {}",
            url,
            response.status()
        )));
    }

    Ok(response.text().await?)
}

/// Build a range set from a newline-delimited CIDR list.
///
/// A trailing blank line (as the published list has) is tolerated.
pub fn parse_range_list(body: &str) -> Result<RangeSet, CdnCheckError> {
    RangeSet::from_cidrs(body.lines())
}

/// Read a CIDR list from disk.
pub fn read_range_file<P: AsRef<Path>>(path: P) -> Result<RangeSet, CdnCheckError> {
    let content = read_file(path.as_ref())?;
    parse_range_list(&content)
}

/// Extract domains from a domain list.
///
/// The first line is a header and is discarded. Each following line
/// contributes its first comma-separated field, trimmed; lines with an
/// empty first field are skipped.
///
/// # Example
///
/// ```rust
/// use cdn_check_lib::parse_domain_list;
///
/// let domains = parse_domain_list("domain,rank\nexample.com,1\nexample.org,2\n");
/// assert_eq!(domains, vec!["example.com", "example.org"]);
/// ```
pub fn parse_domain_list(content: &str) -> Vec<String> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let domain = line.split(',').next().unwrap_or("").trim();
            if domain.is_empty() {
                None
            } else {
                Some(domain.to_string())
            }
        })
        .collect()
}

/// Read and parse a domain list file.
pub fn read_domain_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>, CdnCheckError> {
    let content = read_file(path.as_ref())?;
    Ok(parse_domain_list(&content))
}

fn read_file(path: &Path) -> Result<String, CdnCheckError> {
    if !path.exists() {
        return Err(CdnCheckError::file_error(
            path.to_string_lossy(),
            "File not found",
        ));
    }

    fs::read_to_string(path).map_err(|e| {
        CdnCheckError::file_error(path.to_string_lossy(), format!("Failed to read file: {}", e))
    })
}
