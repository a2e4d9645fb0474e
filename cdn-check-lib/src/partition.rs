//! Splitting the domain list into per-worker batches.

/// Size of each batch for `total` domains spread over `workers`.
///
/// One pool slot is held back as slack, so the list is divided by
/// `workers - 1` (rounded up) and never yields more than `workers - 1`
/// batches. A single-worker pool gets the whole list in one batch.
pub fn batch_size(total: usize, workers: usize) -> usize {
    let divisor = workers.saturating_sub(1).max(1);
    total.div_ceil(divisor).max(1)
}

/// Split `domains` into contiguous, non-empty batches.
///
/// Concatenating the batches in order yields `domains` again. An empty list
/// yields no batches; a list shorter than the pool yields single-domain
/// batches.
///
/// # Example
///
/// ```rust
/// use cdn_check_lib::partition;
///
/// let domains: Vec<String> = (0..10).map(|i| format!("d{}.example", i)).collect();
/// let batches = partition(&domains, 4);
/// assert_eq!(batches.len(), 3);
/// assert_eq!(batches.concat(), domains);
/// ```
pub fn partition(domains: &[String], workers: usize) -> Vec<Vec<String>> {
    if domains.is_empty() {
        return Vec::new();
    }

    let size = batch_size(domains.len(), workers);
    domains.chunks(size).map(<[String]>::to_vec).collect()
}
