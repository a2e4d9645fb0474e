// cdn-check-lib/tests/integration.rs

//! Integration tests for cdn-check-lib exports and end-to-end classification

use async_trait::async_trait;
use cdn_check_lib::{
    address_to_int, cidr_to_range, parse_domain_list, parse_range_list, partition,
    run_classification, CancelFlag, CdnChecker, CheckConfig, Classification, ProgressSink,
    RangeSet, ResolveError, Resolver,
};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

/// In-memory resolver: names in the table resolve, everything else is NXDOMAIN.
struct StaticResolver {
    table: HashMap<String, Ipv4Addr>,
}

impl StaticResolver {
    fn new(entries: &[(&str, [u8; 4])]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(name, ip)| (name.to_string(), Ipv4Addr::from(*ip)))
                .collect(),
        }
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve_ipv4(&self, domain: &str) -> Result<Ipv4Addr, ResolveError> {
        self.table.get(domain).copied().ok_or(ResolveError::NotFound)
    }
}

#[derive(Default)]
struct CountingSink {
    calls: AtomicUsize,
    last: AtomicUsize,
}

impl ProgressSink for CountingSink {
    fn update(&self, completed: usize, _total: usize) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last.store(completed, Ordering::SeqCst);
    }
}

#[test]
fn test_ip_arithmetic_exports() {
    assert_eq!(assert_ok!(address_to_int("127.0.0.1")), 2130706433);

    let range = assert_ok!(cidr_to_range("127.0.0.1/24"));
    assert_eq!(range.len(), 256);
    assert_eq!(range.start(), assert_ok!(address_to_int("127.0.0.0")));

    assert_err!(address_to_int("127.0.0"));
    assert_err!(cidr_to_range("127.0.0.0/99"));
}

#[tokio::test]
async fn test_end_to_end_member_and_unresolved() {
    let ranges = assert_ok!(RangeSet::from_cidrs(["1.1.1.1/32"]));
    let resolver = Arc::new(StaticResolver::new(&[("a.example", [1, 1, 1, 1])]));
    let domains = vec!["a.example".to_string(), "b.example".to_string()];

    let report = run_classification(&domains, Arc::new(ranges), resolver, 100).await;

    assert_eq!(report.member, 1);
    assert_eq!(report.non_member, 0);
    assert_eq!(report.unresolved, 1);
}

#[tokio::test]
async fn test_end_to_end_empty_domain_list() {
    let ranges = assert_ok!(RangeSet::from_cidrs(["1.1.1.1/32"]));
    let resolver = Arc::new(StaticResolver::new(&[]));

    let report = run_classification(&[], Arc::new(ranges), resolver, 100).await;

    assert_eq!(
        (report.member, report.non_member, report.unresolved),
        (0, 0, 0)
    );
    assert_eq!(report.workers, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_published_list_pipeline() {
    // Shape of the real feed: CIDRs one per line with a trailing newline.
    let feed = "173.245.48.0/20\n103.21.244.0/22\n104.16.0.0/13\n172.64.0.0/13\n";
    let csv = "domain,rank\nshop.example,1\nblog.example,2\ngone.example,3\nmail.example,4\n";

    let ranges = assert_ok!(parse_range_list(feed));
    let domains = parse_domain_list(csv);
    assert_eq!(domains.len(), 4);

    let resolver = Arc::new(StaticResolver::new(&[
        ("shop.example", [104, 18, 2, 3]),
        ("blog.example", [172, 67, 0, 9]),
        ("mail.example", [93, 184, 216, 34]),
    ]));
    let checker = CdnChecker::with_resolver(CheckConfig::default().with_workers(3), ranges, resolver);

    let sink = Arc::new(CountingSink::default());
    let report = checker
        .check_domains_with(
            &domains,
            Some(sink.clone() as Arc<dyn ProgressSink>),
            CancelFlag::new(),
        )
        .await;

    assert_eq!(report.member, 2);
    assert_eq!(report.non_member, 1);
    assert_eq!(report.unresolved, 1);
    assert!(report.is_complete());

    // Worker 0 owns the first batch of 2 domains: initial update plus one per domain.
    assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    assert_eq!(sink.last.load(Ordering::SeqCst), 2);

    assert_eq!(
        assert_ok!(checker.check_domain("gone.example").await),
        Classification::Unresolved
    );
}

#[test]
fn test_partition_preserves_every_domain_once() {
    let domains: Vec<String> = (0..2500).map(|i| format!("host{}.example", i)).collect();
    let batches = partition(&domains, 100);

    let mut seen = std::collections::HashSet::new();
    for batch in &batches {
        assert!(!batch.is_empty());
        for d in batch {
            assert!(seen.insert(d.clone()), "{} appears twice", d);
        }
    }
    assert_eq!(seen.len(), domains.len());
    assert_eq!(batches.concat(), domains);
}
