// domain-scan-lib/tests/integration.rs

//! Integration tests for domain-scan-lib: classification and full scans
//! driven by stub DNS, WHOIS and TLS backends. No real network is touched.

use async_trait::async_trait;
use domain_scan_lib::{
    CandidateGenerator, Charset, Dispatcher, DnsLookup, DomainChecker, PatternGuard, Prober,
    RecordKind, RegexMode, ResultCache, ScanConfig, ScanError, ScanHandle, ScanResult, Signature,
    TlsProbe, Verdict, WhoisPolicy, WhoisQuery, WhoisServer,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers every lookup from a fixed record set and counts calls per domain.
#[derive(Default)]
struct StubDns {
    records: Vec<RecordKind>,
    hang_on: Option<String>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StubDns {
    fn with_records(records: Vec<RecordKind>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    fn hanging_on(domain: &str) -> Self {
        Self {
            hang_on: Some(domain.to_string()),
            ..Default::default()
        }
    }

    fn calls_for(&self, domain: &str) -> usize {
        self.calls.lock().unwrap().get(domain).copied().unwrap_or(0)
    }

    fn domains_seen(&self) -> HashMap<String, usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DnsLookup for StubDns {
    async fn has_records(&self, domain: &str, kind: RecordKind) -> Result<bool, ScanError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(domain.to_string())
            .or_default() += 1;

        if self.hang_on.as_deref() == Some(domain) {
            futures::future::pending::<()>().await;
        }
        if self.records.contains(&kind) {
            Ok(true)
        } else {
            Err(ScanError::dns(domain, "NXDOMAIN"))
        }
    }
}

struct StubTls(bool);

#[async_trait]
impl TlsProbe for StubTls {
    async fn has_certificate(&self, domain: &str) -> Result<bool, ScanError> {
        if self.0 {
            Ok(true)
        } else {
            Err(ScanError::tls(domain, "connection refused"))
        }
    }
}

/// Same reply from every server.
struct StubWhois {
    reply: Result<String, ScanError>,
    calls: Mutex<usize>,
}

impl StubWhois {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: Mutex::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            reply: Err(ScanError::network("connection refused")),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl WhoisQuery for StubWhois {
    async fn query(&self, _domain: &str, _server: &WhoisServer) -> Result<String, ScanError> {
        *self.calls.lock().unwrap() += 1;
        self.reply.clone()
    }
}

fn fast_policy() -> WhoisPolicy {
    WhoisPolicy {
        retries: 2,
        base_delay: Duration::ZERO,
        server_delay: Duration::ZERO,
        timeout: Duration::from_secs(1),
    }
}

fn two_servers() -> Vec<WhoisServer> {
    vec![WhoisServer::Default, WhoisServer::parse("whois.nic.li")]
}

fn checker(dns: Arc<StubDns>, whois: Arc<StubWhois>, tls: bool) -> DomainChecker {
    DomainChecker::new(Prober::new(
        dns,
        whois,
        Arc::new(StubTls(tls)),
        two_servers(),
        fast_policy(),
    ))
}

fn fast_config(length: usize, charset: Charset, workers: usize) -> ScanConfig {
    ScanConfig::default()
        .with_length(length)
        .with_suffix(".li")
        .with_charset(charset)
        .with_workers(workers)
        .with_delay(Duration::ZERO)
        .with_whois_policy(fast_policy())
        .with_grace_period(Duration::from_millis(200))
}

async fn collect(mut scan: ScanHandle) -> Vec<ScanResult> {
    let mut results = Vec::new();
    while let Some(result) = scan.next_result().await {
        results.push(result);
    }
    results
}

#[tokio::test]
async fn test_registrar_wording_is_registered_with_whois() {
    let whois = Arc::new(StubWhois::replying(
        "Domain Name: xj9q.li\nRegistrar: Example Registrar AG\n",
    ));
    let checker = checker(Arc::new(StubDns::default()), Arc::clone(&whois), false);

    let result = checker.check_domain("xj9q.li").await.unwrap();
    assert!(!result.available);
    assert_eq!(result.signatures, vec![Signature::Whois]);
    assert!(!result.cached);
    assert!(result.check_duration.is_some());
}

#[tokio::test]
async fn test_explicit_no_match_is_available() {
    let whois = Arc::new(StubWhois::replying("No match for domain \"XJ9Q.LI\".\n"));
    let checker = checker(Arc::new(StubDns::default()), whois, false);

    let result = checker.check_domain("xj9q.li").await.unwrap();
    assert!(result.available);
    assert!(result.signatures.is_empty());
    assert_eq!(result.verdict(), Verdict::Available);
}

#[tokio::test]
async fn test_rate_limit_is_registered() {
    let whois = Arc::new(StubWhois::replying(
        "Service temporarily unavailable, please try again later",
    ));
    let checker = checker(Arc::new(StubDns::default()), whois, false);

    let result = checker.check_domain("xj9q.li").await.unwrap();
    assert!(!result.available);
    assert!(result.signatures.is_empty());
}

#[tokio::test]
async fn test_total_network_failure_is_registered() {
    let whois = Arc::new(StubWhois::failing());
    let checker = checker(Arc::new(StubDns::default()), Arc::clone(&whois), false);

    let result = checker.check_domain("xj9q.li").await.unwrap();
    assert!(!result.available);
    assert!(result.signatures.is_empty());
    // two passes over two servers with two attempts each
    assert_eq!(whois.calls(), 8);
}

#[tokio::test]
async fn test_reserved_name_skips_probing() {
    let dns = Arc::new(StubDns::default());
    let whois = Arc::new(StubWhois::replying("No match"));
    let checker = checker(Arc::clone(&dns), Arc::clone(&whois), false);

    let result = checker.check_domain("www.li").await.unwrap();
    assert!(!result.available);
    assert_eq!(result.signatures, vec![Signature::Reserved]);
    assert_eq!(whois.calls(), 0);
    assert_eq!(dns.calls_for("www.li"), 0);
}

#[tokio::test]
async fn test_dns_and_tls_signatures_win_over_whois() {
    let dns = Arc::new(StubDns::with_records(vec![RecordKind::Ns, RecordKind::Mx]));
    let whois = Arc::new(StubWhois::replying("No match"));
    let checker = checker(dns, whois, true);

    let result = checker.check_domain("xj9q.li").await.unwrap();
    assert!(!result.available);
    assert_eq!(
        result.signatures,
        vec![Signature::DnsNs, Signature::DnsMx, Signature::Ssl]
    );
    assert_eq!(result.signature_list(), "DNS_NS, DNS_MX, SSL");
}

#[tokio::test]
async fn test_invalid_domain_rejected() {
    let checker = checker(
        Arc::new(StubDns::default()),
        Arc::new(StubWhois::failing()),
        false,
    );
    let err = checker.check_domain("-bad-.li").await.unwrap_err();
    assert!(matches!(err, ScanError::InvalidDomain { .. }));
}

#[tokio::test]
async fn test_scan_checks_every_candidate_once() {
    let dns = Arc::new(StubDns::default());
    let whois = Arc::new(StubWhois::replying("No match"));
    let config = fast_config(4, Charset::Digits, 8).with_pattern(r"^12[0-9]{2}\.li$", RegexMode::Full);
    let cache = Arc::new(ResultCache::new(config.cache_ttl));
    let dispatcher = Dispatcher::new(config, checker(Arc::clone(&dns), whois, false), cache);

    let results = collect(dispatcher.start().unwrap()).await;
    assert_eq!(results.len(), 100);

    let unique: HashSet<&str> = results.iter().map(|r| r.domain.as_str()).collect();
    assert_eq!(unique.len(), 100);
    assert!(unique.contains("1200.li"));
    assert!(unique.contains("1299.li"));

    // One probe per candidate: three DNS lookups each
    let seen = dns.domains_seen();
    assert_eq!(seen.len(), 100);
    assert!(seen.values().all(|&calls| calls == 3));
    assert!(results.iter().all(|r| r.available && !r.cached));
}

#[tokio::test]
async fn test_reserved_candidates_are_never_probed() {
    let dns = Arc::new(StubDns::default());
    let whois = Arc::new(StubWhois::replying("No match"));
    let dispatcher = Dispatcher::new(
        fast_config(2, Charset::Digits, 4),
        checker(Arc::clone(&dns), Arc::clone(&whois), false),
        Arc::new(ResultCache::new(Duration::from_secs(60))),
    );

    let results = collect(dispatcher.start().unwrap()).await;
    assert_eq!(results.len(), 100);
    assert!(results
        .iter()
        .all(|r| !r.available && r.signatures == vec![Signature::Reserved]));
    assert!(dns.domains_seen().is_empty());
    assert_eq!(whois.calls(), 0);
}

#[tokio::test]
async fn test_second_scan_is_served_from_cache() {
    let dns = Arc::new(StubDns::default());
    let whois = Arc::new(StubWhois::replying("Registrar: Example"));
    let config = fast_config(4, Charset::Digits, 4).with_pattern(r"^123[0-9]\.li$", RegexMode::Full);
    let cache = Arc::new(ResultCache::new(Duration::from_secs(3600)));
    let dispatcher = Dispatcher::new(
        config,
        checker(Arc::clone(&dns), Arc::clone(&whois), false),
        Arc::clone(&cache),
    );

    let first = collect(dispatcher.start().unwrap()).await;
    assert_eq!(first.len(), 10);
    assert!(first.iter().all(|r| !r.cached));
    let calls_after_first = whois.calls();

    let scan = dispatcher.start().unwrap();
    assert_eq!(scan.stats().total, 10_000);
    let second = collect(scan).await;
    assert_eq!(second.len(), 10);
    assert!(second.iter().all(|r| r.cached));
    assert!(second
        .iter()
        .all(|r| !r.available && r.signatures == vec![Signature::Whois]));
    assert_eq!(whois.calls(), calls_after_first);
    assert_eq!(cache.len(), 10);
}

#[tokio::test]
async fn test_wait_reports_final_counts() {
    let whois = Arc::new(StubWhois::replying("No match"));
    let config = fast_config(4, Charset::Digits, 4).with_pattern(r"^12[0-9]{2}$", RegexMode::Prefix);
    let dispatcher = Dispatcher::new(
        config,
        checker(Arc::new(StubDns::default()), whois, false),
        Arc::new(ResultCache::new(Duration::from_secs(60))),
    );

    let stats = dispatcher.start().unwrap().wait().await.unwrap();
    assert_eq!(stats.total, 10_000);
    assert_eq!(stats.examined, 10_000);
    assert_eq!(stats.generated, 100);
    assert_eq!(stats.processed, 100);
    assert_eq!(stats.available, 100);
    assert_eq!(stats.registered, 0);
    assert_eq!(stats.cache_hits, 0);
}

#[tokio::test]
async fn test_stop_ends_scan_early() {
    let whois = Arc::new(StubWhois::replying("No match"));
    let mut config = fast_config(4, Charset::Digits, 2);
    config.job_queue_capacity = 1;
    config.result_queue_capacity = 1;
    let dispatcher = Dispatcher::new(
        config,
        checker(Arc::new(StubDns::default()), whois, false),
        Arc::new(ResultCache::new(Duration::from_secs(60))),
    );

    let mut scan = dispatcher.start().unwrap();
    let stopper = scan.stop_handle();
    let mut received = 0;
    while received < 5 {
        scan.next_result().await.unwrap();
        received += 1;
    }
    stopper.stop();
    assert!(scan.is_stopped());

    while scan.next_result().await.is_some() {
        received += 1;
    }
    assert!(received < 10_000, "scan was not stopped: {}", received);
    assert!(scan.stats().generated < 10_000);
}

#[tokio::test]
async fn test_hung_worker_is_abandoned_after_grace() {
    let dns = Arc::new(StubDns::hanging_on("1000.li"));
    let whois = Arc::new(StubWhois::replying("No match"));
    let config = fast_config(4, Charset::Digits, 2).with_pattern(r"^100[0-9]\.li$", RegexMode::Full);
    let dispatcher = Dispatcher::new(
        config,
        checker(dns, whois, false),
        Arc::new(ResultCache::new(Duration::from_secs(60))),
    );

    let results = tokio::time::timeout(Duration::from_secs(10), collect(dispatcher.start().unwrap()))
        .await
        .expect("scan should end once the grace period expires");

    assert_eq!(results.len(), 9);
    assert!(results.iter().all(|r| r.domain != "1000.li"));
}

#[tokio::test]
async fn test_explicit_generator() {
    let whois = Arc::new(StubWhois::replying("No match"));
    let dispatcher = Dispatcher::new(
        fast_config(3, Charset::Digits, 3),
        checker(Arc::new(StubDns::default()), whois, false),
        Arc::new(ResultCache::new(Duration::from_secs(60))),
    );

    let guard = PatternGuard::compile("^aab[a-z]$", RegexMode::Prefix).unwrap();
    let generator = CandidateGenerator::new(4, "ch", Charset::Letters, Some(guard)).unwrap();
    let results = collect(dispatcher.start_with(generator).unwrap()).await;
    assert_eq!(results.len(), 26);
    assert!(results.iter().all(|r| r.domain.ends_with(".ch")));
}

#[tokio::test]
async fn test_invalid_pattern_fails_before_start() {
    let config = fast_config(3, Charset::Letters, 2).with_pattern("(a+)+", RegexMode::Full);
    let dispatcher = Dispatcher::new(
        config,
        checker(
            Arc::new(StubDns::default()),
            Arc::new(StubWhois::failing()),
            false,
        ),
        Arc::new(ResultCache::new(Duration::from_secs(60))),
    );
    assert!(dispatcher.start().unwrap_err().is_config_error());
}

#[tokio::test]
async fn test_malformed_suffix_fails_before_start() {
    let dns = Arc::new(StubDns::default());
    let config = fast_config(4, Charset::Digits, 2)
        .with_suffix("li.")
        .with_pattern("^12[0-9]{2}$", RegexMode::Prefix);
    let dispatcher = Dispatcher::new(
        config,
        checker(Arc::clone(&dns), Arc::new(StubWhois::failing()), false),
        Arc::new(ResultCache::new(Duration::from_secs(60))),
    );

    assert!(dispatcher.start().unwrap_err().is_config_error());
    assert!(dns.domains_seen().is_empty());
}

#[tokio::test]
async fn test_explicit_generator_still_validates_config() {
    let mut config = fast_config(3, Charset::Digits, 2);
    config.job_queue_capacity = 0;
    let dispatcher = Dispatcher::new(
        config,
        checker(
            Arc::new(StubDns::default()),
            Arc::new(StubWhois::failing()),
            false,
        ),
        Arc::new(ResultCache::new(Duration::from_secs(60))),
    );

    let generator = CandidateGenerator::new(3, "li", Charset::Digits, None).unwrap();
    let err = dispatcher.start_with(generator).unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn test_reserved_classification_needs_no_network() {
    let whois = Arc::new(StubWhois::failing());
    let checker = checker(Arc::new(StubDns::default()), Arc::clone(&whois), false);

    let (verdict, signatures) = tokio_test::block_on(checker.classify("api.li"));
    assert_eq!(verdict, Verdict::Registered);
    assert_eq!(signatures, vec![Signature::Reserved]);
    assert_eq!(whois.calls(), 0);
}
