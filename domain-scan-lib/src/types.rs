//! Core data types for domain scanning.
//!
//! This module defines the data model shared by every stage of the pipeline:
//! probe signatures, verdicts, scan results, the fixed run configuration and
//! the lock-free progress counters.

use crate::error::ScanError;
use crate::protocols::whois::{default_whois_servers, WhoisServer};
use crate::utils::{is_valid_label, normalize_suffix};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Which signal produced positive evidence for a domain.
///
/// A probe accumulates zero or more signatures. Insertion order is kept for
/// display only; `Reserved` and `Whois` additionally end the WHOIS sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signature {
    #[serde(rename = "DNS_NS")]
    DnsNs,
    #[serde(rename = "DNS_A")]
    DnsA,
    #[serde(rename = "DNS_MX")]
    DnsMx,
    #[serde(rename = "WHOIS")]
    Whois,
    #[serde(rename = "RESERVED")]
    Reserved,
    #[serde(rename = "SSL")]
    Ssl,
}

impl Signature {
    /// The tag used in console output and result files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signature::DnsNs => "DNS_NS",
            Signature::DnsA => "DNS_A",
            Signature::DnsMx => "DNS_MX",
            Signature::Whois => "WHOIS",
            Signature::Reserved => "RESERVED",
            Signature::Ssl => "SSL",
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification outcome.
///
/// `Unknown` only exists inside the classifier. It is collapsed to
/// `Registered` by [`Verdict::resolve`] before anything is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Available,
    Registered,
    Unknown,
}

impl Verdict {
    /// Collapse an undecided verdict to `Registered`.
    pub fn resolve(self) -> Verdict {
        match self {
            Verdict::Unknown => Verdict::Registered,
            decided => decided,
        }
    }

    /// Whether the resolved verdict reports the domain as available.
    pub fn is_available(self) -> bool {
        self.resolve() == Verdict::Available
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Available => write!(f, "AVAILABLE"),
            Verdict::Registered => write!(f, "REGISTERED"),
            Verdict::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Character set the generator enumerates labels over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    /// `0-9`
    Digits,
    /// `a-z`
    Letters,
    /// `a-z` followed by `0-9`
    Alphanumeric,
}

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

impl Charset {
    /// Symbols in enumeration order.
    pub fn symbols(&self) -> &'static [u8] {
        match self {
            Charset::Digits => DIGITS,
            Charset::Letters => LETTERS,
            Charset::Alphanumeric => ALPHANUMERIC,
        }
    }

    pub fn size(&self) -> usize {
        self.symbols().len()
    }

    /// Short selector used on the command line and in result file names.
    pub fn selector(&self) -> &'static str {
        match self {
            Charset::Digits => "d",
            Charset::Letters => "D",
            Charset::Alphanumeric => "a",
        }
    }
}

impl FromStr for Charset {
    type Err = ScanError;

    /// Accepts the short selectors `d`, `D`, `a` (case-sensitive) and the
    /// long names `digits`, `letters`, `alphanumeric` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "d" => return Ok(Charset::Digits),
            "D" => return Ok(Charset::Letters),
            "a" => return Ok(Charset::Alphanumeric),
            _ => {}
        }

        match s.trim().to_lowercase().as_str() {
            "digits" | "numbers" => Ok(Charset::Digits),
            "letters" => Ok(Charset::Letters),
            "alphanumeric" | "alnum" => Ok(Charset::Alphanumeric),
            _ => Err(ScanError::config(format!(
                "Invalid charset selector '{}'. Use d (digits), D (letters) or a (alphanumeric)",
                s
            ))),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Charset::Digits => write!(f, "digits"),
            Charset::Letters => write!(f, "letters"),
            Charset::Alphanumeric => write!(f, "alphanumeric"),
        }
    }
}

/// What the filter pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegexMode {
    /// Label plus suffix, e.g. `ab1.li`
    #[default]
    Full,
    /// Label only, before the suffix is appended, e.g. `ab1`
    Prefix,
}

impl FromStr for RegexMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(RegexMode::Full),
            "prefix" => Ok(RegexMode::Prefix),
            _ => Err(ScanError::config(format!(
                "Invalid regex mode '{}'. Use 'full' or 'prefix'",
                s
            ))),
        }
    }
}

impl fmt::Display for RegexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegexMode::Full => write!(f, "full"),
            RegexMode::Prefix => write!(f, "prefix"),
        }
    }
}

/// Final, surfaced result for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// The candidate that was checked (e.g., "ab1.li")
    pub domain: String,

    /// Resolved verdict; never `Unknown`
    pub available: bool,

    /// Signals that justified the verdict, in the order they fired
    pub signatures: Vec<Signature>,

    /// Whether the verdict was served from the result cache
    pub cached: bool,

    /// How long classification took (absent for cache hits)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_duration: Option<Duration>,
}

impl ScanResult {
    pub fn verdict(&self) -> Verdict {
        if self.available {
            Verdict::Available
        } else {
            Verdict::Registered
        }
    }

    /// Comma-separated signature tags, e.g. `DNS_NS, WHOIS`.
    pub fn signature_list(&self) -> String {
        self.signatures
            .iter()
            .map(Signature::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Retry and pacing policy shared by both WHOIS passes.
#[derive(Debug, Clone, PartialEq)]
pub struct WhoisPolicy {
    /// Attempts per server
    pub retries: u32,
    /// Backoff before retry `n` is `base_delay * 2^n`
    pub base_delay: Duration,
    /// Flat pause after finishing with an explicit server
    pub server_delay: Duration,
    /// Upper bound for a single query
    pub timeout: Duration,
}

impl Default for WhoisPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_secs(2),
            server_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

impl WhoisPolicy {
    /// Backoff to wait after failed attempt number `attempt` (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Fixed configuration for one scan run.
///
/// Built once at startup (defaults < config files < environment < CLI) and
/// never mutated after the dispatcher starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Label length in characters
    /// Default: 3, Range: 1-12
    pub length: usize,

    /// Suffix appended to every label, always with a leading dot
    /// Default: ".li"
    pub suffix: String,

    /// Charset the labels are built from
    pub charset: Charset,

    /// Optional filter pattern, compiled by the pattern guard
    pub pattern: Option<String>,

    /// Whether the filter sees the full domain or the label only
    pub regex_mode: RegexMode,

    /// Number of concurrent workers
    /// Default: 10, Range: 1-100
    pub workers: usize,

    /// Pause each worker takes after every candidate
    /// Default: 1 second
    #[serde(skip)]
    pub delay: Duration,

    /// Whether registered domains are reported, not only available ones
    pub show_registered: bool,

    /// WHOIS servers in probing order; the first is the default referral flow
    #[serde(skip)]
    pub whois_servers: Vec<WhoisServer>,

    /// Retry, backoff and pacing for WHOIS
    #[serde(skip)]
    pub whois_policy: WhoisPolicy,

    /// Connect and handshake bound for the TLS probe
    /// Default: 5 seconds
    #[serde(skip)]
    pub tls_timeout: Duration,

    /// Time budget for a single pattern match
    /// Default: 100 milliseconds
    #[serde(skip)]
    pub match_budget: Duration,

    /// Maximum age of a cached verdict
    /// Default: 24 hours
    #[serde(skip)]
    pub cache_ttl: Duration,

    /// Interval of the background cache sweep
    /// Default: 1 hour
    #[serde(skip)]
    pub sweep_interval: Duration,

    /// Bounded job queue size (backpressure on the generator)
    pub job_queue_capacity: usize,

    /// Bounded result queue size (backpressure on the workers)
    pub result_queue_capacity: usize,

    /// Time in-flight workers get once the job queue has drained
    /// Default: 60 seconds
    #[serde(skip)]
    pub grace_period: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            length: 3,
            suffix: ".li".to_string(),
            charset: Charset::Letters,
            pattern: None,
            regex_mode: RegexMode::Full,
            workers: 10,
            delay: Duration::from_millis(1000),
            show_registered: false,
            whois_servers: default_whois_servers(),
            whois_policy: WhoisPolicy::default(),
            tls_timeout: Duration::from_secs(5),
            match_budget: Duration::from_millis(100),
            cache_ttl: Duration::from_secs(24 * 3600),
            sweep_interval: Duration::from_secs(3600),
            job_queue_capacity: 1000,
            result_queue_capacity: 1000,
            grace_period: Duration::from_secs(60),
        }
    }
}

impl ScanConfig {
    /// Set the label length.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Set the suffix; a missing leading dot is added.
    pub fn with_suffix<S: AsRef<str>>(mut self, suffix: S) -> Self {
        self.suffix = normalize_suffix(suffix.as_ref());
        self
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Set the filter pattern and the mode it is matched in.
    pub fn with_pattern<P: Into<String>>(mut self, pattern: P, mode: RegexMode) -> Self {
        let pattern = pattern.into();
        self.pattern = if pattern.is_empty() {
            None
        } else {
            Some(pattern)
        };
        self.regex_mode = mode;
        self
    }

    /// Set the worker count. Automatically capped at 100.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, 100);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_show_registered(mut self, enabled: bool) -> Self {
        self.show_registered = enabled;
        self
    }

    pub fn with_whois_servers(mut self, servers: Vec<WhoisServer>) -> Self {
        self.whois_servers = servers;
        self
    }

    pub fn with_whois_policy(mut self, policy: WhoisPolicy) -> Self {
        self.whois_policy = policy;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Check the configuration before a run starts.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.length == 0 || self.length > 12 {
            return Err(ScanError::config("Length must be between 1 and 12"));
        }
        if self.workers == 0 || self.workers > 100 {
            return Err(ScanError::config("Workers must be between 1 and 100"));
        }
        let suffix_labels = self.suffix.strip_prefix('.').unwrap_or("");
        if suffix_labels.is_empty() || !suffix_labels.split('.').all(is_valid_label) {
            return Err(ScanError::config(format!(
                "Invalid suffix '{}'. Use something like '.li'",
                self.suffix
            )));
        }
        if self.job_queue_capacity == 0 || self.result_queue_capacity == 0 {
            return Err(ScanError::config("Queue capacities must be positive"));
        }
        if self.whois_policy.retries == 0 {
            return Err(ScanError::config("WHOIS retries must be at least 1"));
        }
        if self.sweep_interval.is_zero() {
            return Err(ScanError::config("Cache sweep interval must be positive"));
        }
        if self.grace_period.is_zero() {
            return Err(ScanError::config("Grace period must be positive"));
        }
        Ok(())
    }

    /// Candidates the unfiltered search space holds, or `None` on overflow.
    pub fn search_space(&self) -> Option<u64> {
        (self.charset.size() as u64).checked_pow(u32::try_from(self.length).ok()?)
    }
}

/// Lock-free progress counters shared by the generator and the workers.
#[derive(Debug, Default)]
pub struct ScanStats {
    total: AtomicU64,
    examined: AtomicU64,
    generated: AtomicU64,
    processed: AtomicU64,
    available: AtomicU64,
    registered: AtomicU64,
    cache_hits: AtomicU64,
    reserved: AtomicU64,
}

/// Point-in-time copy of [`ScanStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Unfiltered search space size
    pub total: u64,
    /// Counter positions visited, filtered or not
    pub examined: u64,
    /// Candidates that passed the filter and were queued
    pub generated: u64,
    /// Results published by workers
    pub processed: u64,
    pub available: u64,
    pub registered: u64,
    pub cache_hits: u64,
    pub reserved: u64,
}

impl ScanStats {
    pub fn new(total: u64) -> Self {
        let stats = Self::default();
        stats.total.store(total, Ordering::Relaxed);
        stats
    }

    pub(crate) fn set_examined(&self, examined: u64) {
        self.examined.store(examined, Ordering::Relaxed);
    }

    pub(crate) fn record_generated(&self) {
        self.generated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_result(&self, result: &ScanResult) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if result.available {
            self.available.fetch_add(1, Ordering::Relaxed);
        } else {
            self.registered.fetch_add(1, Ordering::Relaxed);
        }
        if result.cached {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        if result.signatures.contains(&Signature::Reserved) {
            self.reserved.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total.load(Ordering::Relaxed),
            examined: self.examined.load(Ordering::Relaxed),
            generated: self.generated.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            available: self.available.load(Ordering::Relaxed),
            registered: self.registered.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            reserved: self.reserved.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_resolves_to_registered() {
        assert_eq!(Verdict::Unknown.resolve(), Verdict::Registered);
        assert_eq!(Verdict::Available.resolve(), Verdict::Available);
        assert!(!Verdict::Unknown.is_available());
        assert!(Verdict::Available.is_available());
    }

    #[test]
    fn test_charset_selectors() {
        assert_eq!("d".parse::<Charset>().unwrap(), Charset::Digits);
        assert_eq!("D".parse::<Charset>().unwrap(), Charset::Letters);
        assert_eq!("a".parse::<Charset>().unwrap(), Charset::Alphanumeric);
        assert_eq!("Letters".parse::<Charset>().unwrap(), Charset::Letters);
        assert!("x".parse::<Charset>().unwrap_err().is_config_error());
        assert!("A".parse::<Charset>().is_err());
    }

    #[test]
    fn test_charset_sizes() {
        assert_eq!(Charset::Digits.size(), 10);
        assert_eq!(Charset::Letters.size(), 26);
        assert_eq!(Charset::Alphanumeric.size(), 36);
        assert_eq!(Charset::Alphanumeric.symbols()[26], b'0');
    }

    #[test]
    fn test_regex_mode_parsing() {
        assert_eq!("full".parse::<RegexMode>().unwrap(), RegexMode::Full);
        assert_eq!("PREFIX".parse::<RegexMode>().unwrap(), RegexMode::Prefix);
        assert!("suffix".parse::<RegexMode>().unwrap_err().is_config_error());
    }

    #[test]
    fn test_signature_list_keeps_order() {
        let result = ScanResult {
            domain: "ab.li".to_string(),
            available: false,
            signatures: vec![Signature::DnsNs, Signature::Ssl],
            cached: false,
            check_duration: None,
        };
        assert_eq!(result.signature_list(), "DNS_NS, SSL");
        assert_eq!(result.verdict(), Verdict::Registered);
        assert_eq!(Signature::Reserved.to_string(), "RESERVED");
    }

    #[test]
    fn test_whois_backoff_doubles() {
        let policy = WhoisPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(2));
        assert_eq!(policy.backoff(1), Duration::from_secs(4));
        assert_eq!(policy.backoff(2), Duration::from_secs(8));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search_space(), Some(26u64.pow(3)));
        assert_eq!(config.whois_servers.len(), 8);
    }

    #[test]
    fn test_config_builders() {
        let config = ScanConfig::default()
            .with_suffix("io")
            .with_workers(500)
            .with_pattern("", RegexMode::Prefix);
        assert_eq!(config.suffix, ".io");
        assert_eq!(config.workers, 100);
        assert_eq!(config.pattern, None);
        assert_eq!(config.regex_mode, RegexMode::Prefix);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(ScanConfig::default().with_length(0).validate().is_err());
        assert!(ScanConfig::default().with_length(13).validate().is_err());

        let mut config = ScanConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());

        let mut config = ScanConfig::default();
        config.suffix = ".".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_suffix_rejected() {
        for suffix in ["li.", ".l_i", "..li", "co..uk", "-li"] {
            let err = ScanConfig::default().with_suffix(suffix).validate().unwrap_err();
            assert!(err.is_config_error(), "suffix {suffix:?} should be rejected");
        }
        assert!(ScanConfig::default().with_suffix("co.uk").validate().is_ok());
        assert!(ScanConfig::default().with_suffix(".CH").validate().is_ok());
    }

    #[test]
    fn test_zero_durations_rejected() {
        let mut config = ScanConfig::default();
        config.sweep_interval = Duration::ZERO;
        assert!(config.validate().unwrap_err().is_config_error());

        let config = ScanConfig::default().with_grace_period(Duration::ZERO);
        assert!(config.validate().unwrap_err().is_config_error());
    }

    #[test]
    fn test_stats_record_result() {
        let stats = ScanStats::new(100);
        stats.record_generated();
        stats.record_result(&ScanResult {
            domain: "www.li".to_string(),
            available: false,
            signatures: vec![Signature::Reserved],
            cached: true,
            check_duration: None,
        });

        let snap = stats.snapshot();
        assert_eq!(snap.total, 100);
        assert_eq!(snap.generated, 1);
        assert_eq!(snap.processed, 1);
        assert_eq!(snap.registered, 1);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.reserved, 1);
        assert_eq!(snap.available, 0);
    }
}
