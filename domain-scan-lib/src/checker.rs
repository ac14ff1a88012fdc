//! Conservative availability classifier.
//!
//! This module provides the `DomainChecker`, which turns the prober's raw
//! signals into a final verdict. The decision is deliberately asymmetric:
//! a domain is only reported available on an explicit "no such object"
//! answer from a WHOIS server. Everything else resolves to registered.

use crate::error::ScanError;
use crate::prober::Prober;
use crate::reserved::is_reserved;
use crate::types::{ScanConfig, ScanResult, Signature, Verdict};
use crate::utils::validate_domain;
use std::time::Instant;
use tracing::debug;

/// Classifies one candidate at a time.
///
/// # Example
///
/// ```rust,no_run
/// use domain_scan_lib::{DomainChecker, ScanConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = DomainChecker::from_config(&ScanConfig::default())?;
///     let result = checker.check_domain("xj9q.li").await?;
///     println!("{} available: {}", result.domain, result.available);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DomainChecker {
    prober: Prober,
}

impl DomainChecker {
    pub fn new(prober: Prober) -> Self {
        Self { prober }
    }

    /// Checker backed by the real DNS, WHOIS and TLS clients.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        Ok(Self::new(Prober::from_config(config)?))
    }

    /// Decide a verdict and collect the signatures that justify it.
    ///
    /// First applicable rule wins:
    /// 1. locally reserved name
    /// 2. any probe signature (`RESERVED`, `DNS_*`, `WHOIS`, `SSL`)
    /// 3. the dedicated WHOIS availability pass
    ///
    /// The returned verdict is never `Unknown`.
    pub async fn classify(&self, domain: &str) -> (Verdict, Vec<Signature>) {
        if is_reserved(domain) {
            debug!(domain = %domain, "reserved by local rules");
            return (Verdict::Registered, vec![Signature::Reserved]);
        }

        let signatures = self.prober.probe(domain).await;
        if !signatures.is_empty() {
            return (Verdict::Registered, signatures);
        }

        let verdict = self.prober.whois_availability_pass(domain).await.resolve();
        (verdict, signatures)
    }

    /// Check a single candidate.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::InvalidDomain` if the name is syntactically
    /// invalid. Network failures never surface here.
    pub async fn check_domain(&self, domain: &str) -> Result<ScanResult, ScanError> {
        validate_domain(domain)?;

        let started = Instant::now();
        let (verdict, signatures) = self.classify(domain).await;

        Ok(ScanResult {
            domain: domain.to_string(),
            available: verdict.is_available(),
            signatures,
            cached: false,
            check_duration: Some(started.elapsed()),
        })
    }
}
