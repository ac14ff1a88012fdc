//! Multi-source evidence gathering.
//!
//! The prober asks DNS, WHOIS and TLS independently whether anything exists
//! for a name. Every sub-probe is best-effort: failures are logged and the
//! corresponding signal is treated as absent.

use crate::error::ScanError;
use crate::indicators::{
    interpret_availability_response, interpret_sweep_response, AvailabilityOutcome, SweepOutcome,
};
use crate::protocols::{
    DnsLookup, RecordKind, SystemDnsResolver, TlsCertificateProbe, TlsProbe, WhoisClient,
    WhoisQuery, WhoisServer,
};
use crate::types::{ScanConfig, Signature, Verdict, WhoisPolicy};
use futures::future::join_all;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, trace};

/// Outcome of walking the WHOIS server list once.
struct SweepSummary<T> {
    decision: Option<T>,
    responded: bool,
}

/// Gathers raw signals for a domain.
#[derive(Clone)]
pub struct Prober {
    dns: Arc<dyn DnsLookup>,
    whois: Arc<dyn WhoisQuery>,
    tls: Arc<dyn TlsProbe>,
    servers: Vec<WhoisServer>,
    policy: WhoisPolicy,
}

impl Prober {
    /// Assemble a prober from explicit backends.
    pub fn new(
        dns: Arc<dyn DnsLookup>,
        whois: Arc<dyn WhoisQuery>,
        tls: Arc<dyn TlsProbe>,
        servers: Vec<WhoisServer>,
        policy: WhoisPolicy,
    ) -> Self {
        Self {
            dns,
            whois,
            tls,
            servers,
            policy,
        }
    }

    /// Real network backends configured from `config`.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        Ok(Self::new(
            Arc::new(SystemDnsResolver::new()),
            Arc::new(WhoisClient::with_timeout(config.whois_policy.timeout)),
            Arc::new(TlsCertificateProbe::new(config.tls_timeout)?),
            config.whois_servers.clone(),
            config.whois_policy.clone(),
        ))
    }

    /// Collect every signature that fires for `domain`.
    ///
    /// DNS, the WHOIS sweep and TLS run concurrently. The result lists DNS
    /// signatures first, then the WHOIS-derived one, then `SSL`.
    pub async fn probe(&self, domain: &str) -> Vec<Signature> {
        let (dns, whois, tls) = tokio::join!(
            self.dns_signatures(domain),
            self.whois_sweep(domain),
            self.tls_signature(domain),
        );

        let mut signatures = dns;
        signatures.extend(whois);
        signatures.extend(tls);
        debug!(domain = %domain, signatures = ?signatures, "probe finished");
        signatures
    }

    async fn dns_signatures(&self, domain: &str) -> Vec<Signature> {
        let lookups = RecordKind::ALL.iter().map(|&kind| async move {
            match self.dns.has_records(domain, kind).await {
                Ok(true) => Some(kind.signature()),
                Ok(false) => None,
                Err(e) => {
                    trace!(domain = %domain, record = ?kind, error = %e, "DNS lookup failed");
                    None
                }
            }
        });

        join_all(lookups).await.into_iter().flatten().collect()
    }

    async fn tls_signature(&self, domain: &str) -> Option<Signature> {
        match self.tls.has_certificate(domain).await {
            Ok(true) => Some(Signature::Ssl),
            Ok(false) => None,
            Err(e) => {
                trace!(domain = %domain, error = %e, "TLS probe failed");
                None
            }
        }
    }

    /// First pass over the server list: stop at registered or reserved wording.
    async fn whois_sweep(&self, domain: &str) -> Option<Signature> {
        let summary = self
            .sweep(domain, |text| match interpret_sweep_response(text) {
                SweepOutcome::Registered => Some(Signature::Whois),
                SweepOutcome::Reserved => Some(Signature::Reserved),
                SweepOutcome::Inconclusive => None,
            })
            .await;
        summary.decision
    }

    /// Dedicated availability pass, run only when the probe found nothing.
    ///
    /// Returns `Verdict::Unknown` when no server gave a decisive answer; the
    /// caller resolves that to `Registered`.
    pub async fn whois_availability_pass(&self, domain: &str) -> Verdict {
        let summary = self
            .sweep(domain, |text| match interpret_availability_response(text) {
                // Rate limits and outages never count as availability
                AvailabilityOutcome::ServiceError => Some(Verdict::Registered),
                AvailabilityOutcome::Available => Some(Verdict::Available),
                AvailabilityOutcome::Unavailable => Some(Verdict::Registered),
                AvailabilityOutcome::Inconclusive => None,
            })
            .await;

        match summary.decision {
            Some(verdict) => verdict,
            None if summary.responded => {
                debug!(domain = %domain, "availability pass inconclusive");
                Verdict::Unknown
            }
            None => {
                debug!(domain = %domain, "no WHOIS server answered the availability pass");
                Verdict::Unknown
            }
        }
    }

    /// Walk the server list with retries, backoff and pacing.
    ///
    /// `decide` sees each non-empty response; `Some` ends the walk. An
    /// inconclusive response moves on to the next server without retrying.
    async fn sweep<T, F>(&self, domain: &str, decide: F) -> SweepSummary<T>
    where
        F: Fn(&str) -> Option<T> + Send + Sync,
        T: Send,
    {
        let mut responded = false;
        let last = self.servers.len().saturating_sub(1);

        for (index, server) in self.servers.iter().enumerate() {
            for attempt in 0..self.policy.retries {
                match self.query_once(domain, server).await {
                    Ok(text) if !text.trim().is_empty() => {
                        responded = true;
                        if let Some(decision) = decide(&text) {
                            return SweepSummary {
                                decision: Some(decision),
                                responded,
                            };
                        }
                        trace!(domain = %domain, server = %server, "inconclusive WHOIS response");
                        break;
                    }
                    Ok(_) => {
                        trace!(domain = %domain, server = %server, attempt, "empty WHOIS response");
                    }
                    Err(e) => {
                        trace!(domain = %domain, server = %server, attempt, error = %e, "WHOIS query failed");
                    }
                }

                if attempt + 1 < self.policy.retries {
                    sleep(self.policy.backoff(attempt)).await;
                }
            }

            if !server.is_default() && index < last {
                sleep(self.policy.server_delay).await;
            }
        }

        SweepSummary {
            decision: None,
            responded,
        }
    }

    async fn query_once(&self, domain: &str, server: &WhoisServer) -> Result<String, ScanError> {
        timeout(self.policy.timeout, self.whois.query(domain, server))
            .await
            .map_err(|_| ScanError::timeout(format!("WHOIS query to {}", server), self.policy.timeout))?
    }
}
