//! DNS record presence checks.
//!
//! Only presence matters: a lookup that returns at least one record of the
//! requested type counts, anything else (including NXDOMAIN and resolver
//! failures) is reported to the caller, which treats it as absent.

use crate::error::ScanError;
use crate::types::Signature;
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::time::Duration;
use tracing::warn;

/// Record types the prober asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Ns,
    A,
    Mx,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Ns, RecordKind::A, RecordKind::Mx];

    pub fn signature(self) -> Signature {
        match self {
            RecordKind::Ns => Signature::DnsNs,
            RecordKind::A => Signature::DnsA,
            RecordKind::Mx => Signature::DnsMx,
        }
    }
}

#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// Whether `domain` has at least one record of `kind`.
    async fn has_records(&self, domain: &str, kind: RecordKind) -> Result<bool, ScanError>;
}

/// Resolver backed by the system configuration.
#[derive(Clone)]
pub struct SystemDnsResolver {
    resolver: TokioAsyncResolver,
}

const DNS_TIMEOUT: Duration = Duration::from_secs(5);

impl SystemDnsResolver {
    /// Use `/etc/resolv.conf` when readable, otherwise the built-in public
    /// resolver set.
    ///
    /// Lookups are attempted once; a failed record type is simply absent.
    pub fn new() -> Self {
        let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(system) => system,
            Err(e) => {
                warn!(error = %e, "failed to read system DNS configuration, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.attempts = 1;
        opts.timeout = DNS_TIMEOUT;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }

    /// Wrap an already configured resolver.
    pub fn with_resolver(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }
}

impl Default for SystemDnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsLookup for SystemDnsResolver {
    async fn has_records(&self, domain: &str, kind: RecordKind) -> Result<bool, ScanError> {
        // Trailing dot keeps search domains from being appended
        let fqdn = format!("{}.", domain.trim_end_matches('.'));

        let found = match kind {
            RecordKind::Ns => self.resolver.ns_lookup(fqdn.as_str()).await?.iter().next().is_some(),
            RecordKind::A => self.resolver.lookup_ip(fqdn.as_str()).await?.iter().next().is_some(),
            RecordKind::Mx => self.resolver.mx_lookup(fqdn.as_str()).await?.iter().next().is_some(),
        };
        Ok(found)
    }
}
