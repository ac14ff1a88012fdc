//! Network collaborators used by the prober.
//!
//! Each protocol sits behind a small async trait so the prober and the
//! classifier can be driven by stub backends in tests.

/// DNS record presence checks
pub mod dns;

/// WHOIS over TCP port 43, with IANA referral for the default flow
pub mod whois;

/// TLS certificate presence check
pub mod tls;

pub use dns::{DnsLookup, RecordKind, SystemDnsResolver};
pub use tls::{TlsCertificateProbe, TlsProbe};
pub use whois::{IanaReferral, WhoisClient, WhoisQuery, WhoisServer, DEFAULT_WHOIS_SERVERS};
