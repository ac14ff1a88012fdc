//! # Domain Scan Library
//!
//! Enumerates every domain name of a fixed length over a charset and
//! classifies each one as available or registered from DNS, WHOIS and TLS
//! signals.
//!
//! Classification is conservative: a name is reported available only when
//! a WHOIS server explicitly answers "no such object". Timeouts, refusals
//! and rate limits all lean towards "registered".
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_scan_lib::{Charset, Dispatcher, ScanConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig::default()
//!         .with_length(3)
//!         .with_suffix(".li")
//!         .with_charset(Charset::Letters);
//!
//!     let mut scan = Dispatcher::from_config(config)?.start()?;
//!     while let Some(result) = scan.next_result().await {
//!         if result.available {
//!             println!("{} is available", result.domain);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Components
//!
//! - **Pattern guard**: rejects filter patterns likely to be expensive
//! - **Candidate generator**: lazy odometer over the search space
//! - **Reserved filter**: local rules that mark names registered without probing
//! - **Prober**: DNS NS/A/MX, multi-server WHOIS sweep, TLS certificate check
//! - **Result cache**: TTL memo with a background sweep
//! - **Dispatcher**: bounded queues and a fixed worker pool

// Re-export main public API types and functions
pub use cache::{CachedVerdict, ResultCache, SweeperHandle};
pub use checker::DomainChecker;
pub use concurrent::{Dispatcher, ScanHandle, StopHandle};
pub use config::{
    load_env_config, load_env_config_from, parse_duration_string, ConfigManager, EnvConfig,
    FileConfig,
};
pub use error::ScanError;
pub use generate::{estimate_total, CandidateGenerator};
pub use pattern::PatternGuard;
pub use prober::Prober;
pub use protocols::{
    DnsLookup, RecordKind, SystemDnsResolver, TlsCertificateProbe, TlsProbe, WhoisClient,
    WhoisQuery, WhoisServer, DEFAULT_WHOIS_SERVERS,
};
pub use reserved::is_reserved;
pub use types::{
    Charset, ProgressSnapshot, RegexMode, ScanConfig, ScanResult, ScanStats, Signature, Verdict,
    WhoisPolicy,
};
pub use utils::{normalize_suffix, validate_domain};

// Public modules
pub mod generate;
pub mod indicators;
pub mod pattern;
pub mod protocols;
pub mod reserved;

// Internal modules
mod cache;
mod checker;
mod concurrent;
mod config;
mod error;
mod prober;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScanError>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
