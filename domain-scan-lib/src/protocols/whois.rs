//! WHOIS queries over TCP port 43.
//!
//! A query is the domain followed by CRLF; the response is whatever text the
//! server writes before closing the connection. The first entry of the
//! server list is the default flow: ask `whois.iana.org` which server is
//! authoritative for the suffix, then query that server.

use crate::error::ScanError;
use crate::utils::top_level_label;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Server list in probing order. The empty entry selects the default flow.
pub const DEFAULT_WHOIS_SERVERS: &[&str] = &[
    "",
    "whois.nic.li:43",
    "whois.nic.cx:43",
    "whois.nic.cz:43",
    "whois.verisign-grs.com:43",
    "whois.porkbun.com:43",
    "whois.godaddy.com:43",
    "whois.internic.net:43",
];

const IANA_WHOIS: &str = "whois.iana.org:43";
const WHOIS_PORT: u16 = 43;

/// Upper bound for a single response; registries send a few KiB at most.
const MAX_RESPONSE_BYTES: u64 = 256 * 1024;

/// One entry of the WHOIS server list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WhoisServer {
    /// Resolve the authoritative server through IANA
    Default,
    /// Explicit `host:port`
    Explicit(String),
}

impl WhoisServer {
    /// Parse a list entry. An empty string selects the default flow and a
    /// missing port defaults to 43.
    pub fn parse(entry: &str) -> Self {
        let entry = entry.trim();
        if entry.is_empty() {
            WhoisServer::Default
        } else if entry.contains(':') {
            WhoisServer::Explicit(entry.to_string())
        } else {
            WhoisServer::Explicit(format!("{}:{}", entry, WHOIS_PORT))
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, WhoisServer::Default)
    }
}

impl fmt::Display for WhoisServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhoisServer::Default => write!(f, "default (IANA referral)"),
            WhoisServer::Explicit(addr) => write!(f, "{}", addr),
        }
    }
}

/// The built-in server list, parsed.
pub fn default_whois_servers() -> Vec<WhoisServer> {
    DEFAULT_WHOIS_SERVERS
        .iter()
        .map(|entry| WhoisServer::parse(entry))
        .collect()
}

#[async_trait]
pub trait WhoisQuery: Send + Sync {
    /// Raw response text for `domain` from `server`.
    async fn query(&self, domain: &str, server: &WhoisServer) -> Result<String, ScanError>;
}

/// What an IANA reply says about a suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IanaReferral {
    /// Authoritative WHOIS server for the suffix
    Server(String),
    /// A real TLD record that names no WHOIS server
    NoServer,
    /// Rate limit notice, truncated or garbage reply; says nothing about the suffix
    Unusable,
}

impl IanaReferral {
    /// Whether the answer describes the suffix and may be remembered.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, IanaReferral::Unusable)
    }
}

/// Classify an IANA reply. Only a reply carrying a `domain:` line is a TLD
/// record; anything else without a referral is unusable.
pub fn interpret_iana_reply(response: &str) -> IanaReferral {
    if let Some(server) = parse_iana_refer_response(response) {
        return IanaReferral::Server(server);
    }
    let is_tld_record = response
        .lines()
        .any(|line| line.trim_start().to_lowercase().starts_with("domain:"));
    if is_tld_record {
        IanaReferral::NoServer
    } else {
        IanaReferral::Unusable
    }
}

/// WHOIS client speaking the port 43 protocol directly.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    /// Timeout for a single query, connect included
    timeout: Duration,
    /// Where referral lookups go
    iana: String,
    /// Referral per suffix, shared by clones
    referrals: Arc<Mutex<HashMap<String, IanaReferral>>>,
}

impl WhoisClient {
    /// Create a new WHOIS client with default settings.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(10))
    }

    /// Create a new WHOIS client with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            iana: IANA_WHOIS.to_string(),
            referrals: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Send referral lookups to `address` instead of `whois.iana.org`.
    pub fn with_referral_server<A: Into<String>>(mut self, address: A) -> Self {
        self.iana = address.into();
        self
    }

    /// Send one query to `address` and read until the server closes.
    async fn query_address(&self, address: &str, query: &str) -> Result<String, ScanError> {
        let exchange = async {
            let mut stream = TcpStream::connect(address).await?;
            stream.write_all(format!("{}\r\n", query).as_bytes()).await?;

            let mut buf = Vec::new();
            (&mut stream)
                .take(MAX_RESPONSE_BYTES)
                .read_to_end(&mut buf)
                .await?;
            Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ScanError::whois(
                query,
                format!("query to {} failed: {}", address, e),
            )),
            Err(_) => Err(ScanError::timeout(
                format!("WHOIS query to {}", address),
                self.timeout,
            )),
        }
    }

    /// Authoritative server for the suffix of `domain`, via IANA.
    ///
    /// Unusable replies are not remembered, so the next query asks again.
    async fn referral_server(&self, domain: &str) -> Result<IanaReferral, ScanError> {
        let tld = top_level_label(domain).to_lowercase();

        if let Some(cached) = self.cached_referral(&tld) {
            return Ok(cached);
        }

        let response = self.query_address(&self.iana, &tld).await?;
        let referral = interpret_iana_reply(&response);
        debug!(tld = %tld, referral = ?referral, "IANA referral");
        if referral.is_cacheable() {
            self.cache_referral(&tld, referral.clone());
        }
        Ok(referral)
    }

    fn cached_referral(&self, tld: &str) -> Option<IanaReferral> {
        self.referrals.lock().ok()?.get(tld).cloned()
    }

    fn cache_referral(&self, tld: &str, referral: IanaReferral) {
        if let Ok(mut cache) = self.referrals.lock() {
            cache.insert(tld.to_string(), referral);
        }
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WhoisQuery for WhoisClient {
    async fn query(&self, domain: &str, server: &WhoisServer) -> Result<String, ScanError> {
        match server {
            WhoisServer::Explicit(address) => self.query_address(address, domain).await,
            WhoisServer::Default => match self.referral_server(domain).await? {
                IanaReferral::Server(host) => {
                    let address = if host.contains(':') {
                        host
                    } else {
                        format!("{}:{}", host, WHOIS_PORT)
                    };
                    trace!(domain = %domain, server = %address, "following referral");
                    self.query_address(&address, domain).await
                }
                // IANA's own record for the suffix says nothing about the domain
                IanaReferral::NoServer => Err(ScanError::whois(
                    domain,
                    "no authoritative WHOIS server for this suffix",
                )),
                IanaReferral::Unusable => {
                    Err(ScanError::whois(domain, "IANA reply carried no referral"))
                }
            },
        }
    }
}

/// Parse an IANA WHOIS response for the authoritative WHOIS server.
///
/// The IANA WHOIS response may use either `refer:` or `whois:` to indicate
/// the authoritative WHOIS server for a TLD. We check both fields, preferring
/// `refer:` when present.
///
/// ```text
/// whois:        whois.nic.li
/// refer:        whois.nic.li
/// ```
pub fn parse_iana_refer_response(response: &str) -> Option<String> {
    let mut whois_server = None;

    for line in response.lines() {
        let line_trimmed = line.trim();
        if let Some(server) = line_trimmed.strip_prefix("refer:") {
            let server = server.trim();
            if !server.is_empty() {
                return Some(server.to_string());
            }
        } else if let Some(server) = line_trimmed.strip_prefix("whois:") {
            let server = server.trim();
            if !server.is_empty() {
                whois_server = Some(server.to_string());
            }
        }
    }

    whois_server
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_server_parsing() {
        assert_eq!(WhoisServer::parse(""), WhoisServer::Default);
        assert_eq!(
            WhoisServer::parse("whois.nic.li:43"),
            WhoisServer::Explicit("whois.nic.li:43".to_string())
        );
        assert_eq!(
            WhoisServer::parse("whois.nic.ch"),
            WhoisServer::Explicit("whois.nic.ch:43".to_string())
        );
    }

    #[test]
    fn test_default_server_list() {
        let servers = default_whois_servers();
        assert_eq!(servers.len(), 8);
        assert!(servers[0].is_default());
        assert!(servers[1..].iter().all(|s| !s.is_default()));
        assert_eq!(servers[1].to_string(), "whois.nic.li:43");
    }

    #[test]
    fn test_whois_client_creation() {
        let client = WhoisClient::new();
        assert_eq!(client.timeout, Duration::from_secs(10));

        let custom_client = WhoisClient::with_timeout(Duration::from_secs(3));
        assert_eq!(custom_client.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_parse_iana_refer_response() {
        let response = "% IANA WHOIS server\n% for more information on IANA, visit http://www.iana.org\n\nrefer:        whois.nic.li\n\ndomain:       LI\n";
        assert_eq!(
            parse_iana_refer_response(response),
            Some("whois.nic.li".to_string())
        );

        let no_refer = "% IANA WHOIS server\ndomain: TEST\nstatus: ACTIVE\n";
        assert_eq!(parse_iana_refer_response(no_refer), None);

        let empty_refer = "refer:        \ndomain: LI\n";
        assert_eq!(parse_iana_refer_response(empty_refer), None);

        let whois_field = "% IANA WHOIS server\n\nwhois:        whois.nic.ch\n\ndomain:       CH\n";
        assert_eq!(
            parse_iana_refer_response(whois_field),
            Some("whois.nic.ch".to_string())
        );

        let both_fields = "whois:        whois.old-server.li\nrefer:        whois.nic.li\n";
        assert_eq!(
            parse_iana_refer_response(both_fields),
            Some("whois.nic.li".to_string())
        );
    }

    #[test]
    fn test_interpret_iana_reply() {
        let referral = "refer:        whois.nic.li\n\ndomain:       LI\n";
        assert_eq!(
            interpret_iana_reply(referral),
            IanaReferral::Server("whois.nic.li".to_string())
        );

        let tld_without_server = "% IANA WHOIS server\ndomain: TEST\nstatus: ACTIVE\n";
        assert_eq!(interpret_iana_reply(tld_without_server), IanaReferral::NoServer);
        assert!(IanaReferral::NoServer.is_cacheable());

        for reply in ["% rate limited\n", "garbage", "% Error: 55000000002 Connection refused"] {
            let referral = interpret_iana_reply(reply);
            assert_eq!(referral, IanaReferral::Unusable, "reply {reply:?}");
            assert!(!referral.is_cacheable());
        }
    }

    /// Serve `replies` in order, one per connection, then close.
    async fn scripted_server(replies: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let queries = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&queries);

        tokio::spawn(async move {
            for reply in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 128];
                let n = socket.read(&mut buf).await.unwrap();
                let query = String::from_utf8_lossy(&buf[..n]).trim().to_string();
                seen.lock().unwrap().push(query);
                socket.write_all(reply.as_bytes()).await.unwrap();
            }
        });

        (address, queries)
    }

    #[tokio::test]
    async fn test_unusable_referral_is_not_cached() {
        let tld_record = "domain:       LI\nchanged:      2024-01-01\n";
        let (iana, queries) =
            scripted_server(vec!["% rate limited\n".to_string(), tld_record.to_string()]).await;
        let client = WhoisClient::with_timeout(Duration::from_secs(2)).with_referral_server(iana);

        // A rate-limit notice fails the query instead of querying IANA with the domain
        let err = client.query("xj9q.li", &WhoisServer::Default).await.unwrap_err();
        assert!(err.is_retryable());

        // The next query asks IANA again; a TLD record without a server is remembered
        assert!(client.query("zq7w.li", &WhoisServer::Default).await.is_err());
        assert!(client.query("zq7x.li", &WhoisServer::Default).await.is_err());

        assert_eq!(*queries.lock().unwrap(), vec!["li".to_string(), "li".to_string()]);
    }

    #[tokio::test]
    async fn test_referral_is_followed_and_cached() {
        let (registry, registry_queries) = scripted_server(vec![
            "No match for \"XJ9Q.LI\".\n".to_string(),
            "No match\n".to_string(),
        ])
        .await;
        let referral = format!("refer:        {}\ndomain:       LI\n", registry);
        let (iana, iana_queries) = scripted_server(vec![referral]).await;
        let client = WhoisClient::with_timeout(Duration::from_secs(2)).with_referral_server(iana);

        let first = client.query("xj9q.li", &WhoisServer::Default).await.unwrap();
        assert!(first.contains("No match"));
        let clone = client.clone();
        assert!(clone.query("zq7w.li", &WhoisServer::Default).await.is_ok());

        assert_eq!(iana_queries.lock().unwrap().len(), 1);
        assert_eq!(
            *registry_queries.lock().unwrap(),
            vec!["xj9q.li".to_string(), "zq7w.li".to_string()]
        );
    }

    #[tokio::test]
    async fn test_query_explicit_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = socket.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"xj9q.li\r\n");
            socket
                .write_all(b"No match for domain \"XJ9Q.LI\".\n")
                .await
                .unwrap();
        });

        let client = WhoisClient::new();
        let response = client
            .query("xj9q.li", &WhoisServer::Explicit(address))
            .await
            .unwrap();
        assert!(response.contains("No match"));
    }

    #[tokio::test]
    async fn test_query_connection_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = WhoisClient::with_timeout(Duration::from_secs(2));
        let err = client
            .query("xj9q.li", &WhoisServer::Explicit(address))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
