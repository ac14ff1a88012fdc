//! Local reserved-name filter.
//!
//! Names that registries hold back (infrastructure terms, well-known brands,
//! very short labels) are recognised here before any network probe runs.
//! The filter is advisory: a miss says nothing about availability.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

const COMMON_WORDS: &[&str] = &[
    "www", "ftp", "mail", "email", "smtp", "pop", "imap", "ns", "dns", "mx", "admin", "root",
    "test", "demo", "example", "localhost", "api", "app", "web", "site", "blog", "shop", "store",
    "com", "net", "org", "gov", "edu", "mil", "int", "info", "biz", "name", "pro", "museum",
    "coop", "aero", "jobs", "mobi", "travel", "xxx", "tel", "asia", "cat", "post", "geo",
];

const SERVICE_NAMES: &[&str] = &[
    "google", "facebook", "twitter", "youtube", "amazon", "microsoft", "apple", "netflix",
    "instagram", "linkedin", "whatsapp", "telegram", "github", "gitlab", "bitbucket",
    "stackoverflow", "reddit", "wikipedia", "cloudflare", "aws", "azure", "docker",
    "kubernetes", "nginx", "apache", "mysql", "postgresql", "mongodb", "redis", "stripe",
    "paypal", "bitcoin", "ethereum", "wordpress", "shopify", "zoom", "slack",
];

const GENERIC_TERMS: &[&str] = &[
    "login", "register", "signup", "signin", "logout", "profile", "account", "dashboard",
    "settings", "config", "preferences", "privacy", "security", "terms", "conditions", "policy",
    "legal", "help", "support", "contact", "about", "faq", "news", "press", "media", "careers",
    "team", "company", "home", "index", "main", "default", "landing", "welcome", "hello",
    "start", "begin", "download", "upload", "search", "find", "discover", "explore", "browse",
    "navigate", "menu", "navbar",
];

const TECHNICAL_PREFIXES: &[&str] = &[
    "localhost", "dns", "ns", "mx", "mail", "smtp", "pop", "imap", "ftp", "www", "web", "server",
    "host", "node", "db", "cache", "cdn", "api", "app", "admin", "root", "sys", "net", "org",
    "gov", "edu", "mil", "int", "com", "info", "biz", "name", "pro",
];

const IP_OCTETS: &[&str] = &["127", "192", "10", "172", "255"];

/// Words every per-suffix list below starts from.
const SUFFIX_BASE: &[&str] = &[
    "com", "net", "org", "edu", "gov", "mil", "int", "www", "ftp", "mail", "email", "smtp", "pop",
    "imap", "dns", "ns", "mx", "web", "site", "blog", "shop", "store", "app", "api", "admin",
    "root", "test", "demo", "example", "localhost",
];

const SUFFIX_EXTRAS: &[(&str, &[&str])] = &[
    (
        ".com",
        &[
            "google", "facebook", "twitter", "youtube", "amazon", "microsoft", "apple", "netflix",
            "instagram", "linkedin",
        ],
    ),
    (
        ".net",
        &["network", "internet", "intranet", "extranet", "lan", "wan", "vpn"],
    ),
    (
        ".org",
        &["organization", "foundation", "charity", "nonprofit", "ngo"],
    ),
    (
        ".li",
        &["li", "liechtenstein", "principality", "government", "official", "royal"],
    ),
    (
        ".io",
        &["io", "input", "output", "tech", "technology", "startup", "developer"],
    ),
    (
        ".ai",
        &["ai", "artificial", "intelligence", "machine", "learning", "neural", "deep"],
    ),
    (
        ".de",
        &["de", "deutschland", "german", "germany", "berlin", "munich", "hamburg"],
    ),
];

lazy_static! {
    static ref RESERVED_WORDS: HashSet<&'static str> = COMMON_WORDS
        .iter()
        .chain(SERVICE_NAMES)
        .chain(GENERIC_TERMS)
        .copied()
        .collect();

    static ref TECHNICAL_PREFIX_SET: HashSet<&'static str> =
        TECHNICAL_PREFIXES.iter().copied().collect();

    // single letter, two letters, 2-3 digits, length <= 2
    static ref STRUCTURAL_PATTERNS: Vec<Regex> = ["^[a-z]$", "^[a-z]{2}$", "^[0-9]{2,3}$", "^.{1,2}$"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect();

    static ref SUFFIX_RESERVED: HashMap<&'static str, HashSet<&'static str>> = SUFFIX_EXTRAS
        .iter()
        .map(|(suffix, extras)| {
            let words: HashSet<&'static str> = SUFFIX_BASE.iter().chain(extras.iter()).copied().collect();
            (*suffix, words)
        })
        .collect();
}

/// Whether `domain` is reserved by any local rule.
///
/// ```
/// use domain_scan_lib::reserved::is_reserved;
///
/// assert!(is_reserved("www.li"));
/// assert!(is_reserved("42.li"));
/// assert!(!is_reserved("xj9q.li"));
/// ```
pub fn is_reserved(domain: &str) -> bool {
    is_reserved_by_pattern(domain) || is_reserved_by_tld(domain)
}

/// Global word list, structural shapes, technical prefixes and IP octets.
pub fn is_reserved_by_pattern(domain: &str) -> bool {
    let domain = domain.to_lowercase();
    let Some((label, _)) = domain.split_once('.') else {
        return false;
    };

    if RESERVED_WORDS.contains(label) {
        return true;
    }

    if STRUCTURAL_PATTERNS.iter().any(|re| re.is_match(label)) {
        return true;
    }

    if is_technical_label(label) {
        return true;
    }

    IP_OCTETS.contains(&label)
}

/// Per-suffix reserved lists, keyed by the last label of the domain.
pub fn is_reserved_by_tld(domain: &str) -> bool {
    let domain = domain.to_lowercase();
    let Some((label, _)) = domain.split_once('.') else {
        return false;
    };

    let suffix = format!(".{}", crate::utils::top_level_label(&domain));
    SUFFIX_RESERVED
        .get(suffix.as_str())
        .is_some_and(|words| words.contains(label))
}

/// A technical prefix on its own, or followed by a run of digits (`ns1`, `db02`).
fn is_technical_label(label: &str) -> bool {
    if TECHNICAL_PREFIX_SET.contains(label) {
        return true;
    }

    let prefix = label.trim_end_matches(|c: char| c.is_ascii_digit());
    prefix.len() < label.len() && !prefix.is_empty() && TECHNICAL_PREFIX_SET.contains(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_words() {
        assert!(is_reserved("www.li"));
        assert!(is_reserved("google.ch"));
        assert!(is_reserved("dashboard.io"));
        assert!(is_reserved("WWW.LI"));
    }

    #[test]
    fn test_structural_patterns() {
        assert!(is_reserved("a.li"));
        assert!(is_reserved("xy.li"));
        assert!(is_reserved("42.li"));
        assert!(is_reserved("421.li"));
        assert!(is_reserved("a1.li"));
        assert!(!is_reserved("4217.li"));
    }

    #[test]
    fn test_technical_prefix_with_digits() {
        assert!(is_reserved("ns1.li"));
        assert!(is_reserved("server42.li"));
        assert!(is_reserved("db007.li"));
        assert!(is_reserved("node.li"));
        assert!(!is_reserved("nodes1.li"));
        assert!(!is_reserved("1234.li"));
    }

    #[test]
    fn test_ip_octets() {
        assert!(is_reserved_by_pattern("127.li"));
        assert!(is_reserved_by_pattern("255.li"));
        assert!(is_reserved_by_pattern("10.li"));
    }

    #[test]
    fn test_per_tld_lists() {
        assert!(is_reserved_by_tld("liechtenstein.li"));
        assert!(!is_reserved_by_tld("liechtenstein.ch"));
        assert!(is_reserved_by_tld("berlin.de"));
        assert!(is_reserved_by_tld("vpn.net"));
        assert!(!is_reserved_by_tld("vpn.org"));
        assert!(!is_reserved("vpnx.net"));
    }

    #[test]
    fn test_not_reserved() {
        assert!(!is_reserved("xj9q.li"));
        assert!(!is_reserved("qzv.li"));
        assert!(!is_reserved("k7w2.ch"));
    }

    #[test]
    fn test_no_dot_is_never_reserved() {
        assert!(!is_reserved("www"));
        assert!(!is_reserved("a"));
    }
}
