//! WHOIS response indicator tables.
//!
//! WHOIS output is free text whose layout differs per registry, so it is
//! never parsed field by field. Responses are lowercased and scanned for
//! known substrings instead. All tables are lowercase.

/// Phrases that prove a record exists. End the probe sweep with `WHOIS`.
pub const REGISTERED: &[&str] = &[
    "registrar:",
    "registrant:",
    "creation date:",
    "updated date:",
    "expiration date:",
    "name server:",
    "nserver:",
    "status: connect",
    "changed:",
];

/// Phrases that mark a name as held back by the registry. End the probe
/// sweep with `RESERVED`.
pub const RESERVED: &[&str] = &[
    "status: reserved",
    "status: restricted",
    "status: blocked",
    "status: prohibited",
    "status: not available for registration",
    "status: not available for general registration",
    "status: premium",
    "status: trademark protected",
    "status: trademark reservation",
    "status: brand protection",
    "status: dpml block",
    "status: sunrise block",
    "status: landrush block",
    "status: hold",
    "status: frozen",
    "status: locked",
    "status: suspended",
    "status: quarantine",
    "status: redemption",
    "status: grace period",
    "status: pending delete",
    "status: pending restore",
    "status: clienthold",
    "status: serverhold",
    "status: clienttransferprohibited",
    "status: servertransferprohibited",
    "status: clientupdateprohibited",
    "status: serverupdateprohibited",
    "status: clientdeleteprohibited",
    "status: serverdeleteprohibited",
    "status: clientrenewprohibited",
    "status: serverrenewprohibited",
    "registry reserved",
    "registrar reserved",
    "reserved by",
    "reserved for",
    "reserved domain",
    "reserved name",
    "premium domain",
    "premium name",
    "trademark protected",
    "trademark block",
    "brand protection",
    "policy reserved",
    "policy block",
    "regulatory reserved",
    "regulatory block",
    "unavailable for registration",
    "not available for public registration",
    "not available for general registration",
    "registration not permitted",
    "registration prohibited",
    "registration restricted",
    "registration blocked",
    "registration suspended",
    "registration reserved",
    "this domain is reserved",
    "this name is reserved",
    "domain reserved",
    "name reserved",
    "domain blocked",
    "name blocked",
    "domain restricted",
    "name restricted",
    "domain unavailable",
    "name unavailable",
    "domain not available",
    "name not available",
    "domain withheld",
    "name withheld",
    "domain protected",
    "name protected",
    "domain frozen",
    "name frozen",
    "domain locked",
    "name locked",
    "domain suspended",
    "name suspended",
    "domain quarantined",
    "name quarantined",
    "domain on hold",
    "name on hold",
    "domain in grace period",
    "name in grace period",
    "domain pending delete",
    "name pending delete",
    "domain pending restore",
    "name pending restore",
];

/// Explicit "no such object" wording.
pub const AVAILABLE: &[&str] = &[
    "status: free",
    "not found",
    "no match",
    "status: available",
    "no data found",
    "is available",
    "no entries found",
    "no object found",
    "no matching record",
    "not registered",
    "available for registration",
    "domain available",
    "available domain",
    "free domain",
    "domain free",
    "unregistered domain",
    "domain unregistered",
    "object does not exist",
    "no such domain",
    "registration status: available",
    "state: available",
    "available for purchase",
    "can be registered",
    "eligible for registration",
    "free for registration",
    "open for registration",
    "ready for registration",
    "registration available",
    "status code: 210",
    "status code: 220",
    "response: 210",
    "response: 220",
    // .cz
    "%error:101",
];

/// Rate limiting and outage wording. Never evidence of availability.
pub const SERVICE_ERROR: &[&str] = &[
    "the domain name search is temporarily unavailable",
    "temporarily unavailable",
    "service unavailable",
    "please try again later",
    "requests of this client are not permitted",
    "too many requests",
    "rate limit exceeded",
    "query limit exceeded",
    "access denied",
    "connection timeout",
    "service timeout",
];

/// Record fields that only appear for existing domains.
pub const UNAVAILABLE: &[&str] = &[
    "registrar:",
    "registrant:",
    "creation date:",
    "updated date:",
    "expiration date:",
    "name server:",
    "nserver:",
    "status: registered",
    "status: active",
    "status: ok",
    "status: connect",
    "status: clienttransferprohibited",
    "status: servertransferprohibited",
    "domain status: registered",
    "domain status: active",
    "registration date:",
    "expiry date:",
    "registry expiry date:",
    "registrar registration expiration date:",
    "admin contact:",
    "tech contact:",
    "billing contact:",
    "dnssec:",
    "domain servers in listed order:",
    "registered domain",
    "registered on:",
    "expires on:",
    "last updated on:",
    "changed:",
    "holder:",
    "person:",
    "sponsoring registrar:",
    "whois server:",
    "referral url:",
    "registry domain id:",
    "registrar whois server:",
    "registrar url:",
    "registrar iana id:",
    "registrar abuse contact email:",
    "registrar abuse contact phone:",
    "reseller:",
    "domain status:",
    // .cz
    "registered:",
    "expire:",
    "nsset:",
    "admin-c:",
];

/// Reading of one response during the probe sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    Registered,
    Reserved,
    Inconclusive,
}

/// Reading of one response during the dedicated availability pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityOutcome {
    ServiceError,
    Available,
    Unavailable,
    Inconclusive,
}

fn contains_any(text: &str, table: &[&str]) -> bool {
    table.iter().any(|indicator| text.contains(indicator))
}

/// Registered wording wins over reserved wording.
pub fn interpret_sweep_response(response: &str) -> SweepOutcome {
    let text = response.to_lowercase();
    if contains_any(&text, REGISTERED) {
        SweepOutcome::Registered
    } else if contains_any(&text, RESERVED) {
        SweepOutcome::Reserved
    } else {
        SweepOutcome::Inconclusive
    }
}

/// Most specific first: service error, then available, then unavailable.
pub fn interpret_availability_response(response: &str) -> AvailabilityOutcome {
    let text = response.to_lowercase();
    if contains_any(&text, SERVICE_ERROR) {
        AvailabilityOutcome::ServiceError
    } else if contains_any(&text, AVAILABLE) {
        AvailabilityOutcome::Available
    } else if contains_any(&text, UNAVAILABLE) {
        AvailabilityOutcome::Unavailable
    } else {
        AvailabilityOutcome::Inconclusive
    }
}
