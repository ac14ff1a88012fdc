//! Utility functions for domain processing and validation.
//!
//! Helpers shared by the generator, the reserved filter and the protocol
//! probes: suffix normalization, label splitting and basic syntax checks.

use crate::error::ScanError;

/// Normalize a user-supplied suffix so it always carries a leading dot.
///
/// Surrounding whitespace is removed and the suffix is lowercased.
/// `"li"` and `".li"` both become `".li"`.
pub fn normalize_suffix(suffix: &str) -> String {
    let trimmed = suffix.trim().to_lowercase();
    if trimmed.is_empty() || trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{}", trimmed)
    }
}

/// Split a domain into its first label and the remainder.
///
/// Handles multi-level suffixes (e.g., "ab.co.uk" -> ("ab", "co.uk")).
/// The remainder is `None` when the input has no dot.
pub fn extract_domain_parts(domain: &str) -> (String, Option<String>) {
    match domain.split_once('.') {
        Some((label, rest)) if !rest.is_empty() => (label.to_string(), Some(rest.to_string())),
        Some((label, _)) => (label.to_string(), None),
        None => (domain.to_string(), None),
    }
}

/// The last dot-separated label of a domain, e.g. `"li"` for `"ab.li"`.
pub fn top_level_label(domain: &str) -> &str {
    domain.rsplit('.').next().unwrap_or(domain)
}

/// Validate a domain name format.
///
/// Checks basic RFC 1035 syntax: total length, label lengths, and that
/// labels hold only alphanumerics and inner hyphens.
pub fn validate_domain(domain: &str) -> Result<(), ScanError> {
    let domain = domain.trim();

    if domain.is_empty() {
        return Err(ScanError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }

    if domain.len() > 253 {
        return Err(ScanError::invalid_domain(domain, "Domain name too long"));
    }

    if !domain.contains('.') {
        return Err(ScanError::invalid_domain(domain, "Domain name has no suffix"));
    }

    for label in domain.split('.') {
        if !is_valid_label(label) {
            return Err(ScanError::invalid_domain(
                domain,
                format!("Invalid label '{}'", label),
            ));
        }
    }

    Ok(())
}

/// Whether a single DNS label is syntactically acceptable.
pub(crate) fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }

    // Cannot start or end with hyphen
    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }

    label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
