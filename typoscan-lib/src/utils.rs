//! Utility functions for domain processing and validation.
//!
//! This module contains the suffix-aware domain splitter used by the variation
//! generator, and hostname checks shared by the scanner.

use crate::error::ScanError;
use crate::protocols::registry::suffix_label_count;
use regex::Regex;

lazy_static::lazy_static! {
    /// Dotted hostname with an optional trailing root dot.
    static ref HOSTNAME_RE: Regex = Regex::new(
        r"^(?:[a-z0-9_](?:[a-z0-9_-]{0,61}[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.?$"
    ).expect("hostname regex is valid");
}

/// Normalize user input into a bare lowercase domain.
///
/// Strips surrounding whitespace, a URL scheme, any path/query/fragment, a
/// port and a trailing root dot: `"HTTPS://Example.com:443/login"` becomes
/// `"example.com"`.
pub fn normalize_domain(input: &str) -> String {
    let mut domain = input.trim().to_lowercase();

    for scheme in ["https://", "http://"] {
        if let Some(rest) = domain.strip_prefix(scheme) {
            domain = rest.to_string();
            break;
        }
    }

    if let Some(end) = domain.find(['/', '?', '#']) {
        domain.truncate(end);
    }
    if let Some(colon) = domain.rfind(':') {
        domain.truncate(colon);
    }
    if domain.ends_with('.') {
        domain.pop();
    }

    domain
}

/// Validate a normalized domain name format.
///
/// # Arguments
///
/// * `domain` - The domain name to validate, already normalized
///
/// # Returns
///
/// `Ok(())` if valid, `Err(ScanError)` if invalid.
pub fn validate_domain(domain: &str) -> Result<(), ScanError> {
    if domain.is_empty() {
        return Err(ScanError::invalid_input("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(ScanError::invalid_domain(
            domain,
            "Domain name longer than 253 characters",
        ));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(ScanError::invalid_domain(domain, "Empty label"));
        }
        if label.len() > 63 {
            return Err(ScanError::invalid_domain(
                domain,
                format!("Label '{}' longer than 63 characters", label),
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(ScanError::invalid_domain(
                domain,
                format!("Label '{}' starts or ends with a hyphen", label),
            ));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ScanError::invalid_domain(
                domain,
                format!("Label '{}' contains invalid characters", label),
            ));
        }
    }

    Ok(())
}

/// Split a domain into its registrable name and public suffix.
///
/// Handles multi-label suffixes properly (e.g. `"shop.example.co.uk"` ->
/// `("example", "co.uk")`). Subdomain labels left of the registrable name are
/// dropped.
///
/// # Errors
///
/// Returns `ScanError::InvalidInput` for empty input and
/// `ScanError::InvalidDomain` when the input is malformed or has no label left
/// of its public suffix (`"com"`, `"co.uk"`).
pub fn split_domain(input: &str) -> Result<(String, String), ScanError> {
    let domain = normalize_domain(input);
    validate_domain(&domain)?;

    let labels: Vec<&str> = domain.split('.').collect();
    let suffix_len = suffix_label_count(&labels);

    if suffix_len >= labels.len() {
        return Err(ScanError::invalid_domain(
            &domain,
            "No registrable name under the public suffix",
        ));
    }

    let name_index = labels.len() - suffix_len - 1;
    let name = labels[name_index].to_string();
    let suffix = labels[name_index + 1..].join(".");

    Ok((name, suffix))
}

/// Whether `value` looks like a real DNS hostname (`ns1.example.net.`).
pub fn is_plausible_hostname(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value.len() <= 254 && HOSTNAME_RE.is_match(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("  Example.COM "), "example.com");
        assert_eq!(normalize_domain("https://example.com/login?x=1"), "example.com");
        assert_eq!(normalize_domain("http://example.com:8080"), "example.com");
        assert_eq!(normalize_domain("example.com."), "example.com");
    }

    #[test]
    fn test_validate_domain() {
        assert!(validate_domain("example.com").is_ok());
        assert!(validate_domain("my-brand.co.uk").is_ok());
        assert!(validate_domain("").is_err());
        assert!(validate_domain("exa mple.com").is_err());
        assert!(validate_domain("-example.com").is_err());
        assert!(validate_domain("example..com").is_err());
        assert!(validate_domain(&format!("{}.com", "a".repeat(64))).is_err());
    }

    #[test]
    fn test_empty_input_is_input_error() {
        let err = split_domain("   ").unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput { .. }));
    }

    #[test]
    fn test_split_simple_domain() {
        assert_eq!(
            split_domain("example.com").unwrap(),
            ("example".to_string(), "com".to_string())
        );
    }

    #[test]
    fn test_split_multi_label_suffix() {
        assert_eq!(
            split_domain("example.co.uk").unwrap(),
            ("example".to_string(), "co.uk".to_string())
        );
        assert_eq!(
            split_domain("shop.brand.com.au").unwrap(),
            ("brand".to_string(), "com.au".to_string())
        );
    }

    #[test]
    fn test_split_drops_subdomains() {
        assert_eq!(
            split_domain("www.mail.google.com").unwrap(),
            ("google".to_string(), "com".to_string())
        );
    }

    #[test]
    fn test_split_rejects_bare_suffix() {
        assert!(matches!(
            split_domain("co.uk"),
            Err(ScanError::InvalidDomain { .. })
        ));
        assert!(split_domain("com").is_err());
        assert!(split_domain("localhost").is_err());
    }

    #[test]
    fn test_is_plausible_hostname() {
        assert!(is_plausible_hostname("ns1.google.com."));
        assert!(is_plausible_hostname("dns1.registrar-servers.com"));
        assert!(is_plausible_hostname("NS-123.AWSDNS-45.ORG."));

        assert!(!is_plausible_hostname(""));
        assert!(!is_plausible_hostname("-"));
        assert!(!is_plausible_hostname("localhost"));
        assert!(!is_plausible_hostname("ns1 .example.com"));
        assert!(!is_plausible_hostname("ns1..example.com"));
    }
}
