//! DNS footprint probe for a single candidate.
//!
//! A probe asks the resolver for A, AAAA, NS and MX records concurrently, keeps
//! the first answer of each type, and geolocates the first IPv4 address. Query
//! failures never escape: a record that cannot be fetched is simply absent.

use crate::cache::IpCountryCache;
use crate::protocols::doh::{DohTransport, RecordType};
use crate::protocols::geo::GeoLocator;
use crate::types::{CandidateDomain, ProbeStatus, ResolutionResult, UNKNOWN_COUNTRY};
use std::sync::Arc;
use std::time::Duration;

/// Host part of an MX answer: `"10 mail.example.com."` -> `"mail.example.com."`.
///
/// Values without a priority are returned trimmed as-is.
pub fn normalize_mx(value: &str) -> Option<String> {
    let value = value.trim();
    let host = match value.split_once(char::is_whitespace) {
        Some((_priority, host)) => host.trim(),
        None => value,
    };

    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Resolves candidates through a DoH transport and a shared country cache.
#[derive(Clone)]
pub struct DnsProbe {
    transport: Arc<dyn DohTransport>,
    locator: Arc<dyn GeoLocator>,
    cache: Arc<IpCountryCache>,
    query_timeout: Duration,
}

impl DnsProbe {
    pub fn new(
        transport: Arc<dyn DohTransport>,
        locator: Arc<dyn GeoLocator>,
        cache: Arc<IpCountryCache>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            locator,
            cache,
            query_timeout,
        }
    }

    /// Probe one candidate. Always returns a result; the status is
    /// `NoRecords` when all four lookups come back empty.
    pub async fn probe(&self, candidate: CandidateDomain) -> ResolutionResult {
        let name = candidate.name.as_str();

        let (ipv4, ipv6, name_server, mx) = futures::join!(
            self.first_record(name, RecordType::A),
            self.first_record(name, RecordType::Aaaa),
            self.first_record(name, RecordType::Ns),
            self.first_record(name, RecordType::Mx),
        );
        let mail_server = mx.as_deref().and_then(normalize_mx);

        let country = match ipv4.as_deref() {
            Some(ip) => self.cache.lookup(ip, self.locator.as_ref()).await,
            None => UNKNOWN_COUNTRY.to_string(),
        };

        let mut result = ResolutionResult::unresolved(candidate, ProbeStatus::NoRecords);
        result.ipv4 = ipv4;
        result.ipv6 = ipv6;
        result.name_server = name_server;
        result.mail_server = mail_server;
        result.country = country;
        if result.has_records() {
            result.status = ProbeStatus::Resolved;
        }

        result
    }

    /// First answer of one record type, or None on timeout, error or no data.
    async fn first_record(&self, name: &str, record_type: RecordType) -> Option<String> {
        match tokio::time::timeout(self.query_timeout, self.transport.query(name, record_type)).await
        {
            Ok(Ok(answers)) => answers.into_iter().find(|a| !a.trim().is_empty()),
            Ok(Err(e)) => {
                tracing::debug!("{} query for {} failed: {}", record_type, name, e);
                None
            }
            Err(_) => {
                tracing::debug!(
                    "{} query for {} timed out after {:?}",
                    record_type,
                    name,
                    self.query_timeout
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::types::MutationFamily;
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeDoh {
        records: HashMap<(String, RecordType), Vec<String>>,
        failing: Vec<RecordType>,
        slow: Vec<RecordType>,
    }

    impl FakeDoh {
        fn with(mut self, name: &str, record_type: RecordType, data: &[&str]) -> Self {
            self.records.insert(
                (name.to_string(), record_type),
                data.iter().map(|s| s.to_string()).collect(),
            );
            self
        }
    }

    #[async_trait]
    impl DohTransport for FakeDoh {
        async fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<String>, ScanError> {
            if self.slow.contains(&record_type) {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if self.failing.contains(&record_type) {
                return Err(ScanError::doh_with_status(name, "server error", 502));
            }
            Ok(self
                .records
                .get(&(name.to_string(), record_type))
                .cloned()
                .unwrap_or_default())
        }
    }

    struct FixedLocator(&'static str);

    #[async_trait]
    impl GeoLocator for FixedLocator {
        async fn locate(&self, _ip: &str) -> Result<String, ScanError> {
            Ok(self.0.to_string())
        }
    }

    fn probe_with(doh: FakeDoh) -> DnsProbe {
        DnsProbe::new(
            Arc::new(doh),
            Arc::new(FixedLocator("Iceland")),
            Arc::new(IpCountryCache::default()),
            Duration::from_millis(100),
        )
    }

    fn candidate(name: &str) -> CandidateDomain {
        CandidateDomain::new(name, MutationFamily::Omission)
    }

    #[test]
    fn test_normalize_mx() {
        assert_eq!(
            normalize_mx("10 mail.example.com.").as_deref(),
            Some("mail.example.com.")
        );
        assert_eq!(normalize_mx("mx.example.com").as_deref(), Some("mx.example.com"));
        assert_eq!(normalize_mx("  "), None);
    }

    #[tokio::test]
    async fn test_all_absent_is_no_records() {
        let result = probe_with(FakeDoh::default()).probe(candidate("xample.com")).await;
        assert_eq!(result.status, ProbeStatus::NoRecords);
        assert!(!result.has_records());
        assert_eq!(result.country, UNKNOWN_COUNTRY);
    }

    #[tokio::test]
    async fn test_keeps_first_entries_and_geolocates() {
        let doh = FakeDoh::default()
            .with("examp1e.com", RecordType::A, &["1.1.1.1", "2.2.2.2"])
            .with("examp1e.com", RecordType::Ns, &["ns1.host.net.", "ns2.host.net."])
            .with("examp1e.com", RecordType::Mx, &["20 mx2.host.net.", "10 mx1.host.net."]);

        let result = probe_with(doh).probe(candidate("examp1e.com")).await;
        assert_eq!(result.status, ProbeStatus::Resolved);
        assert_eq!(result.ipv4.as_deref(), Some("1.1.1.1"));
        assert_eq!(result.ipv6, None);
        assert_eq!(result.name_server.as_deref(), Some("ns1.host.net."));
        // Collaborator order, not priority order
        assert_eq!(result.mail_server.as_deref(), Some("mx2.host.net."));
        assert_eq!(result.country, "Iceland");
    }

    #[tokio::test]
    async fn test_country_only_with_ipv4() {
        let doh = FakeDoh::default().with("example.net", RecordType::Aaaa, &["2001:db8::1"]);
        let result = probe_with(doh).probe(candidate("example.net")).await;
        assert_eq!(result.status, ProbeStatus::Resolved);
        assert_eq!(result.country, UNKNOWN_COUNTRY);
    }

    #[tokio::test]
    async fn test_failed_and_slow_queries_are_absent() {
        let mut doh = FakeDoh::default()
            .with("exmple.com", RecordType::A, &["3.3.3.3"])
            .with("exmple.com", RecordType::Ns, &["ns.parked.example."]);
        doh.failing = vec![RecordType::A];
        doh.slow = vec![RecordType::Ns];

        let result = probe_with(doh).probe(candidate("exmple.com")).await;
        assert_eq!(result.status, ProbeStatus::NoRecords);
        assert!(result.ipv4.is_none());
        assert!(result.name_server.is_none());
    }
}
