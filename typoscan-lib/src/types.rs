//! Core data types for typosquatting scans.
//!
//! This module defines the candidate and result structures that flow through
//! the pipeline, the scan configuration, and the events emitted to a stream
//! consumer.

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The technique that produced a candidate domain.
///
/// Declaration order matters: it is the tie-break priority when two families
/// produce the same name, and the primary sort key of generated output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum MutationFamily {
    #[serde(rename = "Original")]
    Original,
    #[serde(rename = "Omission")]
    Omission,
    #[serde(rename = "Replacement")]
    Replacement,
    #[serde(rename = "Insertion")]
    Insertion,
    #[serde(rename = "Repetition")]
    Repetition,
    #[serde(rename = "Double-Repetition")]
    DoubleRepetition,
    #[serde(rename = "Transposition")]
    Transposition,
    #[serde(rename = "Homoglyph")]
    Homoglyph,
    #[serde(rename = "Bitsquatting")]
    Bitsquatting,
    #[serde(rename = "Hyphenation")]
    Hyphenation,
    #[serde(rename = "Vowel-Swap")]
    VowelSwap,
    #[serde(rename = "Keyboard-Proximity")]
    KeyboardProximity,
    #[serde(rename = "TLD-Swap")]
    TldSwap,
    #[serde(rename = "Subdomain")]
    Subdomain,
    #[serde(rename = "Dictionary")]
    Dictionary,
    #[serde(rename = "Addition")]
    Addition,
    #[serde(rename = "Plural")]
    Plural,
    #[serde(rename = "Shuffle")]
    Shuffle,
}

impl MutationFamily {
    /// Every mutation family in declared order. `Original` is not a mutation.
    pub const ALL: [MutationFamily; 17] = [
        MutationFamily::Omission,
        MutationFamily::Replacement,
        MutationFamily::Insertion,
        MutationFamily::Repetition,
        MutationFamily::DoubleRepetition,
        MutationFamily::Transposition,
        MutationFamily::Homoglyph,
        MutationFamily::Bitsquatting,
        MutationFamily::Hyphenation,
        MutationFamily::VowelSwap,
        MutationFamily::KeyboardProximity,
        MutationFamily::TldSwap,
        MutationFamily::Subdomain,
        MutationFamily::Dictionary,
        MutationFamily::Addition,
        MutationFamily::Plural,
        MutationFamily::Shuffle,
    ];

    /// The display tag used in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationFamily::Original => "Original",
            MutationFamily::Omission => "Omission",
            MutationFamily::Replacement => "Replacement",
            MutationFamily::Insertion => "Insertion",
            MutationFamily::Repetition => "Repetition",
            MutationFamily::DoubleRepetition => "Double-Repetition",
            MutationFamily::Transposition => "Transposition",
            MutationFamily::Homoglyph => "Homoglyph",
            MutationFamily::Bitsquatting => "Bitsquatting",
            MutationFamily::Hyphenation => "Hyphenation",
            MutationFamily::VowelSwap => "Vowel-Swap",
            MutationFamily::KeyboardProximity => "Keyboard-Proximity",
            MutationFamily::TldSwap => "TLD-Swap",
            MutationFamily::Subdomain => "Subdomain",
            MutationFamily::Dictionary => "Dictionary",
            MutationFamily::Addition => "Addition",
            MutationFamily::Plural => "Plural",
            MutationFamily::Shuffle => "Shuffle",
        }
    }
}

impl fmt::Display for MutationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationFamily {
    type Err = ScanError;

    /// Parse a family name leniently: `vowel-swap`, `VowelSwap` and
    /// `vowel_swap` are all accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        std::iter::once(MutationFamily::Original)
            .chain(MutationFamily::ALL)
            .find(|family| {
                family
                    .as_str()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .map(|c| c.to_ascii_lowercase())
                    .eq(normalized.chars())
            })
            .ok_or_else(|| ScanError::config(format!("Unknown mutation family '{}'", s)))
    }
}

/// A generated candidate domain and the technique that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateDomain {
    /// Fully qualified candidate name (e.g. "examp1e.com")
    #[serde(rename = "permutation")]
    pub name: String,

    /// Generating technique
    #[serde(rename = "permutationType")]
    pub family: MutationFamily,
}

impl CandidateDomain {
    pub fn new<N: Into<String>>(name: N, family: MutationFamily) -> Self {
        Self {
            name: name.into(),
            family,
        }
    }
}

/// Outcome of probing one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// At least one of A/AAAA/NS/MX answered
    Resolved,
    /// Every record query came back empty (or failed softly)
    NoRecords,
    /// The candidate's overall deadline expired
    Timeout,
    /// The probe itself failed unexpectedly
    Error,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Resolved => write!(f, "Resolved"),
            ProbeStatus::NoRecords => write!(f, "No records"),
            ProbeStatus::Timeout => write!(f, "Timeout"),
            ProbeStatus::Error => write!(f, "Error"),
        }
    }
}

/// DNS footprint of one candidate domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    #[serde(flatten)]
    pub candidate: CandidateDomain,

    /// First A record
    #[serde(rename = "ip")]
    pub ipv4: Option<String>,

    /// First AAAA record
    pub ipv6: Option<String>,

    /// First NS record
    pub name_server: Option<String>,

    /// Host of the first MX record, priority stripped
    pub mail_server: Option<String>,

    /// Country of the first A address, "Unknown" when not resolvable
    pub country: String,

    pub status: ProbeStatus,

    /// Reason for a Timeout or Error status
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// Country reported when geolocation is unavailable.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

impl ResolutionResult {
    /// A result with no records and the given status.
    pub fn unresolved(candidate: CandidateDomain, status: ProbeStatus) -> Self {
        Self {
            candidate,
            ipv4: None,
            ipv6: None,
            name_server: None,
            mail_server: None,
            country: UNKNOWN_COUNTRY.to_string(),
            status,
            error: None,
        }
    }

    /// A result describing a probe that failed with a reason.
    pub fn failed<M: Into<String>>(
        candidate: CandidateDomain,
        status: ProbeStatus,
        reason: M,
    ) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::unresolved(candidate, status)
        }
    }

    pub fn name(&self) -> &str {
        &self.candidate.name
    }

    /// Whether any of A/AAAA/NS/MX is present.
    pub fn has_records(&self) -> bool {
        self.ipv4.is_some()
            || self.ipv6.is_some()
            || self.name_server.is_some()
            || self.mail_server.is_some()
    }
}

/// How a resolved candidate is classified as "registered".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegisteredPolicy {
    /// Registered iff it has a plausible, non-placeholder name server
    #[default]
    NameServer,
    /// Registered iff any of A/AAAA/NS/MX is present
    AnyRecord,
}

impl FromStr for RegisteredPolicy {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nameserver" | "name-server" | "ns" => Ok(RegisteredPolicy::NameServer),
            "any" | "any-record" | "anyrecord" => Ok(RegisteredPolicy::AnyRecord),
            other => Err(ScanError::config(format!(
                "Unknown registered policy '{}', use 'nameserver' or 'any'",
                other
            ))),
        }
    }
}

impl fmt::Display for RegisteredPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisteredPolicy::NameServer => write!(f, "nameserver"),
            RegisteredPolicy::AnyRecord => write!(f, "any"),
        }
    }
}

/// Default DNS-over-HTTPS endpoint (JSON API).
pub const DEFAULT_DOH_ENDPOINT: &str = "https://cloudflare-dns.com/dns-query";

/// Default IP geolocation endpoint; the IP is appended to it.
pub const DEFAULT_GEO_ENDPOINT: &str = "http://ip-api.com/json/";

/// Configuration options for a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Candidates probed concurrently per batch
    /// Default: 30, Range: 1-500
    pub batch_size: usize,

    /// Deadline for each individual DNS record query
    /// Default: 2 seconds
    #[serde(skip)]
    pub query_timeout: Duration,

    /// Deadline for a whole candidate probe (all queries plus geolocation)
    /// Default: 3 seconds
    #[serde(skip)]
    pub candidate_timeout: Duration,

    /// Maximum number of generated candidates (excluding the original)
    /// Default: Some(1000)
    pub cap: Option<usize>,

    /// Seed for sampling and shuffle variations; random when None
    pub seed: Option<u64>,

    /// Number of random permutations drawn by the Shuffle family
    /// Default: 120
    pub shuffle_rounds: usize,

    /// Mutation families to run; all when None
    pub families: Option<Vec<MutationFamily>>,

    /// Registered classification policy
    pub registered_policy: RegisteredPolicy,

    /// Whether results without records produce data events
    /// Default: true
    pub emit_unresolved: bool,

    /// DNS-over-HTTPS JSON endpoint
    pub doh_endpoint: String,

    /// Geolocation endpoint
    pub geo_endpoint: String,

    /// How long a successful geolocation stays cached
    /// Default: 24 hours
    #[serde(skip)]
    pub geo_cache_ttl: Duration,

    /// How long a failed geolocation stays cached
    /// Default: 60 seconds
    #[serde(skip)]
    pub geo_negative_ttl: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: 30,
            query_timeout: Duration::from_secs(2),
            candidate_timeout: Duration::from_secs(3),
            cap: Some(1000),
            seed: None,
            shuffle_rounds: 120,
            families: None,
            registered_policy: RegisteredPolicy::NameServer,
            emit_unresolved: true,
            doh_endpoint: DEFAULT_DOH_ENDPOINT.to_string(),
            geo_endpoint: DEFAULT_GEO_ENDPOINT.to_string(),
            geo_cache_ttl: Duration::from_secs(24 * 3600),
            geo_negative_ttl: Duration::from_secs(60),
        }
    }
}

impl ScanConfig {
    /// Set the batch size. Clamped to 1-500.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, 500);
        self
    }

    /// Set the per-query deadline.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Set the per-candidate deadline.
    pub fn with_candidate_timeout(mut self, timeout: Duration) -> Self {
        self.candidate_timeout = timeout;
        self
    }

    /// Set or remove the candidate cap.
    pub fn with_cap(mut self, cap: Option<usize>) -> Self {
        self.cap = cap;
        self
    }

    /// Fix the generator seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_shuffle_rounds(mut self, rounds: usize) -> Self {
        self.shuffle_rounds = rounds;
        self
    }

    /// Restrict generation to the given families.
    pub fn with_families(mut self, families: Vec<MutationFamily>) -> Self {
        self.families = Some(families);
        self
    }

    pub fn with_registered_policy(mut self, policy: RegisteredPolicy) -> Self {
        self.registered_policy = policy;
        self
    }

    pub fn with_emit_unresolved(mut self, enabled: bool) -> Self {
        self.emit_unresolved = enabled;
        self
    }

    pub fn with_doh_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.doh_endpoint = endpoint.into();
        self
    }

    pub fn with_geo_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.geo_endpoint = endpoint.into();
        self
    }

    /// Set positive and negative TTLs of the geolocation cache.
    pub fn with_geo_cache_ttl(mut self, ttl: Duration, negative_ttl: Duration) -> Self {
        self.geo_cache_ttl = ttl;
        self.geo_negative_ttl = negative_ttl;
        self
    }
}

/// Progress information emitted as a `meta` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanProgress {
    /// Number of candidates in the session, sent once at start
    Total { total: usize },
    /// Candidates processed so far
    Attempted { attempted: usize },
}

/// One probed candidate as emitted to the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEvent {
    #[serde(flatten)]
    pub result: ResolutionResult,

    /// Whether the candidate counted as registered
    pub registered: bool,

    /// Human readable progress, e.g. "Processed 4 of 250"
    pub progress: String,
}

/// Terminal summary of a scan session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub done: bool,
    pub summary: String,
    pub registered_count: usize,
    /// Candidates actually scanned; lower than the session total when a
    /// batch failed
    pub total_count: usize,
}

impl ScanSummary {
    pub fn new(scanned: usize, registered: usize) -> Self {
        Self {
            done: true,
            summary: format!(
                "Scanned {} permutations. Found {} registered.",
                scanned, registered
            ),
            registered_count: registered,
            total_count: scanned,
        }
    }
}

/// An event on the scan stream.
///
/// Serializes to its bare payload; use [`StreamEvent::kind`] for the event
/// name (`meta` or `data`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Meta(ScanProgress),
    Result(Box<ResultEvent>),
    Done(ScanSummary),
}

impl StreamEvent {
    /// Event kind as seen by a stream transport.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Meta(_) => "meta",
            StreamEvent::Result(_) | StreamEvent::Done(_) => "data",
        }
    }

    /// The event payload as a JSON string.
    pub fn payload_json(&self) -> Result<String, ScanError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Render as a server-sent-events style frame: `"<kind>: <json>\n\n"`.
    pub fn to_sse_line(&self) -> Result<String, ScanError> {
        Ok(format!("{}: {}\n\n", self.kind(), self.payload_json()?))
    }

    /// Render as one JSON line: `{"event": "<kind>", "data": <payload>}`.
    pub fn to_json_line(&self) -> Result<String, ScanError> {
        let line = serde_json::json!({
            "event": self.kind(),
            "data": self,
        });
        Ok(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_order_matches_declaration() {
        let mut sorted = MutationFamily::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, MutationFamily::ALL.to_vec());
        assert!(MutationFamily::Original < MutationFamily::Omission);
        assert!(MutationFamily::Plural < MutationFamily::Shuffle);
    }

    #[test]
    fn test_family_from_str_is_lenient() {
        assert_eq!(
            "vowel-swap".parse::<MutationFamily>().unwrap(),
            MutationFamily::VowelSwap
        );
        assert_eq!(
            "KeyboardProximity".parse::<MutationFamily>().unwrap(),
            MutationFamily::KeyboardProximity
        );
        assert_eq!(
            "tld_swap".parse::<MutationFamily>().unwrap(),
            MutationFamily::TldSwap
        );
        assert!("typo".parse::<MutationFamily>().is_err());
    }

    #[test]
    fn test_result_serializes_with_wire_names() {
        let mut result = ResolutionResult::unresolved(
            CandidateDomain::new("gooogle.com", MutationFamily::Repetition),
            ProbeStatus::Resolved,
        );
        result.ipv4 = Some("142.250.0.1".to_string());
        result.name_server = Some("ns1.google.com.".to_string());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["permutation"], "gooogle.com");
        assert_eq!(json["permutationType"], "Repetition");
        assert_eq!(json["ip"], "142.250.0.1");
        assert_eq!(json["nameServer"], "ns1.google.com.");
        assert_eq!(json["status"], "resolved");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_stream_event_kinds_and_sse_framing() {
        let meta = StreamEvent::Meta(ScanProgress::Total { total: 5 });
        assert_eq!(meta.kind(), "meta");
        assert_eq!(meta.to_sse_line().unwrap(), "meta: {\"total\":5}\n\n");

        let done = StreamEvent::Done(ScanSummary::new(5, 2));
        assert_eq!(done.kind(), "data");
        let json: serde_json::Value =
            serde_json::from_str(&done.payload_json().unwrap()).unwrap();
        assert_eq!(json["done"], true);
        assert_eq!(json["registeredCount"], 2);
        assert_eq!(json["totalCount"], 5);
        assert_eq!(json["summary"], "Scanned 5 permutations. Found 2 registered.");
    }

    #[test]
    fn test_config_builder_clamps_batch_size() {
        assert_eq!(ScanConfig::default().with_batch_size(0).batch_size, 1);
        assert_eq!(ScanConfig::default().with_batch_size(9000).batch_size, 500);
        assert_eq!(ScanConfig::default().with_batch_size(50).batch_size, 50);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "ns".parse::<RegisteredPolicy>().unwrap(),
            RegisteredPolicy::NameServer
        );
        assert_eq!(
            "ANY".parse::<RegisteredPolicy>().unwrap(),
            RegisteredPolicy::AnyRecord
        );
        assert!("whois".parse::<RegisteredPolicy>().is_err());
    }
}
