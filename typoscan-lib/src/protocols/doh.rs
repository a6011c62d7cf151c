//! DNS-over-HTTPS (JSON API) implementation.
//!
//! This module resolves individual record types through a DoH resolver that
//! speaks the `application/dns-json` format (Cloudflare, Google). Only the
//! `data` strings of the `Answer` section are surfaced.

use crate::error::ScanError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;

/// DNS record types queried for each candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Aaaa,
    Ns,
    Mx,
}

impl RecordType {
    /// All record types, in the order they are reported.
    pub const ALL: [RecordType; 4] = [RecordType::A, RecordType::Aaaa, RecordType::Ns, RecordType::Mx];

    /// Query string value for the `type` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Ns => "NS",
            RecordType::Mx => "MX",
        }
    }

    /// Numeric RR type as used in the JSON `type` field.
    pub fn code(&self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Ns => 2,
            RecordType::Mx => 15,
            RecordType::Aaaa => 28,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolver that answers one record type for one name.
///
/// An empty vector means the name has no such records (including NXDOMAIN).
#[async_trait]
pub trait DohTransport: Send + Sync {
    async fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<String>, ScanError>;
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Answer", default)]
    answer: Option<Vec<DohAnswer>>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type", default)]
    record_type: Option<u16>,
    data: String,
}

/// Extract answer data of `record_type` from a DoH JSON body.
///
/// CNAME links in the answer chain are skipped when the resolver reports
/// record types. A missing `Answer` section yields no records.
pub fn parse_answers(body: &str, record_type: RecordType) -> Result<Vec<String>, ScanError> {
    let response: DohResponse = serde_json::from_str(body).map_err(|e| ScanError::ParseError {
        message: format!("Invalid DoH response: {}", e),
        content: Some(body.chars().take(200).collect()),
    })?;

    Ok(response
        .answer
        .unwrap_or_default()
        .into_iter()
        .filter(|answer| answer.record_type.map_or(true, |t| t == record_type.code()))
        .map(|answer| answer.data)
        .collect())
}

/// DoH client over a shared `reqwest::Client`.
#[derive(Clone)]
pub struct DohClient {
    /// HTTP client shared by all probes of a scanner
    http_client: reqwest::Client,
    /// JSON API endpoint, e.g. `https://cloudflare-dns.com/dns-query`
    endpoint: String,
}

impl DohClient {
    /// Create a client for `endpoint` that reuses an existing HTTP client.
    pub fn new<E: Into<String>>(http_client: reqwest::Client, endpoint: E) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DohTransport for DohClient {
    async fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<String>, ScanError> {
        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("name", name), ("type", record_type.as_str())])
            .header(reqwest::header::ACCEPT, "application/dns-json")
            .send()
            .await
            .map_err(|e| ScanError::doh(name, format!("Request failed: {}", e)))?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| ScanError::doh(name, format!("Failed to read body: {}", e)))?;
                parse_answers(&body, record_type)
            }
            status => Err(ScanError::doh_with_status(
                name,
                format!("Unexpected response for {} query", record_type),
                status.as_u16(),
            )),
        }
    }
}
