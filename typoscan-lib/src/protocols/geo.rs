//! IP geolocation client.
//!
//! Looks up the country of an IPv4 address through an ip-api.com compatible
//! JSON service (`GET {endpoint}{ip}` returning `{"country": "..."}`).

use crate::error::ScanError;
use crate::types::UNKNOWN_COUNTRY;
use async_trait::async_trait;
use serde::Deserialize;

/// A service that maps an IP address to a country name.
#[async_trait]
pub trait GeoLocator: Send + Sync {
    /// Country for `ip`. A response without a country maps to "Unknown";
    /// transport failures are errors.
    async fn locate(&self, ip: &str) -> Result<String, ScanError>;
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    country: Option<String>,
}

/// Extract the country from a geolocation JSON body.
pub fn parse_country(body: &str) -> Result<String, ScanError> {
    let response: GeoResponse = serde_json::from_str(body)?;
    Ok(response
        .country
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()))
}

/// Geolocation client over a shared `reqwest::Client`.
#[derive(Clone)]
pub struct GeoClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl GeoClient {
    /// Create a client for `endpoint` that reuses an existing HTTP client.
    pub fn new<E: Into<String>>(http_client: reqwest::Client, endpoint: E) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl GeoLocator for GeoClient {
    async fn locate(&self, ip: &str) -> Result<String, ScanError> {
        let url = format!("{}{}", self.endpoint, ip);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ScanError::geolocation(ip, format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ScanError::geolocation(
                ip,
                format!("HTTP {}", response.status().as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScanError::geolocation(ip, format!("Failed to read body: {}", e)))?;

        parse_country(&body).map_err(|e| ScanError::geolocation(ip, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_country() {
        let body = r#"{"status":"success","country":"United States","query":"8.8.8.8"}"#;
        assert_eq!(parse_country(body).unwrap(), "United States");
    }

    #[test]
    fn test_missing_country_is_unknown() {
        let body = r#"{"status":"fail","message":"private range","query":"10.0.0.1"}"#;
        assert_eq!(parse_country(body).unwrap(), UNKNOWN_COUNTRY);
        assert_eq!(parse_country(r#"{"country":""}"#).unwrap(), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_garbage_body_is_error() {
        assert!(parse_country("rate limited").is_err());
    }
}
