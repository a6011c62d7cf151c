//! Error handling for scan operations.
//!
//! This module defines the error type shared by the generator, the DNS probe,
//! the geolocation cache and the batch scheduler. Only input errors are fatal to
//! a scan; everything else is downgraded by the component that observes it.

use std::fmt;
use std::time::Duration;

/// Main error type for typosquatting scans.
#[derive(Debug, Clone)]
pub enum ScanError {
    /// Missing or malformed request input (e.g. no domain given)
    InvalidInput { message: String },

    /// The domain has no registrable name under a known public suffix
    InvalidDomain { domain: String, reason: String },

    /// Network-related errors (connection refused, TLS, etc.)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// DNS-over-HTTPS resolver returned something unusable
    DohError {
        name: String,
        message: String,
        status_code: Option<u16>,
    },

    /// IP geolocation provider failure
    GeolocationError { ip: String, message: String },

    /// A single probe ran out of time
    ProbeTimeout { operation: String, duration: Duration },

    /// A whole batch failed to execute; its remaining candidates are dropped
    BatchExecution { batch: usize, message: String },

    /// JSON parsing errors for provider responses
    ParseError {
        message: String,
        content: Option<String>,
    },

    /// Configuration errors (invalid settings, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading configuration
    FileError { path: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl ScanError {
    /// Create a new invalid input error.
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new DoH error.
    pub fn doh<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        Self::DohError {
            name: name.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a new DoH error with HTTP status code.
    pub fn doh_with_status<N: Into<String>, M: Into<String>>(
        name: N,
        message: M,
        status_code: u16,
    ) -> Self {
        Self::DohError {
            name: name.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a new geolocation error.
    pub fn geolocation<I: Into<String>, M: Into<String>>(ip: I, message: M) -> Self {
        Self::GeolocationError {
            ip: ip.into(),
            message: message.into(),
        }
    }

    /// Create a new probe timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::ProbeTimeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new batch execution error.
    pub fn batch<M: Into<String>>(batch: usize, message: M) -> Self {
        Self::BatchExecution {
            batch,
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error rejects the request before any pipeline work.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::InvalidDomain { .. })
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { message } => write!(f, "Invalid input: {}", message),
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::DohError {
                name,
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "DoH error for '{}' (HTTP {}): {}", name, code, message)
                } else {
                    write!(f, "DoH error for '{}': {}", name, message)
                }
            }
            Self::GeolocationError { ip, message } => {
                write!(f, "Geolocation error for '{}': {}", ip, message)
            }
            Self::ProbeTimeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::BatchExecution { batch, message } => {
                write!(f, "Batch {} failed: {}", batch, message)
            }
            Self::ParseError { message, content: _ } => write!(f, "Parse error: {}", message),
            Self::ConfigError { message } => write!(f, "Configuration error: {}", message),
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(0))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
            content: None,
        }
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
