//! Protocol implementations for candidate probing.
//!
//! This module contains the clients for the external collaborators a scan
//! talks to: a DNS-over-HTTPS JSON resolver and an IP geolocation service,
//! plus the public suffix registry used to split input domains.

/// DNS-over-HTTPS JSON API client
pub mod doh;

/// IP geolocation client
pub mod geo;

/// Public suffix table
pub mod registry;

// Re-export commonly used functions and types
pub use doh::{DohClient, DohTransport, RecordType};
pub use geo::{GeoClient, GeoLocator};
pub use registry::{is_multi_label_suffix, suffix_label_count};
