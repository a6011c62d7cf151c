//! # Typoscan Library
//!
//! A library for spotting live typosquatting domains: it expands a brand
//! domain into confusable candidates and resolves them over DNS-over-HTTPS.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use typoscan_lib::{ScanConfig, Scanner, StreamEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scanner = Scanner::with_config(ScanConfig::default().with_seed(7))?;
//!     let mut events = scanner.scan("example.com")?;
//!
//!     while let Some(event) = events.next().await {
//!         if let StreamEvent::Result(found) = event {
//!             if found.registered {
//!                 println!("{} ({})", found.result.name(), found.result.candidate.family);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Variation Generator**: seventeen mutation families, deterministic per seed
//! - **DNS-over-HTTPS Probe**: concurrent A/AAAA/NS/MX lookups per candidate
//! - **Batched Streaming**: bounded concurrency with progress events
//! - **Geolocation**: TTL-bounded IP to country cache

// Re-export main public API types and functions
// This makes them available as typoscan_lib::TypeName
pub use cache::IpCountryCache;
pub use config::{
    load_env_config, parse_duration_string, parse_families, ConfigManager, EnvConfig, FileConfig,
};
pub use error::ScanError;
pub use generate::{generate, generate_for_domain, GeneratorOptions};
pub use probe::DnsProbe;
pub use protocols::{DohClient, DohTransport, GeoClient, GeoLocator, RecordType};
pub use scanner::{is_registered, ScanSession, ScanStream, Scanner};
pub use types::{
    CandidateDomain, MutationFamily, ProbeStatus, RegisteredPolicy, ResolutionResult,
    ResultEvent, ScanConfig, ScanProgress, ScanSummary, StreamEvent, UNKNOWN_COUNTRY,
};
pub use utils::split_domain;

// Public modules
pub mod cache;
pub mod concurrent;
pub mod generate;
pub mod protocols;

// Internal modules - these are not part of the public API
mod config;
mod error;
mod probe;
mod scanner;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScanError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
