//! IP to country cache.
//!
//! Geolocation lookups are slow and rate limited, so the country of every IP
//! seen during a scan is remembered. Successful lookups are kept for a long
//! TTL; failures are kept only briefly so that a provider outage degrades a
//! session to "Unknown" without sticking for the lifetime of the process.

use crate::protocols::geo::GeoLocator;
use crate::types::UNKNOWN_COUNTRY;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Default lifetime of a successful lookup: 24 hours
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 3600);

/// Default lifetime of a failed lookup: 60 seconds
pub const DEFAULT_NEGATIVE_TTL: Duration = Duration::from_secs(60);

/// Default maximum number of cached IPs
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone)]
struct CacheEntry {
    country: String,
    inserted: Instant,
    /// None when the TTL reaches past what `Instant` can represent
    expires: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires.is_some_and(|expires| now >= expires)
    }
}

/// Thread-safe, TTL-bounded map from IP address to country name.
#[derive(Debug)]
pub struct IpCountryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    negative_ttl: Duration,
    max_entries: usize,
}

// Process-wide cache shared by scanners that use default TTLs
lazy_static::lazy_static! {
    static ref GLOBAL_CACHE: Arc<IpCountryCache> = Arc::new(IpCountryCache::default());
}

/// The process-wide cache instance.
pub fn global() -> Arc<IpCountryCache> {
    Arc::clone(&GLOBAL_CACHE)
}

impl Default for IpCountryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_NEGATIVE_TTL)
    }
}

impl IpCountryCache {
    /// Create an empty cache with the given positive and negative TTLs.
    pub fn new(ttl: Duration, negative_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            negative_ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Limit the number of cached IPs (minimum 1).
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Country for `ip`, asking `locator` only on a miss.
    ///
    /// Never fails: a locator error yields "Unknown", which is cached with
    /// the negative TTL.
    pub async fn lookup(&self, ip: &str, locator: &dyn GeoLocator) -> String {
        if let Some(country) = self.get(ip) {
            return country;
        }

        match locator.locate(ip).await {
            Ok(country) => {
                self.insert(ip, country.clone(), self.ttl);
                country
            }
            Err(e) => {
                tracing::debug!("Geolocation failed for {}: {}", ip, e);
                self.insert(ip, UNKNOWN_COUNTRY.to_string(), self.negative_ttl);
                UNKNOWN_COUNTRY.to_string()
            }
        }
    }

    /// Cached, unexpired country for `ip`, without any I/O.
    pub fn get(&self, ip: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(ip)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.country.clone())
    }

    fn insert(&self, ip: &str, country: String, ttl: Duration) {
        let now = Instant::now();
        let expires = now.checked_add(ttl);

        let Ok(mut entries) = self.entries.lock() else {
            tracing::warn!("IP country cache lock poisoned, not caching {}", ip);
            return;
        };

        if !entries.contains_key(ip) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| !entry.is_expired(now));

            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted)
                    .map(|(key, _)| key.clone());
                if let Some(key) = oldest {
                    entries.remove(&key);
                }
            }
        }

        entries.insert(
            ip.to_string(),
            CacheEntry {
                country,
                inserted: now,
                expires,
            },
        );
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}
