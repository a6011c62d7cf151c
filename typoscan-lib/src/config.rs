//! Configuration file parsing and management.
//!
//! This module handles loading scan settings from TOML files and `TS_*`
//! environment variables, and layering them onto a [`ScanConfig`] with the
//! precedence CLI > environment > local file > home file > XDG file > defaults.

use crate::error::ScanError;
use crate::types::{MutationFamily, RegisteredPolicy, ScanConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
///
/// ```toml
/// [scan]
/// batch_size = 50
/// timeout = "3s"
/// cap = 500          # 0 disables the cap
/// policy = "nameserver"
///
/// [resolver]
/// doh_endpoint = "https://dns.google/resolve"
///
/// [cache]
/// ttl = "12h"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Scan behaviour
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanSection>,

    /// External collaborator endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<ResolverSection>,

    /// IP country cache lifetimes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSection>,
}

/// `[scan]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanSection {
    /// Candidates probed concurrently per batch (1-500)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Per-candidate deadline, e.g. "3s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Per-query deadline, e.g. "2s" or "1500ms"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_timeout: Option<String>,

    /// Candidate cap; 0 means unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_rounds: Option<usize>,

    /// "nameserver" or "any"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit_unresolved: Option<bool>,

    /// Mutation families to run, e.g. ["omission", "homoglyph"]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub families: Option<Vec<String>>,
}

/// `[resolver]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResolverSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doh_endpoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_endpoint: Option<String>,
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheSection {
    /// Lifetime of a successful geolocation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    /// Lifetime of a failed geolocation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_ttl: Option<String>,
}

fn invalid_duration(key: &str, value: &str) -> ScanError {
    ScanError::config(format!(
        "Invalid {} '{}'. Use a format like '500ms', '5s', '2m' (at most 365 days)",
        key, value
    ))
}

fn duration_setting(key: &str, value: &Option<String>) -> Result<Option<Duration>, ScanError> {
    match value {
        Some(raw) => parse_duration_string(raw)
            .map(Some)
            .ok_or_else(|| invalid_duration(key, raw)),
        None => Ok(None),
    }
}

fn validate_batch_size(batch_size: usize) -> Result<(), ScanError> {
    if batch_size == 0 || batch_size > 500 {
        return Err(ScanError::config("Batch size must be between 1 and 500"));
    }
    Ok(())
}

fn validate_endpoint(key: &str, url: &str) -> Result<(), ScanError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ScanError::config(format!(
            "Invalid {} '{}', must be an http(s) URL",
            key, url
        )))
    }
}

/// Parse a list of family names.
pub fn parse_families<S: AsRef<str>>(names: &[S]) -> Result<Vec<MutationFamily>, ScanError> {
    names.iter().map(|name| name.as_ref().parse()).collect()
}

impl FileConfig {
    /// Layer this file's settings onto `config`.
    pub fn apply_to(&self, mut config: ScanConfig) -> Result<ScanConfig, ScanError> {
        if let Some(scan) = &self.scan {
            if let Some(batch_size) = scan.batch_size {
                validate_batch_size(batch_size)?;
                config = config.with_batch_size(batch_size);
            }
            if let Some(timeout) = duration_setting("timeout", &scan.timeout)? {
                config = config.with_candidate_timeout(timeout);
            }
            if let Some(timeout) = duration_setting("query_timeout", &scan.query_timeout)? {
                config = config.with_query_timeout(timeout);
            }
            if let Some(cap) = scan.cap {
                config = config.with_cap(if cap == 0 { None } else { Some(cap) });
            }
            if let Some(seed) = scan.seed {
                config = config.with_seed(seed);
            }
            if let Some(rounds) = scan.shuffle_rounds {
                config = config.with_shuffle_rounds(rounds);
            }
            if let Some(policy) = &scan.policy {
                config = config.with_registered_policy(policy.parse()?);
            }
            if let Some(emit) = scan.emit_unresolved {
                config = config.with_emit_unresolved(emit);
            }
            if let Some(families) = &scan.families {
                config = config.with_families(parse_families(families)?);
            }
        }

        if let Some(resolver) = &self.resolver {
            if let Some(url) = &resolver.doh_endpoint {
                validate_endpoint("doh_endpoint", url)?;
                config = config.with_doh_endpoint(url.clone());
            }
            if let Some(url) = &resolver.geo_endpoint {
                validate_endpoint("geo_endpoint", url)?;
                config = config.with_geo_endpoint(url.clone());
            }
        }

        if let Some(cache) = &self.cache {
            let ttl = duration_setting("ttl", &cache.ttl)?.unwrap_or(config.geo_cache_ttl);
            let negative = duration_setting("negative_ttl", &cache.negative_ttl)?
                .unwrap_or(config.geo_negative_ttl);
            config = config.with_geo_cache_ttl(ttl, negative);
        }

        Ok(config)
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which files were used
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if reading, parsing or
    /// validation fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ScanError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScanError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| ScanError::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", e),
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Unreadable or invalid discovered files are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, ScanError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let discovered = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        // Lowest precedence first
        for path in discovered.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => tracing::warn!("Ignoring {}: {}", path.display(), e),
            }
        }

        if self.verbose {
            for path in &loaded_files {
                tracing::info!("Loaded configuration from {}", path.display());
            }
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./typoscan.toml", "./.typoscan.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Get the global configuration file path in the home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".typoscan.toml", "typoscan.toml"]
            .iter()
            .map(|name| Path::new(&home).join(name))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("typoscan").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` win.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            scan: match (lower.scan, higher.scan) {
                (Some(lower_scan), Some(higher_scan)) => Some(ScanSection {
                    batch_size: higher_scan.batch_size.or(lower_scan.batch_size),
                    timeout: higher_scan.timeout.or(lower_scan.timeout),
                    query_timeout: higher_scan.query_timeout.or(lower_scan.query_timeout),
                    cap: higher_scan.cap.or(lower_scan.cap),
                    seed: higher_scan.seed.or(lower_scan.seed),
                    shuffle_rounds: higher_scan.shuffle_rounds.or(lower_scan.shuffle_rounds),
                    policy: higher_scan.policy.or(lower_scan.policy),
                    emit_unresolved: higher_scan.emit_unresolved.or(lower_scan.emit_unresolved),
                    families: higher_scan.families.or(lower_scan.families),
                }),
                (lower_scan, higher_scan) => higher_scan.or(lower_scan),
            },
            resolver: match (lower.resolver, higher.resolver) {
                (Some(lower_res), Some(higher_res)) => Some(ResolverSection {
                    doh_endpoint: higher_res.doh_endpoint.or(lower_res.doh_endpoint),
                    geo_endpoint: higher_res.geo_endpoint.or(lower_res.geo_endpoint),
                }),
                (lower_res, higher_res) => higher_res.or(lower_res),
            },
            cache: match (lower.cache, higher.cache) {
                (Some(lower_cache), Some(higher_cache)) => Some(CacheSection {
                    ttl: higher_cache.ttl.or(lower_cache.ttl),
                    negative_ttl: higher_cache.negative_ttl.or(lower_cache.negative_ttl),
                }),
                (lower_cache, higher_cache) => higher_cache.or(lower_cache),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), ScanError> {
        // Applying to defaults runs every field check
        config.apply_to(ScanConfig::default()).map(|_| ())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via `TS_*`
/// environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub batch_size: Option<usize>,
    pub timeout: Option<Duration>,
    pub query_timeout: Option<Duration>,
    /// `Some(None)` disables the cap (`TS_CAP=0`)
    pub cap: Option<Option<usize>>,
    pub seed: Option<u64>,
    pub policy: Option<RegisteredPolicy>,
    pub doh_url: Option<String>,
    pub geo_url: Option<String>,
    pub emit_unresolved: Option<bool>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Layer the environment settings onto `config`.
    pub fn apply_to(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(batch_size) = self.batch_size {
            config = config.with_batch_size(batch_size);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_candidate_timeout(timeout);
        }
        if let Some(timeout) = self.query_timeout {
            config = config.with_query_timeout(timeout);
        }
        if let Some(cap) = self.cap {
            config = config.with_cap(cap);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(policy) = self.policy {
            config = config.with_registered_policy(policy);
        }
        if let Some(url) = &self.doh_url {
            config = config.with_doh_endpoint(url.clone());
        }
        if let Some(url) = &self.geo_url {
            config = config.with_geo_endpoint(url.clone());
        }
        if let Some(emit) = self.emit_unresolved {
            config = config.with_emit_unresolved(emit);
        }
        config
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Load configuration from environment variables.
///
/// Parses all `TS_*` environment variables. Invalid values are logged as
/// warnings and ignored.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    let mut env_config = EnvConfig::default();

    let report = |name: &str, value: &str| {
        if verbose {
            tracing::info!("Using {}={}", name, value);
        }
    };

    // TS_BATCH_SIZE - candidates per batch
    if let Some(val) = non_empty_var("TS_BATCH_SIZE") {
        match val.trim().parse::<usize>() {
            Ok(size) if validate_batch_size(size).is_ok() => {
                env_config.batch_size = Some(size);
                report("TS_BATCH_SIZE", &val);
            }
            _ => tracing::warn!("Invalid TS_BATCH_SIZE='{}', must be 1-500", val),
        }
    }

    // TS_TIMEOUT / TS_QUERY_TIMEOUT - deadlines
    if let Some(val) = non_empty_var("TS_TIMEOUT") {
        match parse_duration_string(&val) {
            Some(timeout) => {
                env_config.timeout = Some(timeout);
                report("TS_TIMEOUT", &val);
            }
            None => tracing::warn!("{}", invalid_duration("TS_TIMEOUT", &val)),
        }
    }
    if let Some(val) = non_empty_var("TS_QUERY_TIMEOUT") {
        match parse_duration_string(&val) {
            Some(timeout) => {
                env_config.query_timeout = Some(timeout);
                report("TS_QUERY_TIMEOUT", &val);
            }
            None => tracing::warn!("{}", invalid_duration("TS_QUERY_TIMEOUT", &val)),
        }
    }

    // TS_CAP - candidate cap, 0 for unlimited
    if let Some(val) = non_empty_var("TS_CAP") {
        match val.trim().parse::<usize>() {
            Ok(0) => {
                env_config.cap = Some(None);
                report("TS_CAP", &val);
            }
            Ok(cap) => {
                env_config.cap = Some(Some(cap));
                report("TS_CAP", &val);
            }
            Err(_) => tracing::warn!("Invalid TS_CAP='{}', must be a number", val),
        }
    }

    // TS_SEED - generator seed
    if let Some(val) = non_empty_var("TS_SEED") {
        match val.trim().parse::<u64>() {
            Ok(seed) => {
                env_config.seed = Some(seed);
                report("TS_SEED", &val);
            }
            Err(_) => tracing::warn!("Invalid TS_SEED='{}', must be a number", val),
        }
    }

    // TS_POLICY - registered classification
    if let Some(val) = non_empty_var("TS_POLICY") {
        match val.parse::<RegisteredPolicy>() {
            Ok(policy) => {
                env_config.policy = Some(policy);
                report("TS_POLICY", &val);
            }
            Err(e) => tracing::warn!("Invalid TS_POLICY: {}", e),
        }
    }

    // TS_DOH_URL / TS_GEO_URL - collaborator endpoints
    if let Some(val) = non_empty_var("TS_DOH_URL") {
        match validate_endpoint("TS_DOH_URL", &val) {
            Ok(()) => {
                report("TS_DOH_URL", &val);
                env_config.doh_url = Some(val);
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }
    if let Some(val) = non_empty_var("TS_GEO_URL") {
        match validate_endpoint("TS_GEO_URL", &val) {
            Ok(()) => {
                report("TS_GEO_URL", &val);
                env_config.geo_url = Some(val);
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }

    // TS_EMIT_UNRESOLVED - report candidates without records
    if let Some(val) = non_empty_var("TS_EMIT_UNRESOLVED") {
        match parse_bool(&val) {
            Some(emit) => {
                env_config.emit_unresolved = Some(emit);
                report("TS_EMIT_UNRESOLVED", &val);
            }
            None => tracing::warn!("Invalid TS_EMIT_UNRESOLVED='{}', use true/false", val),
        }
    }

    // TS_CONFIG - explicit config file
    if let Some(val) = non_empty_var("TS_CONFIG") {
        report("TS_CONFIG", &val);
        env_config.config = Some(val);
    }

    env_config
}

/// Longest accepted timeout or cache TTL: 365 days
pub const MAX_DURATION: Duration = Duration::from_secs(365 * 24 * 3600);

/// Parse a duration string like "500ms", "5s", "2m" or "1h".
///
/// A bare number is taken as seconds. Returns None if parsing fails or the
/// value exceeds [`MAX_DURATION`].
pub fn parse_duration_string(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    let (digits, unit_secs) = if let Some(ms) = value.strip_suffix("ms") {
        let millis = ms.parse::<u64>().ok()?;
        return Some(Duration::from_millis(millis)).filter(|d| *d <= MAX_DURATION);
    } else if let Some(secs) = value.strip_suffix('s') {
        (secs, 1)
    } else if let Some(mins) = value.strip_suffix('m') {
        (mins, 60)
    } else if let Some(hours) = value.strip_suffix('h') {
        (hours, 3600)
    } else {
        (value.as_str(), 1)
    };

    let secs = digits.parse::<u64>().ok()?.checked_mul(unit_secs)?;
    Some(Duration::from_secs(secs)).filter(|d| *d <= MAX_DURATION)
}
