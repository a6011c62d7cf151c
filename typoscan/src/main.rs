//! Typoscan CLI Application
//!
//! A command-line interface for spotting live typosquatting domains.
//! It expands a domain into confusable candidates, resolves them over
//! DNS-over-HTTPS and renders the scan event stream.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use futures::StreamExt;
use serde::Serialize;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use typoscan_lib::generate::family_description;
use typoscan_lib::{
    is_registered, load_env_config, parse_duration_string, parse_families, ConfigManager,
    MutationFamily, RegisteredPolicy, ResolutionResult, ScanConfig, Scanner, StreamEvent,
};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for typoscan
#[derive(Parser, Debug)]
#[command(name = "typoscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Find live typosquatting domains over DNS-over-HTTPS")]
#[command(
    long_about = "Generate confusable variations of a domain and resolve them over DNS-over-HTTPS.\n\nReports which variations have name servers, addresses or mail servers, streaming results as they arrive."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain to scan (e.g. example.com or https://www.example.co.uk/login)
    #[arg(
        value_name = "DOMAIN",
        required_unless_present = "list_families",
        help_heading = "Target"
    )]
    pub domain: Option<String>,

    /// Only run these mutation families (comma-separated or repeated)
    #[arg(
        long = "family",
        value_name = "FAMILY",
        value_delimiter = ',',
        action = clap::ArgAction::Append,
        help_heading = "Candidate Generation"
    )]
    pub families: Vec<String>,

    /// Maximum number of generated candidates (0 = unlimited)
    #[arg(
        long = "cap",
        value_name = "N",
        conflicts_with = "no_cap",
        help_heading = "Candidate Generation"
    )]
    pub cap: Option<usize>,

    /// Probe every generated candidate
    #[arg(long = "no-cap", help_heading = "Candidate Generation")]
    pub no_cap: bool,

    /// Seed for sampling and shuffle variations (random when omitted)
    #[arg(long = "seed", value_name = "N", help_heading = "Candidate Generation")]
    pub seed: Option<u64>,

    /// Print generated candidates without resolving them
    #[arg(long = "dry-run", help_heading = "Candidate Generation")]
    pub dry_run: bool,

    /// List all mutation families and exit
    #[arg(long = "list-families", help_heading = "Candidate Generation")]
    pub list_families: bool,

    /// Output one JSON object per event
    #[arg(
        short = 'j',
        long = "json",
        conflicts_with = "sse",
        help_heading = "Output Format"
    )]
    pub json: bool,

    /// Output server-sent-events style frames
    #[arg(long = "sse", help_heading = "Output Format")]
    pub sse: bool,

    /// Enable headers, progress counters and colors
    #[arg(short = 'p', long = "pretty", help_heading = "Output Format")]
    pub pretty: bool,

    /// Collect all results before displaying
    #[arg(long = "batch", help_heading = "Output Format")]
    pub batch: bool,

    /// Only show candidates classified as registered
    #[arg(long = "registered-only", help_heading = "Output Format")]
    pub registered_only: bool,

    /// Do not report candidates without any DNS records
    #[arg(long = "hide-unresolved", help_heading = "Output Format")]
    pub hide_unresolved: bool,

    /// Candidates probed concurrently per batch (1-500)
    #[arg(long = "batch-size", value_name = "N", help_heading = "Performance")]
    pub batch_size: Option<usize>,

    /// Deadline per candidate (e.g. "3s", "500ms")
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Registered classification: nameserver or any
    #[arg(long = "policy", value_name = "POLICY", help_heading = "Detection")]
    pub policy: Option<String>,

    /// Use a specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show progress and configuration details
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,

    /// Show per-candidate probe logs
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if args.list_families {
        print_families();
        return;
    }

    init_tracing(&args);

    if let Err(e) = run_scan(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber. `--debug` and `--verbose` override `RUST_LOG`.
fn init_tracing(args: &Args) {
    let filter = if args.debug {
        EnvFilter::new("typoscan=debug,typoscan_lib=debug")
    } else if args.verbose {
        EnvFilter::new("typoscan=info,typoscan_lib=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    // --list-families is self-contained, skip other validation
    if args.list_families {
        return Ok(());
    }

    if args.batch && args.sse {
        return Err("Cannot use --sse with --batch. Use --batch --json for structured output".to_string());
    }

    if args.pretty && (args.json || args.sse) {
        return Err("Cannot combine --pretty with --json or --sse".to_string());
    }

    if let Some(batch_size) = args.batch_size {
        if batch_size == 0 || batch_size > 500 {
            return Err("Batch size must be between 1 and 500".to_string());
        }
    }

    Ok(())
}

/// Print every mutation family with a short description, then exit.
fn print_families() {
    use console::Style;

    let heading = Style::new().yellow().bold();
    let name_style = Style::new().green().bold();

    println!();
    println!("{}", heading.apply_to("Available Mutation Families:"));
    println!();

    for family in MutationFamily::ALL {
        println!(
            "  {}  {}",
            name_style.apply_to(format!("{:<20}", family.as_str())),
            family_description(family),
        );
    }

    println!();
    println!("Use: typoscan <domain> --family <family>[,<family>...]");
}

/// Main scanning logic
async fn run_scan(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    let domain = args
        .domain
        .clone()
        .ok_or("You must specify a domain to scan")?;

    let scanner = Scanner::with_config(config)?;

    if args.dry_run {
        return print_candidates(&scanner, &domain, &args);
    }

    if args.batch {
        run_batch_scan(&scanner, &domain, &args).await
    } else {
        run_streaming_scan(&scanner, &domain, &args).await
    }
}

/// Print generated candidates without probing them.
fn print_candidates(
    scanner: &Scanner,
    domain: &str,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let candidates = scanner.candidates(domain)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else {
        for candidate in &candidates {
            println!("{}\t{}", candidate.name, candidate.family);
        }
    }
    eprintln!("{} candidates would be probed", candidates.len());
    Ok(())
}

/// Run a scan rendering each event as it arrives.
async fn run_streaming_scan(
    scanner: &Scanner,
    domain: &str,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let structured = args.json || args.sse;
    let mut events = scanner.scan(domain)?;
    let start_time = Instant::now();

    let mut total = 0usize;
    let mut attempted = 0usize;
    let mut tally = ui::StatusTally::default();

    if args.pretty {
        ui::print_header(domain, scanner.config());
    }

    while let Some(event) = events.next().await {
        if let StreamEvent::Result(found) = &event {
            if args.registered_only && !found.registered {
                continue;
            }
        }

        if args.sse {
            print!("{}", event.to_sse_line()?);
            continue;
        }
        if structured {
            println!("{}", event.to_json_line()?);
            continue;
        }

        match event {
            StreamEvent::Meta(progress) => match progress {
                typoscan_lib::ScanProgress::Total { total: count } => total = count,
                typoscan_lib::ScanProgress::Attempted { attempted: count } => attempted = count,
            },
            StreamEvent::Result(found) => {
                tally.add(&found.result);
                let counter = if args.pretty {
                    Some((attempted, total))
                } else {
                    None
                };
                ui::print_result(&found.result, found.registered, counter);
            }
            StreamEvent::Done(summary) => {
                println!();
                ui::print_summary(&summary, &tally, start_time.elapsed());
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct BatchEntry<'a> {
    #[serde(flatten)]
    result: &'a ResolutionResult,
    registered: bool,
}

/// Run a scan collecting all results first.
async fn run_batch_scan(
    scanner: &Scanner,
    domain: &str,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let policy = scanner.config().registered_policy;
    let emit_unresolved = scanner.config().emit_unresolved;

    let spinner = if !args.json {
        ui::Spinner::start(format!("Scanning variations of {}...", domain))
    } else {
        None
    };

    let start_time = Instant::now();
    let results = scanner.scan_all(domain).await?;
    let duration = start_time.elapsed();

    if let Some(s) = spinner {
        s.stop().await;
    }

    let entries: Vec<BatchEntry> = results
        .iter()
        .map(|result| BatchEntry {
            result,
            registered: is_registered(result, policy),
        })
        .filter(|entry| emit_unresolved || entry.result.has_records())
        .filter(|entry| !args.registered_only || entry.registered)
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if args.pretty {
        ui::print_header(domain, scanner.config());
    }

    let shown: Vec<(&ResolutionResult, bool)> =
        entries.iter().map(|e| (e.result, e.registered)).collect();
    ui::print_grouped_results(&shown);

    let registered = results
        .iter()
        .filter(|r| is_registered(r, policy))
        .count();
    let mut tally = ui::StatusTally::default();
    for result in &results {
        tally.add(result);
    }
    ui::print_summary(
        &typoscan_lib::ScanSummary::new(results.len(), registered),
        &tally,
        duration,
    );

    Ok(())
}

/// Build ScanConfig from CLI arguments with config file integration.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments (explicit user input)
/// 2. Environment variables (TS_*)
/// 3. Local config file (./typoscan.toml or ./.typoscan.toml)
/// 4. Global config file (~/.typoscan.toml)
/// 5. XDG config file (~/.config/typoscan/config.toml)
/// 6. Built-in defaults
fn build_config(args: &Args) -> Result<ScanConfig, Box<dyn std::error::Error>> {
    let mut config = ScanConfig::default();
    let config_manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config(args.verbose);

    // Step 1: explicit file (--config, then TS_CONFIG) or discovery
    if let Some(explicit_path) = args.config.as_ref().or(env_config.config.as_ref()) {
        tracing::info!("Using explicit config file: {}", explicit_path);

        let file_config = config_manager
            .load_file(explicit_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", explicit_path, e))?;

        config = file_config.apply_to(config)?;
    } else {
        match config_manager.discover_and_load() {
            Ok(file_config) => config = file_config.apply_to(config)?,
            Err(e) => tracing::warn!("Config discovery warning: {}", e),
        }
    }

    // Step 2: environment variables (TS_*)
    config = env_config.apply_to(config);

    // Step 3: CLI arguments (highest precedence)
    apply_cli_args_to_config(config, args)
}

/// Apply CLI arguments to configuration (highest precedence)
fn apply_cli_args_to_config(
    mut config: ScanConfig,
    args: &Args,
) -> Result<ScanConfig, Box<dyn std::error::Error>> {
    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }

    if let Some(timeout) = &args.timeout {
        let duration = parse_duration_string(timeout).ok_or_else(|| {
            format!(
                "Invalid timeout '{}'. Use a format like '3s', '500ms' or '1m'",
                timeout
            )
        })?;
        config = config.with_candidate_timeout(duration);
    }

    if args.no_cap {
        config = config.with_cap(None);
    } else if let Some(cap) = args.cap {
        config = config.with_cap(if cap == 0 { None } else { Some(cap) });
    }

    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    if let Some(policy) = &args.policy {
        config = config.with_registered_policy(policy.parse::<RegisteredPolicy>()?);
    }

    if args.hide_unresolved {
        config = config.with_emit_unresolved(false);
    }

    if !args.families.is_empty() {
        config = config.with_families(parse_families(&args.families)?);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_test_args() -> Args {
        Args {
            domain: Some("example.com".to_string()),
            families: vec![],
            cap: None,
            no_cap: false,
            seed: None,
            dry_run: false,
            list_families: false,
            json: false,
            sse: false,
            pretty: false,
            batch: false,
            registered_only: false,
            hide_unresolved: false,
            batch_size: None,
            timeout: None,
            policy: None,
            config: None,
            verbose: false,
            debug: false,
        }
    }

    #[test]
    fn test_validate_args_defaults() {
        assert!(validate_args(&create_test_args()).is_ok());
    }

    #[test]
    fn test_validate_args_rejects_sse_batch() {
        let mut args = create_test_args();
        args.sse = true;
        args.batch = true;
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_rejects_pretty_json() {
        let mut args = create_test_args();
        args.pretty = true;
        args.json = true;
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_batch_size_range() {
        let mut args = create_test_args();
        args.batch_size = Some(0);
        assert!(validate_args(&args).is_err());

        args.batch_size = Some(501);
        assert!(validate_args(&args).is_err());

        args.batch_size = Some(500);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_list_families_skips_validation() {
        let mut args = create_test_args();
        args.list_families = true;
        args.batch_size = Some(0);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_cli_args_override_config() {
        let mut args = create_test_args();
        args.batch_size = Some(12);
        args.timeout = Some("750ms".to_string());
        args.seed = Some(99);
        args.policy = Some("any".to_string());
        args.hide_unresolved = true;
        args.families = vec!["omission".to_string(), "vowel-swap".to_string()];

        let config = apply_cli_args_to_config(ScanConfig::default(), &args).unwrap();
        assert_eq!(config.batch_size, 12);
        assert_eq!(config.candidate_timeout, Duration::from_millis(750));
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.registered_policy, RegisteredPolicy::AnyRecord);
        assert!(!config.emit_unresolved);
        assert_eq!(
            config.families,
            Some(vec![MutationFamily::Omission, MutationFamily::VowelSwap])
        );
    }

    #[test]
    fn test_cap_flags() {
        let mut args = create_test_args();
        args.cap = Some(25);
        let config = apply_cli_args_to_config(ScanConfig::default(), &args).unwrap();
        assert_eq!(config.cap, Some(25));

        args.cap = Some(0);
        let config = apply_cli_args_to_config(ScanConfig::default(), &args).unwrap();
        assert_eq!(config.cap, None);

        args.cap = None;
        args.no_cap = true;
        let config = apply_cli_args_to_config(ScanConfig::default(), &args).unwrap();
        assert_eq!(config.cap, None);
    }

    #[test]
    fn test_invalid_cli_values_are_errors() {
        let mut args = create_test_args();
        args.timeout = Some("soon".to_string());
        assert!(apply_cli_args_to_config(ScanConfig::default(), &args).is_err());

        let mut args = create_test_args();
        args.policy = Some("maybe".to_string());
        assert!(apply_cli_args_to_config(ScanConfig::default(), &args).is_err());

        let mut args = create_test_args();
        args.families = vec!["teleportation".to_string()];
        assert!(apply_cli_args_to_config(ScanConfig::default(), &args).is_err());
    }

    #[test]
    fn test_huge_timeout_is_error() {
        let mut args = create_test_args();
        args.timeout = Some("4000000000000000h".to_string());
        assert!(apply_cli_args_to_config(ScanConfig::default(), &args).is_err());

        args.timeout = Some("8760h".to_string());
        let config = apply_cli_args_to_config(ScanConfig::default(), &args).unwrap();
        assert_eq!(config.candidate_timeout, Duration::from_secs(365 * 24 * 3600));
    }
}
