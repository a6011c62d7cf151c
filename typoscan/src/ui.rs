//! Text-mode display logic for the typoscan CLI.
//!
//! This module handles colored result lines, grouped batch output,
//! spinner animation, headers and summaries. Uses only the `console` crate.

use console::{pad_str, style, Alignment, Term};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use typoscan_lib::{ProbeStatus, ResolutionResult, ScanConfig, ScanSummary, UNKNOWN_COUNTRY};

const NAME_WIDTH: usize = 32;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner with the given message. Returns None when stderr is not a TTY.
    pub fn start(message: String) -> Option<Self> {
        let term = Term::stderr();
        if !term.is_term() {
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Some(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a pretty run.
pub fn print_header(domain: &str, config: &ScanConfig) {
    println!(
        "{} {} {}",
        style("typoscan").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!("- Scanning variations of {}", domain)).dim(),
    );

    let mut meta_parts: Vec<String> = Vec::new();
    match config.cap {
        Some(cap) => meta_parts.push(format!("Cap: {}", cap)),
        None => meta_parts.push("Cap: none".to_string()),
    }
    if let Some(families) = &config.families {
        meta_parts.push(format!("Families: {}", families.len()));
    }
    if let Some(seed) = config.seed {
        meta_parts.push(format!("Seed: {}", seed));
    }
    meta_parts.push(format!("Batch: {}", config.batch_size));
    meta_parts.push(format!("Policy: {}", config.registered_policy));

    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Single result line ───────────────────────────────────────────────────────

/// Format and print a single probe result with colors and alignment.
///
/// If `counter` is Some((current, total)), a progress prefix like `[3/8]` is shown.
pub fn print_result(result: &ResolutionResult, registered: bool, counter: Option<(usize, usize)>) {
    let padded_name = pad_str(result.name(), NAME_WIDTH, Alignment::Left, Some(".."));
    let padded_family = pad_str(result.candidate.family.as_str(), 18, Alignment::Left, None);

    let prefix = match counter {
        Some((cur, total)) => format!("{} ", style(format!("[{}/{}]", cur, total)).dim()),
        None => String::new(),
    };

    let label = status_label(result, registered);
    let details = match result.status {
        ProbeStatus::Resolved => format_records(result),
        _ => brief_error(result).to_string(),
    };

    println!(
        "  {}{}  {}  {}  {}",
        prefix,
        style(&padded_name).white(),
        style(&padded_family).dim(),
        label,
        style(details).dim(),
    );
}

fn status_label(result: &ResolutionResult, registered: bool) -> String {
    match result.status {
        ProbeStatus::Resolved if registered => style("REGISTERED").red().bold().to_string(),
        ProbeStatus::Resolved => style("RESOLVES").yellow().bold().to_string(),
        ProbeStatus::NoRecords => style("NO RECORDS").green().to_string(),
        ProbeStatus::Timeout | ProbeStatus::Error => style("UNKNOWN").yellow().to_string(),
    }
}

// ── Grouped batch output ─────────────────────────────────────────────────────

/// Print results grouped as Registered, Resolves, No records and Unknown.
/// Empty sections are omitted entirely.
pub fn print_grouped_results(results: &[(&ResolutionResult, bool)]) {
    let mut registered = Vec::new();
    let mut resolving = Vec::new();
    let mut empty = Vec::new();
    let mut unknown = Vec::new();

    for &(result, is_registered) in results {
        match result.status {
            ProbeStatus::Resolved if is_registered => registered.push(result),
            ProbeStatus::Resolved => resolving.push(result),
            ProbeStatus::NoRecords => empty.push(result),
            ProbeStatus::Timeout | ProbeStatus::Error => unknown.push(result),
        }
    }

    if !registered.is_empty() {
        println!(
            "  {} {}",
            style(format!("── Registered ({}) ", registered.len())).red().bold(),
            style("─".repeat(40)).red().dim(),
        );
        for r in &registered {
            print_grouped_line(r);
        }
        println!();
    }

    if !resolving.is_empty() {
        println!(
            "  {} {}",
            style(format!("── Resolves ({}) ", resolving.len())).yellow().bold(),
            style("─".repeat(42)).yellow().dim(),
        );
        for r in &resolving {
            print_grouped_line(r);
        }
        println!();
    }

    if !empty.is_empty() {
        println!(
            "  {} {}",
            style(format!("── No records ({}) ", empty.len())).green().bold(),
            style("─".repeat(40)).green().dim(),
        );
        for r in &empty {
            print_grouped_line(r);
        }
        println!();
    }

    if !unknown.is_empty() {
        println!(
            "  {} {}",
            style(format!("── Unknown ({}) ", unknown.len())).yellow().bold(),
            style("─".repeat(43)).yellow().dim(),
        );
        for r in &unknown {
            print_grouped_line(r);
        }
        println!();
    }
}

/// Print a single line inside a grouped section.
fn print_grouped_line(result: &ResolutionResult) {
    let padded = pad_str(result.name(), NAME_WIDTH, Alignment::Left, Some(".."));
    let details = match result.status {
        ProbeStatus::Resolved => format_records(result),
        ProbeStatus::NoRecords => String::new(),
        _ => brief_error(result).to_string(),
    };

    println!(
        "    {}  {}  {}",
        style(&padded).white(),
        style(result.candidate.family.as_str()).dim(),
        style(details).dim(),
    );
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Counts of probe outcomes seen during a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusTally {
    pub resolved: usize,
    pub no_records: usize,
    pub timeouts: usize,
    pub errors: usize,
}

impl StatusTally {
    pub fn add(&mut self, result: &ResolutionResult) {
        match result.status {
            ProbeStatus::Resolved => self.resolved += 1,
            ProbeStatus::NoRecords => self.no_records += 1,
            ProbeStatus::Timeout => self.timeouts += 1,
            ProbeStatus::Error => self.errors += 1,
        }
    }
}

/// Print the final summary bar with colored counts.
pub fn print_summary(summary: &ScanSummary, tally: &StatusTally, duration: Duration) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} candidate{} in {:.1}s  {}  {}  {}  {}",
        style(summary.total_count).bold(),
        if summary.total_count == 1 { "" } else { "s" },
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} registered", summary.registered_count)).red(),
        style("|").dim(),
        style(format!("{} resolving", tally.resolved)).yellow(),
    );

    let failed = tally.timeouts + tally.errors;
    if failed > 0 {
        println!(
            "  {} {} candidate{} could not be resolved ({} timeout{}, {} error{})",
            style("•").dim(),
            failed,
            if failed == 1 { "" } else { "s" },
            tally.timeouts,
            if tally.timeouts == 1 { "" } else { "s" },
            tally.errors,
            if tally.errors == 1 { "" } else { "s" },
        );
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Format the records of a resolved candidate into a concise string.
pub fn format_records(result: &ResolutionResult) -> String {
    let mut parts = Vec::new();
    if let Some(ip) = &result.ipv4 {
        if result.country != UNKNOWN_COUNTRY {
            parts.push(format!("A: {} ({})", ip, result.country));
        } else {
            parts.push(format!("A: {}", ip));
        }
    }
    if let Some(ip) = &result.ipv6 {
        parts.push(format!("AAAA: {}", ip));
    }
    if let Some(ns) = &result.name_server {
        parts.push(format!("NS: {}", ns));
    }
    if let Some(mx) = &result.mail_server {
        parts.push(format!("MX: {}", mx));
    }
    if parts.is_empty() {
        "No records".to_string()
    } else {
        parts.join(", ")
    }
}

/// Extract a brief reason for an unresolved candidate.
fn brief_error(result: &ResolutionResult) -> &'static str {
    match result.status {
        ProbeStatus::Timeout => "(timeout)",
        ProbeStatus::Error => match &result.error {
            Some(msg) if msg.to_lowercase().contains("panicked") => "(probe failed)",
            Some(_) => "(error)",
            None => "(unknown status)",
        },
        ProbeStatus::NoRecords => "(no records)",
        ProbeStatus::Resolved => "",
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use typoscan_lib::{CandidateDomain, MutationFamily};

    fn make_result(name: &str, status: ProbeStatus) -> ResolutionResult {
        ResolutionResult::unresolved(CandidateDomain::new(name, MutationFamily::Omission), status)
    }

    #[test]
    fn test_brief_error_timeout() {
        let r = make_result("a.com", ProbeStatus::Timeout);
        assert_eq!(brief_error(&r), "(timeout)");
    }

    #[test]
    fn test_brief_error_panic() {
        let r = ResolutionResult::failed(
            CandidateDomain::new("a.com", MutationFamily::Omission),
            ProbeStatus::Error,
            "Probe panicked: boom",
        );
        assert_eq!(brief_error(&r), "(probe failed)");
    }

    #[test]
    fn test_brief_error_unknown_status() {
        let r = make_result("a.com", ProbeStatus::Error);
        assert_eq!(brief_error(&r), "(unknown status)");
    }

    #[test]
    fn test_format_records_all_fields() {
        let r = ResolutionResult {
            ipv4: Some("93.184.216.34".to_string()),
            ipv6: Some("2606:2800::1".to_string()),
            name_server: Some("ns1.host.net.".to_string()),
            mail_server: Some("mx.host.net.".to_string()),
            country: "Netherlands".to_string(),
            status: ProbeStatus::Resolved,
            ..make_result("a.com", ProbeStatus::Resolved)
        };
        let formatted = format_records(&r);
        assert!(formatted.contains("A: 93.184.216.34 (Netherlands)"));
        assert!(formatted.contains("AAAA: 2606:2800::1"));
        assert!(formatted.contains("NS: ns1.host.net."));
        assert!(formatted.contains("MX: mx.host.net."));
    }

    #[test]
    fn test_format_records_hides_unknown_country() {
        let r = ResolutionResult {
            ipv4: Some("10.0.0.1".to_string()),
            ..make_result("a.com", ProbeStatus::Resolved)
        };
        assert_eq!(format_records(&r), "A: 10.0.0.1");
    }

    #[test]
    fn test_format_records_empty() {
        let r = make_result("a.com", ProbeStatus::NoRecords);
        assert_eq!(format_records(&r), "No records");
    }

    #[test]
    fn test_status_tally() {
        let mut tally = StatusTally::default();
        tally.add(&make_result("a.com", ProbeStatus::Resolved));
        tally.add(&make_result("b.com", ProbeStatus::NoRecords));
        tally.add(&make_result("c.com", ProbeStatus::Timeout));
        tally.add(&make_result("d.com", ProbeStatus::Timeout));
        assert_eq!(
            tally,
            StatusTally {
                resolved: 1,
                no_records: 1,
                timeouts: 2,
                errors: 0,
            }
        );
    }
}
