//! Main scanner implementation.
//!
//! This module provides the `Scanner` struct that orchestrates a scan:
//! generate candidates, probe them batch by batch, deduplicate, classify and
//! report progress as a stream of events.

use crate::cache::{self, IpCountryCache, DEFAULT_NEGATIVE_TTL, DEFAULT_TTL};
use crate::concurrent::{partition_batches, BatchRunner};
use crate::error::ScanError;
use crate::generate::{generate_for_domain, GeneratorOptions};
use crate::probe::DnsProbe;
use crate::protocols::doh::{DohClient, DohTransport};
use crate::protocols::geo::{GeoClient, GeoLocator};
use crate::types::{
    CandidateDomain, RegisteredPolicy, ResolutionResult, ResultEvent, ScanConfig, ScanProgress,
    ScanSummary, StreamEvent,
};
use crate::utils::is_plausible_hostname;
use futures::stream::Stream;
use std::collections::HashSet;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;

/// Name server fragments that indicate a parked or placeholder delegation.
const PLACEHOLDER_KEYWORDS: &[&str] = &["suspended", "parked", "default", "placeholder", "example"];

/// Whether a probed candidate counts as registered under `policy`.
pub fn is_registered(result: &ResolutionResult, policy: RegisteredPolicy) -> bool {
    match policy {
        RegisteredPolicy::NameServer => match result.name_server.as_deref() {
            Some(ns) => {
                let ns = ns.to_lowercase();
                is_plausible_hostname(&ns)
                    && !PLACEHOLDER_KEYWORDS.iter().any(|keyword| ns.contains(keyword))
            }
            None => false,
        },
        RegisteredPolicy::AnyRecord => result.has_records(),
    }
}

/// Per-scan state: the candidate list, the names already reported and the
/// running counters. Never shared between scans.
#[derive(Debug)]
pub struct ScanSession {
    candidates: Vec<CandidateDomain>,
    seen: HashSet<String>,
    scanned: usize,
    registered: usize,
    policy: RegisteredPolicy,
    emit_unresolved: bool,
}

impl ScanSession {
    pub fn new(
        candidates: Vec<CandidateDomain>,
        policy: RegisteredPolicy,
        emit_unresolved: bool,
    ) -> Self {
        Self {
            candidates,
            seen: HashSet::new(),
            scanned: 0,
            registered: 0,
            policy,
            emit_unresolved,
        }
    }

    pub fn candidates(&self) -> &[CandidateDomain] {
        &self.candidates
    }

    pub fn total(&self) -> usize {
        self.candidates.len()
    }

    pub fn scanned(&self) -> usize {
        self.scanned
    }

    pub fn registered(&self) -> usize {
        self.registered
    }

    /// Opening event announcing the session size.
    pub fn start_event(&self) -> StreamEvent {
        StreamEvent::Meta(ScanProgress::Total { total: self.total() })
    }

    /// Account for one result and return the events it produces.
    ///
    /// A name already reported yields nothing and is not counted.
    pub fn record(&mut self, result: ResolutionResult) -> Vec<StreamEvent> {
        if !self.seen.insert(result.name().to_string()) {
            tracing::debug!("Suppressing duplicate result for {}", result.name());
            return Vec::new();
        }

        self.scanned += 1;
        let registered = is_registered(&result, self.policy);
        if registered {
            self.registered += 1;
        }

        let mut events = vec![StreamEvent::Meta(ScanProgress::Attempted {
            attempted: self.scanned,
        })];

        if result.has_records() || self.emit_unresolved {
            events.push(StreamEvent::Result(Box::new(ResultEvent {
                result,
                registered,
                progress: format!("Processed {} of {}", self.scanned, self.total()),
            })));
        }

        events
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary::new(self.scanned, self.registered)
    }
}

/// Stream of scan events. Dropping it cancels the scan.
pub struct ScanStream {
    inner: Pin<Box<dyn Stream<Item = StreamEvent> + Send>>,
}

impl fmt::Debug for ScanStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanStream").finish_non_exhaustive()
    }
}

impl Stream for ScanStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Typosquatting scanner.
///
/// # Example
///
/// ```rust,no_run
/// use futures::StreamExt;
/// use typoscan_lib::{Scanner, StreamEvent};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let scanner = Scanner::new()?;
///     let mut events = scanner.scan("example.com")?;
///
///     while let Some(event) = events.next().await {
///         if let StreamEvent::Done(summary) = event {
///             println!("{}", summary.summary);
///         }
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Scanner {
    config: ScanConfig,
    probe: DnsProbe,
}

impl Scanner {
    /// Create a scanner with default settings.
    pub fn new() -> Result<Self, ScanError> {
        Self::with_config(ScanConfig::default())
    }

    /// Create a scanner using the HTTP collaborators named in `config`.
    ///
    /// The process-wide country cache is used unless the configuration asks
    /// for non-default TTLs.
    pub fn with_config(config: ScanConfig) -> Result<Self, ScanError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.candidate_timeout.saturating_add(Duration::from_secs(1)))
            .build()
            .map_err(|e| {
                ScanError::network_with_source("Failed to create HTTP client", e.to_string())
            })?;

        let transport = Arc::new(DohClient::new(http_client.clone(), config.doh_endpoint.clone()));
        let locator = Arc::new(GeoClient::new(http_client, config.geo_endpoint.clone()));

        let cache = if config.geo_cache_ttl == DEFAULT_TTL
            && config.geo_negative_ttl == DEFAULT_NEGATIVE_TTL
        {
            cache::global()
        } else {
            Arc::new(IpCountryCache::new(
                config.geo_cache_ttl,
                config.geo_negative_ttl,
            ))
        };

        Ok(Self::with_transports(config, transport, locator, cache))
    }

    /// Create a scanner over explicit collaborators.
    pub fn with_transports(
        config: ScanConfig,
        transport: Arc<dyn DohTransport>,
        locator: Arc<dyn GeoLocator>,
        cache: Arc<IpCountryCache>,
    ) -> Self {
        let probe = DnsProbe::new(transport, locator, cache, config.query_timeout);
        Self { config, probe }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn resolve_seed(&self) -> u64 {
        match self.config.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random::<u64>();
                tracing::debug!("No seed configured, using {}", seed);
                seed
            }
        }
    }

    /// Generate the ordered candidate list for `domain` (Original first).
    pub fn candidates(&self, domain: &str) -> Result<Vec<CandidateDomain>, ScanError> {
        let options = GeneratorOptions::from_config(&self.config, self.resolve_seed());
        generate_for_domain(domain, &options)
    }

    fn runner(&self) -> BatchRunner {
        BatchRunner::new(
            self.probe.clone(),
            self.config.batch_size,
            self.config.candidate_timeout,
        )
    }

    /// Start a streaming scan of `domain`.
    ///
    /// Input errors are returned before any work starts. The returned stream
    /// always ends with exactly one summary event unless it is dropped first.
    /// Must be called from within a Tokio runtime.
    pub fn scan(&self, domain: &str) -> Result<ScanStream, ScanError> {
        let candidates = self.candidates(domain)?;
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| ScanError::internal("Streaming scans require a Tokio runtime"))?;

        tracing::info!("Scanning {} candidates for {}", candidates.len(), domain);

        let session = ScanSession::new(
            candidates,
            self.config.registered_policy,
            self.config.emit_unresolved,
        );
        let (tx, rx) = mpsc::channel(self.config.batch_size.max(16) * 2);
        handle.spawn(run_session(self.runner(), session, tx));

        let events = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(ScanStream {
            inner: Box::pin(events),
        })
    }

    /// Resolve every candidate of `domain` and return all results in
    /// candidate order, Original first. No deduplication or events.
    pub async fn scan_all(&self, domain: &str) -> Result<Vec<ResolutionResult>, ScanError> {
        let candidates = self.candidates(domain)?;
        let runner = self.runner();
        let mut results = Vec::with_capacity(candidates.len());

        for (index, batch) in partition_batches(&candidates, runner.batch_size())
            .into_iter()
            .enumerate()
        {
            let outcome = runner.run_batch(index, batch).await;
            results.extend(outcome.results);
            if let Some(e) = outcome.failure {
                tracing::warn!("{}", e);
            }
        }

        Ok(results)
    }
}

/// Drive one session to completion, sending events until the consumer goes
/// away.
async fn run_session(runner: BatchRunner, mut session: ScanSession, tx: mpsc::Sender<StreamEvent>) {
    if tx.send(session.start_event()).await.is_err() {
        return;
    }

    let batches = partition_batches(session.candidates(), runner.batch_size());

    for (index, batch) in batches.into_iter().enumerate() {
        let outcome = tokio::select! {
            outcome = runner.run_batch(index, batch) => outcome,
            _ = tx.closed() => {
                tracing::debug!("Scan consumer went away during batch {}", index);
                return;
            }
        };

        for result in outcome.results {
            for event in session.record(result) {
                if tx.send(event).await.is_err() {
                    tracing::debug!("Scan consumer went away, stopping");
                    return;
                }
            }
        }

        if let Some(e) = outcome.failure {
            tracing::warn!("{}", e);
        }
    }

    let summary = session.summary();
    tracing::info!("{}", summary.summary);
    let _ = tx.send(StreamEvent::Done(summary)).await;
}
