//! Batched concurrent probing.
//!
//! Candidates are probed one batch at a time. Inside a batch every candidate
//! runs as its own Tokio task holding a semaphore permit, bounded by a
//! per-candidate deadline and guarded against panics. Results come back in
//! the batch's candidate order regardless of completion order.

use crate::error::ScanError;
use crate::probe::DnsProbe;
use crate::types::{CandidateDomain, ProbeStatus, ResolutionResult};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Split `items` into consecutive batches of at most `batch_size` (minimum 1).
///
/// ```
/// use typoscan_lib::concurrent::partition_batches;
///
/// let sizes: Vec<usize> = partition_batches(&[1, 2, 3, 4, 5], 2)
///     .iter()
///     .map(|b| b.len())
///     .collect();
/// assert_eq!(sizes, vec![2, 2, 1]);
/// ```
pub fn partition_batches<T: Clone>(items: &[T], batch_size: usize) -> Vec<Vec<T>> {
    items
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// What a batch produced.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Completed results, in candidate order
    pub results: Vec<ResolutionResult>,
    /// Set when the batch could not finish; its missing candidates are skipped
    pub failure: Option<ScanError>,
}

/// Runs batches of candidate probes.
#[derive(Clone)]
pub struct BatchRunner {
    probe: DnsProbe,
    candidate_timeout: Duration,
    batch_size: usize,
    #[cfg(test)]
    closed_batches: Vec<usize>,
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("Probe panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("Probe panicked: {}", message)
    } else {
        "Probe panicked".to_string()
    }
}

/// Probe one candidate within `deadline`, converting panics into results.
async fn guarded_probe(
    probe: DnsProbe,
    candidate: CandidateDomain,
    deadline: Duration,
) -> ResolutionResult {
    let attempt = AssertUnwindSafe(probe.probe(candidate.clone())).catch_unwind();

    match tokio::time::timeout(deadline, attempt).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => {
            let reason = panic_message(panic.as_ref());
            tracing::debug!("{} for {}", reason, candidate.name);
            ResolutionResult::failed(candidate, ProbeStatus::Error, reason)
        }
        Err(_) => ResolutionResult::failed(
            candidate,
            ProbeStatus::Timeout,
            ScanError::timeout("candidate probe", deadline).to_string(),
        ),
    }
}

impl BatchRunner {
    pub fn new(probe: DnsProbe, batch_size: usize, candidate_timeout: Duration) -> Self {
        Self {
            probe,
            candidate_timeout,
            batch_size: batch_size.max(1),
            #[cfg(test)]
            closed_batches: Vec::new(),
        }
    }

    /// Make batch `batch_index` start with a closed limiter.
    #[cfg(test)]
    pub(crate) fn with_closed_batch(mut self, batch_index: usize) -> Self {
        self.closed_batches.push(batch_index);
        self
    }

    #[cfg(not(test))]
    fn limiter(&self, _batch_index: usize) -> Arc<Semaphore> {
        Arc::new(Semaphore::new(self.batch_size))
    }

    #[cfg(test)]
    fn limiter(&self, batch_index: usize) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(self.batch_size));
        if self.closed_batches.contains(&batch_index) {
            semaphore.close();
        }
        semaphore
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Probe every candidate of one batch concurrently and wait for all.
    pub async fn run_batch(&self, batch_index: usize, batch: Vec<CandidateDomain>) -> BatchOutcome {
        let semaphore = self.limiter(batch_index);
        self.run_with_semaphore(batch_index, batch, semaphore).await
    }

    async fn run_with_semaphore(
        &self,
        batch_index: usize,
        batch: Vec<CandidateDomain>,
        semaphore: Arc<Semaphore>,
    ) -> BatchOutcome {
        let mut tasks = JoinSet::new();

        for (position, candidate) in batch.into_iter().enumerate() {
            let probe = self.probe.clone();
            let semaphore = Arc::clone(&semaphore);
            let deadline = self.candidate_timeout;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|_| {
                    ScanError::batch(batch_index, "concurrency limiter closed")
                })?;
                Ok::<_, ScanError>((position, guarded_probe(probe, candidate, deadline).await))
            });
        }

        let mut completed = Vec::new();
        let mut failure = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(entry)) => completed.push(entry),
                Ok(Err(e)) => {
                    failure = Some(e);
                    break;
                }
                Err(e) => {
                    failure = Some(ScanError::batch(batch_index, format!("task failed: {}", e)));
                    break;
                }
            }
        }

        if failure.is_some() {
            tasks.abort_all();
        }

        completed.sort_by_key(|(position, _)| *position);
        BatchOutcome {
            results: completed.into_iter().map(|(_, result)| result).collect(),
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::IpCountryCache;
    use crate::protocols::doh::{DohTransport, RecordType};
    use crate::protocols::geo::GeoLocator;
    use crate::types::MutationFamily;
    use async_trait::async_trait;

    /// Answers NS for names starting with "live", hangs on "slow", panics on "boom".
    struct ScriptedDoh;

    #[async_trait]
    impl DohTransport for ScriptedDoh {
        async fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<String>, ScanError> {
            if name.starts_with("boom") {
                panic!("resolver exploded");
            }
            if name.starts_with("slow") {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            if name.starts_with("live") && record_type == RecordType::Ns {
                return Ok(vec!["ns1.host.net.".to_string()]);
            }
            Ok(Vec::new())
        }
    }

    struct NoGeo;

    #[async_trait]
    impl GeoLocator for NoGeo {
        async fn locate(&self, ip: &str) -> Result<String, ScanError> {
            Err(ScanError::geolocation(ip, "unused"))
        }
    }

    fn runner(batch_size: usize) -> BatchRunner {
        let probe = DnsProbe::new(
            Arc::new(ScriptedDoh),
            Arc::new(NoGeo),
            Arc::new(IpCountryCache::default()),
            Duration::from_secs(30),
        );
        BatchRunner::new(probe, batch_size, Duration::from_millis(200))
    }

    fn batch(names: &[&str]) -> Vec<CandidateDomain> {
        names
            .iter()
            .map(|n| CandidateDomain::new(*n, MutationFamily::Omission))
            .collect()
    }

    #[test]
    fn test_partition_batches() {
        let sizes: Vec<usize> = partition_batches(&["a", "b", "c", "d", "e"], 2)
            .iter()
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);

        assert_eq!(partition_batches(&[1, 2, 3], 0).len(), 3);
        assert!(partition_batches::<u8>(&[], 30).is_empty());
    }

    #[tokio::test]
    async fn test_results_keep_candidate_order() {
        let outcome = runner(4)
            .run_batch(0, batch(&["a.com", "live.com", "b.com", "livelier.com"]))
            .await;

        assert!(outcome.failure.is_none());
        let names: Vec<&str> = outcome.results.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["a.com", "live.com", "b.com", "livelier.com"]);
        assert_eq!(outcome.results[0].status, ProbeStatus::NoRecords);
        assert_eq!(outcome.results[1].status, ProbeStatus::Resolved);
    }

    #[tokio::test]
    async fn test_candidate_deadline_yields_timeout() {
        let outcome = runner(2).run_batch(0, batch(&["slow.com", "live.com"])).await;

        assert!(outcome.failure.is_none());
        assert_eq!(outcome.results[0].status, ProbeStatus::Timeout);
        assert!(outcome.results[0].error.is_some());
        assert_eq!(outcome.results[1].status, ProbeStatus::Resolved);
    }

    #[tokio::test]
    async fn test_panic_yields_error_result() {
        let outcome = runner(2).run_batch(0, batch(&["boom.com", "live.com"])).await;

        assert!(outcome.failure.is_none());
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].status, ProbeStatus::Error);
        assert!(outcome.results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("resolver exploded"));
    }

    #[tokio::test]
    async fn test_closed_batch_only_affects_its_index() {
        let runner = runner(2).with_closed_batch(1);

        let first = runner.run_batch(0, batch(&["live.com"])).await;
        assert!(first.failure.is_none());
        assert_eq!(first.results.len(), 1);

        let second = runner.run_batch(1, batch(&["live.com"])).await;
        assert!(matches!(
            second.failure,
            Some(ScanError::BatchExecution { batch: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_closed_limiter_fails_batch() {
        let semaphore = Arc::new(Semaphore::new(1));
        semaphore.close();

        let outcome = runner(2)
            .run_with_semaphore(3, batch(&["a.com", "b.com"]), semaphore)
            .await;

        assert!(matches!(
            outcome.failure,
            Some(ScanError::BatchExecution { batch: 3, .. })
        ));
        assert!(outcome.results.is_empty());
    }
}
