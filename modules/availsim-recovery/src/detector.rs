//! The Recovery Detector (C6): polls pods concurrently, fanning out one
//! probe per pod each round, until the application's minimum-healthy
//! criterion is met or an overall timeout elapses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::RecoveryResult;
use crate::probe::HealthProbeClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryOutcome {
    pub recovered: bool,
    /// Wall-clock time actually spent probing, excluding time spent
    /// re-resolving the pod set at the start of each round. The
    /// Shutdown/Heal Handler (C8) does not use this for MTTR accounting on
    /// shutdown-class operations; it is informational / used for
    /// recovery-detector-class operations only.
    pub elapsed: Duration,
    /// How many of the last round's discovered pods were serving.
    pub healthy_count: usize,
}

pub struct RecoveryDetector<P: HealthProbeClient> {
    client: Arc<P>,
    poll_interval: Duration,
}

impl<P: HealthProbeClient> RecoveryDetector<P> {
    pub fn new(client: Arc<P>, poll_interval: Duration) -> Self {
        Self { client, poll_interval }
    }

    /// Polls, every `poll_interval`, the pod set returned by `discover` —
    /// re-invoked at the start of every round, since pods get rescheduled
    /// across node failures and a stale snapshot would keep probing
    /// addresses that no longer exist — fanning out one concurrent probe
    /// per URL, until at least `min_healthy` are serving or `timeout`
    /// elapses.
    ///
    /// `timeout` bounds total wall-clock time including rediscovery, but
    /// the `elapsed` reported back excludes time spent inside `discover`
    /// itself, so a slow discovery call doesn't get attributed to the
    /// simulated downtime of a real recovery-detector-class operation.
    pub async fn wait_for_recovery(
        &self,
        discover: impl Fn() -> Vec<String>,
        min_healthy: usize,
        timeout: Duration,
    ) -> RecoveryResult<RecoveryOutcome> {
        let started = Instant::now();
        let mut probe_elapsed = Duration::ZERO;
        loop {
            let pod_urls = discover();
            let round_started = Instant::now();
            let healthy_count = self.count_healthy(&pod_urls).await?;
            probe_elapsed += round_started.elapsed();
            debug!(healthy_count, min_healthy, "recovery poll round");
            if healthy_count >= min_healthy {
                return Ok(RecoveryOutcome {
                    recovered: true,
                    elapsed: probe_elapsed,
                    healthy_count,
                });
            }
            if started.elapsed() >= timeout {
                warn!(healthy_count, min_healthy, "recovery detection timed out");
                return Ok(RecoveryOutcome {
                    recovered: false,
                    elapsed: probe_elapsed,
                    healthy_count,
                });
            }
            let remaining = timeout.saturating_sub(started.elapsed());
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }

    async fn count_healthy(&self, pod_urls: &[String]) -> RecoveryResult<usize> {
        let probes = pod_urls.iter().map(|url| {
            let client = Arc::clone(&self.client);
            let url = url.clone();
            async move { client.is_serving(&url).await }
        });
        let results = join_all(probes).await;
        let mut healthy = 0;
        for result in results {
            if result? {
                healthy += 1;
            }
        }
        Ok(healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::HealthProbeClient;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingClient {
        healthy_after_round: usize,
        round: AtomicUsize,
        always_healthy_urls: Vec<String>,
    }

    #[async_trait]
    impl HealthProbeClient for CountingClient {
        async fn is_serving(&self, url: &str) -> RecoveryResult<bool> {
            Ok(self.always_healthy_urls.contains(&url.to_string())
                || self.round.load(Ordering::SeqCst) >= self.healthy_after_round)
        }
    }

    #[tokio::test]
    async fn recovers_once_all_urls_report_healthy() {
        let client = Arc::new(CountingClient {
            healthy_after_round: 0,
            round: AtomicUsize::new(1),
            always_healthy_urls: vec!["http://a".to_string(), "http://b".to_string()],
        });
        let detector = RecoveryDetector::new(client, Duration::from_millis(5));
        let urls = vec!["http://a".to_string(), "http://b".to_string()];
        let outcome = detector
            .wait_for_recovery(|| urls.clone(), 2, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(outcome.recovered);
    }

    #[tokio::test]
    async fn times_out_when_never_enough_healthy() {
        let client = Arc::new(CountingClient {
            healthy_after_round: usize::MAX,
            round: AtomicUsize::new(0),
            always_healthy_urls: vec![],
        });
        let detector = RecoveryDetector::new(client, Duration::from_millis(5));
        let urls = vec!["http://a".to_string(), "http://b".to_string()];
        let outcome = detector
            .wait_for_recovery(|| urls.clone(), 2, Duration::from_millis(30))
            .await
            .unwrap();
        assert!(!outcome.recovered);
        assert!(outcome.elapsed <= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn min_healthy_below_total_pods_recovers_early() {
        let client = Arc::new(CountingClient {
            healthy_after_round: 0,
            round: AtomicUsize::new(1),
            always_healthy_urls: vec!["http://a".to_string()],
        });
        let detector = RecoveryDetector::new(client, Duration::from_millis(5));
        let urls = vec!["http://a".to_string(), "http://b".to_string(), "http://c".to_string()];
        let outcome = detector
            .wait_for_recovery(|| urls.clone(), 1, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(outcome.recovered);
    }

    #[tokio::test]
    async fn discover_is_re_invoked_every_round() {
        let client = Arc::new(CountingClient {
            healthy_after_round: 0,
            round: AtomicUsize::new(1),
            always_healthy_urls: vec!["http://rediscovered".to_string()],
        });
        let detector = RecoveryDetector::new(client, Duration::from_millis(5));
        let calls = AtomicUsize::new(0);
        let outcome = detector
            .wait_for_recovery(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    vec!["http://rediscovered".to_string()]
                },
                1,
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert!(outcome.recovered);
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }
}
