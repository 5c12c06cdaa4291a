//! Bounded-concurrency batch acquisition.
//!
//! Every URL gets its own task running the full escalation; a semaphore caps
//! how many escalations are in flight. Results are collected in completion
//! order. If the caller's context finishes first, whatever has been
//! collected is returned along with the context error.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use super::escalation::EscalationController;
use crate::context::AcquireContext;
use crate::error::AcquireError;
use crate::models::EscalationResult;

pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Per-URL results of a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Keyed by the URL as submitted.
    pub results: HashMap<String, EscalationResult>,
    /// Set when the batch context finished before every URL completed.
    pub interrupted: Option<AcquireError>,
}

/// Counts for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub missing: usize,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.values().filter(|r| r.is_err()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }

    pub fn summary(&self, submitted: usize) -> BatchSummary {
        let succeeded = self.succeeded();
        let failed = self.failed();
        BatchSummary {
            submitted,
            succeeded,
            failed,
            missing: submitted.saturating_sub(succeeded + failed),
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    controller: Arc<EscalationController>,
    max_concurrency: usize,
    per_url_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(controller: Arc<EscalationController>) -> Self {
        Self {
            controller,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            per_url_timeout: None,
        }
    }

    /// Zero is treated as one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Deadline applied to each URL's escalation, on top of the batch context.
    pub fn with_per_url_timeout(mut self, timeout: Duration) -> Self {
        self.per_url_timeout = Some(timeout);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub async fn scrape_many(&self, ctx: &AcquireContext, urls: &[String]) -> BatchOutcome {
        self.scrape_many_with(ctx, urls, |_, _| {}).await
    }

    /// Like [`scrape_many`](Self::scrape_many), calling `on_result` as each
    /// URL completes.
    pub async fn scrape_many_with<F>(
        &self,
        ctx: &AcquireContext,
        urls: &[String],
        mut on_result: F,
    ) -> BatchOutcome
    where
        F: FnMut(&str, &EscalationResult),
    {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = urls.iter().filter(|u| seen.insert(u.as_str())).collect();

        let mut results = HashMap::with_capacity(unique.len());
        if unique.is_empty() {
            return BatchOutcome {
                results,
                interrupted: None,
            };
        }

        info!(
            urls = unique.len(),
            max_concurrency = self.max_concurrency,
            "Starting batch acquisition"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let (tx, mut rx) = mpsc::channel::<(String, EscalationResult)>(unique.len());
        // Cancelled when the collector returns so stragglers stop early.
        let workers = ctx.child();

        for url in unique {
            let url = url.clone();
            let tx = tx.clone();
            let semaphore = semaphore.clone();
            let controller = self.controller.clone();
            let worker_ctx = workers.clone();
            let per_url_timeout = self.per_url_timeout;

            tokio::spawn(async move {
                let permit = worker_ctx
                    .run(async {
                        semaphore.acquire_owned().await.map_err(|_| {
                            AcquireError::ContextCancelled("worker pool closed".into())
                        })
                    })
                    .await;

                let result = match permit {
                    Ok(_permit) => {
                        let url_ctx = match per_url_timeout {
                            Some(t) => worker_ctx.child_with_timeout(t),
                            None => worker_ctx.child(),
                        };
                        controller.acquire(&url_ctx, &url).await
                    }
                    Err(e) => Err(e),
                };
                // The collector may already have returned.
                let _ = tx.send((url, result)).await;
            });
        }
        drop(tx);

        let interrupted = loop {
            tokio::select! {
                biased;
                item = rx.recv() => match item {
                    Some((url, result)) => {
                        on_result(&url, &result);
                        results.insert(url, result);
                    }
                    // Every worker reported, but some may have been cut short.
                    None => {
                        let cut_short = results
                            .values()
                            .any(|r| r.as_ref().is_err_and(AcquireError::is_cancelled));
                        break ctx.err().filter(|_| cut_short);
                    }
                },
                _ = ctx.done() => {
                    let err = ctx.err().unwrap_or_else(|| {
                        AcquireError::ContextCancelled("context cancelled".into())
                    });
                    warn!(collected = results.len(), "Batch interrupted, returning partial results");
                    break Some(err);
                }
            }
        };
        workers.cancel();

        let outcome = BatchOutcome {
            results,
            interrupted,
        };
        debug!(
            succeeded = outcome.succeeded(),
            failed = outcome.failed(),
            "Batch acquisition finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::{ContentFields, ScrapedContent};
    use crate::scrapers::strategies::{AcquisitionStrategy, StrategyKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tracks how many scrapes run at once.
    struct GaugeStrategy {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl AcquisitionStrategy for GaugeStrategy {
        fn name(&self) -> &str {
            "gauge"
        }

        fn kind(&self) -> StrategyKind {
            StrategyKind::Direct
        }

        async fn scrape(&self, ctx: &AcquireContext, url: &str) -> Result<ScrapedContent> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            // Anything with "slow" in it only finishes via cancellation.
            let delay = if url.contains("slow") {
                Duration::from_secs(60)
            } else {
                self.delay
            };
            let slept = ctx.sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            slept?;

            if url.contains("broken") {
                return Err(AcquireError::TransportFailure("connection reset".into()));
            }
            Ok(ScrapedContent::new(
                ContentFields {
                    title: "Acme".into(),
                    meta_description: "Widgets".into(),
                    headings: vec!["Welcome".into()],
                    nav_items: vec!["Home".into()],
                    body_text: vec!["widget"; 100].join(" "),
                    ..Default::default()
                },
                "acme.test",
            ))
        }
    }

    fn orchestrator(delay: Duration) -> (Orchestrator, Arc<AtomicUsize>) {
        let peak = Arc::new(AtomicUsize::new(0));
        let strategy = GaugeStrategy {
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: peak.clone(),
            delay,
        };
        let controller = EscalationController::new(vec![Box::new(strategy)]);
        (Orchestrator::new(Arc::new(controller)), peak)
    }

    fn urls(n: usize, tag: &str) -> Vec<String> {
        (0..n).map(|i| format!("https://{}{}.test", tag, i)).collect()
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        let (orch, peak) = orchestrator(Duration::from_millis(30));
        let orch = orch.with_max_concurrency(3);
        let batch = urls(12, "site");

        let outcome = orch.scrape_many(&AcquireContext::background(), &batch).await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.results.len(), 12);
        assert_eq!(outcome.succeeded(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_failures_recorded_per_url() {
        let (orch, _) = orchestrator(Duration::from_millis(1));
        let batch = vec![
            "https://ok.test".to_string(),
            "https://broken.test".to_string(),
            "not a url at all://".to_string(),
        ];

        let outcome = orch.scrape_many(&AcquireContext::background(), &batch).await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.results["https://ok.test"].is_ok());
        assert!(matches!(
            outcome.results["https://broken.test"],
            Err(AcquireError::Exhausted { .. })
        ));
        assert!(matches!(
            outcome.results["not a url at all://"],
            Err(AcquireError::InvalidUrl { .. })
        ));
        assert_eq!(
            outcome.summary(3),
            BatchSummary {
                submitted: 3,
                succeeded: 1,
                failed: 2,
                missing: 0
            }
        );
    }

    #[tokio::test]
    async fn test_cancellation_returns_partial_results() {
        let (orch, _) = orchestrator(Duration::from_millis(5));
        let mut batch = urls(3, "fast");
        batch.extend(urls(2, "slow"));

        let ctx = AcquireContext::with_timeout(Duration::from_millis(300));
        let started = std::time::Instant::now();
        let outcome = orch.scrape_many(&ctx, &batch).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(outcome.interrupted.as_ref().is_some_and(|e| e.is_cancelled()));
        for url in urls(3, "fast") {
            assert!(outcome.results[&url].is_ok(), "{} missing", url);
        }
        assert!(outcome.summary(batch.len()).missing <= 2);
    }

    #[tokio::test]
    async fn test_duplicates_and_empty_input() {
        let (orch, _) = orchestrator(Duration::from_millis(1));
        let outcome = orch
            .scrape_many(&AcquireContext::background(), &[])
            .await;
        assert!(outcome.results.is_empty());

        let batch = vec!["https://a.test".to_string(), "https://a.test".to_string()];
        let mut seen = Vec::new();
        let outcome = orch
            .scrape_many_with(&AcquireContext::background(), &batch, |url, _| {
                seen.push(url.to_string())
            })
            .await;
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(seen, vec!["https://a.test".to_string()]);
    }

    #[tokio::test]
    async fn test_per_url_timeout() {
        let (orch, _) = orchestrator(Duration::from_millis(1));
        let orch = orch.with_per_url_timeout(Duration::from_millis(50));
        let batch = vec!["https://slow.test".to_string(), "https://fine.test".to_string()];

        let outcome = orch.scrape_many(&AcquireContext::background(), &batch).await;
        assert!(outcome.is_complete());
        assert!(outcome.results["https://slow.test"]
            .as_ref()
            .is_err_and(|e| e.is_cancelled()));
        assert!(outcome.results["https://fine.test"].is_ok());
    }
}
