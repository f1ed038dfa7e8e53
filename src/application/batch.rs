//! Batch execution of scheduled rescrape tasks
//!
//! Runs a scheduled batch through a bounded worker pool. Each task gets a
//! wall-clock timeout (recorded distinctly from extraction/validation
//! failures) and a task-level retry budget with a fixed, minutes-scale
//! backoff — but only for failure classes that can plausibly succeed on a
//! rerun. Successful products are handed to the repository; the engine
//! never touches them afterward.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::catalog::ScrapeTask;
use crate::domain::errors::ScrapeError;
use crate::domain::repositories::CatalogRepository;
use crate::infrastructure::config::CrawlingConfig;

use super::orchestrator::ScrapeOrchestrator;
use super::scheduler::PriorityScheduler;

/// Aggregated counts for one batch run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(rename = "timedOut")]
    pub timed_out: usize,
    /// Task-level retries spent across the whole batch.
    pub retries: usize,
    pub cancelled: usize,
}

/// Outcome of one task after all task-level retries.
#[derive(Debug)]
enum TaskCompletion {
    Succeeded { retries: u32 },
    Failed { error: ScrapeError, retries: u32 },
    Cancelled,
}

/// Schedules and executes rescrape batches.
pub struct BatchRunner {
    orchestrator: Arc<ScrapeOrchestrator>,
    scheduler: PriorityScheduler,
    repository: Arc<dyn CatalogRepository>,
    config: CrawlingConfig,
    cancellation: CancellationToken,
}

impl BatchRunner {
    pub fn new(
        orchestrator: Arc<ScrapeOrchestrator>,
        scheduler: PriorityScheduler,
        repository: Arc<dyn CatalogRepository>,
        config: CrawlingConfig,
    ) -> Self {
        Self {
            orchestrator,
            scheduler,
            repository,
            config,
            cancellation: CancellationToken::new(),
        }
    }

    /// Token callers can use to stop the batch (e.g. on SIGINT). Tasks
    /// already past their fetch finish; waiting tasks record as
    /// cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Select a batch and run it to completion.
    pub async fn run_batch(&self, batch_size: u32, max_age_hours: i64) -> Result<BatchStats> {
        let tasks = self.scheduler.select_candidates(batch_size, max_age_hours).await?;
        if tasks.is_empty() {
            info!("no catalog entries due for rescraping");
            return Ok(BatchStats::default());
        }

        info!(tasks = tasks.len(), "dispatching rescrape batch");
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_tasks.max(1)));

        let completions = futures::future::join_all(tasks.into_iter().map(|task| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.ok();
                self.run_task(task).await
            }
        }))
        .await;

        let mut stats = BatchStats { total: completions.len(), ..BatchStats::default() };
        for completion in completions {
            match completion {
                TaskCompletion::Succeeded { retries } => {
                    stats.succeeded += 1;
                    stats.retries += retries as usize;
                }
                TaskCompletion::Failed { error, retries } => {
                    stats.failed += 1;
                    stats.retries += retries as usize;
                    if matches!(error, ScrapeError::Timeout { .. }) {
                        stats.timed_out += 1;
                    }
                }
                TaskCompletion::Cancelled => stats.cancelled += 1,
            }
        }

        info!(
            total = stats.total,
            succeeded = stats.succeeded,
            failed = stats.failed,
            timed_out = stats.timed_out,
            retries = stats.retries,
            cancelled = stats.cancelled,
            "batch complete"
        );
        Ok(stats)
    }

    /// Run one task through the pipeline, with the task-level retry tier.
    async fn run_task(&self, mut task: ScrapeTask) -> TaskCompletion {
        let task_timeout = Duration::from_secs(self.config.task_timeout_secs);
        let retry_delay = Duration::from_secs(self.config.task_retry_delay_secs);
        let mut retries: u32 = 0;

        loop {
            if self.cancellation.is_cancelled() {
                return TaskCompletion::Cancelled;
            }
            task.attempt_count += 1;

            let error = match timeout(task_timeout, self.orchestrator.scrape_one(&task.url)).await
            {
                Err(_) => {
                    // aborted task attempt, distinct from a pipeline failure
                    ScrapeError::Timeout { seconds: self.config.task_timeout_secs }
                }
                Ok(outcome) => match (outcome.product, outcome.error) {
                    (Some(product), _) => {
                        match self.repository.save(&product).await {
                            Ok(()) => return TaskCompletion::Succeeded { retries },
                            Err(e) => {
                                error!(task = %task.task_id, id = %product.id, error = %e, "repository save failed");
                                return TaskCompletion::Failed {
                                    error: ScrapeError::Mapping {
                                        field: "persistence".to_string(),
                                        reason: e.to_string(),
                                    },
                                    retries,
                                };
                            }
                        }
                    }
                    (None, Some(error)) => error,
                    (None, None) => ScrapeError::Network("failure without error detail".into()),
                },
            };

            let budget_left = retries < self.config.task_max_retries;
            if error.is_retryable_at_task_level() && budget_left {
                retries += 1;
                warn!(
                    task = %task.task_id,
                    url = %task.url,
                    retry = retries,
                    error = %error,
                    "re-enqueuing task after backoff"
                );
                tokio::select! {
                    () = sleep(retry_delay) => {}
                    () = self.cancellation.cancelled() => return TaskCompletion::Cancelled,
                }
                continue;
            }

            return TaskCompletion::Failed { error, retries };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::memory_catalog::MemoryCatalog;
    use crate::application::orchestrator::ScrapeOrchestrator;
    use crate::application::scheduler::PriorityScheduler;
    use crate::domain::catalog::CatalogEntry;
    use crate::domain::platform::Platform;
    use crate::infrastructure::config::SchedulerConfig;
    use crate::infrastructure::extraction::ExtractorRegistry;
    use crate::infrastructure::fetcher::PageFetcher;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    const PRODUCT_HTML: &str = r#"<html><body>
        <span id="productTitle">Batch Widget</span>
        <span class="a-price"><span class="a-offscreen">$12.50</span></span>
    </body></html>"#;

    /// Fails with a retryable error `failures` times, then serves HTML.
    struct FlakyFetcher {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl PageFetcher for FlakyFetcher {
        async fn fetch(
            &self,
            _url: &str,
            _platform: Platform,
            _attempt: u32,
        ) -> Result<String, ScrapeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ScrapeError::Network("flaky".into()))
            } else {
                Ok(PRODUCT_HTML.to_string())
            }
        }
    }

    fn entries(count: usize) -> Vec<CatalogEntry> {
        (0..count)
            .map(|i| CatalogEntry {
                id: format!("entry-{i}"),
                url: format!("https://www.amazon.com/dp/B00BATCH{i:02}"),
                platform: Platform::Amazon,
                scrape_count: 0,
                last_scraped_at: None,
                is_active: true,
            })
            .collect()
    }

    fn runner(fetcher: Arc<dyn PageFetcher>, catalog: Arc<MemoryCatalog>) -> BatchRunner {
        let config = CrawlingConfig {
            max_fetch_attempts: 1,
            fetch_retry_delay_secs: 0,
            task_retry_delay_secs: 0,
            task_timeout_secs: 30,
            task_max_retries: 3,
            ..CrawlingConfig::default()
        };
        let extractors = Arc::new(ExtractorRegistry::new().unwrap());
        let orchestrator =
            Arc::new(ScrapeOrchestrator::new(fetcher, extractors, config.clone()));
        let scheduler = PriorityScheduler::new(
            Arc::clone(&catalog) as Arc<dyn CatalogRepository>,
            SchedulerConfig::default(),
        );
        BatchRunner::new(orchestrator, scheduler, catalog, config)
    }

    #[tokio::test]
    async fn successful_batch_saves_every_product() {
        let catalog = Arc::new(MemoryCatalog::new(entries(3)));
        let fetcher = Arc::new(FlakyFetcher { failures: 0, calls: AtomicU32::new(0) });
        let stats = runner(fetcher, Arc::clone(&catalog)).run_batch(10, 24).await.unwrap();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.succeeded, 3);
        assert_eq!(stats.failed, 0);
        assert_eq!(catalog.saved_products().await.len(), 3);
    }

    #[tokio::test]
    async fn task_level_retry_rescues_transient_failures() {
        let catalog = Arc::new(MemoryCatalog::new(entries(1)));
        // fetch budget is 1 per task attempt, so the first task attempt
        // fails with AllAttemptsFailed(Network) and the task-level retry
        // must rescue it
        let fetcher = Arc::new(FlakyFetcher { failures: 1, calls: AtomicU32::new(0) });
        let stats = runner(fetcher, Arc::clone(&catalog)).run_batch(10, 24).await.unwrap();

        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.retries, 1);
        assert_eq!(catalog.saved_products().await.len(), 1);
    }

    #[tokio::test]
    async fn retry_budget_exhaustion_fails_the_task() {
        let catalog = Arc::new(MemoryCatalog::new(entries(1)));
        let fetcher = Arc::new(FlakyFetcher { failures: u32::MAX, calls: AtomicU32::new(0) });
        let stats = runner(fetcher, Arc::clone(&catalog)).run_batch(10, 24).await.unwrap();

        assert_eq!(stats.succeeded, 0);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.retries, 3);
        assert!(catalog.saved_products().await.is_empty());
    }

    /// Always fails extraction: page fetches fine but has no product.
    struct EmptyPageFetcher;

    #[async_trait]
    impl PageFetcher for EmptyPageFetcher {
        async fn fetch(
            &self,
            _url: &str,
            _platform: Platform,
            _attempt: u32,
        ) -> Result<String, ScrapeError> {
            Ok("<html><body>nothing to see</body></html>".to_string())
        }
    }

    #[tokio::test]
    async fn terminal_data_errors_spend_no_retry_budget() {
        let catalog = Arc::new(MemoryCatalog::new(entries(1)));
        let stats =
            runner(Arc::new(EmptyPageFetcher), Arc::clone(&catalog)).run_batch(10, 24).await.unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.retries, 0, "extraction failures must not be re-enqueued");
    }

    #[tokio::test]
    async fn empty_catalog_is_an_empty_batch() {
        let catalog = Arc::new(MemoryCatalog::new(Vec::new()));
        let fetcher = Arc::new(FlakyFetcher { failures: 0, calls: AtomicU32::new(0) });
        let stats = runner(fetcher, catalog).run_batch(10, 24).await.unwrap();
        assert_eq!(stats.total, 0);
    }
}

