//! Scrape pipeline orchestration
//!
//! Composes detection → URL validation → fetch (with the outer retry
//! loop) → extraction → validation → mapping into one pipeline per URL.
//! Every stage failure short-circuits into a structured
//! [`ScrapeOutcome`]; nothing propagates uncaught past this boundary, so
//! batches stay isolated per item.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::errors::ScrapeError;
use crate::domain::platform::Platform;
use crate::domain::product::{NormalizedProduct, RawProduct};
use crate::domain::product_url::ProductUrl;
use crate::infrastructure::config::CrawlingConfig;
use crate::infrastructure::extraction::ExtractorRegistry;
use crate::infrastructure::fetcher::PageFetcher;

use super::mapper::ProductMapper;

/// Hard ceiling on fetch attempts regardless of configuration.
const FETCH_ATTEMPT_CEILING: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Success,
    Failed,
}

/// Structured result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeOutcome {
    pub url: String,
    pub status: ScrapeStatus,
    /// Raw extraction, present when the extract stage succeeded.
    pub raw: Option<RawProduct>,
    /// Canonical product, present on full success.
    pub product: Option<NormalizedProduct>,
    /// The typed failure, so callers decide retries on the variant
    /// rather than on message text.
    pub error: Option<ScrapeError>,
    /// Fetch attempts actually spent.
    pub attempts: u32,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}

impl ScrapeOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ScrapeStatus::Success
    }

    /// Stable error class label for logs and stats.
    #[must_use]
    pub fn error_kind(&self) -> Option<&'static str> {
        self.error.as_ref().map(ScrapeError::kind)
    }
}

/// Aggregated result of a batch run.
#[derive(Debug, Serialize)]
pub struct ScrapeReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Per-URL outcomes, index-aligned with the input list.
    pub results: Vec<ScrapeOutcome>,
}

/// Runs the full scrape pipeline for single URLs and batches.
pub struct ScrapeOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    extractors: Arc<ExtractorRegistry>,
    mapper: ProductMapper,
    config: CrawlingConfig,
}

impl ScrapeOrchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractors: Arc<ExtractorRegistry>,
        config: CrawlingConfig,
    ) -> Self {
        Self {
            fetcher,
            extractors,
            mapper: ProductMapper::new(),
            config,
        }
    }

    /// Scrape one URL end to end, returning a structured outcome.
    pub async fn scrape_one(&self, url: &str) -> ScrapeOutcome {
        let started = Instant::now();
        match self.run_pipeline(url).await {
            Ok(run) => {
                info!(%url, id = %run.product.id, attempts = run.attempts, "scrape succeeded");
                ScrapeOutcome {
                    url: url.to_string(),
                    status: ScrapeStatus::Success,
                    raw: Some(run.raw),
                    product: Some(run.product),
                    error: None,
                    attempts: run.attempts,
                    duration_ms: started.elapsed().as_millis() as u64,
                }
            }
            Err(failure) => {
                warn!(%url, error = %failure.error, attempts = failure.attempts, "scrape failed");
                ScrapeOutcome {
                    url: url.to_string(),
                    status: ScrapeStatus::Failed,
                    raw: failure.raw,
                    product: None,
                    error: Some(failure.error),
                    attempts: failure.attempts,
                    duration_ms: started.elapsed().as_millis() as u64,
                }
            }
        }
    }

    /// Scrape a list of URLs with bounded concurrency. One failure never
    /// aborts the batch; results are index-aligned with the input.
    pub async fn scrape_many(&self, urls: &[String]) -> ScrapeReport {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_tasks.max(1)));

        let futures = urls.iter().map(|url| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                // holds the permit for the duration of the scrape; the
                // semaphore is never closed, so acquire cannot fail
                let _permit = semaphore.acquire().await.ok();
                self.scrape_one(url).await
            }
        });

        let results = futures::future::join_all(futures).await;
        let succeeded = results.iter().filter(|outcome| outcome.is_success()).count();

        ScrapeReport {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Convenience accessor for callers that need the side-channel
    /// validation report.
    #[must_use]
    pub fn mapper(&self) -> &ProductMapper {
        &self.mapper
    }

    async fn run_pipeline(&self, url: &str) -> Result<PipelineRun, PipelineFailure> {
        // Stage 1: platform detection. The extractor registry covers
        // every Platform variant by construction (exhaustive match), so
        // detection success implies a registered extractor/fetcher
        // pairing.
        let platform = Platform::detect(url).map_err(PipelineFailure::before_fetch)?;

        // Stage 2: URL validation against the detected platform.
        let validated =
            ProductUrl::parse(url, platform).map_err(PipelineFailure::before_fetch)?;

        // Stage 3: fetch with the outer retry loop.
        let (html, attempts) = self.fetch_with_retry(validated.as_str(), platform).await?;

        // Stage 4: extraction.
        let raw = self
            .extractors
            .extract(platform, &html, url)
            .map_err(|error| PipelineFailure { error, attempts, raw: None })?;

        // Stage 5: side-channel validation, logged but not gating; the
        // mapper re-enforces the hard rules.
        let report = self.mapper.validate(&raw);
        debug!(%url, valid = report.valid, completeness = report.completeness_score, "validated extraction");

        // Stage 6: mapping.
        let product = self.mapper.map(&raw, platform, url).map_err(|error| PipelineFailure {
            error,
            attempts,
            raw: Some(raw.clone()),
        })?;

        Ok(PipelineRun { raw, product, attempts })
    }

    /// The outer fetch retry loop: up to min(configured, 3) attempts, a
    /// different proxy requested on each (the fetcher asks the proxy
    /// client per attempt), fixed pause between attempts. Non-retryable
    /// failures surface immediately; an exhausted budget becomes
    /// `AllAttemptsFailed` carrying the last cause.
    async fn fetch_with_retry(
        &self,
        url: &str,
        platform: Platform,
    ) -> Result<(String, u32), PipelineFailure> {
        let max_attempts = self.config.max_fetch_attempts.clamp(1, FETCH_ATTEMPT_CEILING);
        let delay = Duration::from_secs(self.config.fetch_retry_delay_secs);
        let mut last_error: Option<ScrapeError> = None;

        for attempt in 1..=max_attempts {
            match self.fetcher.fetch(url, platform, attempt).await {
                Ok(html) => return Ok((html, attempt)),
                Err(error) if !error.is_retryable() => {
                    return Err(PipelineFailure { error, attempts: attempt, raw: None });
                }
                Err(error) => {
                    warn!(%url, attempt, max_attempts, error = %error, "fetch attempt failed");
                    last_error = Some(error);
                    if attempt < max_attempts {
                        sleep(delay).await;
                    }
                }
            }
        }

        let last = last_error.unwrap_or_else(|| ScrapeError::Network("no attempt made".into()));
        Err(PipelineFailure {
            error: ScrapeError::AllAttemptsFailed { attempts: max_attempts, last: Box::new(last) },
            attempts: max_attempts,
            raw: None,
        })
    }
}

struct PipelineRun {
    raw: RawProduct,
    product: NormalizedProduct,
    attempts: u32,
}

struct PipelineFailure {
    error: ScrapeError,
    attempts: u32,
    raw: Option<RawProduct>,
}

impl PipelineFailure {
    fn before_fetch(error: ScrapeError) -> Self {
        Self { error, attempts: 0, raw: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    const PRODUCT_HTML: &str = r#"<html><body>
        <span id="productTitle">Stubbed Widget</span>
        <span class="a-price"><span class="a-offscreen">$19.99</span></span>
    </body></html>"#;

    /// Serves canned bodies per URL; URLs not in the map fail with the
    /// configured error.
    struct StubFetcher {
        pages: HashMap<String, String>,
        failure: ScrapeError,
        calls: AtomicU32,
    }

    impl StubFetcher {
        fn serving(pages: HashMap<String, String>, failure: ScrapeError) -> Self {
            Self { pages, failure, calls: AtomicU32::new(0) }
        }

        fn always_failing(failure: ScrapeError) -> Self {
            Self::serving(HashMap::new(), failure)
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(
            &self,
            url: &str,
            _platform: Platform,
            _attempt: u32,
        ) -> Result<String, ScrapeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages.get(url).cloned().ok_or_else(|| self.failure.clone())
        }
    }

    fn orchestrator_with(fetcher: Arc<StubFetcher>, max_fetch_attempts: u32) -> ScrapeOrchestrator {
        let config = CrawlingConfig {
            max_fetch_attempts,
            fetch_retry_delay_secs: 0,
            ..CrawlingConfig::default()
        };
        let extractors = Arc::new(ExtractorRegistry::new().unwrap());
        ScrapeOrchestrator::new(fetcher, extractors, config)
    }

    fn amazon_url(n: usize) -> String {
        format!("https://www.amazon.com/dp/B0000000{n:02}")
    }

    #[tokio::test]
    async fn unsupported_platform_short_circuits_without_fetching() {
        let fetcher = Arc::new(StubFetcher::always_failing(ScrapeError::Network("x".into())));
        let orchestrator = orchestrator_with(Arc::clone(&fetcher), 3);

        let outcome = orchestrator.scrape_one("https://www.example.com/item/1").await;
        assert_eq!(outcome.status, ScrapeStatus::Failed);
        assert_eq!(outcome.error_kind(), Some("unsupported_platform"));
        assert_eq!(outcome.attempts, 0);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_urls_fail_before_fetching() {
        let fetcher = Arc::new(StubFetcher::always_failing(ScrapeError::Network("x".into())));
        let outcome = orchestrator_with(fetcher, 3).scrape_one("not-a-url").await;
        assert_eq!(outcome.status, ScrapeStatus::Failed);
        assert_eq!(outcome.error_kind(), Some("invalid_url"));
    }

    #[tokio::test]
    async fn successful_pipeline_produces_a_mapped_product() {
        let url = amazon_url(1);
        let fetcher = Arc::new(StubFetcher::serving(
            HashMap::from([(url.clone(), PRODUCT_HTML.to_string())]),
            ScrapeError::Network("x".into()),
        ));
        let outcome = orchestrator_with(fetcher, 3).scrape_one(&url).await;

        assert_eq!(outcome.status, ScrapeStatus::Success);
        assert_eq!(outcome.attempts, 1);
        let product = outcome.product.unwrap();
        assert_eq!(product.title, "Stubbed Widget");
        assert_eq!(product.price, 19.99);
        assert!(product.id.starts_with("AMAZON-"));
        assert_eq!(outcome.raw.unwrap().platform_id.as_deref(), Some("B000000001"));
    }

    #[tokio::test]
    async fn retry_budget_is_min_of_configured_and_three() {
        // configured above the ceiling: exactly 3 fetch calls
        let fetcher = Arc::new(StubFetcher::always_failing(ScrapeError::Network("down".into())));
        let outcome = orchestrator_with(Arc::clone(&fetcher), 10).scrape_one(&amazon_url(2)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.error_kind(), Some("all_attempts_failed"));
        assert!(outcome.error.unwrap().to_string().contains("down"));

        // configured below the ceiling: exactly 2 fetch calls
        let fetcher = Arc::new(StubFetcher::always_failing(ScrapeError::Blocked {
            marker: "captcha".into(),
        }));
        let outcome = orchestrator_with(Arc::clone(&fetcher), 2).scrape_one(&amazon_url(3)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.error_kind(), Some("all_attempts_failed"));
    }

    #[tokio::test]
    async fn non_retryable_http_errors_surface_after_one_attempt() {
        let fetcher = Arc::new(StubFetcher::always_failing(ScrapeError::Http { status: 404 }));
        let outcome = orchestrator_with(Arc::clone(&fetcher), 3).scrape_one(&amazon_url(4)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.error_kind(), Some("http"));
    }

    #[tokio::test]
    async fn extraction_failure_is_terminal_and_keeps_no_raw() {
        let url = amazon_url(5);
        let fetcher = Arc::new(StubFetcher::serving(
            HashMap::from([(url.clone(), "<html><body>no product here</body></html>".into())]),
            ScrapeError::Network("x".into()),
        ));
        let outcome = orchestrator_with(Arc::clone(&fetcher), 3).scrape_one(&url).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1, "no retry for layout mismatches");
        assert_eq!(outcome.error_kind(), Some("extraction_failed"));
        assert!(outcome.raw.is_none());
    }

    #[tokio::test]
    async fn batch_of_ten_with_three_failures_stays_index_aligned() {
        let urls: Vec<String> = (0..10).map(amazon_url).collect();
        // indices 2, 5 and 9 have no canned page and fail
        let pages: HashMap<String, String> = urls
            .iter()
            .enumerate()
            .filter(|(index, _)| ![2, 5, 9].contains(index))
            .map(|(_, url)| (url.clone(), PRODUCT_HTML.to_string()))
            .collect();
        let fetcher =
            Arc::new(StubFetcher::serving(pages, ScrapeError::Http { status: 404 }));

        let report = orchestrator_with(fetcher, 3).scrape_many(&urls).await;
        assert_eq!(report.total, 10);
        assert_eq!(report.succeeded, 7);
        assert_eq!(report.failed, 3);
        assert_eq!(report.results.len(), 10);
        for (index, outcome) in report.results.iter().enumerate() {
            assert_eq!(outcome.url, urls[index], "results must be index-aligned");
            let expected_failed = [2, 5, 9].contains(&index);
            assert_eq!(outcome.is_success(), !expected_failed, "url index {index}");
        }
    }
}
