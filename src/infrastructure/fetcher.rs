//! Page fetcher with proxy rotation, browser-like headers and block
//! detection
//!
//! One call to [`Fetcher::fetch`] is ONE attempt: it obtains a proxy from
//! the injected [`ProxyClient`], sends the request with a rotated
//! user-agent and platform-appropriate headers, and classifies the
//! response. The outer retry loop (attempt budget, proxy rotation pause)
//! belongs to the orchestrator, so retry policy lives in exactly one
//! place.
//!
//! Classification: a 2xx with a non-empty body is success unless the body
//! carries a known block/challenge signature, which becomes
//! [`ScrapeError::Blocked`] — retryable, but logged distinctly because it
//! signals detection risk rather than an outage.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::errors::ScrapeError;
use crate::domain::platform::Platform;
use crate::infrastructure::config::CrawlingConfig;
use crate::infrastructure::proxy_client::ProxyClient;

/// The fetch seam the orchestrator depends on. One call is one attempt;
/// retry budgets live with the caller.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, platform: Platform, attempt: u32)
        -> Result<String, ScrapeError>;
}

/// Desktop browser user-agents rotated across attempts.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

/// Case-insensitive body markers that mean the site served a challenge
/// page instead of content.
const BLOCK_SIGNATURES: &[&str] = &[
    "captcha",
    "robot check",
    "api-services-support@amazon.com",
    "access denied",
    "cf-browser-verification",
    "challenge-platform",
    "attention required! | cloudflare",
    "pardon our interruption",
    "are you a human",
    "unusual traffic",
];

/// Fetches raw HTML for product pages.
pub struct Fetcher {
    /// Client used when no proxy is available.
    direct: reqwest::Client,
    proxy_client: Arc<ProxyClient>,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(proxy_client: Arc<ProxyClient>, config: &CrawlingConfig) -> Result<Self, ScrapeError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let direct = Self::build_client(timeout, None)?;
        Ok(Self { direct, proxy_client, timeout })
    }

    /// One fetch attempt. `attempt` is 1-based and only used for logging,
    /// so the orchestrator's loop stays legible in the output.
    pub async fn fetch(
        &self,
        url: &str,
        platform: Platform,
        attempt: u32,
    ) -> Result<String, ScrapeError> {
        let proxy = self.proxy_client.next_proxy().await;
        let client = match &proxy {
            Some(proxy) => {
                debug!(%url, attempt, proxy = %proxy.proxy_url(), "fetching through proxy");
                Self::build_client(self.timeout, Some(&proxy.proxy_url()))?
            }
            None => {
                // Policy: proceed without a proxy rather than abort, but
                // never silently.
                warn!(%url, attempt, "no proxy available, fetching direct");
                self.direct.clone()
            }
        };

        let response = client
            .get(url)
            .headers(platform_headers(platform))
            .header(USER_AGENT, pick_user_agent())
            .send()
            .await
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Http { status: status.as_u16() });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScrapeError::Network(format!("failed to read body: {e}")))?;

        if body.trim().is_empty() {
            return Err(ScrapeError::Network("empty response body".to_string()));
        }

        if let Some(marker) = detect_block(&body) {
            warn!(%url, attempt, marker, "block/challenge page detected");
            return Err(ScrapeError::Blocked { marker: marker.to_string() });
        }

        debug!(%url, attempt, bytes = body.len(), "fetched page");
        Ok(body)
    }

    fn build_client(
        timeout: Duration,
        proxy_url: Option<&str>,
    ) -> Result<reqwest::Client, ScrapeError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(proxy_url) = proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| ScrapeError::Network(format!("invalid proxy url: {e}")))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| ScrapeError::Network(format!("failed to build http client: {e}")))
    }
}

#[async_trait]
impl PageFetcher for Fetcher {
    async fn fetch(
        &self,
        url: &str,
        platform: Platform,
        attempt: u32,
    ) -> Result<String, ScrapeError> {
        Fetcher::fetch(self, url, platform, attempt).await
    }
}

/// Scan a response body for block/challenge signatures.
#[must_use]
pub fn detect_block(body: &str) -> Option<&'static str> {
    // Challenge pages are small; cap the scan so multi-megabyte product
    // pages containing the word "captcha" in a review don't false-positive.
    let haystack: String = body.chars().take(20_000).collect::<String>().to_lowercase();
    BLOCK_SIGNATURES.iter().find(|marker| haystack.contains(**marker)).copied()
}

fn pick_user_agent() -> &'static str {
    USER_AGENTS[fastrand::usize(..USER_AGENTS.len())]
}

/// Accept/locale headers that look like a real browser for the platform's
/// primary market.
fn platform_headers(platform: Platform) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    let accept_language = match platform {
        Platform::Amazon => "en-US,en;q=0.9",
        Platform::Jumia => "en-NG,en;q=0.9,fr;q=0.7",
    };
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(accept_language));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers
}
