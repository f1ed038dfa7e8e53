//! Error taxonomy for the extraction pipeline
//!
//! One typed enum covers every failure class the pipeline produces, so
//! retry decisions at both tiers (fetch-level and task-level) are made on
//! the variant, never on message strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure the scrape pipeline can report.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ScrapeError {
    /// The URL's host matches no known platform. Terminal.
    #[error("unsupported platform for url: {url}")]
    UnsupportedPlatform { url: String },

    /// The URL failed validation (scheme, length, host/platform mismatch).
    /// Terminal.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport-level failure (DNS, connect, timeout on the wire).
    /// Retryable at the fetch level.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response. Retryable only when the status is a server error.
    #[error("http error {status}")]
    Http { status: u16 },

    /// A 2xx response whose body carries an anti-bot challenge instead of
    /// content. Retryable, but logged distinctly: it signals detection
    /// risk, not a transient outage.
    #[error("blocked by target site (marker: {marker})")]
    Blocked { marker: String },

    /// The fetch retry budget is exhausted. Terminal for this task attempt;
    /// carries the last underlying failure.
    #[error("all {attempts} fetch attempts failed, last: {last}")]
    AllAttemptsFailed { attempts: u32, last: Box<ScrapeError> },

    /// A required field (title, price) could not be extracted. Terminal:
    /// retrying will not fix a page-layout mismatch.
    #[error("extraction failed: required field '{field}' missing or unparsable")]
    ExtractionFailed { field: String },

    /// A raw field failed normalization (out-of-range price, short title).
    /// Terminal.
    #[error("mapping failed for '{field}': {reason}")]
    Mapping { field: String, reason: String },

    /// The whole task exceeded its wall-clock budget. Recorded distinctly
    /// from extraction/validation failures.
    #[error("task timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The proxy pool service misbehaved. Normally absorbed by the
    /// ProxyClient's fallback path.
    #[error("proxy pool error: {0}")]
    ProxyPool(String),
}

impl ScrapeError {
    /// Whether the Fetcher's inner retry loop should try again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Blocked { .. } => true,
            Self::Http { status } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the task-level retry tier may re-enqueue the whole task.
    ///
    /// Only classes that escaped the fetch budget for transient reasons
    /// qualify; data errors will never parse differently on a rerun.
    #[must_use]
    pub fn is_retryable_at_task_level(&self) -> bool {
        match self {
            Self::AllAttemptsFailed { last, .. } => last.is_retryable(),
            Self::Timeout { .. } => true,
            other => other.is_retryable(),
        }
    }

    /// Short stable label for logs and per-batch stats.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedPlatform { .. } => "unsupported_platform",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::Network(_) => "network",
            Self::Http { .. } => "http",
            Self::Blocked { .. } => "blocked",
            Self::AllAttemptsFailed { .. } => "all_attempts_failed",
            Self::ExtractionFailed { .. } => "extraction_failed",
            Self::Mapping { .. } => "mapping",
            Self::Timeout { .. } => "timeout",
            Self::ProxyPool(_) => "proxy_pool",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        assert!(ScrapeError::Http { status: 503 }.is_retryable());
        assert!(ScrapeError::Http { status: 500 }.is_retryable());
        assert!(!ScrapeError::Http { status: 404 }.is_retryable());
        assert!(!ScrapeError::Http { status: 403 }.is_retryable());
    }

    #[test]
    fn blocked_is_retryable_extraction_is_not() {
        assert!(ScrapeError::Blocked { marker: "captcha".into() }.is_retryable());
        assert!(!ScrapeError::ExtractionFailed { field: "title".into() }.is_retryable());
    }

    #[test]
    fn task_level_retry_follows_the_last_cause() {
        let transient = ScrapeError::AllAttemptsFailed {
            attempts: 3,
            last: Box::new(ScrapeError::Network("connect refused".into())),
        };
        assert!(transient.is_retryable_at_task_level());

        let terminal = ScrapeError::AllAttemptsFailed {
            attempts: 3,
            last: Box::new(ScrapeError::Http { status: 404 }),
        };
        assert!(!terminal.is_retryable_at_task_level());

        assert!(!ScrapeError::Mapping { field: "price".into(), reason: "out of range".into() }
            .is_retryable_at_task_level());
        assert!(ScrapeError::Timeout { seconds: 120 }.is_retryable_at_task_level());
    }
}
