//! Catalog entries and the rescrape task unit
//!
//! `CatalogEntry` is the shape the external repository returns from its
//! catalog query; `ScrapeTask` is what the scheduler emits and a worker
//! consumes. Tasks are discarded on terminal success or failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::platform::Platform;

/// Unique identifier for a scheduled scrape task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A watched catalog item as reported by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub url: String,
    pub platform: Platform,
    #[serde(rename = "scrapeCount")]
    pub scrape_count: u32,
    #[serde(rename = "lastScrapedAt")]
    pub last_scraped_at: Option<DateTime<Utc>>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

impl CatalogEntry {
    /// Tier 0 entries have never been scraped successfully.
    #[must_use]
    pub fn never_scraped(&self) -> bool {
        self.last_scraped_at.is_none() || self.scrape_count == 0
    }

    /// Whether the entry's last scrape is older than `max_age_hours`.
    ///
    /// Never-scraped entries are already Tier 0 and report stale too.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, max_age_hours: i64) -> bool {
        match self.last_scraped_at {
            None => true,
            Some(at) => now.signed_duration_since(at) > chrono::Duration::hours(max_age_hours),
        }
    }
}

/// One unit of rescrape work emitted by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeTask {
    #[serde(rename = "taskId")]
    pub task_id: TaskId,
    #[serde(rename = "catalogEntryId")]
    pub catalog_entry_id: String,
    pub url: String,
    pub platform: Platform,
    #[serde(rename = "attemptCount")]
    pub attempt_count: u32,
}

impl ScrapeTask {
    /// Build a fresh task (attempt 0) for a catalog entry.
    #[must_use]
    pub fn for_entry(entry: &CatalogEntry) -> Self {
        Self {
            task_id: TaskId::new(),
            catalog_entry_id: entry.id.clone(),
            url: entry.url.clone(),
            platform: entry.platform,
            attempt_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(scrape_count: u32, last_scraped_at: Option<DateTime<Utc>>) -> CatalogEntry {
        CatalogEntry {
            id: "entry-1".into(),
            url: "https://www.amazon.com/dp/B08N5WRWNW".into(),
            platform: Platform::Amazon,
            scrape_count,
            last_scraped_at,
            is_active: true,
        }
    }

    #[test]
    fn zero_count_or_missing_timestamp_is_never_scraped() {
        let now = Utc::now();
        assert!(entry(0, Some(now)).never_scraped());
        assert!(entry(5, None).never_scraped());
        assert!(!entry(5, Some(now)).never_scraped());
    }

    #[test]
    fn staleness_compares_against_max_age() {
        let now = Utc::now();
        let fresh = entry(1, Some(now - Duration::hours(2)));
        let stale = entry(1, Some(now - Duration::hours(30)));
        assert!(!fresh.is_stale(now, 24));
        assert!(stale.is_stale(now, 24));
        assert!(entry(1, None).is_stale(now, 24));
    }

    #[test]
    fn task_carries_the_entry_identity() {
        let e = entry(2, None);
        let task = ScrapeTask::for_entry(&e);
        assert_eq!(task.catalog_entry_id, "entry-1");
        assert_eq!(task.platform, Platform::Amazon);
        assert_eq!(task.attempt_count, 0);
    }
}
