//! Priority ranking of catalog entries due for re-extraction
//!
//! The scheduler turns the repository's candidate pool into a bounded,
//! priority-ordered batch of [`ScrapeTask`]s. Ranking is two coarse
//! tiers — never-scraped first, then stale — with fine ordering inside a
//! tier by scrape count (ascending) and last-scraped time (ascending,
//! never-scraped first).
//!
//! The scheduler does NOT de-duplicate against in-flight tasks from a
//! previous, still-running batch: triggering a new batch early can select
//! the same entry twice. This mirrors the documented gap in the system's
//! behavior; a lease-based in-flight marker would change observable
//! semantics and belongs to the repository owner if ever added.

use anyhow::Result;
use chrono::Utc;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::catalog::{CatalogEntry, ScrapeTask};
use crate::domain::repositories::CatalogRepository;
use crate::infrastructure::config::SchedulerConfig;

/// Minimum candidate pool requested from the repository, so tiny limits
/// still rank over something.
const MIN_POOL_WIDTH: u32 = 50;

/// Selects and orders rescrape work.
pub struct PriorityScheduler {
    repository: Arc<dyn CatalogRepository>,
    config: SchedulerConfig,
}

impl PriorityScheduler {
    pub fn new(repository: Arc<dyn CatalogRepository>, config: SchedulerConfig) -> Self {
        Self { repository, config }
    }

    /// Rank the catalog and emit at most `limit` tasks.
    pub async fn select_candidates(
        &self,
        limit: u32,
        max_age_hours: i64,
    ) -> Result<Vec<ScrapeTask>> {
        let pool_width = limit
            .saturating_mul(self.config.pool_multiplier.max(1))
            .max(MIN_POOL_WIDTH);
        let entries = self
            .repository
            .find_products_for_scraping(pool_width, max_age_hours)
            .await?;
        debug!(candidates = entries.len(), pool_width, "fetched candidate pool");

        let now = Utc::now();
        let mut due: Vec<&CatalogEntry> = entries
            .iter()
            .filter(|entry| entry.is_active)
            .filter(|entry| entry.never_scraped() || entry.is_stale(now, max_age_hours))
            .collect();

        due.sort_by(|a, b| rank(a, b));

        let tasks: Vec<ScrapeTask> =
            due.into_iter().take(limit as usize).map(ScrapeTask::for_entry).collect();

        info!(selected = tasks.len(), limit, max_age_hours, "selected rescrape batch");
        Ok(tasks)
    }
}

/// Tier, then scrape count ascending, then last-scraped ascending.
/// `Option`'s ordering puts `None` first, which is exactly the
/// "never scraped sorts oldest" rule.
fn rank(a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    tier(a)
        .cmp(&tier(b))
        .then(a.scrape_count.cmp(&b.scrape_count))
        .then(a.last_scraped_at.cmp(&b.last_scraped_at))
}

const fn tier(entry: &CatalogEntry) -> u8 {
    if entry.last_scraped_at.is_none() || entry.scrape_count == 0 {
        0
    } else {
        1
    }
}
