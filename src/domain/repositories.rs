//! Repository interfaces consumed by the rescrape engine
//!
//! Persistence, schema, caching and transactions belong to the repository
//! implementation; this core only calls the two shapes below.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::catalog::CatalogEntry;
use crate::domain::product::NormalizedProduct;

/// The external catalog/persistence collaborator.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Candidate entries for re-scraping. The repository may pre-filter by
    /// age and activity; the scheduler applies the authoritative ranking.
    async fn find_products_for_scraping(
        &self,
        limit: u32,
        max_age_hours: i64,
    ) -> Result<Vec<CatalogEntry>>;

    /// Persist a normalized product. Uniqueness of `platform_id` per
    /// platform is enforced here, not in the engine.
    async fn save(&self, product: &NormalizedProduct) -> Result<()>;
}
