//! In-memory catalog repository
//!
//! Backs the CLI's direct-invocation mode and the test suites. Entries
//! are seeded up front (e.g. from a JSON file); saves update the matching
//! entry's scrape bookkeeping so consecutive batches see the effect of
//! earlier runs.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::catalog::CatalogEntry;
use crate::domain::product::NormalizedProduct;
use crate::domain::repositories::CatalogRepository;

/// Catalog held entirely in memory.
#[derive(Default)]
pub struct MemoryCatalog {
    entries: Mutex<Vec<CatalogEntry>>,
    saved: Mutex<Vec<NormalizedProduct>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Products persisted so far, in save order.
    pub async fn saved_products(&self) -> Vec<NormalizedProduct> {
        self.saved.lock().await.clone()
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn find_products_for_scraping(
        &self,
        limit: u32,
        _max_age_hours: i64,
    ) -> Result<Vec<CatalogEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().take(limit as usize).cloned().collect())
    }

    async fn save(&self, product: &NormalizedProduct) -> Result<()> {
        debug!(id = %product.id, "saving product to in-memory catalog");
        self.saved.lock().await.push(product.clone());

        // bump scrape bookkeeping on the owning entry; the platform id
        // embedded in the entry URL is the only join key available here
        let mut entries = self.entries.lock().await;
        for entry in entries.iter_mut() {
            let matches_platform_id = product
                .platform_id
                .as_deref()
                .is_some_and(|pid| entry.url.contains(pid));
            if matches_platform_id {
                entry.scrape_count += 1;
                entry.last_scraped_at = Some(Utc::now());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::platform::Platform;

    fn entry(id: &str, url: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            url: url.to_string(),
            platform: Platform::Amazon,
            scrape_count: 0,
            last_scraped_at: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn respects_the_query_limit() {
        let catalog = MemoryCatalog::new(
            (0..10)
                .map(|i| entry(&format!("e{i}"), &format!("https://www.amazon.com/dp/X{i}")))
                .collect(),
        );
        let found = catalog.find_products_for_scraping(3, 24).await.unwrap();
        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn save_records_products_and_bumps_bookkeeping() {
        let catalog = MemoryCatalog::new(vec![entry(
            "e1",
            "https://www.amazon.com/dp/B08N5WRWNW",
        )]);

        let product = NormalizedProduct {
            id: "AMAZON-abc123def456".into(),
            title: "Widget".into(),
            price: 10.0,
            currency: "USD".into(),
            category: "General".into(),
            platform: Platform::Amazon,
            platform_id: Some("B08N5WRWNW".into()),
            image_url: None,
            rating: None,
            rating_count: 0,
            completeness_score: 0.6,
            scraped_at: Utc::now(),
        };
        catalog.save(&product).await.unwrap();

        assert_eq!(catalog.saved_products().await.len(), 1);
        let entries = catalog.find_products_for_scraping(10, 24).await.unwrap();
        assert_eq!(entries[0].scrape_count, 1);
        assert!(entries[0].last_scraped_at.is_some());
    }
}
