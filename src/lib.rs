//! pricewatch - Resilient product extraction and prioritized rescraping
//!
//! Extracts structured product data (title, price, currency, rating,
//! image, category, platform identifier) from adversarial e-commerce
//! pages across Amazon and Jumia, normalizes it into canonical records
//! and decides which watched catalog entries most need re-extraction.
//!
//! The crate is layered: `domain` holds the entities and rules,
//! `infrastructure` talks to the outside world (proxy pool, target
//! sites, config, logging), and `application` composes both into the
//! scrape pipeline, scheduler and batch runner.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the pipeline surface for binary and integration-test use
pub use application::{
    BatchRunner, BatchStats, MemoryCatalog, PriorityScheduler, ProductMapper, ScrapeOrchestrator,
    ScrapeOutcome, ScrapeReport, ScrapeStatus,
};
pub use domain::{
    CatalogEntry, CatalogRepository, NormalizedProduct, Platform, ProductUrl, RawProduct,
    ScrapeError, ScrapeTask,
};
pub use infrastructure::{AppConfig, ExtractorRegistry, Fetcher, ProxyClient};
