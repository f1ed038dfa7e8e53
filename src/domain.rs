//! Domain module - Core business logic and entities
//!
//! This module contains the domain entities, value objects, error taxonomy
//! and repository contracts of the rescrape engine. Everything here is pure
//! in-memory computation; no I/O.

pub mod catalog;
pub mod errors;
pub mod platform;
pub mod product;
pub mod product_url;
pub mod repositories;
pub mod taxonomy;

// Re-export commonly used items
pub use catalog::{CatalogEntry, ScrapeTask, TaskId};
pub use errors::ScrapeError;
pub use platform::{Platform, PriceBounds};
pub use product::{NormalizedProduct, Price, RawProduct};
pub use product_url::ProductUrl;
pub use repositories::CatalogRepository;
