//! Application layer module
//!
//! Use cases composing the domain and infrastructure: mapping raw
//! extractions into canonical products, orchestrating the per-URL
//! pipeline, ranking the catalog for rescraping and executing batches.

pub mod batch;
pub mod mapper;
pub mod memory_catalog;
pub mod orchestrator;
pub mod scheduler;

pub use batch::{BatchRunner, BatchStats};
pub use mapper::{ProductMapper, ValidationReport};
pub use memory_catalog::MemoryCatalog;
pub use orchestrator::{ScrapeOrchestrator, ScrapeOutcome, ScrapeReport, ScrapeStatus};
pub use scheduler::PriorityScheduler;
