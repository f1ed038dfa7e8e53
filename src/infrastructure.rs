//! Infrastructure layer for HTTP, proxy rotation, HTML extraction and
//! process plumbing
//!
//! Everything that talks to the outside world (proxy pool service, target
//! sites) or to the process environment (config files, log sinks) lives
//! here, behind small injectable objects.

pub mod config;
pub mod extraction;
pub mod fetcher;
pub mod logging;
pub mod proxy_client;

pub use config::{AppConfig, ConfigManager};
pub use extraction::ExtractorRegistry;
pub use fetcher::Fetcher;
pub use proxy_client::{ProxyClient, ProxyInfo, ProxyPoolStatus};
