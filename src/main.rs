//! Job/CLI entrypoint: schedule and run a rescrape batch.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use pricewatch::application::{BatchRunner, MemoryCatalog, PriorityScheduler, ScrapeOrchestrator};
use pricewatch::domain::{CatalogEntry, CatalogRepository};
use pricewatch::infrastructure::config::ConfigManager;
use pricewatch::infrastructure::logging::init_logging_with_config;
use pricewatch::infrastructure::{ExtractorRegistry, Fetcher, ProxyClient};

#[derive(Parser)]
#[command(name = "pricewatch", about = "Resilient product extraction and rescrape scheduling")]
struct Cli {
    /// Path to a JSON config file (also via PRICEWATCH_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Select the highest-priority catalog entries and rescrape them
    RunBatch {
        /// Maximum number of tasks in the batch
        #[arg(long)]
        batch_size: Option<u32>,

        /// Entries last scraped more than this many hours ago are due
        #[arg(long)]
        max_age_hours: Option<i64>,

        /// JSON file of catalog entries to schedule from
        #[arg(long)]
        catalog: PathBuf,

        /// Run to completion in the foreground without signal handling
        #[arg(long)]
        sync: bool,
    },

    /// Report the proxy pool's health and exit
    ProxyStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConfigManager::new(cli.config.clone()).load().await?;
    init_logging_with_config(&config.logging)?;

    match cli.command {
        Command::RunBatch { batch_size, max_age_hours, catalog, sync } => {
            let batch_size = batch_size.unwrap_or(config.scheduler.batch_size);
            let max_age_hours = max_age_hours.unwrap_or(config.scheduler.max_age_hours);

            let repository = Arc::new(load_catalog(&catalog).await?);
            info!(
                entries = repository.entry_count().await,
                batch_size, max_age_hours, "starting rescrape batch"
            );

            let proxy_client = Arc::new(ProxyClient::new(config.proxy.clone())?);
            let fetcher = Arc::new(Fetcher::new(Arc::clone(&proxy_client), &config.crawling)?);
            let extractors = Arc::new(ExtractorRegistry::new()?);
            let orchestrator =
                Arc::new(ScrapeOrchestrator::new(fetcher, extractors, config.crawling.clone()));
            let scheduler = PriorityScheduler::new(
                Arc::clone(&repository) as Arc<dyn CatalogRepository>,
                config.scheduler.clone(),
            );
            let runner = BatchRunner::new(
                orchestrator,
                scheduler,
                Arc::clone(&repository) as Arc<dyn CatalogRepository>,
                config.crawling.clone(),
            );

            let stats = if sync {
                runner.run_batch(batch_size, max_age_hours).await?
            } else {
                // cancel the batch cleanly on ctrl-c
                let token = runner.cancellation_token();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("interrupt received, cancelling batch");
                        token.cancel();
                    }
                });
                runner.run_batch(batch_size, max_age_hours).await?
            };

            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }

        Command::ProxyStatus => {
            let proxy_client = ProxyClient::new(config.proxy.clone())?;
            let status = proxy_client.status().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
    }
}

async fn load_catalog(path: &PathBuf) -> Result<MemoryCatalog> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read catalog file {}", path.display()))?;
    let entries: Vec<CatalogEntry> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse catalog file {}", path.display()))?;
    Ok(MemoryCatalog::new(entries))
}
