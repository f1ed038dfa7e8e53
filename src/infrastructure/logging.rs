//! Logging system configuration and initialization
//!
//! Sets up `tracing` with an `EnvFilter` built from [`LoggingConfig`]:
//! console output by default, optional non-blocking file output, and
//! module-level filters to keep dependency noise out of the scrape logs.
//! `RUST_LOG` overrides the configured filter entirely.

use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing_appender::non_blocking;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

pub use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking file writer alive for the process lifetime.
static FILE_GUARD: OnceCell<non_blocking::WorkerGuard> = OnceCell::new();

/// Initialize the logging system with default configuration.
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging from a [`LoggingConfig`].
///
/// The filter is assembled as `<level>` plus one directive per entry in
/// `module_filters`; `RUST_LOG`, when set, wins over all of it.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(&config.level);
        for (module, level) in &config.module_filters {
            if let Ok(directive) = format!("{module}={level}").parse() {
                filter = filter.add_directive(directive);
            }
        }
        filter
    });

    let console_layer = config
        .console_output
        .then(|| fmt::layer().with_target(true).boxed());

    let file_layer = if config.file_output {
        let log_dir = PathBuf::from(&config.log_dir);
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("failed to create log directory {:?}: {}", log_dir, e))?;
        let appender = tracing_appender::rolling::daily(&log_dir, "pricewatch.log");
        let (writer, guard) = non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        Some(fmt::layer().with_writer(writer).with_ansi(false).boxed())
    } else {
        None
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_produces_a_filter() {
        // init can only run once per process; just exercise filter assembly.
        let config = LoggingConfig::default();
        let mut filter = EnvFilter::new(&config.level);
        for (module, level) in &config.module_filters {
            filter = filter.add_directive(format!("{module}={level}").parse().unwrap());
        }
        let rendered = filter.to_string();
        assert!(rendered.contains("info"));
        assert!(rendered.contains("reqwest"));
    }
}
