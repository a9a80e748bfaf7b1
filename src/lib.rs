pub mod cli;
pub mod core;
pub mod providers;
pub mod store;
pub mod view;
pub mod web;

use crate::core::cache::RateCacheService;
use crate::core::config::AppConfig;
use crate::core::rate::RateSource;
use crate::providers::VisaRateProvider;
use crate::store::ObservationLog;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Serve { bind: Option<String> },
    Show,
    Log,
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

/// Builds the process-wide rate cache backed by the Visa provider.
pub fn build_cache(config: &AppConfig) -> Result<Arc<RateCacheService>> {
    let source: Arc<dyn RateSource> = Arc::new(
        VisaRateProvider::from_config(&config.providers.visa)
            .context("Failed to create Visa rate provider")?,
    );
    build_cache_with_source(config, source)
}

pub fn build_cache_with_source(
    config: &AppConfig,
    source: Arc<dyn RateSource>,
) -> Result<Arc<RateCacheService>> {
    let log_path = config.log_file_path()?;
    debug!(path = %log_path.display(), "Using observation log");
    let log = Arc::new(ObservationLog::new(log_path));
    Ok(Arc::new(RateCacheService::new(
        source,
        log,
        config.ttl(),
        config.staleness,
    )))
}

pub fn app_state(config: &AppConfig, cache: Arc<RateCacheService>) -> web::AppState {
    web::AppState {
        cache,
        currencies: Arc::new(config.currencies.clone()),
        trend_window: config.trend_window,
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxmark starting...");
    let config = load_config(config_path)?;
    let cache = build_cache(&config)?;

    match command {
        AppCommand::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            web::serve(&bind, app_state(&config, cache)).await
        }
        AppCommand::Show => {
            cli::rates::run(&cache, &config.currencies, config.trend_window).await
        }
        AppCommand::Log => cli::log::run(cache.log()),
    }
}
