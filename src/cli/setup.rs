use super::ui;
use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::path::Path;

// Embedded so that `setup` works from an installed binary
const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

/// Creates a default configuration file at the default location
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    let config = setup_at_path(&path)?;

    println!(
        "{} {}",
        ui::style_text("Created configuration at", ui::StyleType::Title),
        path.display()
    );
    println!(
        "{}",
        ui::style_text(
            &format!(
                "Tracking {} currencies, refreshed every {} minutes",
                config.currencies.len(),
                config.ttl_minutes
            ),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}

/// Writes the example configuration to `path` and returns it parsed.
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    let config: AppConfig =
        serde_yaml::from_str(EXAMPLE_CONFIG).context("Embedded example config is invalid")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!(
        currencies = config.currencies.len(),
        "Created default configuration at {}",
        path.display()
    );
    Ok(config)
}
