//! Configuration loading from TOML files

use super::{MonitorConfig, TierConfig, validate_config};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Where a loaded configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded and validated from a file on disk
    File,
    /// Built-in defaults, used when the file was absent
    Defaults,
}

impl ConfigSource {
    /// Human-readable description for startup logging
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::File => "config file",
            Self::Defaults => "built-in defaults",
        }
    }
}

/// Load and validate configuration from a TOML file
///
/// # Errors
/// Returns an error when the file cannot be read, parsed, or fails
/// validation.
pub fn load_config(path: impl AsRef<Path>) -> Result<MonitorConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;

    let config: MonitorConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file '{}'", path.display()))?;

    validate_config(&config)
        .with_context(|| format!("invalid configuration in '{}'", path.display()))?;

    Ok(config)
}

/// Load configuration from a file, falling back to defaults when absent
///
/// A present-but-broken file is still an error; only a missing file falls
/// back.
///
/// # Errors
/// Returns an error when the file exists but cannot be loaded.
pub fn load_config_with_fallback(path: impl AsRef<Path>) -> Result<(MonitorConfig, ConfigSource)> {
    let path = path.as_ref();
    if path.exists() {
        Ok((load_config(path)?, ConfigSource::File))
    } else {
        warn!(
            "config file '{}' not found, using built-in defaults",
            path.display()
        );
        Ok((create_default_config(), ConfigSource::Defaults))
    }
}

/// Built-in default configuration: three tiers at sensible cadences
#[must_use]
pub fn create_default_config() -> MonitorConfig {
    MonitorConfig {
        tiers: vec![
            TierConfig::builder("fast", Duration::from_secs(10))
                .build()
                .expect("static tier config is valid"),
            TierConfig::builder("medium", Duration::from_secs(60))
                .build()
                .expect("static tier config is valid"),
            TierConfig::builder("slow", Duration::from_secs(300))
                .build()
                .expect("static tier config is valid"),
        ],
        ..MonitorConfig::default()
    }
}
