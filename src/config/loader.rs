use anyhow::{Context, Result};
use std::path::Path;

use super::Config;

pub const CONFIG_FILE_NAMES: [&str; 2] = ["asset-stamp.toml", ".asset-stamp.toml"];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Find and load configuration file
/// Searches in current directory and parent directories for asset-stamp.toml
pub fn find_and_load_config() -> Result<Option<Config>> {
    let current_dir = std::env::current_dir()?;
    find_config_from(&current_dir)
}

/// Same as [`find_and_load_config`], starting at `start`
pub fn find_config_from(start: &Path) -> Result<Option<Config>> {
    let mut current_dir = start.to_path_buf();

    loop {
        for name in &CONFIG_FILE_NAMES {
            let config_path = current_dir.join(name);
            if config_path.exists() {
                tracing::debug!("Using config {}", config_path.display());
                let config = load_config(&config_path)?;
                return Ok(Some(config));
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Ok(None)
}
