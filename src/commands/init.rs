use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use asset_stamp::config::{Config, CONFIG_FILE_NAMES};

pub fn run(force: bool) -> Result<()> {
    let file_name = CONFIG_FILE_NAMES[0];
    let config_path = Path::new(file_name);

    if config_path.exists() && !force {
        println!(
            "{} Configuration file already exists: {}",
            style("!").yellow().bold(),
            config_path.display()
        );
        println!("  Use {} to overwrite.", style("--force").cyan());
        return Ok(());
    }

    // Generate default configuration
    let content = Config::default_toml();

    std::fs::write(config_path, &content)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    println!(
        "{} Created configuration file: {}",
        style("✓").green().bold(),
        style(config_path.display()).cyan()
    );

    println!();
    println!("Next steps:");
    println!(
        "  1. Edit {} to list your entry files and asset directories",
        style(file_name).cyan()
    );
    println!(
        "  2. Mark references in your files as {}",
        style("{{addHash:css/site.css}}").cyan()
    );
    println!(
        "  3. Run {} to write fingerprinted files",
        style("asset-stamp build ./web").cyan()
    );

    Ok(())
}
