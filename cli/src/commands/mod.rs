pub mod cluster;
pub mod load;
pub mod overlay;
pub mod regions;
pub mod search;

use anyhow::{Context, Result};
use geonav::NavConfig;
use serde_json::Value;

use crate::cli::Cli;

/// Config file (or defaults) with the command-line data location applied.
pub fn config(cli: &Cli) -> Result<NavConfig> {
    let mut config = match &cli.config {
        Some(path) => NavConfig::from_path(path).with_context(|| format!("failed to load config {}", path.display()))?,
        None => NavConfig::default(),
    };
    if let Some(dir) = &cli.data_dir { config.data.data_dir = Some(dir.clone()) }
    if let Some(url) = &cli.base_url { config.data.base_url = Some(url.clone()) }
    Ok(config)
}

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
