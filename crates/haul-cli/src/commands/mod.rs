//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `scrape` - Sign in and scrape orders into the order file
//! - `status` - Order file summary and listing

pub mod scrape;
pub mod status;

use std::path::Path;

use anyhow::{Context, Result};
use haul_core::ScraperConfig;

// Re-export command functions for main.rs
pub use scrape::*;
pub use status::*;

/// Config file and environment, with `--file` on top
pub fn load_config(config_path: Option<&Path>, file: Option<&Path>) -> Result<ScraperConfig> {
    let mut config = ScraperConfig::load(config_path)
        .context("Failed to load config")?
        .apply_env();
    if let Some(file) = file {
        config.orders_file = file.to_path_buf();
    }
    Ok(config)
}

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
