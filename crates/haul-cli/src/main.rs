//! Haul CLI - amazon.de order history scraper
//!
//! Usage:
//!   haul scrape --email ADDRESS   Sign in and fetch new orders
//!   haul status                   Summarize the order file
//!   haul list --limit 10          Show the most recent orders

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.file.as_deref())?;

    match cli.command {
        Commands::Scrape {
            email,
            password,
            start,
            end,
            headless,
            extensive,
            webdriver,
        } => {
            let flags = commands::ScrapeFlags {
                email,
                password,
                start,
                end,
                headless,
                extensive,
                webdriver,
            };
            commands::cmd_scrape(&flags.apply(config))
        }
        Commands::Status => commands::cmd_status(&config.orders_file),
        Commands::List { limit, json } => commands::cmd_list(&config.orders_file, limit, json),
    }
}
