//! CLI argument definitions using clap
//!
//! This module contains the clap structs and enums for parsing CLI arguments.
//! The command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Haul - Keep a local copy of your amazon.de order history
#[derive(Parser)]
#[command(name = "haul")]
#[command(about = "Scrapes your amazon.de order history into a JSON file", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Order file (defaults to the config file's value, else orders.json)
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    /// Config file (defaults to ~/.local/share/haul/config.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and scrape new orders
    ///
    /// Without --start/--end the whole history from 2010 on is kept and only
    /// orders newer than the latest stored one are fetched. A custom year
    /// range replaces the order file.
    Scrape {
        /// Account e-mail
        #[arg(short, long)]
        email: Option<String>,

        /// Account password (prefer the HAUL_PASSWORD environment variable)
        #[arg(long)]
        password: Option<String>,

        /// First year to scrape
        #[arg(long)]
        start: Option<i32>,

        /// Last year to scrape (defaults to the current year)
        #[arg(long)]
        end: Option<i32>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Also fetch item categories (one extra page load per item)
        #[arg(long)]
        extensive: bool,

        /// WebDriver server url (also HAUL_WEBDRIVER_URL)
        #[arg(long)]
        webdriver: Option<String>,
    },

    /// Show a summary of the order file
    Status,

    /// List the most recent orders
    List {
        /// Number of orders to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Print the orders as JSON
        #[arg(long)]
        json: bool,
    },
}
