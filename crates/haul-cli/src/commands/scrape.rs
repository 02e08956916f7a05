//! Scrape command implementation

use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::Local;
use haul_core::progress::ProgressObserver;
use haul_core::reconcile::Strategy;
use haul_core::{run_scrape, OrderStore, ScrapeOptions, ScraperConfig, WebDriverSession};

/// Command-line overrides for a scrape
#[derive(Debug, Default)]
pub struct ScrapeFlags {
    pub email: Option<String>,
    pub password: Option<String>,
    pub start: Option<i32>,
    pub end: Option<i32>,
    pub headless: bool,
    pub extensive: bool,
    pub webdriver: Option<String>,
}

impl ScrapeFlags {
    /// Layer the flags over `config`; switches only ever turn options on
    pub fn apply(self, mut config: ScraperConfig) -> ScraperConfig {
        if let Some(email) = self.email {
            config.email = Some(email);
        }
        if let Some(password) = self.password {
            config.password = Some(password);
        }
        if let Some(start) = self.start {
            config.start_year = start;
        }
        if let Some(end) = self.end {
            config.end_year = Some(end);
        }
        if let Some(url) = self.webdriver {
            config.webdriver_url = url;
        }
        config.headless |= self.headless;
        config.extensive |= self.extensive;
        config
    }
}

const BAR_WIDTH: usize = 30;

/// Progress bar on a single terminal line
#[derive(Debug, Default)]
pub struct ProgressLine {
    last_percent: Option<u32>,
}

impl ProgressLine {
    pub fn render(fraction: f64) -> String {
        let fraction = fraction.clamp(0.0, 1.0);
        let filled = (fraction * BAR_WIDTH as f64).round() as usize;
        format!(
            "   [{}{}] {:>3}%",
            "█".repeat(filled),
            "░".repeat(BAR_WIDTH - filled),
            (fraction * 100.0).round() as u32
        )
    }

    fn finish(&self) {
        if self.last_percent.is_some() {
            println!();
        }
    }
}

impl ProgressObserver for ProgressLine {
    fn on_progress(&mut self, fraction: f64) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u32;
        if self.last_percent == Some(percent) {
            return;
        }
        self.last_percent = Some(percent);
        print!("\r{}", Self::render(fraction));
        let _ = io::stdout().flush();
    }
}

pub fn cmd_scrape(config: &ScraperConfig) -> Result<()> {
    let today = Local::now().date_naive();

    // Validate everything before a browser is started
    let credentials = config.credentials().context("Invalid account settings")?;
    let range = config.range(today).context("Invalid date range")?;
    let store = OrderStore::new(&config.orders_file);

    println!();
    println!(
        "🛒 Scraping orders from {} to {}",
        range.start_date, range.end_date
    );
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Account: {}", credentials.email);
    println!("   Order file: {}", store.path().display());
    if range.is_custom() {
        println!("   ⚠️  Custom year range: the order file will be replaced");
    }
    if config.extensive {
        println!("   Categories: enabled (slow)");
    }
    println!();

    let mut session = WebDriverSession::connect(&config.webdriver_url, config.headless)
        .with_context(|| {
            format!(
                "Could not start a browser. Is geckodriver running at {}?",
                config.webdriver_url
            )
        })?;

    let mut progress = ProgressLine::default();
    let result = run_scrape(
        &mut session,
        &credentials,
        &range,
        &store,
        ScrapeOptions::from(config),
        Some(&mut progress),
    );
    progress.finish();
    let report = result.context("Scrape failed")?;

    println!();
    match report.strategy {
        Strategy::Full => println!("✓ Full scrape complete"),
        Strategy::Partial { cutoff } => {
            println!("✓ Updated orders newer than {}", cutoff)
        }
    }
    println!("   New orders: {}", report.added);
    println!("   Already known: {}", report.duplicates);
    println!("   Total orders: {}", report.orders.len());
    println!("   Pages scraped: {}", report.stats.pages_scraped);
    if report.stats.fragments_skipped > 0 {
        println!(
            "   ⚠️  Skipped unreadable orders: {}",
            report.stats.fragments_skipped
        );
    }
    println!();

    Ok(())
}
