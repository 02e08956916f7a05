//! CLI command tests

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use haul_core::models::{Categories, Item};
use haul_core::{Order, OrderStore, ScraperConfig};
use tempfile::TempDir;

use crate::cli::{Cli, Commands};
use crate::commands::{self, truncate, ProgressLine, ScrapeFlags};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn order(id: &str, date: NaiveDate, price: f64, titles: &[&str]) -> Order {
    let items = titles
        .iter()
        .map(|title| Item::new(price, "not available", *title, "Händler", Categories::new()))
        .collect();
    Order::new(id, price, date, items)
}

fn sample_orders() -> Vec<Order> {
    vec![
        order("302-1", day(2021, 3, 4), 19.99, &["Buch"]),
        order("D01-2", day(2022, 7, 1), 3.99, &["Film"]),
        order("302-3", day(2023, 12, 24), 45.5, &["Kabel", "Stecker"]),
    ]
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_scrape_args() {
    let cli = Cli::parse_from([
        "haul",
        "--file",
        "bestellungen.json",
        "scrape",
        "--email",
        "kunde@example.de",
        "--start",
        "2018",
        "--headless",
    ]);
    assert_eq!(cli.file, Some(PathBuf::from("bestellungen.json")));
    match cli.command {
        Commands::Scrape {
            email,
            start,
            end,
            headless,
            extensive,
            ..
        } => {
            assert_eq!(email.as_deref(), Some("kunde@example.de"));
            assert_eq!(start, Some(2018));
            assert_eq!(end, None);
            assert!(headless);
            assert!(!extensive);
        }
        _ => panic!("expected scrape command"),
    }
}

#[test]
fn test_parse_list_defaults() {
    let cli = Cli::parse_from(["haul", "list", "--verbose"]);
    assert!(cli.verbose);
    match cli.command {
        Commands::List { limit, json } => {
            assert_eq!(limit, 20);
            assert!(!json);
        }
        _ => panic!("expected list command"),
    }
}

// ========== Config Layering Tests ==========

#[test]
fn test_scrape_flags_override_config() {
    let config = ScraperConfig::from_toml(
        r#"
        [account]
        email = "alt@example.de"

        [scrape]
        extensive = true
        "#,
    )
    .unwrap();

    let config = ScrapeFlags {
        email: Some("kunde@example.de".into()),
        password: Some("geheim".into()),
        end: Some(2022),
        webdriver: Some("http://127.0.0.1:9515".into()),
        ..Default::default()
    }
    .apply(config);

    assert_eq!(config.email.as_deref(), Some("kunde@example.de"));
    assert_eq!(config.end_year, Some(2022));
    assert_eq!(config.start_year, 2010);
    // Unset switches keep the config value
    assert!(config.extensive);
    assert!(!config.headless);
    assert_eq!(config.webdriver_url, "http://127.0.0.1:9515");
    assert!(config.credentials().is_ok());
}

#[test]
fn test_load_config_file_flag() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[store]\nfile = \"from-config.json\"").unwrap();

    let config = commands::load_config(Some(&config_path), None).unwrap();
    assert_eq!(config.orders_file, PathBuf::from("from-config.json"));

    let override_path = dir.path().join("override.json");
    let config = commands::load_config(Some(&config_path), Some(&override_path)).unwrap();
    assert_eq!(config.orders_file, override_path);
}

#[test]
fn test_cmd_scrape_rejects_missing_password_before_browsing() {
    let config = ScraperConfig {
        email: Some("kunde@example.de".into()),
        password: None,
        // Nothing listens here; the command must fail before connecting
        webdriver_url: "http://127.0.0.1:1".into(),
        ..Default::default()
    };
    let err = commands::cmd_scrape(&config).unwrap_err();
    assert!(err.to_string().contains("Invalid account settings"));
}

#[test]
fn test_cmd_scrape_rejects_future_end_year() {
    let config = ScraperConfig {
        email: Some("kunde@example.de".into()),
        password: Some("geheim".into()),
        end_year: Some(2999),
        webdriver_url: "http://127.0.0.1:1".into(),
        ..Default::default()
    };
    let err = commands::cmd_scrape(&config).unwrap_err();
    assert!(err.to_string().contains("Invalid date range"));
}

// ========== Status/List Tests ==========

#[test]
fn test_summarize() {
    let summary = commands::summarize(&sample_orders());
    assert_eq!(summary.orders, 3);
    assert_eq!(summary.items, 4);
    assert_eq!(summary.digital, 1);
    assert!((summary.total_spent - 69.48).abs() < 1e-9);
    assert_eq!(summary.first, Some(day(2021, 3, 4)));
    assert_eq!(summary.last, Some(day(2023, 12, 24)));

    let empty = commands::summarize(&[]);
    assert_eq!(empty.orders, 0);
    assert_eq!(empty.first, None);
}

#[test]
fn test_recent_orders() {
    let orders = sample_orders();
    let recent = commands::recent_orders(&orders, 2);
    let ids: Vec<_> = recent.iter().map(|o| o.order_id.as_str()).collect();
    assert_eq!(ids, vec!["302-3", "D01-2"]);
    assert_eq!(commands::recent_orders(&orders, 10).len(), 3);
}

#[test]
fn test_cmd_status_and_list() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orders.json");

    // No file yet
    assert!(commands::cmd_status(&path).is_ok());
    assert!(commands::cmd_list(&path, 5, false).is_ok());

    OrderStore::new(&path).save(&sample_orders()).unwrap();
    assert!(commands::cmd_status(&path).is_ok());
    assert!(commands::cmd_list(&path, 5, false).is_ok());
    assert!(commands::cmd_list(&path, 1, true).is_ok());
}

#[test]
fn test_cmd_list_corrupt_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orders.json");
    std::fs::write(&path, "{not json").unwrap();
    let err = commands::cmd_list(&path, 5, false).unwrap_err();
    assert!(err.to_string().contains("Failed to read"));
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("Kabel", 10), "Kabel");
    assert_eq!(truncate("Größenverstellbarer Schreibtisch", 10), "Größenv...");
}

#[test]
fn test_progress_line_render() {
    let empty = ProgressLine::render(0.0);
    assert!(empty.ends_with("  0%"));
    assert!(!empty.contains('█'));

    let half = ProgressLine::render(0.5);
    assert!(half.ends_with(" 50%"));
    assert_eq!(half.matches('█').count(), 15);

    assert!(ProgressLine::render(1.7).ends_with("100%"));
}
