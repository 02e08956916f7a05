//! Order file commands (status, list)

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use haul_core::{Order, OrderStore};

use super::truncate;

/// Aggregate numbers of an order file
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub orders: usize,
    pub items: usize,
    pub digital: usize,
    pub total_spent: f64,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

pub fn summarize(orders: &[Order]) -> OrderSummary {
    OrderSummary {
        orders: orders.len(),
        items: orders.iter().map(|o| o.items.len()).sum(),
        digital: orders.iter().filter(|o| o.is_digital()).count(),
        total_spent: orders.iter().map(|o| o.price).sum(),
        first: orders.iter().map(|o| o.date).min(),
        last: orders.iter().map(|o| o.date).max(),
    }
}

/// The `limit` most recent orders, newest first
pub fn recent_orders(orders: &[Order], limit: usize) -> Vec<&Order> {
    let mut recent: Vec<&Order> = orders.iter().collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(limit);
    recent
}

fn load(path: &Path) -> Result<Vec<Order>> {
    OrderStore::new(path)
        .load()
        .with_context(|| format!("Failed to read {}", path.display()))
}

pub fn cmd_status(path: &Path) -> Result<()> {
    println!();
    println!("📊 Haul Status");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Order file: {}", path.display());

    if !path.exists() {
        println!("   Size: (no orders scraped yet)");
        println!();
        println!("   Scrape your orders with:");
        println!("     haul scrape --email you@example.de");
        println!();
        return Ok(());
    }

    if let Ok(metadata) = fs::metadata(path) {
        let size_kb = metadata.len() as f64 / 1024.0;
        if size_kb < 1024.0 {
            println!("   Size: {:.1} KB", size_kb);
        } else {
            println!("   Size: {:.1} MB", size_kb / 1024.0);
        }
    }

    let summary = summarize(&load(path)?);
    println!();
    println!("   Orders: {}", summary.orders);
    println!("   Items: {}", summary.items);
    println!("   Digital orders: {}", summary.digital);
    println!("   Total spent: {:.2} EUR", summary.total_spent);
    if let (Some(first), Some(last)) = (summary.first, summary.last) {
        println!("   Span: {} → {}", first, last);
    }
    println!();
    Ok(())
}

pub fn cmd_list(path: &Path, limit: usize, json: bool) -> Result<()> {
    let orders = load(path)?;
    let recent = recent_orders(&orders, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&recent)?);
        return Ok(());
    }

    if recent.is_empty() {
        println!("No orders found. Scrape some with:");
        println!("  haul scrape --email you@example.de");
        return Ok(());
    }

    println!();
    println!("📦 Recent Orders");
    println!("   ─────────────────────────────────────────────────────────────");

    for order in recent {
        let title = order
            .items
            .first()
            .map(|item| item.title.as_str())
            .unwrap_or("-");
        let more = if order.items.len() > 1 {
            format!(" (+{})", order.items.len() - 1)
        } else {
            String::new()
        };
        println!(
            "   {} │ {:>10.2} │ {:<19} │ {}{}",
            order.date,
            order.price,
            order.order_id,
            truncate(title, 40),
            more
        );
    }
    println!();

    Ok(())
}
