//! Incremental reconciliation of stored and freshly scraped orders
//!
//! A scrape either starts from scratch or only fetches what is newer than
//! the latest stored order:
//!
//! - custom date range: stored orders may cover a different window, they
//!   are discarded and the range is scraped completely
//! - nothing stored: full scrape of the range
//! - otherwise: partial scrape with the newest stored date as cutoff
//!
//! Scraped orders are merged by `order_id` (stored orders win) and the
//! result is sorted by date, keeping the relative order of same-day orders.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fragment::Normalizer;
use crate::models::{Order, ScrapeRange};
use crate::pagination::{OrderPages, Pagination, PaginationStats, Paginator};
use crate::progress::ProgressObserver;
use crate::store::OrderStore;

/// How much of the history gets scraped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Scrape the whole requested range
    Full,
    /// Scrape back until orders older than `cutoff` show up
    Partial { cutoff: NaiveDate },
}

impl Strategy {
    /// Oldest date that needs scraping
    pub fn cutoff(&self, range: &ScrapeRange) -> NaiveDate {
        match self {
            Strategy::Full => range.start_date,
            Strategy::Partial { cutoff } => *cutoff,
        }
    }
}

/// Decide between a full and a partial scrape
pub fn choose_strategy(existing: &[Order], range: &ScrapeRange) -> Strategy {
    if range.is_custom() {
        return Strategy::Full;
    }
    match existing.iter().map(|order| order.date).max() {
        Some(cutoff) => Strategy::Partial { cutoff },
        None => Strategy::Full,
    }
}

/// Result of [`merge_orders`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Merged orders sorted by date
    pub orders: Vec<Order>,
    /// Scraped orders that were new
    pub added: usize,
    /// Orders dropped because their id was already present
    pub duplicates: usize,
}

/// Merge scraped orders into existing ones
///
/// The first occurrence of an id wins, existing orders before scraped ones.
/// The sort is stable, so same-day orders keep existing-then-scrape order.
pub fn merge_orders(existing: Vec<Order>, scraped: Vec<Order>) -> MergeOutcome {
    let mut seen = HashSet::with_capacity(existing.len() + scraped.len());
    let mut orders = Vec::with_capacity(existing.len() + scraped.len());
    let mut duplicates = 0;

    for order in existing {
        if seen.insert(order.order_id.clone()) {
            orders.push(order);
        } else {
            warn!(order_id = %order.order_id, "Stored orders contain a duplicate id, dropping it");
            duplicates += 1;
        }
    }

    let before = orders.len();
    for order in scraped {
        if seen.insert(order.order_id.clone()) {
            orders.push(order);
        } else {
            debug!(order_id = %order.order_id, "Already known");
            duplicates += 1;
        }
    }
    let added = orders.len() - before;

    orders.sort_by_key(|order| order.date);

    MergeOutcome {
        orders,
        added,
        duplicates,
    }
}

/// Summary of a reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    /// Final orders sorted by date
    pub orders: Vec<Order>,
    pub strategy: Strategy,
    /// Orders parsed from the pages, before deduplication
    pub scraped: usize,
    pub added: usize,
    pub duplicates: usize,
    pub stats: PaginationStats,
}

/// Drives a scrape and merges its result
pub struct Reconciler<'o> {
    normalizer: Normalizer,
    observer: Option<&'o mut dyn ProgressObserver>,
}

impl<'o> Reconciler<'o> {
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Option<&'o mut dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Reconcile `existing` with what `pages` lists for `range`
    ///
    /// Does not touch any store. For a custom range `existing` is ignored.
    pub fn reconcile<P: OrderPages>(
        self,
        existing: Vec<Order>,
        range: &ScrapeRange,
        pages: &mut P,
    ) -> ReconcileReport {
        let existing = if range.is_custom() && !existing.is_empty() {
            info!(
                discarded = existing.len(),
                "Custom date range, not reusing stored orders"
            );
            Vec::new()
        } else {
            existing
        };

        let strategy = choose_strategy(&existing, range);
        let cutoff = strategy.cutoff(range);
        match strategy {
            Strategy::Full => info!(start = %range.start_date, end = %range.end_date, "Full scrape"),
            Strategy::Partial { cutoff } => {
                info!(%cutoff, known = existing.len(), "Partial scrape, stored orders up to cutoff")
            }
        }

        let Pagination { orders, stats } = if cutoff > range.end_date {
            info!(%cutoff, end = %range.end_date, "Nothing to scrape after cutoff");
            Pagination::default()
        } else {
            Paginator::new(pages, self.normalizer, cutoff, range.end_date, range.today)
                .with_observer(self.observer)
                .run()
        };

        let scraped = orders.len();
        let MergeOutcome {
            orders,
            added,
            duplicates,
        } = merge_orders(existing, orders);
        info!(scraped, added, duplicates, total = orders.len(), "Reconciled orders");

        ReconcileReport {
            orders,
            strategy,
            scraped,
            added,
            duplicates,
            stats,
        }
    }

    /// Load from `store`, reconcile and save the result back
    ///
    /// A custom range removes the store first.
    pub fn run<P: OrderPages>(
        self,
        store: &OrderStore,
        range: &ScrapeRange,
        pages: &mut P,
    ) -> Result<ReconcileReport> {
        let existing = if range.is_custom() {
            if store.remove()? {
                info!("Custom date range, removed stored orders");
            }
            Vec::new()
        } else {
            store.load()?
        };

        let report = self.reconcile(existing, range, pages);
        store.save(&report.orders)?;
        Ok(report)
    }
}
