//! Year filter and result page state machine
//!
//! The order history is browsed one year filter at a time, newest first.
//! Within a filter, pages list orders newest first, so once a page ends
//! with an order older than the cutoff the rest of that filter is already
//! known and is not fetched.
//!
//! ```text
//! SelectingFilter -> CheckingAvailability -> ScrapingPage -> CheckingNextPage
//!        ^                    |                   |                |
//!        +--------------------+-------------------+----------------+
//!                                                     (next page) -> ScrapingPage
//! SelectingFilter -> Done   once every filter index was visited
//! ```

use std::collections::VecDeque;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use crate::fragment::{DetailLookup, Normalizer, OrderFragment};
use crate::models::Order;
use crate::progress::{ProgressEstimator, ProgressObserver};

/// Filter index of the current year. Indexes 0 and 1 ("last 30 days",
/// "last 3 months") are contained in it and never used.
pub const CURRENT_YEAR_FILTER: u32 = 2;

/// What the state machine needs from the order history pages
pub trait OrderPages: DetailLookup {
    /// Switch the order list to the year filter `index`. `false` when the
    /// filter control could not be found in time.
    fn select_filter(&mut self, index: u32) -> bool;

    /// Whether the selected filter lists any orders
    fn orders_available(&mut self) -> bool;

    /// Raw order boxes of the current page, newest first
    fn page_fragments(&mut self) -> Vec<OrderFragment>;

    /// Whether an enabled next-page control exists
    fn has_next_page(&mut self) -> bool;

    /// Follow the next-page control. `false` if navigation failed.
    fn go_to_next_page(&mut self) -> bool;
}

/// Filter indexes covering `cutoff.year ..= end.year`, newest first
pub fn filter_indices(cutoff: NaiveDate, end: NaiveDate, today: NaiveDate) -> Vec<u32> {
    let first = CURRENT_YEAR_FILTER as i32 + (today.year() - end.year());
    let last = CURRENT_YEAR_FILTER as i32 + (today.year() - cutoff.year());
    if last < first || first < CURRENT_YEAR_FILTER as i32 {
        return Vec::new();
    }
    (first as u32..=last as u32).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    SelectingFilter,
    CheckingAvailability { filter: u32 },
    ScrapingPage { filter: u32, page: u32 },
    CheckingNextPage { filter: u32, page: u32 },
    Done,
}

/// Counters of one pagination run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationStats {
    pub filters_visited: usize,
    pub filters_unavailable: usize,
    pub empty_filters: usize,
    pub pages_scraped: usize,
    pub fragments_skipped: usize,
    /// Whether a filter was left early because the cutoff was passed
    pub stopped_early: bool,
}

/// Result of a finished pagination run
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    /// Orders in scrape order (newest first per filter)
    pub orders: Vec<Order>,
    pub stats: PaginationStats,
}

/// Drives [`OrderPages`] through the year filters
pub struct Paginator<'p, 'o, P: OrderPages> {
    pages: &'p mut P,
    normalizer: Normalizer,
    cutoff: NaiveDate,
    estimator: ProgressEstimator,
    observer: Option<&'o mut dyn ProgressObserver>,
    filters: VecDeque<u32>,
    state: FilterState,
    orders: Vec<Order>,
    stats: PaginationStats,
}

impl<'p, 'o, P: OrderPages> Paginator<'p, 'o, P> {
    /// Scrape from `end` back to `cutoff`. `today` anchors the filter
    /// indexes.
    pub fn new(
        pages: &'p mut P,
        normalizer: Normalizer,
        cutoff: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Self {
        let filters = filter_indices(cutoff, end, today);
        debug!(?filters, %cutoff, %end, "Planned order filters");
        Self {
            pages,
            normalizer,
            cutoff,
            estimator: ProgressEstimator::new(cutoff, end),
            observer: None,
            filters: filters.into(),
            state: FilterState::SelectingFilter,
            orders: Vec::new(),
            stats: PaginationStats::default(),
        }
    }

    pub fn with_observer(mut self, observer: Option<&'o mut dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn stats(&self) -> &PaginationStats {
        &self.stats
    }

    /// Perform one transition and return the new state
    pub fn step(&mut self) -> FilterState {
        self.state = match self.state {
            FilterState::SelectingFilter => match self.filters.pop_front() {
                None => FilterState::Done,
                Some(filter) => {
                    self.stats.filters_visited += 1;
                    if self.pages.select_filter(filter) {
                        info!(filter, "Scraping order filter");
                        FilterState::CheckingAvailability { filter }
                    } else {
                        warn!(filter, "Order filter not reachable, skipping");
                        self.stats.filters_unavailable += 1;
                        FilterState::SelectingFilter
                    }
                }
            },
            FilterState::CheckingAvailability { filter } => {
                if self.pages.orders_available() {
                    FilterState::ScrapingPage { filter, page: 1 }
                } else {
                    debug!(filter, "No orders for filter");
                    self.stats.empty_filters += 1;
                    FilterState::SelectingFilter
                }
            }
            FilterState::ScrapingPage { filter, page } => {
                let oldest = self.scrape_page();
                self.stats.pages_scraped += 1;
                match oldest {
                    Some(date) if date < self.cutoff => {
                        info!(filter, page, %date, cutoff = %self.cutoff, "Reached known orders, leaving filter");
                        self.stats.stopped_early = true;
                        FilterState::SelectingFilter
                    }
                    _ => FilterState::CheckingNextPage { filter, page },
                }
            }
            FilterState::CheckingNextPage { filter, page } => {
                if self.pages.has_next_page() && self.pages.go_to_next_page() {
                    FilterState::ScrapingPage {
                        filter,
                        page: page + 1,
                    }
                } else {
                    FilterState::SelectingFilter
                }
            }
            FilterState::Done => FilterState::Done,
        };
        self.state
    }

    /// Run until every filter is done
    pub fn run(mut self) -> Pagination {
        while self.step() != FilterState::Done {}
        info!(
            orders = self.orders.len(),
            pages = self.stats.pages_scraped,
            "Finished scraping order filters"
        );
        Pagination {
            orders: self.orders,
            stats: self.stats,
        }
    }

    /// Scrape the current page; returns the date of the last parsed order
    fn scrape_page(&mut self) -> Option<NaiveDate> {
        let fragments = self.pages.page_fragments();
        let mut last_date = None;
        for fragment in &fragments {
            match self.normalizer.normalize(fragment, &mut *self.pages) {
                Some(order) => {
                    let fraction = self.estimator.at(order.date);
                    if let Some(observer) = self.observer.as_deref_mut() {
                        observer.on_progress(fraction);
                    }
                    last_date = Some(order.date);
                    self.orders.push(order);
                }
                None => self.stats.fragments_skipped += 1,
            }
        }
        last_date
    }
}
