//! Haul Core Library
//!
//! Order history scraping for amazon.de:
//! - Order/item model and the JSON order store
//! - German date and price parsing
//! - Browser capability interface with an offline HTML backend and a live
//!   WebDriver backend (feature `webdriver`)
//! - Site adapter for sign-in, year filters, order boxes and detail pages
//! - Year filter/page state machine with progress reporting
//! - Incremental reconciliation of stored and scraped orders

pub mod config;
pub mod dates;
pub mod error;
pub mod fragment;
pub mod html;
pub mod models;
pub mod page;
pub mod pagination;
pub mod progress;
pub mod reconcile;
pub mod session;
pub mod site;
pub mod store;
#[cfg(feature = "webdriver")]
pub mod webdriver;

/// Test utilities: in-memory order pages and stored HTML fixtures
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{Credentials, ScraperConfig};
pub use error::{Error, Result};
pub use fragment::{DetailLookup, Normalizer, OrderFragment};
pub use html::HtmlSession;
pub use models::{Categories, Item, Order, ScrapeRange};
pub use page::{AuxTab, Element, Locator, PageSource};
pub use pagination::{FilterState, OrderPages, Paginator, PaginationStats};
pub use progress::{ProgressEstimator, ProgressObserver};
pub use reconcile::{merge_orders, ReconcileReport, Reconciler, Strategy};
pub use session::{run_scrape, ScrapeOptions};
pub use site::OrderHistory;
pub use store::OrderStore;
#[cfg(feature = "webdriver")]
pub use webdriver::WebDriverSession;
