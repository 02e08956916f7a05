//! Domain models for haul

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sentinel stored when a link or seller could not be scraped
pub const NOT_AVAILABLE: &str = "not available";

/// Order ids of downloadable/streamed content start with this prefix
pub const DIGITAL_ORDER_PREFIX: &str = "D01";

/// The order history of the site does not reach further back than this
pub const EARLIEST_ORDER_YEAR: i32 = 2010;

/// Category names of an item keyed by breadcrumb depth (or genre index)
pub type Categories = BTreeMap<u32, String>;

/// A single purchase as shown in the order history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub price: f64,
    pub date: NaiveDate,
    pub items: Vec<Item>,
}

impl Order {
    pub fn new(order_id: impl Into<String>, price: f64, date: NaiveDate, items: Vec<Item>) -> Self {
        Self {
            order_id: order_id.into(),
            price,
            date,
            items,
        }
    }

    /// Whether this is a digital order (e.g. video or audio book)
    pub fn is_digital(&self) -> bool {
        is_digital_order(&self.order_id)
    }
}

pub fn is_digital_order(order_id: &str) -> bool {
    order_id.starts_with(DIGITAL_ORDER_PREFIX)
}

/// A line item of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub price: f64,
    pub link: String,
    pub title: String,
    pub seller: String,
    #[serde(default)]
    pub categories: Categories,
}

impl Item {
    pub fn new(
        price: f64,
        link: impl Into<String>,
        title: impl Into<String>,
        seller: impl Into<String>,
        categories: Categories,
    ) -> Self {
        Self {
            price,
            link: link.into(),
            title: title.into(),
            seller: seller.into(),
            categories,
        }
    }
}

/// The requested scraping window
///
/// `today` is carried along so that year filters and the "custom range"
/// decision are computed against one fixed reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub today: NaiveDate,
}

impl ScrapeRange {
    /// Build a range covering `start_year` through `end_year` (inclusive).
    ///
    /// The range ends today when `end_year` is the current year, otherwise on
    /// Dec 31 of `end_year`.
    pub fn from_years(start_year: i32, end_year: i32, today: NaiveDate) -> Result<Self> {
        if start_year > end_year {
            return Err(Error::Configuration(format!(
                "start year {} must not be after end year {}",
                start_year, end_year
            )));
        }
        if end_year < EARLIEST_ORDER_YEAR {
            return Err(Error::Configuration(format!(
                "order history only covers years from {} on, got end year {}",
                EARLIEST_ORDER_YEAR, end_year
            )));
        }
        if end_year > today.year() {
            return Err(Error::Configuration(format!(
                "end year {} is in the future",
                end_year
            )));
        }

        let start_date = NaiveDate::from_ymd_opt(start_year, 1, 1).ok_or_else(|| {
            Error::Configuration(format!("invalid start year {}", start_year))
        })?;
        let end_date = if end_year == today.year() {
            today
        } else {
            NaiveDate::from_ymd_opt(end_year, 12, 31)
                .ok_or_else(|| Error::Configuration(format!("invalid end year {}", end_year)))?
        };

        Ok(Self {
            start_date,
            end_date,
            today,
        })
    }

    /// The maximal window: everything from 2010 up to today
    pub fn full_history(today: NaiveDate) -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(EARLIEST_ORDER_YEAR, 1, 1).unwrap_or(today),
            end_date: today,
            today,
        }
    }

    /// Whether the user narrowed the default window. Persisted orders cannot
    /// be trusted for a custom window since they may only partially overlap.
    pub fn is_custom(&self) -> bool {
        self.start_date.year() != EARLIEST_ORDER_YEAR || self.end_date.year() != self.today.year()
    }
}
