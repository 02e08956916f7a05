//! Normalization of scraped order fragments into [`Order`] records
//!
//! A fragment is the raw text pulled out of one order box of the order
//! history. Normalizing it never aborts the scrape: missing or malformed
//! pieces degrade to `0` prices, sentinel strings and empty category maps,
//! with a warning. Only a fragment without a usable order id or date is
//! dropped, since it can neither be deduplicated nor placed in time.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::dates::parse_date;
use crate::error::{Error, Result};
use crate::models::{is_digital_order, Categories, Item, Order, NOT_AVAILABLE};

/// Marker in front of the seller name in an item's text
const SELLER_MARKER: &str = "durch: ";

/// Prefix of a price that is a real amount (other values are e.g. gift
/// card balances)
const CURRENCY: &str = "EUR";

/// Category entry appended to video genres
const VIDEO_CATEGORY: &str = "movie";

/// Raw data of one order box
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFragment {
    /// Generic `value` fields of the order header, in page order:
    /// `[date, price, recipient, order_id]`, the recipient may be missing
    pub info: Vec<String>,
    /// Link to the order details page
    pub details_link: Option<String>,
    pub items: Vec<ItemFragment>,
}

/// Raw data of one item row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFragment {
    /// Full text of the row (seller is read from it)
    pub text: String,
    pub title: Option<String>,
    pub link: Option<String>,
    /// Price printed next to the item, if any
    pub price: Option<String>,
}

/// Header fields of an order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderInfo {
    pub order_id: String,
    pub price: f64,
    pub date: NaiveDate,
}

/// Lookups that need another page (order details, product page)
pub trait DetailLookup {
    /// Price of the item at `item_index` (position within the order) as
    /// listed on the order details page
    fn details_price(&mut self, details_link: &str, item_index: usize) -> Result<f64>;

    /// Categories shown on the product page
    fn item_categories(&mut self, item_link: &str) -> Result<Categories>;
}

/// Turns fragments into orders
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    /// Also fetch item categories from the product pages (one extra page
    /// load per item)
    pub extensive: bool,
}

impl Normalizer {
    pub fn new(extensive: bool) -> Self {
        Self { extensive }
    }

    /// Normalize a fragment, or `None` if it has no usable id or date
    ///
    /// Item fields degrade to defaults, the header does not: an order with
    /// an id but an unparseable date is dropped, counted in
    /// `PaginationStats::fragments_skipped` and never persisted.
    pub fn normalize(
        &self,
        fragment: &OrderFragment,
        lookup: &mut dyn DetailLookup,
    ) -> Option<Order> {
        let info = match parse_order_info(&fragment.info) {
            Ok(info) => info,
            Err(e) => {
                warn!("Skipping order, header unreadable: {}", e);
                return None;
            }
        };

        let digital = is_digital_order(&info.order_id);
        let items = fragment
            .items
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let price = if digital {
                    info.price
                } else {
                    self.item_price(raw, index, fragment, &info, lookup)
                };
                let link = raw.link.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
                let categories = if self.extensive && link != NOT_AVAILABLE {
                    lookup.item_categories(&link).unwrap_or_else(|e| {
                        warn!(order_id = %info.order_id, "No categories for {}: {}", link, e);
                        Categories::new()
                    })
                } else {
                    Categories::new()
                };
                Item {
                    price,
                    link,
                    title: raw.title.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                    seller: item_seller(&raw.text),
                    categories,
                }
            })
            .collect();

        debug!(order_id = %info.order_id, date = %info.date, "Parsed order");
        Some(Order::new(info.order_id, info.price, info.date, items))
    }

    fn item_price(
        &self,
        raw: &ItemFragment,
        index: usize,
        fragment: &OrderFragment,
        info: &OrderInfo,
        lookup: &mut dyn DetailLookup,
    ) -> f64 {
        if let Some(price) = raw.price.as_deref().and_then(|p| parse_price(p).ok()) {
            return price;
        }
        let Some(details_link) = fragment.details_link.as_deref() else {
            warn!(order_id = %info.order_id, "Could not parse price, no details link");
            return 0.0;
        };
        match lookup.details_price(details_link, index) {
            Ok(price) => price,
            Err(e) => {
                warn!(order_id = %info.order_id, "Could not parse price: {}", e);
                0.0
            }
        }
    }
}

/// Read id, price and date from the order header fields
pub fn parse_order_info(fields: &[String]) -> Result<OrderInfo> {
    if fields.len() < 3 {
        return Err(Error::ElementNotFound(format!(
            "expected at least 3 order info fields, found {}",
            fields.len()
        )));
    }

    let order_id = if fields.len() < 4 {
        fields[2].trim()
    } else {
        fields[3].trim()
    };
    if order_id.is_empty() {
        return Err(Error::ElementNotFound("empty order id".into()));
    }

    let date = parse_date(fields[0].trim())?;

    let price_str = fields[1].trim();
    let price = if price_str.contains(CURRENCY) {
        parse_price(price_str).unwrap_or_else(|e| {
            warn!(order_id, "Could not parse order price: {}", e);
            0.0
        })
    } else {
        0.0
    };

    Ok(OrderInfo {
        order_id: order_id.to_string(),
        price,
        date,
    })
}

/// Parse a price like `EUR 1.234,56`
pub fn parse_price(s: &str) -> Result<f64> {
    let amount = s.trim().trim_start_matches(CURRENCY).trim();
    let normalized = amount.replace('.', "").replace(',', ".");
    normalized
        .parse::<f64>()
        .map_err(|_| Error::Parse(format!("Unable to parse price: {}", s)))
}

/// Seller name following `durch: ` in an item's text
pub fn item_seller(text: &str) -> String {
    text.split_once(SELLER_MARKER)
        .and_then(|(_, rest)| rest.lines().next())
        .map(str::trim)
        .filter(|seller| !seller.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Categories from a breadcrumb list: entries alternate with separators,
/// the first entry is depth 1
pub fn breadcrumb_categories<S: AsRef<str>>(entries: &[S]) -> Categories {
    entries
        .iter()
        .enumerate()
        .filter(|(index, _)| index % 2 == 0)
        .map(|(index, name)| ((index / 2 + 1) as u32, name.as_ref().trim().to_string()))
        .collect()
}

/// Categories from a video's meta info, e.g. `Genres Drama, Komödie\n...`
///
/// Genres are keyed from 0 and followed by a `movie` entry.
pub fn video_categories(meta: &str) -> Categories {
    let first_line = meta.lines().next().unwrap_or_default();
    let mut genres: Vec<String> = first_line.split(", ").map(str::to_string).collect();
    if let Some(first) = genres.first_mut() {
        // Drop the label in front of the first genre
        if let Some((_, genre)) = first.split_once(' ') {
            *first = genre.to_string();
        }
    }

    let mut categories: Categories = genres
        .into_iter()
        .map(|genre| genre.trim().to_string())
        .filter(|genre| !genre.is_empty())
        .enumerate()
        .map(|(index, genre)| (index as u32, genre))
        .collect();
    categories.insert(categories.len() as u32, VIDEO_CATEGORY.to_string());
    categories
}
