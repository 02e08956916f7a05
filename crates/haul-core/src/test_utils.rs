//! Test utilities for haul-core
//!
//! In-memory order history pages for exercising the pagination state
//! machine and the reconciliation engine without a browser, and stored
//! HTML pages mimicking the real order history for the site adapter.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::dates::MONTHS;
use crate::error::{Error, Result};
use crate::fragment::{DetailLookup, ItemFragment, OrderFragment};
use crate::html::HtmlSession;
use crate::models::{Categories, Item, Order};
use crate::page::PageSource;
use crate::pagination::OrderPages;
use crate::progress::ProgressObserver;
use crate::site::{filter_option_id, NO_ORDERS_MARKER, ORDERS_URL, SIGNIN_URL};

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A date as printed by the order history, e.g. `4. September 2018`
pub fn german_date(date: NaiveDate) -> String {
    format!("{}. {} {}", date.day(), MONTHS[date.month0() as usize], date.year())
}

/// A fragment for a single-item order priced EUR 10,00
pub fn fragment(order_id: &str, date: NaiveDate) -> OrderFragment {
    OrderFragment {
        info: vec![german_date(date), "EUR 10,00".into(), order_id.into()],
        details_link: Some(format!("https://shop.test/details/{}", order_id)),
        items: vec![ItemFragment {
            text: format!("Artikel {}\nVerkauf durch: Händler", order_id),
            title: Some(format!("Artikel {}", order_id)),
            link: Some(format!("https://shop.test/dp/{}", order_id)),
            price: Some("EUR 10,00".into()),
        }],
    }
}

/// The order `fragment` normalizes to
pub fn order(order_id: &str, date: NaiveDate) -> Order {
    Order::new(
        order_id,
        10.0,
        date,
        vec![Item::new(
            10.0,
            format!("https://shop.test/dp/{}", order_id),
            format!("Artikel {}", order_id),
            "Händler",
            Categories::new(),
        )],
    )
}

/// Lookup that never finds a details page
pub struct NoLookup;

impl DetailLookup for NoLookup {
    fn details_price(&mut self, details_link: &str, _item_index: usize) -> Result<f64> {
        Err(Error::ElementNotFound(format!(
            "no details page for {}",
            details_link
        )))
    }

    fn item_categories(&mut self, _item_link: &str) -> Result<Categories> {
        Ok(Categories::new())
    }
}

/// Observer that remembers every reported value
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub values: Vec<f64>,
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&mut self, fraction: f64) {
        self.values.push(fraction);
    }
}

/// Order history held in memory
///
/// Filters missing from the map behave like a filter control that never
/// appears; a filter with no pages shows the "no orders" marker.
#[derive(Debug, Default)]
pub struct FakeOrderPages {
    filters: BTreeMap<u32, Vec<Vec<OrderFragment>>>,
    current: Option<(u32, usize)>,
    /// Filter indexes in the order they were selected
    pub selected: Vec<u32>,
    /// Number of result pages whose fragments were read
    pub pages_loaded: usize,
}

impl FakeOrderPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, index: u32, pages: Vec<Vec<OrderFragment>>) -> Self {
        self.filters.insert(index, pages);
        self
    }

    pub fn with_empty_filter(self, index: u32) -> Self {
        self.with_filter(index, Vec::new())
    }

    fn current_pages(&self) -> Option<(&Vec<Vec<OrderFragment>>, usize)> {
        let (filter, page) = self.current?;
        self.filters.get(&filter).map(|pages| (pages, page))
    }
}

impl DetailLookup for FakeOrderPages {
    fn details_price(&mut self, details_link: &str, _item_index: usize) -> Result<f64> {
        Err(Error::ElementNotFound(details_link.to_string()))
    }

    fn item_categories(&mut self, _item_link: &str) -> Result<Categories> {
        Ok(Categories::new())
    }
}

impl OrderPages for FakeOrderPages {
    fn select_filter(&mut self, index: u32) -> bool {
        self.selected.push(index);
        if self.filters.contains_key(&index) {
            self.current = Some((index, 0));
            true
        } else {
            false
        }
    }

    fn orders_available(&mut self) -> bool {
        self.current_pages()
            .map(|(pages, _)| !pages.is_empty())
            .unwrap_or(false)
    }

    fn page_fragments(&mut self) -> Vec<OrderFragment> {
        self.pages_loaded += 1;
        self.current_pages()
            .and_then(|(pages, page)| pages.get(page).cloned())
            .unwrap_or_default()
    }

    fn has_next_page(&mut self) -> bool {
        self.current_pages()
            .map(|(pages, page)| page + 1 < pages.len())
            .unwrap_or(false)
    }

    fn go_to_next_page(&mut self) -> bool {
        match self.current {
            Some((filter, page)) => {
                self.current = Some((filter, page + 1));
                true
            }
            None => false,
        }
    }
}

/// Markup of one order box, normalizing to [`order`]
pub fn order_box(order_id: &str, date: NaiveDate) -> String {
    format!(
        r#"<div class="order">
  <div class="a-box order-info">
    <span class="label">Bestellung aufgegeben</span>
    <span class="value">{date}</span>
    <span class="label">Summe</span>
    <span class="value">EUR 10,00</span>
    <span class="label">Bestellnr.</span>
    <span class="value">{id}</span>
    <a class="a-link-normal" href="https://shop.test/details/{id}">Bestelldetails anzeigen</a>
  </div>
  <div class="a-box">
    <div class="a-fixed-left-grid">
      <div class="a-col-left"><img src="https://shop.test/img/{id}.jpg"></div>
      <div class="a-col-right">
        <div class="a-row"><a class="a-link-normal" href="https://shop.test/dp/{id}">Artikel {id}</a></div>
        <div class="a-row">Verkauf durch: Händler</div>
        <div class="a-row"><span class="a-color-price">EUR 10,00</span></div>
      </div>
    </div>
  </div>
</div>"#,
        date = german_date(date),
        id = order_id
    )
}

/// Url of result page `page` (from 1) of filter `filter`
pub fn page_url(filter: u32, page: usize) -> String {
    format!("https://shop.test/orders/{}/{}", filter, page)
}

/// Page the browser lands on after signing in
pub const LANDING_URL: &str = "https://shop.test/orders";

/// A stored order history with year filters and result pages
#[derive(Debug, Default, Clone)]
pub struct HistoryFixture {
    filters: BTreeMap<u32, Vec<Vec<(String, NaiveDate)>>>,
    sign_in: Option<bool>,
}

impl HistoryFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, index: u32, pages: Vec<Vec<(&str, NaiveDate)>>) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| {
                page.into_iter()
                    .map(|(id, date)| (id.to_string(), date))
                    .collect()
            })
            .collect();
        self.filters.insert(index, pages);
        self
    }

    pub fn with_empty_filter(self, index: u32) -> Self {
        self.with_filter(index, Vec::new())
    }

    /// Put a sign-in form in front of the order history that accepts or
    /// rejects the credentials
    pub fn with_sign_in(mut self, accepted: bool) -> Self {
        self.sign_in = Some(accepted);
        self
    }

    fn filter_menu(&self) -> String {
        let options: String = self
            .filters
            .keys()
            .map(|index| {
                format!(
                    r#"<li><a id="{}" href="{}">Filter {}</a></li>"#,
                    filter_option_id(*index),
                    page_url(*index, 1),
                    index
                )
            })
            .collect();
        format!(
            r#"<span id="a-autoid-1-announce">Bestellungen aufgegeben in</span><ul class="a-popover">{}</ul>"#,
            options
        )
    }

    fn result_page(&self, filter: u32, page: usize, pages: usize, orders: &str) -> String {
        let pagination = if pages < 2 {
            String::new()
        } else {
            let previous = if page == 1 {
                r#"<li class="a-disabled">←Zurück</li>"#.to_string()
            } else {
                format!(r#"<li><a href="{}">←Zurück</a></li>"#, page_url(filter, page - 1))
            };
            let next = if page == pages {
                r#"<li class="a-disabled a-last">Weiter→</li>"#.to_string()
            } else {
                format!(
                    r#"<li class="a-last"><a href="{}">Weiter→</a></li>"#,
                    page_url(filter, page + 1)
                )
            };
            format!(r#"<ul class="a-pagination">{}{}</ul>"#, previous, next)
        };
        format!(
            "<html><body>{}<div id=\"ordersContainer\">{}</div>{}</body></html>",
            self.filter_menu(),
            orders,
            pagination
        )
    }

    /// Session serving the fixture's pages
    ///
    /// Without a sign-in form the session starts on the order history.
    pub fn session(&self) -> HtmlSession {
        let landing = format!("<html><body>{}</body></html>", self.filter_menu());
        let mut session = HtmlSession::new().with_page(LANDING_URL, landing.clone());

        for (&filter, pages) in &self.filters {
            if pages.is_empty() {
                let empty = format!(
                    "<div class=\"a-box\">Sie haben {} {}.</div>",
                    filter, NO_ORDERS_MARKER
                );
                session.add_page(page_url(filter, 1), self.result_page(filter, 1, 1, &empty));
            }
            for (index, orders) in pages.iter().enumerate() {
                let boxes: String = orders
                    .iter()
                    .map(|(id, date)| order_box(id, *date))
                    .collect();
                session.add_page(
                    page_url(filter, index + 1),
                    self.result_page(filter, index + 1, pages.len(), &boxes),
                );
            }
        }

        match self.sign_in {
            Some(accepted) => {
                let target = if accepted { LANDING_URL } else { SIGNIN_URL };
                session.add_page(
                    ORDERS_URL,
                    format!(
                        r#"<html><body><form name="signIn">
  <input id="ap_email" type="email">
  <input id="ap_password" type="password">
  <input name="rememberMe" type="checkbox">
  <a id="signInSubmit" href="{}">Anmelden</a>
</form></body></html>"#,
                        target
                    ),
                );
            }
            None => {
                session.add_page(ORDERS_URL, landing);
                // Pages are in place, loading cannot fail
                let _ = session.navigate(ORDERS_URL);
            }
        }
        session
    }
}
