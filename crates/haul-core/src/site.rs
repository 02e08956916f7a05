//! amazon.de order history on top of a [`PageSource`]
//!
//! Everything that knows about the site's markup lives here: the sign-in
//! form, the year filter dropdown, order boxes, pagination and the detail
//! pages used for prices and categories.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::fragment::{
    breadcrumb_categories, parse_price, video_categories, DetailLookup, ItemFragment,
    OrderFragment,
};
use crate::models::Categories;
use crate::page::{AuxTab, Element, Locator, PageSource, DEFAULT_TIMEOUT};
use crate::pagination::OrderPages;

pub const ORDERS_URL: &str = "https://www.amazon.de/gp/css/order-history?ref_=nav_orders_first";
pub const SIGNIN_URL: &str = "https://www.amazon.de/ap/signin";

/// Shown instead of the order list when a filter has no orders
pub const NO_ORDERS_MARKER: &str = "keine Bestellungen aufgegeben";

// Sign-in form
const EMAIL_FIELD: &str = "ap_email";
const PASSWORD_FIELD: &str = "ap_password";
const REMEMBER_ME: &str = "rememberMe";
const SIGNIN_SUBMIT: &str = "signInSubmit";
const PHONE_SKIP_LINK: &str = "ap-account-fixup-phone-skip-link";

// Order list
const FILTER_DROPDOWN: &str = "a-autoid-1-announce";
const ORDER: &str = "order";
const ORDER_INFO: &str = "order-info";
const INFO_VALUE: &str = "value";
const BOX: &str = "a-box";
const ITEM: &str = "a-fixed-left-grid";
const ITEM_DETAILS: &str = "a-col-right";
const ROW: &str = "a-row";
const LINK: &str = "a-link-normal";
const PRICE: &str = "a-color-price";

// Pagination
const PAGINATION: &str = "a-pagination";
const DISABLED: &str = "a-disabled";
const LAST: &str = "a-last";
const NEXT_LABEL: &str = "Weiter";

// Detail pages
const SHIPMENTS: &str = "od-shipments";
const BREADCRUMBS: &str = "wayfinding-breadcrumbs_container";
const BREADCRUMB_ENTRY: &str = "a-list-item";
const VIDEO_META: &str = "dv-dp-node-meta-info";

/// Id of the dropdown entry for year filter `index`
pub fn filter_option_id(index: u32) -> String {
    format!("orderFilter_{}", index)
}

/// Sign in on the order history page
///
/// Missing form fields are logged and the check below decides. If the
/// browser is still on the sign-in page afterwards the session is ended and
/// an authentication error returned.
pub fn sign_in<P: PageSource>(
    source: &mut P,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<()> {
    let password = credentials.password()?;
    source.navigate(ORDERS_URL)?;

    if !fill_sign_in_form(source, &credentials.email, password, timeout)? {
        warn!("Error while trying to sign in, couldn't find all needed form elements");
    }

    let url = source.current_url()?;
    if url.starts_with(SIGNIN_URL) {
        if let Err(e) = source.quit() {
            warn!("Failed to end browser session: {}", e);
        }
        return Err(Error::Authentication(
            "Couldn't sign in. Maybe your credentials are incorrect?".into(),
        ));
    }
    info!(email = %credentials.email, "Signed in");

    match source.find_by_id(PHONE_SKIP_LINK) {
        Some(skip) => {
            source.click(&skip)?;
            info!("Skipped adding phone number");
        }
        None => debug!("No need to skip adding phone number"),
    }
    Ok(())
}

/// Returns `false` as soon as a form element is missing
fn fill_sign_in_form<P: PageSource>(
    source: &mut P,
    email: &str,
    password: &str,
    timeout: Duration,
) -> Result<bool> {
    if !source.wait_for(&Locator::id(EMAIL_FIELD), timeout) {
        return Ok(false);
    }
    let Some(email_input) = source.find_by_id(EMAIL_FIELD) else {
        return Ok(false);
    };
    source.send_keys(&email_input, email)?;

    let Some(password_input) = source.find_by_id(PASSWORD_FIELD) else {
        return Ok(false);
    };
    source.send_keys(&password_input, password)?;

    let Some(remember) = source.find(&Locator::name(REMEMBER_ME)) else {
        return Ok(false);
    };
    source.click(&remember)?;

    let Some(submit) = source.find_by_id(SIGNIN_SUBMIT) else {
        return Ok(false);
    };
    source.click(&submit)?;
    Ok(true)
}

/// The signed-in order history
pub struct OrderHistory<'s, P: PageSource> {
    source: &'s mut P,
    timeout: Duration,
}

impl<'s, P: PageSource> OrderHistory<'s, P> {
    pub fn new(source: &'s mut P) -> Self {
        Self::with_timeout(source, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(source: &'s mut P, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    fn click_when_present(&mut self, locator: &Locator) -> bool {
        if !self.source.wait_or_warn(locator, self.timeout) {
            return false;
        }
        let Some(element) = self.source.find(locator) else {
            return false;
        };
        match self.source.click(&element) {
            Ok(()) => true,
            Err(e) => {
                warn!("Clicking {} failed: {}", locator, e);
                false
            }
        }
    }
}

/// Raw data of one order box
fn order_fragment<E: Element>(order: &E) -> OrderFragment {
    let info = match order.find_by_class(ORDER_INFO) {
        Some(info) => info
            .find_all_by_class(INFO_VALUE)
            .iter()
            .map(|field| field.text())
            .collect(),
        None => {
            debug!("Order box without {}", ORDER_INFO);
            Vec::new()
        }
    };

    // The first box holds the order info, every further box the items of
    // one seller
    let items = order
        .find_all_by_class(BOX)
        .iter()
        .skip(1)
        .flat_map(|seller_box| seller_box.find_all_by_class(ITEM))
        .map(|item| item_fragment(&item))
        .collect();

    OrderFragment {
        info,
        details_link: order.find_by_class(LINK).and_then(|link| link.attr("href")),
        items,
    }
}

fn item_fragment<E: Element>(item: &E) -> ItemFragment {
    let title_row = item
        .find_by_class(ITEM_DETAILS)
        .and_then(|details| details.find_all_by_class(ROW).into_iter().next());

    ItemFragment {
        text: item.text(),
        title: title_row.as_ref().map(|row| row.text()),
        link: title_row
            .as_ref()
            .and_then(|row| row.find_by_class(LINK))
            .and_then(|link| link.attr("href")),
        price: item.find_by_class(PRICE).map(|price| price.text()),
    }
}

impl<P: PageSource> DetailLookup for OrderHistory<'_, P> {
    fn details_price(&mut self, details_link: &str, item_index: usize) -> Result<f64> {
        let timeout = self.timeout;
        let tab = AuxTab::open(&mut *self.source, details_link)?;
        if !tab.wait_or_warn(&Locator::class(SHIPMENTS), timeout) {
            return Err(Error::ElementNotFound(SHIPMENTS.into()));
        }
        let shipments = tab
            .find_by_class(SHIPMENTS)
            .ok_or_else(|| Error::ElementNotFound(SHIPMENTS.into()))?;
        let prices = shipments.find_all_by_class(PRICE);
        let price = prices.get(item_index).ok_or_else(|| {
            Error::ElementNotFound(format!(
                "price {} of {} on details page",
                item_index,
                prices.len()
            ))
        })?;
        parse_price(&price.text())
    }

    fn item_categories(&mut self, item_link: &str) -> Result<Categories> {
        let timeout = self.timeout;
        let tab = AuxTab::open(&mut *self.source, item_link)?;

        if tab.wait_for(&Locator::id(BREADCRUMBS), timeout) {
            if let Some(container) = tab.find_by_id(BREADCRUMBS) {
                let entries: Vec<String> = container
                    .find_all_by_class(BREADCRUMB_ENTRY)
                    .iter()
                    .map(|entry| entry.text())
                    .collect();
                return Ok(breadcrumb_categories(&entries));
            }
        }

        if tab.wait_for(&Locator::class(VIDEO_META), timeout) {
            if let Some(meta) = tab.find_by_class(VIDEO_META) {
                return Ok(video_categories(&meta.text()));
            }
        }

        debug!("No categories on {}", item_link);
        Ok(Categories::new())
    }
}

impl<P: PageSource> OrderPages for OrderHistory<'_, P> {
    fn select_filter(&mut self, index: u32) -> bool {
        self.click_when_present(&Locator::id(FILTER_DROPDOWN))
            && self.click_when_present(&Locator::id(filter_option_id(index)))
    }

    fn orders_available(&mut self) -> bool {
        match self.source.page_source() {
            Ok(markup) => !markup.contains(NO_ORDERS_MARKER),
            Err(e) => {
                warn!("Could not read page: {}", e);
                false
            }
        }
    }

    fn page_fragments(&mut self) -> Vec<OrderFragment> {
        let orders = self.source.find_all_by_class(ORDER);
        debug!(count = orders.len(), "Order boxes on page");
        orders.iter().map(|order| order_fragment(order)).collect()
    }

    fn has_next_page(&mut self) -> bool {
        let Some(pagination) = self.source.find_by_class(PAGINATION) else {
            return false;
        };
        !pagination
            .find_all_by_class(DISABLED)
            .iter()
            .any(|disabled| disabled.text().contains(NEXT_LABEL))
    }

    fn go_to_next_page(&mut self) -> bool {
        let href = self
            .source
            .find_by_class(PAGINATION)
            .and_then(|pagination| pagination.find_by_class(LAST))
            .and_then(|last| last.find_by_tag("a"))
            .and_then(|link| link.attr("href"));
        let Some(href) = href else {
            warn!("Next page link not found");
            return false;
        };
        match self.source.navigate(&href) {
            Ok(()) => true,
            Err(e) => {
                warn!("Loading next page failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Normalizer;
    use crate::html::HtmlSession;
    use crate::models::NOT_AVAILABLE;
    use crate::pagination::Paginator;
    use crate::test_utils::{day, german_date, order_box, HistoryFixture};

    fn credentials() -> Credentials {
        Credentials::new("kunde@example.de", Some("geheim".into()))
    }

    fn sign_in_page(submit_target: &str) -> String {
        format!(
            r#"<html><body><form>
                <input id="ap_email" type="email">
                <input id="ap_password" type="password">
                <input name="rememberMe" type="checkbox">
                <a id="signInSubmit" href="{}">Anmelden</a>
            </form></body></html>"#,
            submit_target
        )
    }

    #[test]
    fn test_sign_in() {
        let mut session = HtmlSession::new()
            .with_page(ORDERS_URL, sign_in_page("https://www.amazon.de/fixup"))
            .with_page(
                "https://www.amazon.de/fixup",
                r#"<html><body><a id="ap-account-fixup-phone-skip-link" href="https://www.amazon.de/orders">Später</a></body></html>"#,
            );

        sign_in(&mut session, &credentials(), DEFAULT_TIMEOUT).unwrap();

        assert_eq!(
            session.typed(),
            &[
                ("ap_email".to_string(), "kunde@example.de".to_string()),
                ("ap_password".to_string(), "geheim".to_string()),
            ]
        );
        // The phone prompt was skipped
        assert_eq!(
            session.current_url().unwrap(),
            "https://www.amazon.de/orders"
        );
        assert!(!session.is_closed());
    }

    #[test]
    fn test_sign_in_failure_ends_session() {
        let mut session = HtmlSession::new().with_page(ORDERS_URL, sign_in_page(SIGNIN_URL));

        let result = sign_in(&mut session, &credentials(), DEFAULT_TIMEOUT);
        assert!(matches!(result, Err(Error::Authentication(_))));
        assert!(session.is_closed());
    }

    #[test]
    fn test_sign_in_without_password() {
        let mut session = HtmlSession::new();
        let result = sign_in(
            &mut session,
            &Credentials::new("kunde@example.de", None),
            DEFAULT_TIMEOUT,
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert!(session.visited().is_empty());
    }

    #[test]
    fn test_order_fragments() {
        let fixture = HistoryFixture::new().with_filter(2, vec![vec![("A1", day(2024, 3, 2))]]);
        let mut session = fixture.session();
        let mut history = OrderHistory::new(&mut session);

        assert!(history.select_filter(2));
        assert!(history.orders_available());
        let fragments = history.page_fragments();
        assert_eq!(fragments.len(), 1);

        let fragment = &fragments[0];
        assert_eq!(
            fragment.info,
            vec![german_date(day(2024, 3, 2)), "EUR 10,00".to_string(), "A1".to_string()]
        );
        assert_eq!(
            fragment.details_link.as_deref(),
            Some("https://shop.test/details/A1")
        );
        assert_eq!(fragment.items.len(), 1);
        assert_eq!(fragment.items[0].title.as_deref(), Some("Artikel A1"));
        assert_eq!(
            fragment.items[0].link.as_deref(),
            Some("https://shop.test/dp/A1")
        );
        assert_eq!(fragment.items[0].price.as_deref(), Some("EUR 10,00"));
        assert!(fragment.items[0].text.contains("Verkauf durch: Händler"));
    }

    #[test]
    fn test_missing_filter_and_empty_filter() {
        let fixture = HistoryFixture::new()
            .with_filter(2, vec![vec![("A1", day(2024, 3, 2))]])
            .with_empty_filter(3);
        let mut session = fixture.session();
        let mut history = OrderHistory::new(&mut session);

        assert!(!history.select_filter(4));
        assert!(history.select_filter(3));
        assert!(!history.orders_available());
    }

    #[test]
    fn test_pagination_controls() {
        let fixture = HistoryFixture::new().with_filter(
            2,
            vec![
                vec![("A1", day(2024, 3, 2))],
                vec![("B2", day(2024, 2, 2))],
            ],
        );
        let mut session = fixture.session();
        let mut history = OrderHistory::new(&mut session);

        assert!(history.select_filter(2));
        assert!(history.has_next_page());
        assert!(history.go_to_next_page());
        assert_eq!(history.page_fragments()[0].info[2], "B2");
        // Last page: next control disabled
        assert!(!history.has_next_page());
        assert!(!history.go_to_next_page());
    }

    #[test]
    fn test_single_page_has_no_pagination() {
        let fixture = HistoryFixture::new().with_filter(2, vec![vec![("A1", day(2024, 3, 2))]]);
        let mut session = fixture.session();
        let mut history = OrderHistory::new(&mut session);
        assert!(history.select_filter(2));
        assert!(!history.has_next_page());
    }

    #[test]
    fn test_details_price_from_details_page() {
        let mut session = HtmlSession::new()
            .with_page("https://shop.test/orders", "<html><body></body></html>")
            .with_page(
                "https://shop.test/details/302-1",
                r#"<html><body><div class="od-shipments">
                    <span class="a-color-price">EUR 4,99</span>
                    <span class="a-color-price">EUR 1.024,00</span>
                </div></body></html>"#,
            );
        session.navigate("https://shop.test/orders").unwrap();
        let mut history = OrderHistory::new(&mut session);

        assert_eq!(
            history.details_price("https://shop.test/details/302-1", 1).unwrap(),
            1024.0
        );
        assert!(matches!(
            history.details_price("https://shop.test/details/302-1", 2),
            Err(Error::ElementNotFound(_))
        ));
        // Missing page: tab still released
        assert!(history
            .details_price("https://shop.test/details/unknown", 0)
            .is_err());
        drop(history);
        assert_eq!(session.tab_count(), 1);
        assert_eq!(session.current_url().unwrap(), "https://shop.test/orders");
    }

    #[test]
    fn test_item_categories() {
        let mut session = HtmlSession::new()
            .with_page("https://shop.test/orders", "<html><body></body></html>")
            .with_page(
                "https://shop.test/dp/buch",
                r#"<html><body><div id="wayfinding-breadcrumbs_container"><ul>
                    <li><span class="a-list-item">Bücher</span></li>
                    <li><span class="a-list-item">›</span></li>
                    <li><span class="a-list-item">Krimis &amp; Thriller</span></li>
                </ul></div></body></html>"#,
            )
            .with_page(
                "https://shop.test/video",
                r#"<html><body><div class="dv-dp-node-meta-info">
                    <p>Genres Drama, Komödie</p><p>Regie Jemand</p>
                </div></body></html>"#,
            );
        session.navigate("https://shop.test/orders").unwrap();
        let mut history = OrderHistory::new(&mut session);

        let books = history.item_categories("https://shop.test/dp/buch").unwrap();
        assert_eq!(books[&1], "Bücher");
        assert_eq!(books[&2], "Krimis & Thriller");
        assert_eq!(books.len(), 2);

        let video = history.item_categories("https://shop.test/video").unwrap();
        assert_eq!(video[&0], "Drama");
        assert_eq!(video[&1], "Komödie");
        assert_eq!(video[&2], "movie");

        assert!(history
            .item_categories("https://shop.test/nothing")
            .unwrap()
            .is_empty());
        drop(history);
        assert_eq!(session.tab_count(), 1);
    }

    #[test]
    fn test_unreachable_product_page_keeps_order_list_focused() {
        let today = day(2024, 5, 17);
        let fixture = HistoryFixture::new().with_filter(
            2,
            vec![
                vec![("A1", day(2024, 3, 2))],
                vec![("B2", day(2024, 2, 2))],
            ],
        );
        let mut session = fixture
            .session()
            .with_unreachable("https://shop.test/dp/A1");
        let mut history = OrderHistory::new(&mut session);

        let result = Paginator::new(
            &mut history,
            Normalizer::new(true),
            day(2024, 1, 1),
            today,
            today,
        )
        .run();

        let ids: Vec<_> = result.orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "B2"]);
        assert!(result.orders[0].items[0].categories.is_empty());
        assert_eq!(result.stats.pages_scraped, 2);
        drop(history);
        assert_eq!(session.tab_count(), 1);
    }

    #[test]
    fn test_normalize_page_with_details_fallback() {
        let body = order_box("A1", day(2024, 3, 2)).replace(
            r#"<span class="a-color-price">EUR 10,00</span>"#,
            "",
        );
        let mut session = HtmlSession::new()
            .with_page(
                "https://shop.test/orders",
                format!("<html><body>{}</body></html>", body),
            )
            .with_page(
                "https://shop.test/details/A1",
                r#"<html><body><div class="od-shipments"><span class="a-color-price">EUR 7,50</span></div></body></html>"#,
            );
        session.navigate("https://shop.test/orders").unwrap();
        let mut history = OrderHistory::new(&mut session);

        let fragments = history.page_fragments();
        let order = Normalizer::default()
            .normalize(&fragments[0], &mut history)
            .unwrap();
        assert_eq!(order.items[0].price, 7.5);
        assert_eq!(order.items[0].seller, "Händler");
        assert_ne!(order.items[0].link, NOT_AVAILABLE);
    }
}
