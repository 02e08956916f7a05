//! Offline page source over stored HTML pages
//!
//! `HtmlSession` serves pages from an in-memory url → markup map and
//! behaves like a very small browser: clicking an element with an `href`
//! follows the link, tabs are a stack on top of the primary tab, and
//! unknown urls load an empty page. Urls marked as unreachable fail to
//! load like a dropped connection would. It is used to replay captured order
//! pages and to exercise the site logic in tests.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{Error, Result};
use crate::page::{Element, Locator, PageSource};

/// Url of a freshly opened tab
const BLANK_URL: &str = "about:blank";

/// Tags that start a new line in rendered text
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "br", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ol", "p",
    "section", "table", "tr", "ul",
];

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            debug!("Invalid selector {}: {:?}", css, e);
            None
        }
    }
}

/// An element of a stored page
///
/// Holds the document and the element's position in it, so it stays valid
/// independently of the session's current page.
#[derive(Clone)]
pub struct HtmlElement {
    doc: Rc<Html>,
    path: Vec<usize>,
}

impl HtmlElement {
    fn root(doc: &Rc<Html>) -> Self {
        Self {
            doc: Rc::clone(doc),
            path: Vec::new(),
        }
    }

    fn from_ref(doc: &Rc<Html>, element: ElementRef<'_>) -> Self {
        let root = *doc.root_element();
        let mut path = Vec::new();
        let mut node = *element;
        while node.id() != root.id() {
            path.push(
                node.prev_siblings()
                    .filter(|sibling| sibling.value().is_element())
                    .count(),
            );
            match node.parent() {
                Some(parent) => node = parent,
                None => break,
            }
        }
        path.reverse();
        Self {
            doc: Rc::clone(doc),
            path,
        }
    }

    fn resolve(&self) -> Option<ElementRef<'_>> {
        let mut current = self.doc.root_element();
        for &idx in &self.path {
            current = current.children().filter_map(ElementRef::wrap).nth(idx)?;
        }
        Some(current)
    }

    fn select(&self, css: &str) -> Vec<HtmlElement> {
        let (Some(scope), Some(sel)) = (self.resolve(), selector(css)) else {
            return Vec::new();
        };
        scope
            .select(&sel)
            .filter(|found| found.id() != scope.id())
            .map(|found| HtmlElement::from_ref(&self.doc, found))
            .collect()
    }
}

impl Element for HtmlElement {
    fn text(&self) -> String {
        self.resolve().map(render_text).unwrap_or_default()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.resolve()
            .and_then(|el| el.value().attr(name).map(str::to_string))
    }

    fn find_by_class(&self, class: &str) -> Option<Self> {
        self.select(&Locator::class(class).css()).into_iter().next()
    }

    fn find_all_by_class(&self, class: &str) -> Vec<Self> {
        self.select(&Locator::class(class).css())
    }

    fn find_by_tag(&self, tag: &str) -> Option<Self> {
        self.select(tag).into_iter().next()
    }
}

/// Text of an element roughly as a browser renders it: inline content on
/// one line, block elements on their own lines.
fn render_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(element, &mut raw);
    raw.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let flat: String = text
                .chars()
                .map(|c| if c.is_whitespace() { ' ' } else { c })
                .collect();
            out.push_str(&flat);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let block = BLOCK_TAGS.contains(&child_el.value().name());
            if block {
                out.push('\n');
            }
            push_text(child_el, out);
            if block {
                out.push('\n');
            }
        }
    }
}

struct Tab {
    url: String,
    doc: Rc<Html>,
}

/// Browser stand-in over stored pages
#[derive(Default)]
pub struct HtmlSession {
    pages: HashMap<String, String>,
    unreachable: HashSet<String>,
    tabs: Vec<Tab>,
    visited: Vec<String>,
    typed: Vec<(String, String)>,
    closed: bool,
}

impl HtmlSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the markup served for `url`
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.add_page(url, html);
        self
    }

    pub fn add_page(&mut self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.insert(url.into(), html.into());
    }

    /// Make loading `url` fail
    pub fn with_unreachable(mut self, url: impl Into<String>) -> Self {
        self.unreachable.insert(url.into());
        self
    }

    /// Every url loaded so far, in order, including auxiliary tabs
    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    /// Text typed into elements as `(element id, text)`
    pub fn typed(&self) -> &[(String, String)] {
        &self.typed
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of open tabs including the primary one
    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    fn load(&mut self, url: &str) -> Result<Tab> {
        self.visited.push(url.to_string());
        if self.unreachable.contains(url) {
            return Err(Error::Browser(format!("Could not load {}", url)));
        }
        let doc = match self.pages.get(url) {
            Some(markup) => Html::parse_document(markup),
            None => {
                debug!("No stored page for {}, loading empty page", url);
                Html::parse_document("")
            }
        };
        Ok(Tab {
            url: url.to_string(),
            doc: Rc::new(doc),
        })
    }

    fn current(&self) -> Option<&Tab> {
        self.tabs.last()
    }

    fn current_root(&self) -> Option<HtmlElement> {
        self.current().map(|tab| HtmlElement::root(&tab.doc))
    }
}

impl PageSource for HtmlSession {
    type Element = HtmlElement;

    fn navigate(&mut self, url: &str) -> Result<()> {
        let tab = self.load(url)?;
        match self.tabs.last_mut() {
            Some(current) => *current = tab,
            None => self.tabs.push(tab),
        }
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        self.current()
            .map(|tab| tab.url.clone())
            .ok_or_else(|| Error::Browser("No page loaded".into()))
    }

    fn page_source(&self) -> Result<String> {
        self.current()
            .map(|tab| tab.doc.html())
            .ok_or_else(|| Error::Browser("No page loaded".into()))
    }

    fn find(&self, locator: &Locator) -> Option<HtmlElement> {
        self.find_all(locator).into_iter().next()
    }

    fn find_all(&self, locator: &Locator) -> Vec<HtmlElement> {
        self.current_root()
            .map(|root| root.select(&locator.css()))
            .unwrap_or_default()
    }

    fn wait_for(&self, locator: &Locator, _timeout: Duration) -> bool {
        // Stored pages are complete, presence is known immediately
        self.find(locator).is_some()
    }

    fn click(&mut self, element: &HtmlElement) -> Result<()> {
        if let Some(href) = element.attr("href") {
            self.navigate(&href)?;
        }
        Ok(())
    }

    fn send_keys(&mut self, element: &HtmlElement, text: &str) -> Result<()> {
        let target = element.attr("id").unwrap_or_default();
        self.typed.push((target, text.to_string()));
        Ok(())
    }

    fn open_tab(&mut self) -> Result<()> {
        if self.tabs.is_empty() {
            return Err(Error::Browser("No primary tab to open a tab from".into()));
        }
        self.tabs.push(Tab {
            url: BLANK_URL.to_string(),
            doc: Rc::new(Html::parse_document("")),
        });
        Ok(())
    }

    fn close_tab(&mut self) -> Result<()> {
        if self.tabs.len() < 2 {
            return Err(Error::Browser("No auxiliary tab open".into()));
        }
        self.tabs.pop();
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        self.tabs.clear();
        self.closed = true;
        Ok(())
    }
}
