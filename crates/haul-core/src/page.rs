//! Browser capability interface
//!
//! The scraper only needs a handful of things from a browser session:
//! looking up elements by id or class (optionally waiting for them),
//! reading text and attributes, clicking, typing, navigating, and opening a
//! secondary tab for detail pages. [`PageSource`] captures exactly that so
//! the site logic can run against a live WebDriver session or against saved
//! HTML pages.
//!
//! Lookups never fail: absence is reported as `None`/`false` and the caller
//! decides what a missing element means.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Default time to wait for an element to appear
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// How to look up an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    Class(String),
    /// Form fields by their `name` attribute
    Name(String),
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Equivalent CSS selector
    pub fn css(&self) -> String {
        match self {
            Self::Id(id) => format!("#{}", id),
            Self::Class(class) => format!(".{}", class),
            Self::Name(name) => format!("[name=\"{}\"]", name),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id '{}'", id),
            Self::Class(class) => write!(f, "class '{}'", class),
            Self::Name(name) => write!(f, "name '{}'", name),
        }
    }
}

/// An element of the current page
///
/// Searches only look at descendants of the element.
pub trait Element: Clone {
    /// Rendered text, one line per block of text
    fn text(&self) -> String;

    fn attr(&self, name: &str) -> Option<String>;

    fn find_by_class(&self, class: &str) -> Option<Self>;

    fn find_all_by_class(&self, class: &str) -> Vec<Self>;

    fn find_by_tag(&self, tag: &str) -> Option<Self>;
}

/// A single browser session with one primary tab and at most one
/// auxiliary tab at a time
pub trait PageSource {
    type Element: Element;

    fn navigate(&mut self, url: &str) -> Result<()>;

    fn current_url(&self) -> Result<String>;

    /// Full markup of the current page
    fn page_source(&self) -> Result<String>;

    /// First element of the current page matching `locator`
    fn find(&self, locator: &Locator) -> Option<Self::Element>;

    fn find_all(&self, locator: &Locator) -> Vec<Self::Element>;

    /// Wait up to `timeout` for an element to be present
    fn wait_for(&self, locator: &Locator, timeout: Duration) -> bool;

    fn click(&mut self, element: &Self::Element) -> Result<()>;

    fn send_keys(&mut self, element: &Self::Element, text: &str) -> Result<()>;

    /// Open a new empty tab and focus it. On error the primary tab keeps
    /// the focus.
    fn open_tab(&mut self) -> Result<()>;

    /// Close the focused auxiliary tab and focus the primary tab again
    fn close_tab(&mut self) -> Result<()>;

    /// End the session
    fn quit(&mut self) -> Result<()>;

    fn find_by_id(&self, id: &str) -> Option<Self::Element> {
        self.find(&Locator::id(id))
    }

    fn find_by_class(&self, class: &str) -> Option<Self::Element> {
        self.find(&Locator::class(class))
    }

    fn find_all_by_class(&self, class: &str) -> Vec<Self::Element> {
        self.find_all(&Locator::class(class))
    }

    /// [`wait_for`](Self::wait_for) with a warning when the element never shows up
    fn wait_or_warn(&self, locator: &Locator, timeout: Duration) -> bool {
        let found = self.wait_for(locator, timeout);
        if !found {
            warn!(
                "Skipping, loading {} took too much time (>{:?})",
                locator, timeout
            );
        }
        found
    }
}

/// An auxiliary tab that is closed again when the guard goes out of scope
///
/// While the guard lives, the page source is focused on the auxiliary tab
/// and is reachable through `Deref`. Dropping the guard closes the tab and
/// returns focus to the primary tab, also on early return or when `url`
/// fails to load.
pub struct AuxTab<'a, P: PageSource> {
    source: &'a mut P,
}

impl<'a, P: PageSource> AuxTab<'a, P> {
    pub fn open(source: &'a mut P, url: &str) -> Result<Self> {
        source.open_tab()?;
        let mut tab = Self { source };
        tab.source.navigate(url)?;
        Ok(tab)
    }
}

impl<P: PageSource> Deref for AuxTab<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.source
    }
}

impl<P: PageSource> DerefMut for AuxTab<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.source
    }
}

impl<P: PageSource> Drop for AuxTab<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.source.close_tab() {
            warn!("Failed to close auxiliary tab: {}", e);
        }
    }
}
