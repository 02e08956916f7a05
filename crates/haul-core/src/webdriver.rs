//! Live browser backend over a W3C WebDriver server
//!
//! Talks to geckodriver through `fantoccini`. The client is async; the
//! session owns a current-thread runtime and blocks on every command, which
//! matches the strictly sequential way the site is scraped.

use std::rc::Rc;
use std::time::Duration;

use fantoccini::elements::Element as RemoteElement;
use fantoccini::wd::WindowHandle;
use fantoccini::{Client, ClientBuilder, Locator as RemoteLocator};
use serde_json::json;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::page::{Element, Locator, PageSource};

fn browser_err(e: impl std::fmt::Display) -> Error {
    Error::Browser(e.to_string())
}

/// Firefox capabilities; multi-process tabs are disabled since they break
/// switching between windows
fn firefox_capabilities(headless: bool) -> serde_json::Map<String, serde_json::Value> {
    let args: Vec<&str> = if headless { vec!["-headless"] } else { Vec::new() };
    let mut caps = serde_json::Map::new();
    caps.insert("browserName".into(), json!("firefox"));
    caps.insert(
        "moz:firefoxOptions".into(),
        json!({
            "args": args,
            "prefs": {
                "browser.tabs.remote.autostart": false,
                "browser.tabs.remote.autostart.1": false,
                "browser.tabs.remote.autostart.2": false,
            }
        }),
    );
    caps
}

/// An element of the live page
#[derive(Clone)]
pub struct WebElement {
    inner: RemoteElement,
    rt: Rc<Runtime>,
}

impl WebElement {
    fn wrap(&self, inner: RemoteElement) -> Self {
        Self {
            inner,
            rt: Rc::clone(&self.rt),
        }
    }
}

impl Element for WebElement {
    fn text(&self) -> String {
        self.rt.block_on(self.inner.text()).unwrap_or_default()
    }

    fn attr(&self, name: &str) -> Option<String> {
        // Properties resolve links to absolute urls
        self.rt
            .block_on(self.inner.prop(name))
            .ok()
            .flatten()
            .or_else(|| self.rt.block_on(self.inner.attr(name)).ok().flatten())
    }

    fn find_by_class(&self, class: &str) -> Option<Self> {
        let css = Locator::class(class).css();
        self.rt
            .block_on(self.inner.find(RemoteLocator::Css(&css)))
            .ok()
            .map(|found| self.wrap(found))
    }

    fn find_all_by_class(&self, class: &str) -> Vec<Self> {
        let css = Locator::class(class).css();
        self.rt
            .block_on(self.inner.find_all(RemoteLocator::Css(&css)))
            .map(|found| found.into_iter().map(|el| self.wrap(el)).collect())
            .unwrap_or_default()
    }

    fn find_by_tag(&self, tag: &str) -> Option<Self> {
        self.rt
            .block_on(self.inner.find(RemoteLocator::Css(tag)))
            .ok()
            .map(|found| self.wrap(found))
    }
}

/// A Firefox session driven through geckodriver
pub struct WebDriverSession {
    client: Client,
    rt: Rc<Runtime>,
    primary: Option<WindowHandle>,
}

impl WebDriverSession {
    /// Start a browser through the WebDriver server at `url`
    pub fn connect(url: &str, headless: bool) -> Result<Self> {
        let rt = Builder::new_current_thread().enable_all().build()?;
        if headless {
            info!("Run in headless mode");
        }
        let client = rt
            .block_on(
                ClientBuilder::native()
                    .capabilities(firefox_capabilities(headless))
                    .connect(url),
            )
            .map_err(|e| Error::Browser(format!("Could not start browser via {}: {}", url, e)))?;
        debug!(url, "WebDriver session started");

        Ok(Self {
            client,
            rt: Rc::new(rt),
            primary: None,
        })
    }

    fn wrap(&self, inner: RemoteElement) -> WebElement {
        WebElement {
            inner,
            rt: Rc::clone(&self.rt),
        }
    }
}

impl PageSource for WebDriverSession {
    type Element = WebElement;

    fn navigate(&mut self, url: &str) -> Result<()> {
        self.rt.block_on(self.client.goto(url)).map_err(browser_err)
    }

    fn current_url(&self) -> Result<String> {
        self.rt
            .block_on(self.client.current_url())
            .map(|url| url.to_string())
            .map_err(browser_err)
    }

    fn page_source(&self) -> Result<String> {
        self.rt.block_on(self.client.source()).map_err(browser_err)
    }

    fn find(&self, locator: &Locator) -> Option<WebElement> {
        let css = locator.css();
        self.rt
            .block_on(self.client.find(RemoteLocator::Css(&css)))
            .ok()
            .map(|el| self.wrap(el))
    }

    fn find_all(&self, locator: &Locator) -> Vec<WebElement> {
        let css = locator.css();
        self.rt
            .block_on(self.client.find_all(RemoteLocator::Css(&css)))
            .map(|found| found.into_iter().map(|el| self.wrap(el)).collect())
            .unwrap_or_default()
    }

    fn wait_for(&self, locator: &Locator, timeout: Duration) -> bool {
        let css = locator.css();
        self.rt
            .block_on(
                self.client
                    .wait()
                    .at_most(timeout)
                    .for_element(RemoteLocator::Css(&css)),
            )
            .is_ok()
    }

    fn click(&mut self, element: &WebElement) -> Result<()> {
        self.rt.block_on(element.inner.click()).map_err(browser_err)
    }

    fn send_keys(&mut self, element: &WebElement, text: &str) -> Result<()> {
        self.rt
            .block_on(element.inner.send_keys(text))
            .map_err(browser_err)
    }

    fn open_tab(&mut self) -> Result<()> {
        let primary = self.rt.block_on(self.client.window()).map_err(browser_err)?;
        let tab = self
            .rt
            .block_on(self.client.new_window(true))
            .map_err(browser_err)?;
        // Focus only moves once the switch succeeded
        self.rt
            .block_on(self.client.switch_to_window(tab.handle))
            .map_err(browser_err)?;
        self.primary = Some(primary);
        Ok(())
    }

    fn close_tab(&mut self) -> Result<()> {
        let primary = self
            .primary
            .take()
            .ok_or_else(|| Error::Browser("No auxiliary tab open".into()))?;
        self.rt
            .block_on(self.client.close_window())
            .map_err(browser_err)?;
        self.rt
            .block_on(self.client.switch_to_window(primary))
            .map_err(browser_err)
    }

    fn quit(&mut self) -> Result<()> {
        debug!("Ending WebDriver session");
        self.rt
            .block_on(self.client.clone().close())
            .map_err(browser_err)
    }
}
