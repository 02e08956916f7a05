//! Scraper configuration
//!
//! Resolution order, later wins:
//! 1. Built-in defaults
//! 2. TOML file (`--config`, else `~/.local/share/haul/config.toml` if present)
//! 3. Environment (`HAUL_PASSWORD`, `HAUL_WEBDRIVER_URL`)
//! 4. Command-line flags (applied by the frontend)
//!
//! Example file:
//!
//! ```toml
//! [account]
//! email = "kunde@example.de"
//!
//! [scrape]
//! start_year = 2015
//! extensive = true
//! timeout_secs = 5
//!
//! [browser]
//! webdriver_url = "http://localhost:4444"
//! headless = true
//!
//! [store]
//! file = "/home/kunde/orders.json"
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ScrapeRange, EARLIEST_ORDER_YEAR};
use crate::page::DEFAULT_TIMEOUT;
use crate::store::DEFAULT_ORDERS_FILE;

pub const PASSWORD_ENV: &str = "HAUL_PASSWORD";
pub const WEBDRIVER_URL_ENV: &str = "HAUL_WEBDRIVER_URL";

/// geckodriver's default address
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Account used to sign in
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    password: Option<String>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: Option<String>) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }

    /// The password; missing is a configuration error
    pub fn password(&self) -> Result<&str> {
        self.password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::Configuration("Password not given".into()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.email.is_empty() {
            return Err(Error::Configuration("No e-mail provided".into()));
        }
        if !self.email.contains('@') || !self.email.contains('.') {
            return Err(Error::Configuration(format!(
                "Incorrect e-mail layout: {}",
                self.email
            )));
        }
        self.password()?;
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Resolved settings for a scrape run
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub email: Option<String>,
    pub password: Option<String>,
    pub start_year: i32,
    /// `None` means the current year
    pub end_year: Option<i32>,
    pub headless: bool,
    pub extensive: bool,
    pub webdriver_url: String,
    /// How long to wait for elements to appear
    pub timeout: Duration,
    pub orders_file: PathBuf,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            start_year: EARLIEST_ORDER_YEAR,
            end_year: None,
            headless: false,
            extensive: false,
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            orders_file: PathBuf::from(DEFAULT_ORDERS_FILE),
        }
    }
}

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("haul").join("config.toml"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    account: Option<RawAccount>,
    scrape: Option<RawScrape>,
    browser: Option<RawBrowser>,
    store: Option<RawStore>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAccount {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScrape {
    start_year: Option<i32>,
    end_year: Option<i32>,
    extensive: Option<bool>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBrowser {
    webdriver_url: Option<String>,
    headless: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStore {
    file: Option<PathBuf>,
}

impl ScraperConfig {
    /// Load from `path`, else from the default location if it exists, else
    /// defaults. An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => Some(fs::read_to_string(path).map_err(|e| {
                Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
            })?),
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => {
                    debug!("Using config {}", default_path.display());
                    Some(fs::read_to_string(&default_path)?)
                }
                _ => None,
            },
        };

        match content {
            Some(content) => Self::from_toml(&content),
            None => Ok(Self::default()),
        }
    }

    /// Defaults overridden by the values present in `content`
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let mut config = Self::default();

        if let Some(account) = raw.account {
            if let Some(email) = account.email {
                config.email = Some(email);
            }
        }

        if let Some(scrape) = raw.scrape {
            if let Some(start) = scrape.start_year {
                config.start_year = start;
            }
            if let Some(end) = scrape.end_year {
                config.end_year = Some(end);
            }
            if let Some(extensive) = scrape.extensive {
                config.extensive = extensive;
            }
            if let Some(secs) = scrape.timeout_secs {
                config.timeout = Duration::from_secs(secs);
            }
        }

        if let Some(browser) = raw.browser {
            if let Some(url) = browser.webdriver_url {
                config.webdriver_url = url;
            }
            if let Some(headless) = browser.headless {
                config.headless = headless;
            }
        }

        if let Some(store) = raw.store {
            if let Some(file) = store.file {
                config.orders_file = file;
            }
        }

        Ok(config)
    }

    /// Apply environment overrides from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(password) = lookup(PASSWORD_ENV).filter(|p| !p.is_empty()) {
            self.password = Some(password);
        }
        if let Some(url) = lookup(WEBDRIVER_URL_ENV).filter(|u| !u.is_empty()) {
            self.webdriver_url = url;
        }
        self
    }

    /// Validated sign-in credentials
    pub fn credentials(&self) -> Result<Credentials> {
        let email = self
            .email
            .clone()
            .ok_or_else(|| Error::Configuration("No e-mail provided".into()))?;
        let credentials = Credentials::new(email, self.password.clone());
        credentials.validate()?;
        Ok(credentials)
    }

    /// The requested scrape window relative to `today`
    pub fn range(&self, today: NaiveDate) -> Result<ScrapeRange> {
        ScrapeRange::from_years(
            self.start_year,
            self.end_year.unwrap_or_else(|| today.year()),
            today,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::day;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ScraperConfig::default();
        assert_eq!(config.start_year, 2010);
        assert_eq!(config.end_year, None);
        assert_eq!(config.webdriver_url, DEFAULT_WEBDRIVER_URL);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.orders_file, PathBuf::from("orders.json"));

        let range = config.range(day(2024, 5, 17)).unwrap();
        assert!(!range.is_custom());
    }

    #[test]
    fn test_from_toml_overrides_only_given_values() {
        let config = ScraperConfig::from_toml(
            r#"
            [account]
            email = "kunde@example.de"

            [scrape]
            start_year = 2015
            timeout_secs = 10

            [browser]
            headless = true
            "#,
        )
        .unwrap();

        assert_eq!(config.email.as_deref(), Some("kunde@example.de"));
        assert_eq!(config.start_year, 2015);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.headless);
        assert!(!config.extensive);
        assert_eq!(config.webdriver_url, DEFAULT_WEBDRIVER_URL);
        assert!(config.range(day(2024, 5, 17)).unwrap().is_custom());
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        assert!(matches!(
            ScraperConfig::from_toml("[scrape]\npassword = \"x\""),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            (PASSWORD_ENV, "geheim"),
            (WEBDRIVER_URL_ENV, "http://127.0.0.1:9515"),
        ]
        .into_iter()
        .collect();

        let config = ScraperConfig::from_toml("[browser]\nwebdriver_url = \"http://file:4444\"")
            .unwrap()
            .apply_env_with(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.password.as_deref(), Some("geheim"));
        assert_eq!(config.webdriver_url, "http://127.0.0.1:9515");
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[store]\nfile = \"/tmp/bestellungen.json\"").unwrap();

        let config = ScraperConfig::load(Some(&path)).unwrap();
        assert_eq!(config.orders_file, PathBuf::from("/tmp/bestellungen.json"));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            ScraperConfig::load(Some(&missing)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_credentials_validation() {
        let mut config = ScraperConfig::default();
        assert!(matches!(config.credentials(), Err(Error::Configuration(_))));

        config.email = Some("kunde-at-example".into());
        config.password = Some("geheim".into());
        assert!(matches!(config.credentials(), Err(Error::Configuration(_))));

        config.email = Some("kunde@example.de".into());
        config.password = None;
        assert!(matches!(config.credentials(), Err(Error::Configuration(_))));

        config.password = Some("geheim".into());
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.password().unwrap(), "geheim");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials::new("kunde@example.de", Some("geheim".into()));
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("kunde@example.de"));
        assert!(!debug.contains("geheim"));
    }

    #[test]
    fn test_invalid_year_range() {
        let config = ScraperConfig {
            start_year: 2020,
            end_year: Some(2018),
            ..Default::default()
        };
        assert!(matches!(
            config.range(day(2024, 5, 17)),
            Err(Error::Configuration(_))
        ));
    }
}
