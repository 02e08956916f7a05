//! Error types for haul

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid email, password or date range. Raised before any
    /// page is fetched.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Sign-in did not leave the login page
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Expected page structure was absent. Recovered locally by the scraper.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Malformed date or price string
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
