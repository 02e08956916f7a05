//! A complete scrape run: sign in, reconcile, save, release the browser

use std::time::Duration;

use tracing::{info, warn};

use crate::config::{Credentials, ScraperConfig};
use crate::error::{Error, Result};
use crate::fragment::Normalizer;
use crate::models::ScrapeRange;
use crate::page::{PageSource, DEFAULT_TIMEOUT};
use crate::progress::ProgressObserver;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::site::{sign_in, OrderHistory};
use crate::store::OrderStore;

#[derive(Debug, Clone, Copy)]
pub struct ScrapeOptions {
    pub timeout: Duration,
    /// Fetch item categories from product pages
    pub extensive: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            extensive: false,
        }
    }
}

impl From<&ScraperConfig> for ScrapeOptions {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            timeout: config.timeout,
            extensive: config.extensive,
        }
    }
}

/// Scrape `range` into `store`
///
/// The session is ended when this returns, whatever the outcome.
pub fn run_scrape<P: PageSource>(
    source: &mut P,
    credentials: &Credentials,
    range: &ScrapeRange,
    store: &OrderStore,
    options: ScrapeOptions,
    observer: Option<&mut dyn ProgressObserver>,
) -> Result<ReconcileReport> {
    let result = scrape(source, credentials, range, store, options, observer);

    // A failed sign-in already ended the session
    if !matches!(result, Err(Error::Authentication(_))) {
        if let Err(e) = source.quit() {
            warn!("Failed to end browser session: {}", e);
        }
    }
    result
}

fn scrape<P: PageSource>(
    source: &mut P,
    credentials: &Credentials,
    range: &ScrapeRange,
    store: &OrderStore,
    options: ScrapeOptions,
    observer: Option<&mut dyn ProgressObserver>,
) -> Result<ReconcileReport> {
    credentials.validate()?;
    sign_in(source, credentials, options.timeout)?;

    let mut history = OrderHistory::with_timeout(source, options.timeout);
    let report = Reconciler::new(Normalizer::new(options.extensive))
        .with_observer(observer)
        .run(store, range, &mut history)?;

    info!(
        orders = report.orders.len(),
        added = report.added,
        file = %store.path().display(),
        "Scrape finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::HtmlSession;
    use crate::reconcile::Strategy;
    use crate::test_utils::{day, order, HistoryFixture};
    use tempfile::TempDir;

    fn credentials() -> Credentials {
        Credentials::new("kunde@example.de", Some("geheim".into()))
    }

    #[test]
    fn test_run_scrape() {
        let dir = TempDir::new().unwrap();
        let store = OrderStore::new(dir.path().join("orders.json"));
        let today = day(2024, 5, 17);
        let mut session = HistoryFixture::new()
            .with_sign_in(true)
            .with_filter(2, vec![vec![("B2", day(2024, 2, 1))]])
            .with_filter(3, vec![vec![("A1", day(2023, 6, 1))]])
            .session();
        let mut progress = Vec::new();
        let mut observer = |fraction: f64| progress.push(fraction);

        let report = run_scrape(
            &mut session,
            &credentials(),
            &ScrapeRange::full_history(today),
            &store,
            ScrapeOptions::default(),
            Some(&mut observer),
        )
        .unwrap();

        assert_eq!(report.strategy, Strategy::Full);
        assert_eq!(
            report.orders,
            vec![order("A1", day(2023, 6, 1)), order("B2", day(2024, 2, 1))]
        );
        assert_eq!(store.load().unwrap(), report.orders);
        assert!(session.is_closed());
        assert_eq!(progress.len(), 2);
    }

    #[test]
    fn test_rejected_credentials() {
        let dir = TempDir::new().unwrap();
        let store = OrderStore::new(dir.path().join("orders.json"));
        let mut session = HistoryFixture::new()
            .with_sign_in(false)
            .with_filter(2, vec![vec![("B2", day(2024, 2, 1))]])
            .session();

        let result = run_scrape(
            &mut session,
            &credentials(),
            &ScrapeRange::full_history(day(2024, 5, 17)),
            &store,
            ScrapeOptions::default(),
            None,
        );

        assert!(matches!(result, Err(Error::Authentication(_))));
        assert!(session.is_closed());
        assert!(!store.exists());
    }

    #[test]
    fn test_invalid_credentials_fail_before_browsing() {
        let dir = TempDir::new().unwrap();
        let store = OrderStore::new(dir.path().join("orders.json"));
        let mut session = HistoryFixture::new().with_sign_in(true).session();

        let result = run_scrape(
            &mut session,
            &Credentials::new("kunde@example.de", None),
            &ScrapeRange::full_history(day(2024, 5, 17)),
            &store,
            ScrapeOptions::default(),
            None,
        );

        assert!(matches!(result, Err(Error::Configuration(_))));
        assert!(session.visited().is_empty());
        assert!(session.is_closed());
    }
}
