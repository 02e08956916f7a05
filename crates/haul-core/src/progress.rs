//! Progress estimation and reporting
//!
//! Scraping walks backward in time from the end of the requested range to
//! the cutoff, so the fraction done is the share of that span already
//! passed. Frontends implement [`ProgressObserver`] (or pass a closure) to
//! surface it.

use chrono::NaiveDate;

use crate::dates::elapsed_days;

/// Receives progress notifications from the scraping thread.
///
/// Called synchronously after every parsed order; implementations must
/// return quickly since they stall scraping.
pub trait ProgressObserver {
    fn on_progress(&mut self, fraction: f64);
}

impl<F> ProgressObserver for F
where
    F: FnMut(f64),
{
    fn on_progress(&mut self, fraction: f64) {
        self(fraction)
    }
}

/// Fraction of `[start, end]` already processed when scraping has reached
/// `current`, clamped to `[0, 1]`.
///
/// An empty or inverted range counts as fully done.
pub fn progress(current: NaiveDate, start: NaiveDate, end: NaiveDate) -> f64 {
    let total_days = elapsed_days(end, start);
    if total_days <= 0 {
        return 1.0;
    }
    let scraped_days = elapsed_days(end, current);
    (scraped_days as f64 / total_days as f64).clamp(0.0, 1.0)
}

/// Progress estimator bound to one scrape window
#[derive(Debug, Clone, Copy)]
pub struct ProgressEstimator {
    start: NaiveDate,
    end: NaiveDate,
}

impl ProgressEstimator {
    /// `start` is the cutoff (the oldest date that will be scraped), `end`
    /// the newest.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn at(&self, current: NaiveDate) -> f64 {
        progress(current, self.start, self.end)
    }
}
