//! Localized date parsing and the day offsets used for progress estimates

use chrono::{Datelike, NaiveDate};

use crate::error::{Error, Result};

/// Month names as printed by the German order history
pub const MONTHS: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

/// Parse a date like `4. September 2018`
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    let [day_str, month_str, year_str] = parts[..] else {
        return Err(Error::Parse(format!("Unexpected date layout: {}", s)));
    };

    let day: u32 = day_str
        .trim_end_matches('.')
        .parse()
        .map_err(|_| Error::Parse(format!("Invalid day in date: {}", s)))?;
    let month = month_number(month_str)
        .ok_or_else(|| Error::Parse(format!("Unknown month name: {}", month_str)))?;
    let year: i32 = year_str
        .parse()
        .map_err(|_| Error::Parse(format!("Invalid year in date: {}", s)))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::Parse(format!("Date does not exist: {}", s)))
}

/// 1-based month number for a localized month name
pub fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|idx| idx as u32 + 1)
}

/// Days from `earlier` to `later` on a simplified calendar where every month
/// has 31 days. Negative when `earlier` is after `later`.
///
/// Not real calendar arithmetic: it only feeds a progress bar and is kept
/// cheap and monotonic.
pub fn elapsed_days(later: NaiveDate, earlier: NaiveDate) -> i64 {
    let days = later.day() as i64 - earlier.day() as i64;
    let months = later.month() as i64 - earlier.month() as i64;
    let years = (later.year() - earlier.year()) as i64;
    days + months * 31 + years * 12 * 31
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("4. September 2018").unwrap(),
            NaiveDate::from_ymd_opt(2018, 9, 4).unwrap()
        );
        assert_eq!(
            parse_date("31. Dezember 2021").unwrap(),
            NaiveDate::from_ymd_opt(2021, 12, 31).unwrap()
        );
        assert_eq!(
            parse_date("1. März 2020").unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_parse_date_unknown_month() {
        assert!(matches!(
            parse_date("4. September2 2018"),
            Err(Error::Parse(_))
        ));
        assert!(matches!(parse_date("4. Sept 2018"), Err(Error::Parse(_))));
        // English names are not in the table
        assert!(matches!(parse_date("4. March 2018"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_date_malformed() {
        assert!(matches!(parse_date("vier. Mai 2018"), Err(Error::Parse(_))));
        assert!(matches!(parse_date("4. Mai zwanzig"), Err(Error::Parse(_))));
        assert!(matches!(parse_date("4. Mai"), Err(Error::Parse(_))));
        assert!(matches!(parse_date(""), Err(Error::Parse(_))));
        assert!(matches!(parse_date("31. Februar 2020"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("Januar"), Some(1));
        assert_eq!(month_number("Dezember"), Some(12));
        assert_eq!(month_number("january"), None);
    }

    #[test]
    fn test_elapsed_days_uses_31_day_months() {
        let a = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
        assert_eq!(elapsed_days(a, b), 31);

        let c = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(elapsed_days(c, d), 372);
        assert_eq!(elapsed_days(d, c), -372);
        assert_eq!(elapsed_days(c, c), 0);
    }
}
