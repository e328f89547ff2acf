//! The occurrence date contract.
//!
//! Source dates are day-first text (`"15/01/2020"`). They are parsed with
//! exactly that layout; anything else is unparseable and left to callers
//! to skip.

use chrono::{Datelike as _, NaiveDate};

/// `chrono` layout of `ocorrencia_dia`.
pub const OCCURRENCE_DATE_FORMAT: &str = "%d/%m/%Y";

/// Parses a `DD/MM/YYYY` occurrence date. Returns `None` for any other
/// layout or an impossible calendar date.
#[must_use]
pub fn parse_occurrence_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), OCCURRENCE_DATE_FORMAT).ok()
}

/// Formats a date back into the `DD/MM/YYYY` contract.
#[must_use]
pub fn format_occurrence_date(date: NaiveDate) -> String {
    date.format(OCCURRENCE_DATE_FORMAT).to_string()
}

/// Year-month label (`"2020-01"`) used by monthly series.
#[must_use]
pub fn month_label(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_first_dates() {
        let date = parse_occurrence_date("05/11/2019").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2019, 11, 5).unwrap());
        assert_eq!(format_occurrence_date(date), "05/11/2019");
    }

    #[test]
    fn rejects_other_layouts() {
        assert!(parse_occurrence_date("2019-11-05").is_none());
        assert!(parse_occurrence_date("31/02/2019").is_none());
        assert!(parse_occurrence_date("").is_none());
        assert!(parse_occurrence_date("not a date").is_none());
    }

    #[test]
    fn month_labels_are_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2021, 3, 9).unwrap();
        assert_eq!(month_label(date), "2021-03");
    }
}
