//! Month arithmetic relative to a project's start date.
//!
//! Months are zero-based offsets: month 0 is the calendar month that
//! contains the project start date.

use chrono::{Datelike, Months, NaiveDate};

/// Zero-based month offset from the project start.
pub type ProjectMonth = u32;

/// Returns the first day of the calendar month `offset` months after `start`.
#[must_use]
pub fn month_start(start: NaiveDate, offset: ProjectMonth) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(start.year(), start.month(), 1).unwrap_or(start);
    first
        .checked_add_months(Months::new(offset))
        .unwrap_or(first)
}

/// Returns the last day of the calendar month `offset` months after `start`.
#[must_use]
pub fn month_end(start: NaiveDate, offset: ProjectMonth) -> NaiveDate {
    let next = month_start(start, offset + 1);
    next.pred_opt().unwrap_or(next)
}

/// Returns the `YYYY-MM` label of a project month.
#[must_use]
pub fn month_label(start: NaiveDate, offset: ProjectMonth) -> String {
    let date = month_start(start, offset);
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Returns the project month containing `date`, or `None` if it precedes the start.
#[must_use]
pub fn months_between(start: NaiveDate, date: NaiveDate) -> Option<ProjectMonth> {
    let diff = (date.year() - start.year()) * 12 + i32::try_from(date.month()).ok()?
        - i32::try_from(start.month()).ok()?;
    u32::try_from(diff).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(0, date(2026, 3, 1))]
    #[case(1, date(2026, 4, 1))]
    #[case(10, date(2027, 1, 1))]
    #[case(24, date(2028, 3, 1))]
    fn test_month_start(#[case] offset: u32, #[case] expected: NaiveDate) {
        assert_eq!(month_start(date(2026, 3, 17), offset), expected);
    }

    #[test]
    fn test_month_end_handles_february() {
        assert_eq!(month_end(date(2028, 1, 31), 1), date(2028, 2, 29));
        assert_eq!(month_end(date(2027, 1, 31), 1), date(2027, 2, 28));
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label(date(2026, 11, 5), 0), "2026-11");
        assert_eq!(month_label(date(2026, 11, 5), 2), "2027-01");
    }

    #[test]
    fn test_months_between() {
        let start = date(2026, 3, 15);
        assert_eq!(months_between(start, date(2026, 3, 1)), Some(0));
        assert_eq!(months_between(start, date(2027, 2, 28)), Some(11));
        assert_eq!(months_between(start, date(2026, 2, 28)), None);
    }
}
