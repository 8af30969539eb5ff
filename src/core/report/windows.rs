//! Report date windows

use chrono::{Days, NaiveDate};
use std::fmt;

/// An inclusive date range submitted as one report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    /// First day (inclusive)
    pub start: NaiveDate,
    /// Last day (inclusive)
    pub end: NaiveDate,
}

impl fmt::Display for ReportWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.start, self.end)
    }
}

/// Split `start..=end` into consecutive windows of at most `days` days
///
/// Windows never overlap and together cover every day in the range, including `end`.
/// An inverted range yields no windows.
///
/// # Examples
///
/// ```
/// use bazaar::core::report::split_windows;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
/// assert_eq!(split_windows(start, end, 30).len(), 3);
/// ```
pub fn split_windows(start: NaiveDate, end: NaiveDate, days: u32) -> Vec<ReportWindow> {
    let span = u64::from(days.max(1) - 1);
    let mut windows = Vec::new();
    let mut current = start;

    while current <= end {
        let window_end = current
            .checked_add_days(Days::new(span))
            .map_or(end, |d| d.min(end));
        windows.push(ReportWindow {
            start: current,
            end: window_end,
        });
        match window_end.checked_add_days(Days::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }

    windows
}
