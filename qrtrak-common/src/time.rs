//! Timestamp utilities

use chrono::{DateTime, Datelike, Months, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Count whole calendar months elapsed between `start` and `end`.
///
/// "Whole month" follows calendar semantics: the anchor day-of-month
/// must have been reached again (with end-of-month clamping, so
/// Jan 31 + 1 month = Feb 28/29). Returns 0 when `end <= start`.
pub fn whole_months_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    if end <= start {
        return 0;
    }

    // Month-component difference is an upper bound on the answer;
    // the true count is this or one less, so the loop below runs at
    // most twice.
    let upper = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    let mut months = upper.max(0) as u32;

    while months > 0 {
        match start.checked_add_months(Months::new(months)) {
            Some(anchor) if anchor <= end => break,
            _ => months -= 1,
        }
    }

    months
}
