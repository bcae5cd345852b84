//! Calendar-month usage period alignment (spec §4.2: "aligned window
//! (monthly)"; Open Question resolved in SPEC_FULL.md — calendar months,
//! not rolling 30-day windows).

use chrono::{DateTime, Datelike, TimeZone, Utc};

/// The `[start, end)` calendar-month window containing `at`.
pub fn month_window(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.with_ymd_and_hms(at.year(), at.month(), 1, 0, 0, 0).single().expect("valid first-of-month");
    (start, next_month_start(start))
}

fn next_month_start(start: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if start.month() == 12 { (start.year() + 1, 1) } else { (start.year(), start.month() + 1) };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single().expect("valid first-of-month")
}

/// Advances a stale `[period_start, period_end)` window forward until it
/// contains `now`, handling the case where more than one month elapsed with
/// no traffic (spec §4.6: daily backstop rollover must also catch up idle
/// orgs, not just advance by one window).
pub fn advance_to_contain(period_end: DateTime<Utc>, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let mut start = period_end;
    let mut end = next_month_start(start);
    while end <= now {
        start = end;
        end = next_month_start(start);
    }
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_window_spans_the_calendar_month() {
        let at = Utc.with_ymd_and_hms(2026, 7, 15, 12, 0, 0).unwrap();
        let (start, end) = month_window(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn december_rolls_into_next_year() {
        let at = Utc.with_ymd_and_hms(2026, 12, 20, 0, 0, 0).unwrap();
        let (_, end) = month_window(at);
        assert_eq!(end, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn advance_skips_multiple_idle_months() {
        let stale_end = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 7, 15, 0, 0, 0).unwrap();
        let (start, end) = advance_to_contain(stale_end, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
    }
}
