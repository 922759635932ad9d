//! Merge and date ordering of events from all sources.
//!
//! Ordering uses the *effective date*: the calendar date at the start of
//! `Event::date`. Events whose date cannot be read sort last, after every
//! dated event, and ties keep their input order.

use chrono::NaiveDate;
use tracing::warn;

use crate::event::Event;

/// Effective sort date of `event`.
///
/// The date portion is everything before the first `T` or whitespace. If it
/// is not a `YYYY-MM-DD` calendar date the result is [`NaiveDate::MAX`] and a
/// warning naming the event is logged.
pub fn effective_sort_date(event: &Event) -> NaiveDate {
    let raw = event.date.trim();
    let date_part = raw
        .split(|c: char| c == 'T' || c.is_whitespace())
        .next()
        .unwrap_or_default();

    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => date,
        Err(e) => {
            warn!(
                event = %event.name,
                kind = %event.kind,
                date = %event.date,
                error = %e,
                "invalid event date, sorting last"
            );
            NaiveDate::MAX
        }
    }
}

/// Sort events ascending by effective date. Stable: equal dates keep input
/// order.
pub fn merge_events(events: Vec<Event>) -> Vec<Event> {
    let mut keyed: Vec<(NaiveDate, Event)> = events
        .into_iter()
        .map(|event| (effective_sort_date(&event), event))
        .collect();
    keyed.sort_by_key(|(date, _)| *date);
    keyed.into_iter().map(|(_, event)| event).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shower(name: &str, date: &str) -> Event {
        Event::meteor_shower(name, date, None, "test")
    }

    fn names(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_effective_date_truncates_time_and_zone() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(effective_sort_date(&shower("a", "2025-06-01")), expected);
        assert_eq!(effective_sort_date(&shower("b", "2025-06-01T23:59:59")), expected);
        assert_eq!(effective_sort_date(&shower("c", "2025-06-01T10:00:00+02:00")), expected);
        assert_eq!(effective_sort_date(&shower("d", "2025-06-01 08:16")), expected);
    }

    #[test]
    fn test_effective_date_falls_back_to_max() {
        assert_eq!(effective_sort_date(&shower("x", "not-a-date")), NaiveDate::MAX);
        assert_eq!(effective_sort_date(&shower("y", "")), NaiveDate::MAX);
        assert_eq!(effective_sort_date(&shower("z", "2025-Apr-22")), NaiveDate::MAX);
        assert_eq!(effective_sort_date(&shower("w", "2025-02-30")), NaiveDate::MAX);
    }

    #[test]
    fn test_sorts_ascending() {
        let merged = merge_events(vec![
            shower("Geminids", "2025-12-14T00:00:00"),
            Event::eclipse("Partial Eclipse", "2025-03-29", None, None, "ecl"),
            Event::close_approach("(2024 YR4)", "2025-01-04T08:16:00", 0.05, 7.0, "cad"),
        ]);
        assert_eq!(
            names(&merged),
            vec!["(2024 YR4)", "Partial Eclipse", "Geminids"]
        );
    }

    #[test]
    fn test_equal_dates_keep_input_order() {
        let merged = merge_events(vec![
            shower("A", "2025-06-01"),
            shower("later", "2025-07-01"),
            shower("B", "2025-06-01T12:00:00"),
            shower("earlier", "2025-05-01"),
            shower("C", "2025-06-01T00:00:00"),
        ]);
        assert_eq!(names(&merged), vec!["earlier", "A", "B", "C", "later"]);
    }

    #[test]
    fn test_malformed_dates_go_last_in_input_order() {
        let merged = merge_events(vec![
            shower("bad-1", "not-a-date"),
            Event::eclipse("Total Eclipse", "2099-01-01", None, None, "ecl"),
            shower("bad-2", ""),
            shower("first", "2025-01-01"),
        ]);
        assert_eq!(
            names(&merged),
            vec!["first", "Total Eclipse", "bad-1", "bad-2"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_events(Vec::new()).is_empty());
    }
}
