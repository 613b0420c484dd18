//! Expiration-cycle calendar arithmetic.
//!
//! Equity option expirations fall on the third Friday of each calendar
//! month. This module derives the recurring boundary dates that carve a
//! daily history into expiration-aligned cycles, and the Friday-ending
//! week windows used for the weekly period kind.
//!
//! Everything here is pure date arithmetic: no wall clock, no I/O, no
//! randomness. Same inputs, same boundaries.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::{AnalysisError, Result};

/// Days from `date`'s weekday forward to the next Friday (0 if `date` is
/// already a Friday).
#[inline]
fn days_until_friday(date: NaiveDate) -> i64 {
    let offset = (Weekday::Fri.num_days_from_monday() + 7
        - date.weekday().num_days_from_monday())
        % 7;
    i64::from(offset)
}

/// First day of the month containing `date`.
#[inline]
fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day()) - 1)
}

/// First day of the month after the one containing `first`.
#[inline]
fn next_month(first: NaiveDate) -> NaiveDate {
    month_start(first + Duration::days(32))
}

/// First day of the month before the one containing `first`.
#[inline]
fn prev_month(first: NaiveDate) -> NaiveDate {
    month_start(first - Duration::days(1))
}

/// Third Friday of the month containing `date`: the first Friday on or
/// after the 1st, plus two weeks.
pub fn third_friday(date: NaiveDate) -> NaiveDate {
    let first = month_start(date);
    first + Duration::days(days_until_friday(first) + 14)
}

/// Friday that closes the week containing `date`.
///
/// Weeks run Saturday through Friday, so a Saturday or Sunday already
/// belongs to the week ending on the *next* Friday.
pub fn week_ending_friday(date: NaiveDate) -> NaiveDate {
    date + Duration::days(days_until_friday(date))
}

/// Expiration boundaries (third Fridays) covering the span `first..=last`.
///
/// Coverage starts one month before the month containing `first` and ends
/// two months after the month containing `last`, which guarantees every
/// date in the span has both an enclosing lower and upper boundary. The
/// result is strictly increasing and duplicate-free.
///
/// Fewer than two boundaries means the requested span cannot be bracketed
/// at all (e.g. `first > last`); that is a caller error, reported as
/// [`AnalysisError::DegenerateBoundaries`].
pub fn expiration_boundaries(first: NaiveDate, last: NaiveDate) -> Result<Vec<NaiveDate>> {
    let mut cursor = prev_month(month_start(first));
    let stop = next_month(next_month(month_start(last)));

    let mut boundaries = BTreeSet::new();
    while cursor <= stop {
        boundaries.insert(third_friday(cursor));
        cursor = next_month(cursor);
    }

    if boundaries.len() < 2 {
        return Err(AnalysisError::DegenerateBoundaries {
            start: first,
            end: last,
        });
    }

    Ok(boundaries.into_iter().collect())
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_third_friday_known_months() {
        // January 2025 starts on a Wednesday: first Friday Jan 3, third Jan 17.
        assert_eq!(third_friday(date(2025, 1, 1)), date(2025, 1, 17));
        // March 2024 starts on a Friday: the 1st is the first Friday.
        assert_eq!(third_friday(date(2024, 3, 10)), date(2024, 3, 15));
        // February 2026 starts on a Sunday.
        assert_eq!(third_friday(date(2026, 2, 28)), date(2026, 2, 20));
    }

    #[test]
    fn test_third_friday_is_independent_of_day_within_month() {
        for d in 1..=30 {
            assert_eq!(third_friday(date(2025, 6, d)), date(2025, 6, 20));
        }
    }

    #[test]
    fn test_week_ending_friday() {
        // 2025-01-03 is a Friday.
        assert_eq!(week_ending_friday(date(2025, 1, 3)), date(2025, 1, 3));
        // Saturday and Sunday roll into the next week.
        assert_eq!(week_ending_friday(date(2025, 1, 4)), date(2025, 1, 10));
        assert_eq!(week_ending_friday(date(2025, 1, 5)), date(2025, 1, 10));
        // Monday through Thursday close on the coming Friday.
        assert_eq!(week_ending_friday(date(2025, 1, 6)), date(2025, 1, 10));
        assert_eq!(week_ending_friday(date(2025, 1, 9)), date(2025, 1, 10));
    }

    #[test]
    fn test_boundaries_strictly_increasing_and_friday() {
        let boundaries = expiration_boundaries(date(2023, 2, 7), date(2025, 11, 28)).unwrap();

        assert!(boundaries.len() > 30);
        for pair in boundaries.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        for b in &boundaries {
            assert_eq!(b.weekday(), Weekday::Fri);
            assert_eq!(*b, third_friday(*b));
        }
    }

    #[test]
    fn test_boundaries_bracket_the_requested_span() {
        let first = date(2024, 7, 22);
        let last = date(2024, 9, 3);
        let boundaries = expiration_boundaries(first, last).unwrap();

        assert!(boundaries.first().unwrap() < &first);
        assert!(boundaries.last().unwrap() > &last);
    }

    #[test]
    fn test_boundaries_single_day_history() {
        // Even a one-day span gets bracketed: -1 month .. +2 months.
        let day = date(2025, 3, 21); // itself a third Friday
        let boundaries = expiration_boundaries(day, day).unwrap();

        assert!(boundaries.len() >= 2);
        assert!(boundaries.first().unwrap() < &day);
        assert!(boundaries.last().unwrap() > &day);
        assert!(boundaries.contains(&day));
    }

    #[test]
    fn test_degenerate_range_is_an_error() {
        let err = expiration_boundaries(date(2025, 6, 1), date(2020, 1, 1)).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateBoundaries { .. }));
    }
}
