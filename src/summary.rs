//! Period aggregation.
//!
//! Reduces the bars of one period into a single [`PeriodSummary`]. Order
//! matters for `open` and `close` (chronologically first and last bar),
//! so the reduction always sorts by date first instead of trusting input
//! order.

use chrono::NaiveDate;
use serde::Serialize;

use crate::segment::PeriodSpan;
use crate::Bar;

/// One period reduced to its OHLC aggregate and variation metrics.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub label: String,
    /// First scheduled calendar day of the period.
    pub period_start: NaiveDate,
    /// Last scheduled calendar day of the period (inclusive).
    pub period_end: NaiveDate,
    /// Date of the earliest bar actually observed in the period.
    pub first_day: NaiveDate,
    /// Date of the latest bar actually observed in the period.
    pub last_day: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// `high - open`.
    pub var_up: f64,
    /// `open - low`.
    pub var_down: f64,
    /// Retracement from the high back toward the close: `high - close`.
    pub pullback: f64,
    /// Recovery from the low back toward the close: `close - low`.
    pub recovery: f64,
    /// `close - open`.
    pub delta: f64,
    /// True once the period has fully elapsed. Only closed periods feed
    /// the historical bracket statistics.
    pub closed: bool,
}

/// Reduces `bars` belonging to `span` into a summary. Returns `None` for
/// an empty group.
///
/// `today` decides the `closed` flag: a period is closed once its last
/// scheduled day lies strictly before today.
pub fn summarize(span: &PeriodSpan, bars: &[Bar], today: NaiveDate) -> Option<PeriodSummary> {
    if bars.is_empty() {
        return None;
    }

    let mut ordered: Vec<Bar> = bars.to_vec();
    ordered.sort_by_key(|b| b.date);

    let first = ordered[0];
    let last = ordered[ordered.len() - 1];
    let high = ordered.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = ordered.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

    let open = first.open;
    let close = last.close;

    Some(PeriodSummary {
        label: span.label.clone(),
        period_start: span.start,
        period_end: span.last_day(),
        first_day: first.date,
        last_day: last.date,
        open,
        high,
        low,
        close,
        var_up: high - open,
        var_down: open - low,
        pullback: high - close,
        recovery: close - low,
        delta: close - open,
        closed: span.last_day() < today,
    })
}

// ============================================================
// TESTS
// ============================================================
