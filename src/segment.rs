//! Period segmentation.
//!
//! Assigns each daily bar to a weekly window and to expiration cycles
//! (single- and double-expiration). All intervals are left-closed,
//! right-open: a bar dated exactly on an expiration boundary belongs to
//! the cycle that *starts* there, not the one that ends there.
//!
//! Bars that no cycle interval can hold (before the first boundary, or
//! past the last usable one) are dropped from that cycle kind only. They
//! always keep their weekly assignment.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::calendar::week_ending_friday;
use crate::Bar;

/// A labelled half-open calendar interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSpan {
    pub label: String,
    pub start: NaiveDate,
    /// Exclusive end: the day the next span begins.
    pub end: NaiveDate,
}

impl PeriodSpan {
    /// Last calendar day belonging to the span.
    #[inline]
    pub fn last_day(&self) -> NaiveDate {
        self.end - Duration::days(1)
    }

    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// How many expiration boundaries one cycle spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePairing {
    /// One expiration per cycle (monthly).
    Single,
    /// Two consecutive expirations per cycle (bimonthly).
    Double,
}

/// Groups bars into Saturday-through-Friday weeks.
///
/// Every bar is assigned; weekends and holidays simply leave gaps inside
/// a window. Spans are returned in chronological order with their bars in
/// input order.
pub fn weekly_spans(bars: &[Bar]) -> Vec<(PeriodSpan, Vec<Bar>)> {
    let mut groups: BTreeMap<NaiveDate, Vec<Bar>> = BTreeMap::new();
    for bar in bars {
        groups
            .entry(week_ending_friday(bar.date))
            .or_default()
            .push(*bar);
    }

    groups
        .into_iter()
        .map(|(friday, bars)| {
            let start = friday - Duration::days(6);
            let span = PeriodSpan {
                label: format!("{start}/{friday}"),
                start,
                end: friday + Duration::days(1),
            };
            (span, bars)
        })
        .collect()
}

/// Groups bars into expiration cycles bounded by `boundaries`.
///
/// `boundaries` must be strictly increasing (the output of
/// [`crate::calendar::expiration_boundaries`]). With
/// [`CyclePairing::Double`] every other boundary becomes a bin edge, so
/// each cycle spans two expirations.
///
/// Bars outside every bin are skipped; this is the explicit per-kind drop,
/// not an error.
pub fn cycle_spans(
    bars: &[Bar],
    boundaries: &[NaiveDate],
    pairing: CyclePairing,
) -> Vec<(PeriodSpan, Vec<Bar>)> {
    let edges: Vec<NaiveDate> = match pairing {
        CyclePairing::Single => boundaries.to_vec(),
        CyclePairing::Double => boundaries.iter().copied().step_by(2).collect(),
    };
    if edges.len() < 2 {
        return Vec::new();
    }

    let mut groups: BTreeMap<usize, Vec<Bar>> = BTreeMap::new();
    for bar in bars {
        // Bin i holds dates in [edges[i], edges[i + 1]).
        let upper = edges.partition_point(|e| *e <= bar.date);
        if upper == 0 || upper == edges.len() {
            continue;
        }
        groups.entry(upper - 1).or_default().push(*bar);
    }

    groups
        .into_iter()
        .map(|(bin, bars)| (cycle_span(&edges, boundaries, pairing, bin), bars))
        .collect()
}

fn cycle_span(
    edges: &[NaiveDate],
    boundaries: &[NaiveDate],
    pairing: CyclePairing,
    bin: usize,
) -> PeriodSpan {
    let start = edges[bin];
    let end = edges[bin + 1];
    let label = match pairing {
        // A single cycle is known by the expiration that closes it.
        CyclePairing::Single => end.format("%Y-%m-%d").to_string(),
        // A double cycle is known by its two constituent expirations.
        CyclePairing::Double => {
            let first = boundaries[bin * 2];
            let second = boundaries[bin * 2 + 1];
            format!(
                "Bim-{}/{}-{}",
                first.format("%b"),
                second.format("%b"),
                second.year()
            )
        }
    };
    PeriodSpan { label, start, end }
}

// ============================================================
// TESTS
// ============================================================
