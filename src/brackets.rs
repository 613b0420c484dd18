//! Opening-price brackets and their historical statistics.
//!
//! Closed period summaries are grouped by the bracket their opening price
//! falls into; each bracket with enough history gets empirical range
//! bands (two-tailed symmetric quantile widths of Delta) and
//! pullback/recovery exceedance frequencies. A bracket below the sample
//! floor gets no entry at all — absence means "insufficient data", never
//! zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::summary::PeriodSummary;

/// Two-tailed coverage levels of the range bands, in percent.
pub const CONFIDENCE_LEVELS: [u32; 4] = [60, 70, 75, 80];

/// Retracement thresholds of the reversal frequencies, in percent of the
/// realized variation.
pub const REVERSAL_THRESHOLDS: [u32; 4] = [20, 30, 40, 50];

/// A bracket needs strictly more than this many closed periods before any
/// statistic is published for it.
pub const DEFAULT_MIN_BRACKET_SAMPLES: usize = 10;

/// Fixed opening-price ranges, exhaustive over positive prices. Upper
/// bounds are closed; lower bounds open (except the bottom bracket).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PriceBracket {
    /// (-inf, 3.50]
    UpTo350,
    /// (3.50, 6.00]
    From350To600,
    /// (6.00, 8.00]
    From600To800,
    /// (8.00, 10.00]
    From800To1000,
    /// (10.00, +inf)
    Above1000,
}

impl PriceBracket {
    pub const ALL: [PriceBracket; 5] = [
        PriceBracket::UpTo350,
        PriceBracket::From350To600,
        PriceBracket::From600To800,
        PriceBracket::From800To1000,
        PriceBracket::Above1000,
    ];

    /// The bracket holding `price`.
    pub fn of(price: f64) -> Self {
        if price <= 3.50 {
            PriceBracket::UpTo350
        } else if price <= 6.00 {
            PriceBracket::From350To600
        } else if price <= 8.00 {
            PriceBracket::From600To800
        } else if price <= 10.00 {
            PriceBracket::From800To1000
        } else {
            PriceBracket::Above1000
        }
    }

    #[inline]
    pub fn contains(self, price: f64) -> bool {
        Self::of(price) == self
    }

    /// Display name for rendering layers.
    pub fn label(self) -> &'static str {
        match self {
            PriceBracket::UpTo350 => "up to 3.50",
            PriceBracket::From350To600 => "3.50 to 6.00",
            PriceBracket::From600To800 => "6.00 to 8.00",
            PriceBracket::From800To1000 => "8.00 to 10.00",
            PriceBracket::Above1000 => "above 10.00",
        }
    }
}

/// Empirical quantile with linear interpolation between order statistics
/// (the numpy/pandas default definition).
///
/// `sorted` must be ascending and non-empty; `q` in `0.0..=1.0`. Returns
/// NaN for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!((0.0..=1.0).contains(&q));
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * q;
            let lo = h.floor() as usize;
            let hi = h.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (h - lo as f64)
        }
    }
}

/// Historical statistics of one bracket for one period kind.
///
/// Array fields are keyed positionally by [`CONFIDENCE_LEVELS`] and
/// [`REVERSAL_THRESHOLDS`]; the keyed accessors below avoid off-by-one
/// lookups in callers.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BracketStats {
    /// Number of closed periods behind these numbers.
    pub samples: usize,
    /// Symmetric band half-widths around the period open, one per
    /// confidence level.
    pub range_widths: [f64; 4],
    /// Fraction of periods whose pullback exceeded t% of their upward
    /// variation, one per threshold.
    pub pullback_freq: [f64; 4],
    /// Fraction of periods whose recovery exceeded t% of their downward
    /// variation, one per threshold.
    pub recovery_freq: [f64; 4],
    /// Mean of the four pullback frequencies.
    pub avg_pullback: f64,
    /// Mean of the four recovery frequencies.
    pub avg_recovery: f64,
    /// Mean `var_up` across the bracket's closed periods.
    pub avg_var_up: f64,
    /// Mean `var_down` across the bracket's closed periods.
    pub avg_var_down: f64,
}

impl BracketStats {
    /// Band half-width for a supported confidence level.
    pub fn range_width(&self, confidence: u32) -> Option<f64> {
        CONFIDENCE_LEVELS
            .iter()
            .position(|c| *c == confidence)
            .map(|i| self.range_widths[i])
    }

    /// Pullback exceedance frequency for a supported threshold.
    pub fn pullback_frequency(&self, threshold: u32) -> Option<f64> {
        REVERSAL_THRESHOLDS
            .iter()
            .position(|t| *t == threshold)
            .map(|i| self.pullback_freq[i])
    }

    /// Recovery exceedance frequency for a supported threshold.
    pub fn recovery_frequency(&self, threshold: u32) -> Option<f64> {
        REVERSAL_THRESHOLDS
            .iter()
            .position(|t| *t == threshold)
            .map(|i| self.recovery_freq[i])
    }

    /// The close interval `(open - width, open + width)` implied by a
    /// confidence level, for display.
    pub fn close_band(&self, open: f64, confidence: u32) -> Option<(f64, f64)> {
        self.range_width(confidence).map(|w| (open - w, open + w))
    }
}

/// Builds the per-bracket statistics table from period summaries.
///
/// Only closed periods count; the in-progress period (the one carrying the
/// same-day placeholder bar) never contaminates its own reference
/// statistics. Brackets with `samples <= min_samples` are omitted.
pub fn bracket_table(
    summaries: &[PeriodSummary],
    min_samples: usize,
) -> BTreeMap<PriceBracket, BracketStats> {
    let mut table = BTreeMap::new();

    for bracket in PriceBracket::ALL {
        let rows: Vec<&PeriodSummary> = summaries
            .iter()
            .filter(|s| s.closed && bracket.contains(s.open))
            .collect();
        if rows.len() <= min_samples {
            continue;
        }
        table.insert(bracket, stats_for(&rows));
    }

    table
}

fn stats_for(rows: &[&PeriodSummary]) -> BracketStats {
    let n = rows.len() as f64;

    let mut deltas: Vec<f64> = rows.iter().map(|s| s.delta).collect();
    deltas.sort_by(f64::total_cmp);

    let mut range_widths = [0.0; 4];
    for (i, confidence) in CONFIDENCE_LEVELS.iter().enumerate() {
        let tail = (1.0 - f64::from(*confidence) / 100.0) / 2.0;
        let lower = quantile(&deltas, tail).abs();
        let upper = quantile(&deltas, 1.0 - tail).abs();
        // Symmetric around zero, so the wider tail wins.
        range_widths[i] = lower.max(upper);
    }

    let mut pullback_freq = [0.0; 4];
    let mut recovery_freq = [0.0; 4];
    for (i, threshold) in REVERSAL_THRESHOLDS.iter().enumerate() {
        let fraction = f64::from(*threshold) / 100.0;
        pullback_freq[i] = rows
            .iter()
            .filter(|s| s.pullback > fraction * s.var_up)
            .count() as f64
            / n;
        recovery_freq[i] = rows
            .iter()
            .filter(|s| s.recovery > fraction * s.var_down)
            .count() as f64
            / n;
    }

    BracketStats {
        samples: rows.len(),
        range_widths,
        pullback_freq,
        recovery_freq,
        avg_pullback: pullback_freq.iter().sum::<f64>() / 4.0,
        avg_recovery: recovery_freq.iter().sum::<f64>() / 4.0,
        avg_var_up: rows.iter().map(|s| s.var_up).sum::<f64>() / n,
        avg_var_down: rows.iter().map(|s| s.var_down).sum::<f64>() / n,
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summary(open: f64, delta: f64) -> PeriodSummary {
        let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let close = open + delta;
        let high = open.max(close) + 0.10;
        let low = open.min(close) - 0.10;
        PeriodSummary {
            label: "test".into(),
            period_start: day,
            period_end: day,
            first_day: day,
            last_day: day,
            open,
            high,
            low,
            close,
            var_up: high - open,
            var_down: open - low,
            pullback: high - close,
            recovery: close - low,
            delta,
            closed: true,
        }
    }

    #[test]
    fn test_bracket_of_edges() {
        assert_eq!(PriceBracket::of(1.00), PriceBracket::UpTo350);
        assert_eq!(PriceBracket::of(3.50), PriceBracket::UpTo350);
        assert_eq!(PriceBracket::of(3.51), PriceBracket::From350To600);
        assert_eq!(PriceBracket::of(6.00), PriceBracket::From350To600);
        assert_eq!(PriceBracket::of(8.00), PriceBracket::From600To800);
        assert_eq!(PriceBracket::of(10.00), PriceBracket::From800To1000);
        assert_eq!(PriceBracket::of(10.01), PriceBracket::Above1000);
    }

    #[test]
    fn test_brackets_are_exhaustive() {
        let mut price = 0.01;
        while price < 20.0 {
            // Every positive price lands in exactly one bracket.
            let holders = PriceBracket::ALL
                .iter()
                .filter(|b| b.contains(price))
                .count();
            assert_eq!(holders, 1, "price {price}");
            price += 0.07;
        }
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 4.0);
        assert_eq!(quantile(&values, 0.5), 2.5);
        // h = 3 * 0.25 = 0.75 -> 1.0 + 0.75 * (2.0 - 1.0)
        assert!((quantile(&values, 0.25) - 1.75).abs() < 1e-12);
        assert_eq!(quantile(&[7.0], 0.9), 7.0);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_bracket_omitted_at_sample_floor() {
        // Exactly 10 rows: no entry. 11 rows: entry appears.
        let ten: Vec<PeriodSummary> = (0..10).map(|i| summary(5.0, 0.01 * i as f64)).collect();
        let table = bracket_table(&ten, DEFAULT_MIN_BRACKET_SAMPLES);
        assert!(!table.contains_key(&PriceBracket::From350To600));

        let eleven: Vec<PeriodSummary> = (0..11).map(|i| summary(5.0, 0.01 * i as f64)).collect();
        let table = bracket_table(&eleven, DEFAULT_MIN_BRACKET_SAMPLES);
        let stats = table.get(&PriceBracket::From350To600).unwrap();
        assert_eq!(stats.samples, 11);
    }

    #[test]
    fn test_open_periods_do_not_count() {
        let mut rows: Vec<PeriodSummary> = (0..12).map(|i| summary(5.0, 0.01 * i as f64)).collect();
        rows[11].closed = false;

        let table = bracket_table(&rows, DEFAULT_MIN_BRACKET_SAMPLES);
        let stats = table.get(&PriceBracket::From350To600).unwrap();
        assert_eq!(stats.samples, 11);
    }

    #[test]
    fn test_range_widths_widen_with_confidence() {
        let rows: Vec<PeriodSummary> = (0..40)
            .map(|i| summary(5.0, -0.50 + 0.025 * i as f64))
            .collect();

        let table = bracket_table(&rows, DEFAULT_MIN_BRACKET_SAMPLES);
        let stats = table.get(&PriceBracket::From350To600).unwrap();

        let w60 = stats.range_width(60).unwrap();
        let w70 = stats.range_width(70).unwrap();
        let w75 = stats.range_width(75).unwrap();
        let w80 = stats.range_width(80).unwrap();
        assert!(w60 < w70 && w70 < w75 && w75 < w80);
        assert_eq!(stats.range_width(90), None);
    }

    #[test]
    fn test_reversal_frequencies_and_averages() {
        // Constructed so pullback == 0.10 and var_up == delta + 0.10 for
        // positive deltas: small deltas retrace past every threshold,
        // large ones past none.
        let rows: Vec<PeriodSummary> = (0..20)
            .map(|i| summary(5.0, 0.05 + 0.05 * (i % 10) as f64))
            .collect();

        let table = bracket_table(&rows, DEFAULT_MIN_BRACKET_SAMPLES);
        let stats = table.get(&PriceBracket::From350To600).unwrap();

        for i in 0..3 {
            assert!(
                stats.pullback_freq[i] >= stats.pullback_freq[i + 1],
                "higher thresholds cannot be exceeded more often"
            );
        }
        let expected = stats.pullback_freq.iter().sum::<f64>() / 4.0;
        assert!((stats.avg_pullback - expected).abs() < 1e-12);
    }

    #[test]
    fn test_close_band_is_centered_on_open() {
        let rows: Vec<PeriodSummary> = (0..15)
            .map(|i| summary(5.0, -0.20 + 0.03 * i as f64))
            .collect();
        let table = bracket_table(&rows, DEFAULT_MIN_BRACKET_SAMPLES);
        let stats = table.get(&PriceBracket::From350To600).unwrap();

        let (lo, hi) = stats.close_band(5.0, 80).unwrap();
        let w = stats.range_width(80).unwrap();
        assert!((5.0 - lo - w).abs() < 1e-12);
        assert!((hi - 5.0 - w).abs() < 1e-12);
    }
}
