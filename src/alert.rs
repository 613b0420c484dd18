//! Alert evaluation for the in-progress period.
//!
//! Compares the realized variation of the period containing "today"
//! against its bracket's historical averages. The three outcomes of the
//! evaluation are ordinary values, not errors: downstream consumers must
//! render "no active period" and "insufficient data" explicitly.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::brackets::{BracketStats, PriceBracket};
use crate::summary::PeriodSummary;
use crate::Bar;

/// Which historical average the realized move has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertSide {
    High,
    Low,
}

/// Outcome of the normal evaluation path.
#[derive(Debug, Clone, Serialize)]
pub struct AlertDecision {
    pub period_label: String,
    pub bracket: PriceBracket,
    /// Opening price of the active period.
    pub open: f64,
    /// Realized `max(high) - open` from period start through today.
    pub var_up: f64,
    /// Realized `open - min(low)` from period start through today.
    pub var_down: f64,
    /// Historical mean upward variation of the bracket.
    pub avg_var_up: f64,
    /// Historical mean downward variation of the bracket.
    pub avg_var_down: f64,
    /// `None` when the move is still inside historical parameters. At
    /// most one side fires per evaluation; high is checked first.
    pub side: Option<AlertSide>,
    /// Average pullback probability for a high alert, average recovery
    /// probability for a low alert.
    pub reversal_probability: Option<f64>,
    /// Days from today to the period's last scheduled calendar day.
    pub days_remaining: i64,
}

impl AlertDecision {
    #[inline]
    pub fn fired(&self) -> bool {
        self.side.is_some()
    }
}

/// Tri-state result of evaluating one period kind.
#[derive(Debug, Clone, Serialize)]
pub enum AlertEvaluation {
    /// Today falls outside every known period span.
    NoActivePeriod,
    /// The active period's bracket has no published statistics.
    InsufficientHistory { bracket: PriceBracket, open: f64 },
    Evaluated(AlertDecision),
}

impl AlertEvaluation {
    /// The decision, when the normal path was taken.
    pub fn decision(&self) -> Option<&AlertDecision> {
        match self {
            AlertEvaluation::Evaluated(d) => Some(d),
            _ => None,
        }
    }
}

/// Evaluates the period containing `today` against its bracket history.
///
/// `summaries` are all summaries of the period kind (the active one
/// included), `stats` its bracket table, and `bars` the full daily set
/// the realized extremes are read from.
pub fn evaluate(
    summaries: &[PeriodSummary],
    stats: &BTreeMap<PriceBracket, BracketStats>,
    bars: &[Bar],
    today: NaiveDate,
) -> AlertEvaluation {
    let Some(active) = summaries
        .iter()
        .find(|s| s.period_start <= today && today <= s.period_end)
    else {
        return AlertEvaluation::NoActivePeriod;
    };

    let open = active.open;
    let bracket = PriceBracket::of(open);
    let Some(bracket_stats) = stats.get(&bracket) else {
        return AlertEvaluation::InsufficientHistory { bracket, open };
    };

    // Realized extremes from period start through today, inclusive.
    let mut high = f64::NEG_INFINITY;
    let mut low = f64::INFINITY;
    for bar in bars
        .iter()
        .filter(|b| active.period_start <= b.date && b.date <= today)
    {
        high = high.max(bar.high);
        low = low.min(bar.low);
    }
    if !high.is_finite() || !low.is_finite() {
        // The period exists but has not traded yet as of `today`.
        return AlertEvaluation::NoActivePeriod;
    }

    let var_up = high - open;
    let var_down = open - low;

    let (side, reversal_probability) = if var_up >= bracket_stats.avg_var_up {
        (Some(AlertSide::High), Some(bracket_stats.avg_pullback))
    } else if var_down >= bracket_stats.avg_var_down {
        (Some(AlertSide::Low), Some(bracket_stats.avg_recovery))
    } else {
        (None, None)
    };

    AlertEvaluation::Evaluated(AlertDecision {
        period_label: active.label.clone(),
        bracket,
        open,
        var_up,
        var_down,
        avg_var_up: bracket_stats.avg_var_up,
        avg_var_down: bracket_stats.avg_var_down,
        side,
        reversal_probability,
        days_remaining: (active.period_end - today).num_days(),
    })
}

// ============================================================
// TESTS
// ============================================================
