//! # cyclerange - expiration-cycle range statistics
//!
//! Deterministic statistics engine for daily OHLC price histories. The
//! history is partitioned into weeks, single-expiration cycles and
//! double-expiration cycles (option expirations fall on the third Friday
//! of each month); every finished period is reduced to its range and
//! variation metrics, grouped by opening-price bracket, and the period
//! currently in progress is compared against its bracket's history to
//! decide whether a high-side or low-side variation alert fires.
//!
//! The engine performs no I/O: it is a pure function of the supplied bar
//! sequence and the explicit "today" date. Fetching quotes, caching and
//! rendering belong to collaborators (see [`PriceFeed`]).
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use cyclerange::prelude::*;
//!
//! // Bring your own bar type.
//! struct Day { date: NaiveDate, o: f64, h: f64, l: f64, c: f64 }
//!
//! impl DailyBar for Day {
//!     fn date(&self) -> NaiveDate { self.date }
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//! }
//!
//! let history: Vec<Day> = vec![]; // oldest first, from your data source
//! let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
//!
//! let engine = AnalysisEngine::new();
//! match engine.analyze(&history, today) {
//!     Ok(report) => {
//!         for (bracket, stats) in &report.week.brackets {
//!             println!("{}: {} periods", bracket.label(), stats.samples);
//!         }
//!     }
//!     Err(AnalysisError::EmptyHistory) => eprintln!("no data"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

pub mod alert;
pub mod brackets;
pub mod calendar;
pub mod segment;
pub mod summary;

pub mod prelude {
    pub use crate::{
        // Alerts
        alert::{AlertDecision, AlertEvaluation, AlertSide},
        // Parallel
        analyze_parallel,
        // Brackets
        brackets::{
            bracket_table, quantile, BracketStats, PriceBracket, CONFIDENCE_LEVELS,
            DEFAULT_MIN_BRACKET_SAMPLES, REVERSAL_THRESHOLDS,
        },
        // Calendar
        calendar::{expiration_boundaries, third_friday, week_ending_friday},
        // Segmentation
        segment::{cycle_spans, weekly_spans, CyclePairing, PeriodSpan},
        // Aggregation
        summary::{summarize, PeriodSummary},
        // Engine
        AnalysisEngine,
        // Errors
        AnalysisError,
        AnalysisReport,
        Bar,
        // Core traits
        DailyBar,
        PeriodKind,
        PeriodReport,
        PriceFeed,
        Result,
        SymbolError,
        SymbolReport,
    };
}

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::alert::{evaluate, AlertEvaluation};
use crate::brackets::{bracket_table, BracketStats, PriceBracket, DEFAULT_MIN_BRACKET_SAMPLES};
use crate::calendar::expiration_boundaries;
use crate::segment::{cycle_spans, weekly_spans, CyclePairing, PeriodSpan};
use crate::summary::{summarize, PeriodSummary};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Hard failures of the analysis pipeline.
///
/// The soft conditions of the domain - a bracket without enough history,
/// or a date outside every known period - are *not* errors; they are
/// variants of [`AlertEvaluation`] that consumers must render explicitly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum AnalysisError {
    #[error("empty price history")]
    EmptyHistory,

    #[error("bar at index {index} is not strictly after its predecessor")]
    OutOfOrder { index: usize },

    #[error("invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("expiration boundaries cannot bracket {start}..{end}")]
    DegenerateBoundaries { start: NaiveDate, end: NaiveDate },

    #[error("price feed failure: {0}")]
    Feed(String),
}

// ============================================================
// DAILY BARS
// ============================================================

/// Caller-supplied daily bar. One record per trading day, prices in the
/// instrument's quote currency.
pub trait DailyBar {
    fn date(&self) -> NaiveDate;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
}

/// Owned, normalized bar used internally and echoed in reports.
///
/// `synthetic` marks the same-day placeholder the engine appends when the
/// upstream source has not yet published a bar for "today": all four
/// prices reuse the most recent close. The period holding it is never
/// counted as closed history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub synthetic: bool,
}

impl DailyBar for Bar {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }
}

fn validate_bar(bar: &Bar, index: usize) -> Result<()> {
    let prices = [bar.open, bar.high, bar.low, bar.close];
    if prices.iter().any(|p| !p.is_finite()) {
        return Err(AnalysisError::InvalidBar {
            index,
            reason: "non-finite price",
        });
    }
    if prices.iter().any(|p| *p <= 0.0) {
        return Err(AnalysisError::InvalidBar {
            index,
            reason: "non-positive price",
        });
    }
    if bar.high < bar.low {
        return Err(AnalysisError::InvalidBar {
            index,
            reason: "high below low",
        });
    }
    Ok(())
}

// ============================================================
// PERIOD KINDS
// ============================================================

/// The three ways the calendar is partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodKind {
    Week,
    MonthlyCycle,
    BimonthlyCycle,
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeriodKind::Week => "week",
            PeriodKind::MonthlyCycle => "monthly cycle",
            PeriodKind::BimonthlyCycle => "bimonthly cycle",
        };
        f.write_str(name)
    }
}

// ============================================================
// REPORTS
// ============================================================

/// Everything computed for one period kind: the summary rows (in-progress
/// period included, for display), the bracket statistics table (closed
/// periods only) and the alert evaluation for today.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodReport {
    pub kind: PeriodKind,
    pub summaries: Vec<PeriodSummary>,
    pub brackets: BTreeMap<PriceBracket, BracketStats>,
    pub alert: AlertEvaluation,
}

/// Full analysis of one instrument as of `today`.
///
/// The cycle-based kinds carry their own `Result`: a boundary-generation
/// failure disables them without touching the weekly report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub today: NaiveDate,
    pub week: PeriodReport,
    pub monthly: Result<PeriodReport>,
    pub bimonthly: Result<PeriodReport>,
}

// ============================================================
// ANALYSIS ENGINE
// ============================================================

/// The statistics engine. Stateless between calls: every run recomputes
/// boundaries, segmentation, aggregates and statistics from the supplied
/// snapshot, so equal inputs give equal reports.
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    min_bracket_samples: usize,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self {
            min_bracket_samples: DEFAULT_MIN_BRACKET_SAMPLES,
        }
    }
}

impl AnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the sample floor a bracket must exceed before its
    /// statistics are published.
    pub fn min_bracket_samples(mut self, samples: usize) -> Self {
        self.min_bracket_samples = samples;
        self
    }

    /// Runs the full pipeline: validate, append the same-day placeholder
    /// if needed, segment per period kind, aggregate, compute bracket
    /// statistics and evaluate the in-progress period.
    ///
    /// `history` must be oldest-first with strictly ascending dates;
    /// weekend and holiday gaps are expected. `today` is the evaluation
    /// date, normally the wall-clock date of the caller.
    pub fn analyze<T: DailyBar>(&self, history: &[T], today: NaiveDate) -> Result<AnalysisReport> {
        let bars = self.normalize(history, today)?;
        let first = bars[0].date;
        let last = bars[bars.len() - 1].date;

        let week = self.report_for(PeriodKind::Week, weekly_spans(&bars), &bars, today);

        // Boundary failure is fatal to the cycle kinds only.
        let (monthly, bimonthly) = match expiration_boundaries(first, last) {
            Ok(boundaries) => (
                Ok(self.report_for(
                    PeriodKind::MonthlyCycle,
                    cycle_spans(&bars, &boundaries, CyclePairing::Single),
                    &bars,
                    today,
                )),
                Ok(self.report_for(
                    PeriodKind::BimonthlyCycle,
                    cycle_spans(&bars, &boundaries, CyclePairing::Double),
                    &bars,
                    today,
                )),
            ),
            Err(e) => (Err(e.clone()), Err(e)),
        };

        Ok(AnalysisReport {
            today,
            week,
            monthly,
            bimonthly,
        })
    }

    fn report_for(
        &self,
        kind: PeriodKind,
        groups: Vec<(PeriodSpan, Vec<Bar>)>,
        bars: &[Bar],
        today: NaiveDate,
    ) -> PeriodReport {
        let summaries: Vec<PeriodSummary> = groups
            .iter()
            .filter_map(|(span, group)| summarize(span, group, today))
            .collect();
        let brackets = bracket_table(&summaries, self.min_bracket_samples);
        let alert = evaluate(&summaries, &brackets, bars, today);

        PeriodReport {
            kind,
            summaries,
            brackets,
            alert,
        }
    }

    fn normalize<T: DailyBar>(&self, history: &[T], today: NaiveDate) -> Result<Vec<Bar>> {
        if history.is_empty() {
            return Err(AnalysisError::EmptyHistory);
        }

        let mut bars: Vec<Bar> = Vec::with_capacity(history.len() + 1);
        for (index, item) in history.iter().enumerate() {
            let bar = Bar {
                date: item.date(),
                open: item.open(),
                high: item.high(),
                low: item.low(),
                close: item.close(),
                synthetic: false,
            };
            validate_bar(&bar, index)?;
            if let Some(prev) = bars.last() {
                if prev.date >= bar.date {
                    return Err(AnalysisError::OutOfOrder { index });
                }
            }
            bars.push(bar);
        }

        // Same-day placeholder: the upstream source has nothing for today
        // yet, so today's period still gets a row. All four prices reuse
        // the newest close.
        let newest = bars[bars.len() - 1];
        if newest.date < today {
            bars.push(Bar {
                date: today,
                open: newest.close,
                high: newest.close,
                low: newest.close,
                close: newest.close,
                synthetic: true,
            });
        }

        Ok(bars)
    }
}

// ============================================================
// PRICE FEED COLLABORATOR / PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// External source of daily histories. Freshness, caching and retry
/// policy are entirely the implementor's business; the engine treats each
/// fetched sequence as an immutable snapshot.
pub trait PriceFeed: Sync {
    type Bar: DailyBar;
    type Error: fmt::Display;

    /// Ordered daily bars for `symbol`, oldest first.
    fn fetch(&self, symbol: &str) -> std::result::Result<Vec<Self::Bar>, Self::Error>;
}

/// Analysis of a single symbol.
#[derive(Debug)]
pub struct SymbolReport {
    pub symbol: String,
    pub report: AnalysisReport,
}

/// Failure for a single symbol; feed errors arrive as
/// [`AnalysisError::Feed`].
#[derive(Debug)]
pub struct SymbolError {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Fetches and analyzes many symbols in parallel. One symbol failing -
/// in the feed or in the engine - never affects the others.
pub fn analyze_parallel<F>(
    engine: &AnalysisEngine,
    feed: &F,
    symbols: &[&str],
    today: NaiveDate,
) -> (Vec<SymbolReport>, Vec<SymbolError>)
where
    F: PriceFeed,
{
    let results: Vec<_> = symbols
        .par_iter()
        .map(|symbol| {
            feed.fetch(symbol)
                .map_err(|e| AnalysisError::Feed(e.to_string()))
                .and_then(|bars| engine.analyze(&bars, today))
                .map(|report| SymbolReport {
                    symbol: (*symbol).to_string(),
                    report,
                })
                .map_err(|error| SymbolError {
                    symbol: (*symbol).to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
