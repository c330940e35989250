//! ABC floor-retest structure detection.
//!
//! A detector is a pure function over one `PriceSeries`: no I/O, no shared
//! state, and the same input always yields the same verdict.
//!
//! The structure it looks for:
//! - A: a support plateau in the older part of the window
//! - B: a later low that breaks meaningfully below A
//! - reclaim: the first bar after B whose high crosses back above A
//! - C: the first low after the reclaim that touches A again from above

pub mod abc;
pub mod stats;

pub use abc::{analyze, analyze_with};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thresholds of the ABC detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureParams {
    /// Series shorter than this never get analyzed.
    pub min_bars: usize,
    /// Bars of history always left outside the window.
    pub safety_margin: usize,
    /// Fraction of the window used as the floor region.
    pub split_ratio: f64,
    /// Percentile of floor-region lows taken as the support level.
    pub floor_percentile: f64,
    /// B must be below `A * breakdown_factor`.
    pub breakdown_factor: f64,
    /// A reclaim bar's high must exceed `A * reclaim_factor`.
    pub reclaim_factor: f64,
    /// C must land within `A * (1 ± retest_band)`.
    pub retest_band: f64,
    /// A retest at most this many bars old counts as recent.
    pub recent_bars: usize,
    /// Inclusive distance-to-A band treated as "sitting on the floor".
    pub distance_band: (f64, f64),
}

impl Default for StructureParams {
    fn default() -> Self {
        Self {
            min_bars: 30,
            safety_margin: 5,
            split_ratio: 0.65,
            floor_percentile: 0.35,
            breakdown_factor: 0.9995,
            reclaim_factor: 1.001,
            retest_band: 0.01,
            recent_bars: 20,
            distance_band: (-0.008, 0.012),
        }
    }
}

/// A located structure point. `index` is the bar position in the full series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointMark {
    pub index: usize,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Located A/B/C points.
///
/// `support` always exists once the analysis got past the length checks;
/// `breakdown` and `retest` are only set when that step was reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructurePoints {
    pub support: PointMark,
    pub breakdown: Option<PointMark>,
    pub retest: Option<PointMark>,
    /// `(last_close - A) / A`, set once the reclaim step was reached.
    pub distance: Option<f64>,
}

/// Which step decided the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureOutcome {
    TooShort,
    EmptyFloorRegion,
    EmptyBreakdownRegion,
    NonPositiveFloor,
    NoBreakdown,
    NotReclaimed,
    NoRetest,
    StaleRetest,
    Confirmed,
}

impl StructureOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, StructureOutcome::Confirmed)
    }
}

impl fmt::Display for StructureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StructureOutcome::TooShort => "not enough bars",
            StructureOutcome::EmptyFloorRegion => "floor region is empty",
            StructureOutcome::EmptyBreakdownRegion => "breakdown region is empty",
            StructureOutcome::NonPositiveFloor => "support level is not positive",
            StructureOutcome::NoBreakdown => "no clear breakdown below support",
            StructureOutcome::NotReclaimed => "broke down, never reclaimed",
            StructureOutcome::NoRetest => "reclaimed, no retest of support yet",
            StructureOutcome::StaleRetest => "retest too old and price away from support",
            StructureOutcome::Confirmed => "ABC structure: retesting support",
        };
        f.write_str(s)
    }
}

/// Detector output for one (instrument, series) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisVerdict {
    pub passed: bool,
    pub points: Option<StructurePoints>,
    pub outcome: StructureOutcome,
    pub message: Option<String>,
}

impl AnalysisVerdict {
    pub(crate) fn fail(outcome: StructureOutcome, points: Option<StructurePoints>) -> Self {
        // Length and region failures carry no message.
        let message = match outcome {
            StructureOutcome::TooShort
            | StructureOutcome::EmptyFloorRegion
            | StructureOutcome::EmptyBreakdownRegion => None,
            other => Some(other.to_string()),
        };

        Self {
            passed: false,
            points,
            outcome,
            message,
        }
    }

    pub(crate) fn from_points(outcome: StructureOutcome, points: StructurePoints) -> Self {
        let message = match (outcome, points.distance) {
            (StructureOutcome::StaleRetest | StructureOutcome::NoRetest, Some(d)) => {
                format!("{outcome} (distance to A {:+.1}%)", d * 100.0)
            }
            _ => outcome.to_string(),
        };

        Self {
            passed: outcome.passed(),
            points: Some(points),
            outcome,
            message: Some(message),
        }
    }

    pub fn distance(&self) -> Option<f64> {
        self.points.and_then(|p| p.distance)
    }
}
