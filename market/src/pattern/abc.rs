//! ABC floor-retest detector.
//!
//! Works on the most recent `lookback` bars of a series:
//!
//! ```text
//!  |<------------- floor region ------------->|<-- breakdown / retest -->|
//!  offset                              offset + split                  len
//! ```
//!
//! The reclaim and retest scans run in full-series order, so every index
//! reported in `StructurePoints` is a position in the whole series.

use super::stats::{argmin, nearest_index, quantile};
use super::{AnalysisVerdict, PointMark, StructureOutcome, StructureParams, StructurePoints};
use crate::types::{PriceBar, PriceSeries};

/// Runs the detector with the canonical thresholds.
pub fn analyze(series: &PriceSeries, lookback: usize) -> AnalysisVerdict {
    analyze_with(series, lookback, &StructureParams::default())
}

pub fn analyze_with(
    series: &PriceSeries,
    lookback: usize,
    params: &StructureParams,
) -> AnalysisVerdict {
    let bars = series.bars();
    let len = bars.len();

    if len < params.min_bars {
        return AnalysisVerdict::fail(StructureOutcome::TooShort, None);
    }

    let lookback = lookback.min(len.saturating_sub(params.safety_margin));
    let offset = len - lookback;
    let split = (lookback as f64 * params.split_ratio).floor() as usize;

    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    // A: robust plateau level of the floor region.
    let floor_lows = &lows[offset..offset + split];
    let Some(val_a) = quantile(floor_lows, params.floor_percentile) else {
        return AnalysisVerdict::fail(StructureOutcome::EmptyFloorRegion, None);
    };
    let pos_a = nearest_index(floor_lows, val_a).unwrap_or(0);

    let mut points = StructurePoints {
        support: mark(bars, offset + pos_a, val_a),
        breakdown: None,
        retest: None,
        distance: None,
    };

    let region_start = offset + split;
    let region = &lows[region_start..];
    let Some(pos_b) = argmin(region) else {
        return AnalysisVerdict::fail(StructureOutcome::EmptyBreakdownRegion, Some(points));
    };

    if val_a <= 0.0 {
        return AnalysisVerdict::fail(StructureOutcome::NonPositiveFloor, Some(points));
    }

    // B: deepest low after the split, must break below A.
    let idx_b = region_start + pos_b;
    let val_b = lows[idx_b];
    points.breakdown = Some(mark(bars, idx_b, val_b));

    if val_b >= val_a * params.breakdown_factor {
        return AnalysisVerdict::fail(StructureOutcome::NoBreakdown, Some(points));
    }

    let reclaim_level = val_a * params.reclaim_factor;
    let Some(idx_reclaim) = bars[idx_b + 1..]
        .iter()
        .position(|b| b.high > reclaim_level)
        .map(|p| idx_b + 1 + p)
    else {
        return AnalysisVerdict::fail(StructureOutcome::NotReclaimed, Some(points));
    };

    // C: first touch of the floor band from the reclaim bar onward.
    let lower = val_a * (1.0 - params.retest_band);
    let upper = val_a * (1.0 + params.retest_band);
    let idx_c = (idx_reclaim..len).find(|&i| lows[i] >= lower && lows[i] <= upper);
    points.retest = idx_c.map(|i| mark(bars, i, lows[i]));

    let last_close = bars[len - 1].close;
    let distance = (last_close - val_a) / val_a;
    points.distance = Some(distance);

    let outcome = match idx_c {
        None => StructureOutcome::NoRetest,
        Some(i) => {
            let recent = len - 1 - i <= params.recent_bars;
            let (lo, hi) = params.distance_band;
            let on_floor = lo <= distance && distance <= hi;

            if recent || on_floor {
                StructureOutcome::Confirmed
            } else {
                StructureOutcome::StaleRetest
            }
        }
    };

    AnalysisVerdict::from_points(outcome, points)
}

fn mark(bars: &[PriceBar], index: usize, value: f64) -> PointMark {
    PointMark {
        index,
        value,
        timestamp: bars[index].timestamp,
    }
}
