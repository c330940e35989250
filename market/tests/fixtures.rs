#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use market::{Interval, PriceBar, PriceSeries};

pub fn ts(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

pub fn bar(i: usize, low: f64, high: f64, close: f64) -> PriceBar {
    PriceBar {
        timestamp: ts(i),
        open: close,
        high,
        low,
        close,
        volume: 10_000.0,
    }
}

/// How the tail of the ABC fixture behaves after the breakdown at bar 165.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    /// Reclaim at 182, retest at 186 (low 100.3), close 100.8 afterwards.
    Retest,
    /// Same reclaim and retest, then a rally to ~105.
    RetestThenRally,
    /// Never trades above 99.9 again.
    NoReclaim,
}

/// 200 daily bars. With lookback 120 the window is bars 80..200 and the
/// floor region is bars 80..158. The floor sits at 100.0, the breakdown low
/// is 95.0 at bar 165.
pub fn abc_series(tail: Tail) -> PriceSeries {
    let mut bars = Vec::with_capacity(200);

    for i in 0..200 {
        let b = match i {
            0..158 => {
                let low = if i % 3 == 0 { 100.6 } else { 100.0 };
                bar(i, low, low + 1.5, low + 0.8)
            }
            158..165 => bar(i, 98.5, 99.5, 99.0),
            165 => bar(i, 95.0, 98.0, 96.0),
            166..182 => bar(i, 97.5, 99.9, 99.0),
            _ if tail == Tail::NoReclaim => bar(i, 97.5, 99.9, 99.0),
            182..186 => bar(i, 101.2, 102.5, 102.0),
            186 => bar(i, 100.3, 101.5, 100.9),
            _ if tail == Tail::RetestThenRally => bar(i, 104.0, 106.0, 105.0),
            _ => bar(i, 100.4, 101.5, 100.8),
        };
        bars.push(b);
    }

    PriceSeries::new("ABC.TW", Interval::Daily, bars)
}

/// Builds a series from a list of lows; highs and closes follow the lows.
pub fn series_from_lows(lows: &[f64], spread: f64) -> PriceSeries {
    let bars = lows
        .iter()
        .enumerate()
        .map(|(i, &low)| bar(i, low, low + spread, low + spread / 2.0));
    PriceSeries::new("GEN.TW", Interval::Daily, bars)
}
