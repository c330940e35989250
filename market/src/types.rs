use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bar granularity supported by the screener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    Daily,
    Hourly,
    FiveMinute,
    OneMinute,
}

impl Interval {
    /// Interval code as understood by the chart data provider.
    pub fn code(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Hourly => "60m",
            Interval::FiveMinute => "5m",
            Interval::OneMinute => "1m",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported interval: {0}")]
pub struct UnknownInterval(pub String);

impl FromStr for Interval {
    type Err = UnknownInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" | "d" | "daily" => Ok(Interval::Daily),
            "60m" | "1h" | "h" | "hourly" => Ok(Interval::Hourly),
            "5m" => Ok(Interval::FiveMinute),
            "1m" => Ok(Interval::OneMinute),
            other => Err(UnknownInterval(other.to_string())),
        }
    }
}

/// One OHLCV observation. All prices are finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// A provider row before cleaning. Any missing field drops the row.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBar {
    pub timestamp: Option<DateTime<Utc>>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl RawBar {
    fn complete(self) -> Option<PriceBar> {
        let bar = PriceBar {
            timestamp: self.timestamp?,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            volume: self.volume?,
        };

        bar.is_finite().then_some(bar)
    }
}

/// Ordered bars for one instrument at one granularity.
///
/// Invariants:
/// - timestamps strictly increase
/// - every bar is complete and finite
///
/// The series is immutable once built; cleaning happens in the constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    interval: Interval,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Builds a series from raw provider rows, dropping incomplete rows.
    pub fn from_raw(
        symbol: impl Into<String>,
        interval: Interval,
        rows: impl IntoIterator<Item = RawBar>,
    ) -> Self {
        Self::new(symbol, interval, rows.into_iter().filter_map(RawBar::complete))
    }

    /// Builds a series from complete bars. Non-finite rows and rows that do not
    /// move time strictly forward are dropped (first occurrence wins).
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        bars: impl IntoIterator<Item = PriceBar>,
    ) -> Self {
        let mut kept: Vec<PriceBar> = Vec::new();

        for bar in bars.into_iter().filter(PriceBar::is_finite) {
            if kept.last().is_some_and(|prev| bar.timestamp <= prev.timestamp) {
                continue;
            }
            kept.push(bar);
        }

        Self {
            symbol: symbol.into(),
            interval,
            bars: kept,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// The most recent `n` bars (or all of them when shorter).
    pub fn tail(&self, n: usize) -> &[PriceBar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }
}

/// Fundamental ratios fed to the advisory prompt. Each may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub revenue_growth: Option<f64>,
    pub gross_margins: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub debt_to_equity: Option<f64>,
}
