#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use market::{Fundamentals, Interval, PriceBar, PriceSeries};
use tokio::sync::Semaphore;

use screener::advisory::{AdvisoryError, AdvisoryModel};
use screener::market_data::{FetchWindow, MarketDataError, MarketDataSource};

fn bar(i: usize, low: f64, high: f64, close: f64) -> PriceBar {
    PriceBar {
        timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64),
        open: close,
        high,
        low,
        close,
        volume: 10_000.0,
    }
}

/// 200 bars with support at 100.0, breakdown to 95.0 at bar 165, reclaim at
/// 182 and a retest at 186. Bars after the retest close at `last_close`, so
/// the distance to support is `(last_close - 100) / 100`.
pub fn abc_series(symbol: &str, last_close: f64) -> PriceSeries {
    let bars = (0..200).map(|i| match i {
        0..158 => {
            let low = if i % 3 == 0 { 100.6 } else { 100.0 };
            bar(i, low, low + 1.5, low + 0.8)
        }
        158..165 => bar(i, 98.5, 99.5, 99.0),
        165 => bar(i, 95.0, 98.0, 96.0),
        166..182 => bar(i, 97.5, 99.9, 99.0),
        182..186 => bar(i, 101.2, 102.5, 102.0),
        186 => bar(i, 100.3, 101.5, 100.9),
        _ => bar(i, last_close - 0.4, last_close + 0.7, last_close),
    });

    PriceSeries::new(symbol, Interval::Daily, bars)
}

/// One-minute bars closing at `closes`, oldest first.
pub fn minute_series(symbol: &str, closes: &[f64]) -> PriceSeries {
    let start = Utc.with_ymd_and_hms(2025, 6, 2, 1, 0, 0).unwrap();
    let bars = closes.iter().enumerate().map(|(i, &close)| PriceBar {
        timestamp: start + Duration::minutes(i as i64),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 500.0,
    });
    PriceSeries::new(symbol, Interval::OneMinute, bars)
}

/// Flat series that never breaks down.
pub fn flat_series(symbol: &str, n: usize) -> PriceSeries {
    let bars = (0..n).map(|i| bar(i, 50.0, 51.0, 50.5));
    PriceSeries::new(symbol, Interval::Daily, bars)
}

/// In-memory market keyed by provider symbol.
#[derive(Default)]
pub struct InMemoryMarket {
    pub series: HashMap<String, PriceSeries>,
    /// Served for one-minute windows instead of `series`.
    pub intraday: HashMap<String, PriceSeries>,
    pub fundamentals: HashMap<String, Fundamentals>,
    pub failing_fundamentals: HashSet<String>,

    /// Symbols the provider rejects, with the rejection text.
    pub failing_series: HashMap<String, String>,

    /// Fetching this symbol panics.
    pub panic_on: Option<String>,

    /// When set, every series fetch waits for a permit first.
    pub gate: Option<Arc<Semaphore>>,

    pub series_calls: AtomicUsize,
    pub fundamentals_calls: AtomicUsize,
}

impl InMemoryMarket {
    pub fn with_series(entries: Vec<PriceSeries>) -> Self {
        Self {
            series: entries
                .into_iter()
                .map(|s| (s.symbol().to_string(), s))
                .collect(),
            ..Self::default()
        }
    }

    pub fn series_calls(&self) -> usize {
        self.series_calls.load(Ordering::SeqCst)
    }

    pub fn fundamentals_calls(&self) -> usize {
        self.fundamentals_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for InMemoryMarket {
    async fn fetch_series(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<PriceSeries, MarketDataError> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }

        self.series_calls.fetch_add(1, Ordering::SeqCst);

        if self.panic_on.as_deref() == Some(symbol) {
            panic!("feed crashed on {symbol}");
        }

        if let Some(message) = self.failing_series.get(symbol) {
            return Err(MarketDataError::Provider {
                symbol: symbol.to_string(),
                message: message.clone(),
            });
        }

        let table = if window.interval == Interval::OneMinute {
            &self.intraday
        } else {
            &self.series
        };

        table
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketDataError::NoData(symbol.to_string()))
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketDataError> {
        self.fundamentals_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_fundamentals.contains(symbol) {
            return Err(MarketDataError::Provider {
                symbol: symbol.to_string(),
                message: "quote summary unavailable".into(),
            });
        }

        Ok(self.fundamentals.get(symbol).copied().unwrap_or_default())
    }
}

/// Advisory model answering with a fixed rating line.
pub struct FixedModel {
    pub answer: Result<String, ()>,
    pub calls: AtomicUsize,
}

impl FixedModel {
    pub fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Every call is rate limited.
    pub fn rate_limited() -> Arc<Self> {
        Arc::new(Self {
            answer: Err(()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdvisoryModel for FixedModel {
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(prompt.contains("Symbol: "));

        match &self.answer {
            Ok(text) => Ok(text.clone()),
            Err(()) => Err(AdvisoryError::RateLimited("quota exhausted".into())),
        }
    }
}
