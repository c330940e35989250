//! Market data boundary.
//!
//! The screener only needs two things from a data provider: an OHLCV series
//! for a symbol and a handful of fundamental ratios. Everything provider
//! specific (URLs, payload shapes, null handling) stays behind
//! `MarketDataSource`.

pub mod client;
pub mod errors;
pub mod types;

pub use client::YahooClient;
pub use errors::MarketDataError;

use std::collections::HashMap;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use market::{Fundamentals, Interval, PriceSeries};
use tracing::{debug, info};

/// Concurrent symbol downloads inside one chunk.
const CHUNK_CONCURRENCY: usize = 8;

/// Fewer bars than this means the symbol variant has no usable listing.
pub const MIN_USABLE_BARS: usize = 5;

/// Granularity plus how much history to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub interval: Interval,
    pub range: &'static str,
}

impl FetchWindow {
    pub const fn new(interval: Interval, range: &'static str) -> Self {
        Self { interval, range }
    }

    /// Default history per granularity: 10 months daily, 1 month hourly,
    /// 5 days of 5-minute bars, 3 days of 1-minute bars.
    pub const fn for_interval(interval: Interval) -> Self {
        let range = match interval {
            Interval::Daily => "10mo",
            Interval::Hourly => "1mo",
            Interval::FiveMinute => "5d",
            Interval::OneMinute => "3d",
        };
        Self { interval, range }
    }
}

#[async_trait]
pub trait MarketDataSource: Send + Sync + 'static {
    async fn fetch_series(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<PriceSeries, MarketDataError>;

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketDataError>;

    /// Fetches a chunk of symbols with bounded concurrency.
    ///
    /// Per-symbol failures and empty series are skipped. The chunk only fails
    /// when every symbol in it failed.
    async fn fetch_chunk(
        &self,
        symbols: &[String],
        window: FetchWindow,
    ) -> Result<HashMap<String, PriceSeries>, MarketDataError> {
        let fetched: Vec<(String, Result<PriceSeries, MarketDataError>)> =
            stream::iter(symbols.iter().cloned())
                .map(|symbol: String| async move {
                    let res = self.fetch_series(&symbol, window).await;
                    (symbol, res)
                })
                .buffer_unordered(CHUNK_CONCURRENCY)
            .collect()
            .await;

        let mut out = HashMap::with_capacity(fetched.len());
        let mut failures = 0usize;

        for (symbol, res) in fetched {
            match res {
                Ok(series) if !series.is_empty() => {
                    out.insert(symbol, series);
                }
                Ok(_) => debug!(%symbol, "empty series skipped"),
                Err(e) => {
                    failures += 1;
                    debug!(%symbol, error = %e, "symbol fetch failed");
                }
            }
        }

        if !symbols.is_empty() && failures == symbols.len() {
            return Err(MarketDataError::ChunkFailed(failures));
        }

        Ok(out)
    }
}

/// Trims and upper-cases user input; bare numeric codes get the listed
/// exchange suffix (`2330` -> `2330.TW`).
pub fn normalize_symbol(raw: &str) -> String {
    let symbol = raw.trim().to_ascii_uppercase();

    if !symbol.is_empty() && symbol.bytes().all(|b| b.is_ascii_digit()) {
        format!("{symbol}{}", market::universe::LISTED_SUFFIX)
    } else {
        symbol
    }
}

/// Fetches a series, retrying a listed (`.TW`) symbol on the OTC board
/// (`.TWO`) when the listed variant has no usable history.
///
/// Returns the symbol variant that actually produced the data.
pub async fn fetch_with_suffix_fallback<S: MarketDataSource + ?Sized>(
    source: &S,
    symbol: &str,
    window: FetchWindow,
) -> Result<(String, PriceSeries), MarketDataError> {
    let primary = source.fetch_series(symbol, window).await;

    if let Ok(series) = &primary {
        if series.len() >= MIN_USABLE_BARS {
            return Ok((symbol.to_string(), series.clone()));
        }
    }

    if let Some(stem) = symbol.strip_suffix(".TW") {
        let alt = format!("{stem}.TWO");
        info!(%symbol, %alt, "listed symbol has no data; retrying OTC variant");

        match source.fetch_series(&alt, window).await {
            Ok(series) if series.len() >= MIN_USABLE_BARS => return Ok((alt, series)),
            Ok(_) => debug!(%alt, "OTC variant has no usable data either"),
            Err(e) => debug!(%alt, error = %e, "OTC variant fetch failed"),
        }
    }

    match primary {
        Err(e) => Err(e),
        Ok(_) => Err(MarketDataError::NoData(symbol.to_string())),
    }
}

/// Fallback symbols for futures shorthands, tried in order.
pub fn futures_candidates(symbol: &str) -> Vec<String> {
    let symbol = symbol.trim().to_ascii_uppercase();

    let list: &[&str] = match symbol.as_str() {
        "TX" | "WTX" => &["TX=F", "^TWII"],
        "NQ" => &["NQ=F", "MNQ=F"],
        "MNQ" => &["MNQ=F"],
        _ => return vec![symbol],
    };

    list.iter().map(|s| s.to_string()).collect()
}
