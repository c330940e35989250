use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use market::{StructureOutcome, StructurePoints};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chart::ChartCandle;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalyzeResponse {
    Started { job_id: Uuid },
    Running { message: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckStockQuery {
    pub symbol: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_lookback")]
    pub lookback: usize,
}

fn default_interval() -> String {
    "1d".to_string()
}

fn default_lookback() -> usize {
    120
}

/// Single-instrument check result.
///
/// `symbol` echoes the variant that produced the data (`.TWO` after an OTC
/// fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckStockResponse {
    pub symbol: String,
    pub interval: String,
    pub is_passed: bool,
    pub dist: String,
    pub message: String,
    pub status: String,
    pub outcome: Option<StructureOutcome>,
    pub points: Option<StructurePoints>,
    pub candles: Vec<ChartCandle>,
    pub chart: Option<String>,
}

impl CheckStockResponse {
    /// Body returned when no usable data could be fetched.
    pub fn unavailable(symbol: String, interval: String, message: String) -> Self {
        Self {
            symbol,
            interval,
            is_passed: false,
            dist: "N/A".to_string(),
            message,
            status: "No Data".to_string(),
            outcome: None,
            points: None,
            candles: Vec::new(),
            chart: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FuturesQuery {
    #[serde(default = "default_futures_symbol")]
    pub symbol: String,
}

fn default_futures_symbol() -> String {
    "TX".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeResult {
    pub used_symbol: Option<String>,
    pub is_passed: bool,
    pub dist: String,
    pub status: String,
    pub message: String,
    pub points: Option<StructurePoints>,
    pub chart: Option<String>,
}

/// Futures check, one entry per timeframe label (`1h`, `5m`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesResponse {
    pub symbol: String,
    #[serde(flatten)]
    pub timeframes: BTreeMap<String, TimeframeResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteQuery {
    /// Comma separated; bare codes get the listed suffix.
    #[serde(default = "default_quote_symbols")]
    pub symbols: String,
}

fn default_quote_symbols() -> String {
    "^TWII,NQ=F,2330.TW".to_string()
}

/// Latest price of one symbol, or the reason it has none. Keyed by the
/// symbol exactly as requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuoteEntry {
    Price {
        price: f64,
        change: f64,
        /// Fraction of the previous close, 0 when that close is 0.
        pct_change: f64,
        time: DateTime<Utc>,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub time: DateTime<Utc>,
}
