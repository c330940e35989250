use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Query, State};
use market::{AnalysisVerdict, Interval, PriceSeries};
use tracing::{debug, info, instrument, warn};

use crate::api::AppState;
use crate::api::types::{
    AnalyzeQuery, AnalyzeResponse, CheckStockQuery, CheckStockResponse, FuturesQuery,
    FuturesResponse, HealthResponse, QuoteEntry, QuoteQuery, TimeframeResult,
};
use crate::chart;
use crate::error::ApiError;
use crate::job::{JobStatus, StartOutcome, format_distance};
use crate::market_data::{
    FetchWindow, MarketDataError, MarketDataSource, fetch_with_suffix_fallback, futures_candidates,
    normalize_symbol,
};
use crate::time::now;

/// Futures timeframes: label and fetch window.
const FUTURES_TIMEFRAMES: [(&str, FetchWindow); 2] = [
    ("1h", FetchWindow::new(Interval::Hourly, "1y")),
    ("5m", FetchWindow::new(Interval::FiveMinute, "5d")),
];

/// A futures candidate needs at least this many bars to be used.
const FUTURES_MIN_BARS: usize = 50;

/// Quote sources in order: intraday first, daily when there are no minute bars.
const QUOTE_WINDOWS: [FetchWindow; 2] = [
    FetchWindow::for_interval(Interval::OneMinute),
    FetchWindow::new(Interval::Daily, "5d"),
];

pub async fn start_analysis(
    State(state): State<AppState>,
    Query(q): Query<AnalyzeQuery>,
) -> Json<AnalyzeResponse> {
    match state.jobs.start(q.force) {
        StartOutcome::Started { job_id, .. } => Json(AnalyzeResponse::Started { job_id }),
        StartOutcome::AlreadyRunning => Json(AnalyzeResponse::Running {
            message: "Job already running".to_string(),
        }),
    }
}

pub async fn job_status(State(state): State<AppState>) -> Json<JobStatus> {
    Json(state.jobs.snapshot())
}

#[instrument(skip(state), fields(symbol = %q.symbol, interval = %q.interval))]
pub async fn check_stock(
    State(state): State<AppState>,
    Query(q): Query<CheckStockQuery>,
) -> Result<Json<CheckStockResponse>, ApiError> {
    let interval: Interval = q
        .interval
        .parse()
        .map_err(|e: market::types::UnknownInterval| ApiError::BadRequest(e.to_string()))?;

    let symbol = normalize_symbol(&q.symbol);
    if symbol.is_empty() {
        return Err(ApiError::BadRequest("symbol is required".to_string()));
    }

    let window = FetchWindow::for_interval(interval);
    let (used, series) =
        match fetch_with_suffix_fallback(state.market.as_ref(), &symbol, window).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "no usable data");
                return Ok(Json(CheckStockResponse::unavailable(
                    symbol,
                    interval.to_string(),
                    e.to_string(),
                )));
            }
        };

    let verdict = market::pattern::analyze(&series, q.lookback);
    let dist = verdict
        .distance()
        .map(format_distance)
        .unwrap_or_else(|| "N/A".to_string());

    let (status, message) = if verdict.passed {
        (
            "Buy Setup".to_string(),
            format!("ABC structure: retesting support ({interval})"),
        )
    } else {
        let message = verdict
            .message
            .clone()
            .unwrap_or_else(|| format!("not matched (distance to A {dist})"));
        (format!("Check ({interval})"), message)
    };

    info!(used = %used, passed = verdict.passed, outcome = ?verdict.outcome, "stock checked");

    Ok(Json(CheckStockResponse {
        symbol: used,
        interval: interval.to_string(),
        is_passed: verdict.passed,
        dist,
        message,
        status,
        outcome: Some(verdict.outcome),
        points: verdict.points,
        candles: chart::candles(&series, series.len()),
        chart: None,
    }))
}

#[instrument(skip(state), fields(symbol = %q.symbol))]
pub async fn check_futures(
    State(state): State<AppState>,
    Query(q): Query<FuturesQuery>,
) -> Result<Json<FuturesResponse>, ApiError> {
    let symbol = q.symbol.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(ApiError::BadRequest("symbol is required".to_string()));
    }

    let candidates = futures_candidates(&symbol);
    let mut timeframes = BTreeMap::new();

    for (label, window) in FUTURES_TIMEFRAMES {
        let result = match first_usable(state.market.as_ref(), &candidates, window).await {
            Some((used, series)) => {
                let verdict = market::pattern::analyze(&series, state.lookback);
                timeframe_result(used, &series, &verdict)
            }
            None => TimeframeResult {
                used_symbol: None,
                is_passed: false,
                dist: "N/A".to_string(),
                status: "No Data".to_string(),
                message: format!("no data (tried: {})", candidates.join(", ")),
                points: None,
                chart: None,
            },
        };

        timeframes.insert(label.to_string(), result);
    }

    Ok(Json(FuturesResponse { symbol, timeframes }))
}

/// Latest price for each requested symbol. A failing symbol gets an
/// `{"error": ..}` entry and does not affect the others.
#[instrument(skip(state), fields(symbols = %q.symbols))]
pub async fn quote(
    State(state): State<AppState>,
    Query(q): Query<QuoteQuery>,
) -> Json<BTreeMap<String, QuoteEntry>> {
    let mut quotes = BTreeMap::new();

    for raw in q.symbols.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let entry = match latest_quote(state.market.as_ref(), &normalize_symbol(raw)).await {
            Ok(entry) => entry,
            Err(MarketDataError::NoData(_)) => QuoteEntry::Failed {
                error: "No Data".to_string(),
            },
            Err(e) => {
                warn!(symbol = raw, error = %e, "quote unavailable");
                QuoteEntry::Failed {
                    error: e.to_string(),
                }
            }
        };

        quotes.insert(raw.to_string(), entry);
    }

    Json(quotes)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        time: now(),
    })
}

/// First candidate symbol with at least `FUTURES_MIN_BARS` bars.
async fn first_usable(
    source: &dyn MarketDataSource,
    candidates: &[String],
    window: FetchWindow,
) -> Option<(String, PriceSeries)> {
    for symbol in candidates {
        match source.fetch_series(symbol, window).await {
            Ok(series) if series.len() >= FUTURES_MIN_BARS => {
                return Some((symbol.clone(), series));
            }
            Ok(series) => info!(%symbol, bars = series.len(), "too few bars; trying next"),
            Err(e) => warn!(%symbol, error = %e, "futures fetch failed; trying next"),
        }
    }
    None
}

async fn latest_quote(
    source: &dyn MarketDataSource,
    symbol: &str,
) -> Result<QuoteEntry, MarketDataError> {
    let mut last_err = None;

    for window in QUOTE_WINDOWS {
        match source.fetch_series(symbol, window).await {
            Ok(series) if !series.is_empty() => return Ok(price_change(&series)),
            Ok(_) => debug!(%symbol, interval = %window.interval, "no bars; trying next window"),
            Err(e) => {
                debug!(%symbol, interval = %window.interval, error = %e, "quote fetch failed");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| MarketDataError::NoData(symbol.to_string())))
}

/// Last close against the close before it. A single bar is its own
/// reference, so the change is zero.
fn price_change(series: &PriceSeries) -> QuoteEntry {
    let bars = series.bars();
    let Some(last) = bars.last() else {
        return QuoteEntry::Failed {
            error: "No Data".to_string(),
        };
    };
    let prev = bars.iter().rev().nth(1).unwrap_or(last);

    let change = last.close - prev.close;
    let pct_change = if prev.close != 0.0 {
        change / prev.close
    } else {
        0.0
    };

    QuoteEntry::Price {
        price: last.close,
        change,
        pct_change,
        time: last.timestamp,
    }
}

fn timeframe_result(used: String, series: &PriceSeries, verdict: &AnalysisVerdict) -> TimeframeResult {
    let dist = verdict
        .distance()
        .map(format_distance)
        .unwrap_or_else(|| "N/A".to_string());

    let (status, message) = if verdict.passed {
        ("Support Hold".to_string(), "matched".to_string())
    } else {
        ("Watch".to_string(), format!("not matched (distance {dist})"))
    };

    TimeframeResult {
        used_symbol: Some(used),
        is_passed: verdict.passed,
        dist,
        status,
        message,
        points: verdict.points,
        chart: chart::render(series, verdict.points.as_ref()),
    }
}
