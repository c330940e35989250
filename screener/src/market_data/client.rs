use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use market::{Fundamentals, PriceSeries, RawBar};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::market_data::errors::MarketDataError;
use crate::market_data::types::{ChartEnvelope, ChartResult, ProviderError, SummaryEnvelope};
use crate::market_data::{FetchWindow, MarketDataSource};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) screener/0.1";

/// Chart and quote-summary client for the public finance API.
#[derive(Clone)]
pub struct YahooClient {
    http: Client,
    url: String,
}

impl YahooClient {
    pub fn new(url: String) -> Result<Self, MarketDataError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketDataSource for YahooClient {
    #[instrument(skip(self), fields(interval = %window.interval, range = window.range), level = "debug")]
    async fn fetch_series(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<PriceSeries, MarketDataError> {
        let url = format!("{}/v8/finance/chart/{}", self.url, symbol);

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("range", window.range),
                ("interval", window.interval.code()),
                ("includePrePost", "false"),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let series = parse_chart(symbol, window, status, &body)?;

        debug!(bars = series.len(), "chart fetched");

        Ok(series)
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketDataError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.url, symbol);

        let resp = self
            .http
            .get(&url)
            .query(&[("modules", "financialData,summaryDetail")])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let envelope: SummaryEnvelope = decode(symbol, status, &body)?;

        if let Some(err) = envelope.quote_summary.error {
            return Err(rejected(symbol, err));
        }

        let summary = envelope
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| MarketDataError::NoData(symbol.to_string()))?;

        Ok(Fundamentals {
            revenue_growth: summary.financial_data.revenue_growth.raw,
            gross_margins: summary.financial_data.gross_margins.raw,
            return_on_equity: summary.financial_data.return_on_equity.raw,
            trailing_pe: summary.summary_detail.trailing_pe.raw,
            debt_to_equity: summary.financial_data.debt_to_equity.raw,
        })
    }
}

/// Builds the series from a chart response of any status. The provider
/// answers unknown symbols with a 404 whose body still carries `chart.error`.
fn parse_chart(
    symbol: &str,
    window: FetchWindow,
    status: StatusCode,
    body: &str,
) -> Result<PriceSeries, MarketDataError> {
    let envelope: ChartEnvelope = decode(symbol, status, body)?;

    if let Some(err) = envelope.chart.error {
        return Err(rejected(symbol, err));
    }

    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| MarketDataError::NoData(symbol.to_string()))?;

    Ok(PriceSeries::from_raw(symbol, window.interval, raw_rows(&result)))
}

/// Decodes a JSON body. An undecodable body is reported by status when the
/// status is not a success.
fn decode<T: DeserializeOwned>(
    symbol: &str,
    status: StatusCode,
    body: &str,
) -> Result<T, MarketDataError> {
    match serde_json::from_str(body) {
        Ok(v) => Ok(v),
        Err(_) if !status.is_success() => Err(MarketDataError::Status {
            symbol: symbol.to_string(),
            status: status.as_u16(),
        }),
        Err(e) => Err(e.into()),
    }
}

fn rejected(symbol: &str, err: ProviderError) -> MarketDataError {
    if err.code.eq_ignore_ascii_case("Not Found") {
        return MarketDataError::NoData(symbol.to_string());
    }

    MarketDataError::Provider {
        symbol: symbol.to_string(),
        message: format!("{}: {}", err.code, err.description),
    }
}

/// Zips the column arrays into rows. Short columns yield missing fields,
/// which drops the row when the series is built.
fn raw_rows(result: &ChartResult) -> Vec<RawBar> {
    let cols = result.indicators.quote.first();
    let at = |v: Option<&Vec<Option<f64>>>, i: usize| v.and_then(|c| c.get(i).copied().flatten());

    result
        .timestamp
        .iter()
        .enumerate()
        .map(|(i, &ts)| RawBar {
            timestamp: DateTime::from_timestamp(ts, 0),
            open: at(cols.map(|c| &c.open), i),
            high: at(cols.map(|c| &c.high), i),
            low: at(cols.map(|c| &c.low), i),
            close: at(cols.map(|c| &c.close), i),
            volume: at(cols.map(|c| &c.volume), i),
        })
        .collect()
}
