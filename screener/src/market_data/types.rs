use serde::Deserialize;

// ---------- chart endpoint ----------

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub chart: ChartBody,
}

#[derive(Debug, Deserialize)]
pub struct ChartBody {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    /// Epoch seconds, one per bar.
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteColumns>,
}

/// Column-oriented OHLCV. Gaps come through as `null`.
#[derive(Debug, Default, Deserialize)]
pub struct QuoteColumns {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

// ---------- quote summary endpoint ----------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEnvelope {
    pub quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
pub struct SummaryBody {
    #[serde(default)]
    pub result: Option<Vec<SummaryResult>>,
    #[serde(default)]
    pub error: Option<ProviderError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    #[serde(default)]
    pub financial_data: FinancialData,
    #[serde(default)]
    pub summary_detail: SummaryDetail,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialData {
    #[serde(default)]
    pub revenue_growth: RawNumber,
    #[serde(default)]
    pub gross_margins: RawNumber,
    #[serde(default)]
    pub return_on_equity: RawNumber,
    #[serde(default)]
    pub debt_to_equity: RawNumber,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDetail {
    #[serde(default, rename = "trailingPE")]
    pub trailing_pe: RawNumber,
}

/// `{"raw": 0.12, "fmt": "12%"}`; missing values come as `{}`.
#[derive(Debug, Default, Deserialize)]
pub struct RawNumber {
    #[serde(default)]
    pub raw: Option<f64>,
}
