//! Chart rendering for screened candidates.
//!
//! Charts are small self-contained SVG documents (candles, a dashed support
//! line at A, up-markers under the A bar and the latest bar), shipped to the
//! browser as base64 strings.

use std::fmt::Write as _;

use base64::Engine;
use market::{PriceBar, PriceSeries, StructurePoints};
use serde::{Deserialize, Serialize};

/// Bars shown per chart.
pub const CHART_BARS: usize = 90;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const PAD: f64 = 24.0;

const UP: &str = "#26a69a";
const DOWN: &str = "#ef5350";
const SUPPORT: &str = "#1e88e5";
const MARKER: &str = "#fb8c00";

/// Chart-ready candle for client-side rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartCandle {
    /// Bar open time, epoch seconds.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl From<&PriceBar> for ChartCandle {
    fn from(b: &PriceBar) -> Self {
        Self {
            time: b.timestamp.timestamp(),
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
        }
    }
}

/// Last `n` bars as chart candles.
pub fn candles(series: &PriceSeries, n: usize) -> Vec<ChartCandle> {
    series.tail(n).iter().map(ChartCandle::from).collect()
}

/// Renders the last `CHART_BARS` bars and returns the SVG base64 encoded.
///
/// `None` for an empty series.
pub fn render(series: &PriceSeries, points: Option<&StructurePoints>) -> Option<String> {
    let svg = render_svg(series, points)?;
    Some(base64::engine::general_purpose::STANDARD.encode(svg.as_bytes()))
}

pub fn render_svg(series: &PriceSeries, points: Option<&StructurePoints>) -> Option<String> {
    let bars = series.tail(CHART_BARS);
    if bars.is_empty() {
        return None;
    }

    // position of the first visible bar in the full series
    let first = series.len() - bars.len();
    let support = points.map(|p| p.support);

    let mut lo = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let mut hi = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    if let Some(a) = support {
        lo = lo.min(a.value);
        hi = hi.max(a.value);
    }
    if hi - lo <= f64::EPSILON {
        hi = lo + 1.0;
    }
    // room under the lows for markers
    lo -= (hi - lo) * 0.06;

    let slot = (WIDTH - 2.0 * PAD) / bars.len() as f64;
    let body = (slot * 0.6).max(1.0);
    let x = |i: usize| PAD + slot * (i as f64 + 0.5);
    let y = |v: f64| PAD + (hi - v) / (hi - lo) * (HEIGHT - 2.0 * PAD);

    let mut out = String::with_capacity(bars.len() * 160 + 512);

    // Writing into a String cannot fail.
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    );
    let _ = write!(out, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##);
    let _ = write!(
        out,
        r##"<text x="{PAD}" y="16" font-family="sans-serif" font-size="12" fill="#333333">{} ({})</text>"##,
        escape(series.symbol()),
        series.interval()
    );

    for (i, b) in bars.iter().enumerate() {
        let color = if b.close >= b.open { UP } else { DOWN };
        let cx = x(i);
        let top = y(b.open.max(b.close));
        let height = (y(b.open.min(b.close)) - top).max(1.0);

        let _ = write!(
            out,
            r#"<line x1="{cx:.2}" y1="{:.2}" x2="{cx:.2}" y2="{:.2}" stroke="{color}" stroke-width="1"/>"#,
            y(b.high),
            y(b.low)
        );
        let _ = write!(
            out,
            r#"<rect x="{:.2}" y="{top:.2}" width="{body:.2}" height="{height:.2}" fill="{color}"/>"#,
            cx - body / 2.0
        );
    }

    if let Some(a) = support {
        let ya = y(a.value);
        let _ = write!(
            out,
            r#"<line x1="{PAD}" y1="{ya:.2}" x2="{:.2}" y2="{ya:.2}" stroke="{SUPPORT}" stroke-width="1.5" stroke-dasharray="6 4"/>"#,
            WIDTH - PAD
        );
        let _ = write!(
            out,
            r#"<text x="{:.2}" y="{:.2}" font-family="sans-serif" font-size="11" fill="{SUPPORT}">A {:.2}</text>"#,
            WIDTH - PAD - 60.0,
            ya - 4.0,
            a.value
        );

        if let Some(i) = a.index.checked_sub(first) {
            marker(&mut out, x(i), y(bars[i].low) + 10.0);
        }
        marker(&mut out, x(bars.len() - 1), y(bars[bars.len() - 1].low) + 10.0);
    }

    out.push_str("</svg>");

    Some(out)
}

/// Upward triangle with its tip at (`cx`, `tip`).
fn marker(out: &mut String, cx: f64, tip: f64) {
    let _ = write!(
        out,
        r#"<polygon class="marker" points="{cx:.2},{tip:.2} {:.2},{:.2} {:.2},{:.2}" fill="{MARKER}"/>"#,
        cx - 5.0,
        tip + 8.0,
        cx + 5.0,
        tip + 8.0
    );
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
