use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::FutureExt;
use market::{Fundamentals, Interval, PriceSeries, StructurePoints};
use tracing::{debug, error, info, warn};

use crate::advisory::Rating;
use crate::chart;
use crate::job::manager::JobContext;
use crate::job::status::{ResultRecord, format_distance};
use crate::job::load_universe;
use crate::logger::{annotate_symbol, warn_if_slow};
use crate::market_data::FetchWindow;
use crate::time::today;

/// Analysis progress is published every this many symbols.
const ANALYZE_PROGRESS_EVERY: usize = 50;

const SLOW_CHUNK: Duration = Duration::from_secs(60);
const SLOW_FUNDAMENTALS: Duration = Duration::from_secs(10);

/// A series that passed the detector.
struct Candidate<'a> {
    series: &'a PriceSeries,
    points: StructurePoints,
    distance: f64,
}

/// Job task body. Every error and panic ends in the `error` state, so the
/// job never stays `running`.
pub(crate) async fn run(ctx: Arc<JobContext>, force: bool) {
    match AssertUnwindSafe(execute(&ctx, force)).catch_unwind().await {
        Ok(Ok(())) => info!(component = "job", event = "finish", "analysis job completed"),
        Ok(Err(e)) => {
            error!(component = "job", event = "failure", error = ?e, "analysis job failed");
            ctx.fail(format!("{e:#}"));
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!(component = "job", event = "panic", %reason, "analysis job panicked");
            ctx.fail(format!("job panicked: {reason}"));
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

async fn execute(ctx: &JobContext, force: bool) -> anyhow::Result<()> {
    let date = today();

    if !force {
        ctx.set_progress("Reading from cache...");
        match ctx.cache.load(date).await {
            Ok(Some(records)) => {
                info!(count = records.len(), %date, "serving cached results");
                ctx.complete("Loaded from cache", Some(records));
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "cache unreadable; recomputing"),
        }
    }

    ctx.set_progress("Loading tickers...");
    let universe = load_universe(&ctx.tickers_path, &ctx.config.mandatory)
        .await
        .context("loading instrument universe")?;
    let symbols = universe.symbols();

    let fetched = download(ctx, &symbols).await;

    let picks = select_candidates(ctx, &fetched);
    ctx.set_progress(format!("AI Diagnosis for top {} candidates...", picks.len()));

    for (i, pick) in picks.iter().enumerate() {
        let symbol = pick.series.symbol();
        ctx.set_progress(format!("AI Analyzing {}/{}: {symbol}", i + 1, picks.len()));
        annotate_symbol(symbol);

        let record = build_record(ctx, pick).await;
        ctx.push_result(record);
    }

    let results = ctx.results();
    if !results.is_empty() {
        ctx.cache
            .store(date, &results)
            .await
            .context("writing result cache")?;
    }

    ctx.complete(format!("Done: {} candidates", results.len()), None);

    Ok(())
}

/// Chunked daily download. Failed chunks are logged and skipped; the output
/// keeps universe order.
async fn download(ctx: &JobContext, symbols: &[String]) -> Vec<PriceSeries> {
    let window = FetchWindow::for_interval(Interval::Daily);
    let chunk_size = ctx.config.chunk_size.max(1);
    let total_batches = symbols.len().div_ceil(chunk_size);

    ctx.set_progress(format!("Starting download for {} stocks...", symbols.len()));

    let mut out = Vec::with_capacity(symbols.len());

    for (i, chunk) in symbols.chunks(chunk_size).enumerate() {
        let batch = i + 1;
        ctx.set_progress(format!(
            "Downloading batch {batch}/{total_batches} ({} stocks)...",
            chunk.len()
        ));

        match warn_if_slow("fetch_chunk", SLOW_CHUNK, ctx.market.fetch_chunk(chunk, window)).await {
            Ok(mut by_symbol) => {
                out.extend(chunk.iter().filter_map(|s| by_symbol.remove(s)));
                debug!(batch, total = out.len(), "batch processed");
            }
            Err(e) => warn!(batch, error = %e, "batch download failed; skipped"),
        }
    }

    out
}

/// Runs the detector over every series and keeps the `top_n` passing ones
/// closest to support.
fn select_candidates<'a>(ctx: &JobContext, fetched: &'a [PriceSeries]) -> Vec<Candidate<'a>> {
    let total = fetched.len();
    let mut candidates = Vec::new();

    for (i, series) in fetched.iter().enumerate() {
        if i % ANALYZE_PROGRESS_EVERY == 0 {
            ctx.set_progress(format!("Processing technical analysis: {i}/{total}"));
        }

        let verdict = market::pattern::analyze(series, ctx.config.lookback);
        if !verdict.passed {
            continue;
        }

        match (verdict.points, verdict.distance()) {
            (Some(points), Some(distance)) if distance.is_finite() => candidates.push(Candidate {
                series,
                points,
                distance,
            }),
            _ => debug!(symbol = series.symbol(), "passing verdict without distance skipped"),
        }
    }

    candidates.sort_by(|a, b| a.distance.abs().total_cmp(&b.distance.abs()));
    candidates.truncate(ctx.config.top_n);

    info!(passed = candidates.len(), screened = total, "candidates selected");

    candidates
}

async fn build_record(ctx: &JobContext, pick: &Candidate<'_>) -> ResultRecord {
    let symbol = pick.series.symbol();

    let fundamentals = match warn_if_slow(
        "fetch_fundamentals",
        SLOW_FUNDAMENTALS,
        ctx.market.fetch_fundamentals(symbol),
    )
    .await
    {
        Ok(f) => f,
        Err(e) => {
            warn!(%symbol, error = %e, "fundamentals unavailable");
            Fundamentals::default()
        }
    };

    let advice = ctx.advisory.advise(symbol, &fundamentals, pick.distance).await;
    let chart = chart::render(pick.series, Some(&pick.points));

    ResultRecord {
        symbol: symbol.to_string(),
        dist: format_distance(pick.distance),
        distance: pick.distance,
        status: Rating::from_advice(&advice),
        advice,
        chart,
        points: Some(pick.points),
    }
}
