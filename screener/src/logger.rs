use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{Span, field, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

/// Used when `RUST_LOG` is unset. Keeps the HTTP stack quiet.
const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Installs the global subscriber: compact lines for local runs, one JSON
/// object per event (with the current job span attached) in production.
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .init();
    } else {
        registry.with(fmt::layer().compact().with_target(false)).init();
    }
}

/// Root span of one analysis job.
pub fn job_span(job_id: &Uuid, force: bool) -> Span {
    tracing::info_span!(
        "analysis_job",
        job_id = %job_id,
        force,
        symbol = field::Empty
    )
}

/// Attach the instrument currently being processed to the job span.
pub fn annotate_symbol(symbol: &str) {
    Span::current().record("symbol", field::display(symbol));
}

/// Awaits an external call and warns when it overran `budget`.
pub async fn warn_if_slow<F: Future>(operation: &'static str, budget: Duration, fut: F) -> F::Output {
    let started = Instant::now();
    let out = fut.await;

    let elapsed = started.elapsed();
    if elapsed > budget {
        warn!(
            component = "job",
            event = "slow_call",
            operation,
            elapsed_ms = elapsed.as_millis() as u64,
            budget_ms = budget.as_millis() as u64,
            "external call over budget"
        );
    }

    out
}
