use std::sync::Arc;

use anyhow::Context;
use screener::{
    advisory::{AdvisoryGateway, GeminiClient},
    api::{self, AppState},
    cache::ResultCache,
    config::AppConfig,
    job::JobManager,
    logger::init_tracing,
    market_data::{MarketDataSource, YahooClient},
};
use tokio::net::TcpListener;

/// Builds the data and advisory clients and the job manager.
fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let market: Arc<dyn MarketDataSource> = Arc::new(
        YahooClient::new(cfg.market_data_url.clone()).context("building market data client")?,
    );

    if cfg.advisory_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set; advisory texts will report the missing key");
    }

    let model = GeminiClient::new(
        cfg.advisory_url.clone(),
        cfg.advisory_model.clone(),
        cfg.advisory_api_key.clone(),
    )
    .context("building advisory client")?;

    let jobs = JobManager::new(
        Arc::clone(&market),
        AdvisoryGateway::new(Arc::new(model), cfg.retry),
        ResultCache::new(cfg.cache_dir.clone()),
        cfg.tickers_path.clone(),
        cfg.job.clone(),
    );

    Ok(AppState {
        jobs,
        market,
        lookback: cfg.job.lookback,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env();
    init_tracing(cfg.json_logs);

    tracing::info!("Starting screener...");

    let state = build_state(&cfg)?;
    let app = api::router(state);

    let listener = TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;

    tracing::info!(addr = %cfg.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = ?e, "failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("http server")?;

    Ok(())
}
