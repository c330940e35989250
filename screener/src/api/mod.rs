//! HTTP surface.
//!
//! - `POST /api/analyze?force=` starts the batch job (single-flight)
//! - `GET  /api/status` polls job progress and results
//! - `GET  /api/check_stock` runs the detector on one instrument
//! - `GET  /api/check_futures` checks a futures shorthand on 1h and 5m bars
//! - `GET  /api/quote?symbols=` latest price and change per symbol
//! - `GET  /api/health`

pub mod handlers;
pub mod types;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::job::JobManager;
use crate::market_data::MarketDataSource;

#[derive(Clone)]
pub struct AppState {
    pub jobs: JobManager,
    pub market: Arc<dyn MarketDataSource>,
    /// Detector window for the futures check.
    pub lookback: usize,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/analyze", post(handlers::start_analysis))
        .route("/api/status", get(handlers::job_status))
        .route("/api/check_stock", get(handlers::check_stock))
        .route("/api/check_futures", get(handlers::check_futures))
        .route("/api/quote", get(handlers::quote))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}
