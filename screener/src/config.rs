use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::advisory::RetryPolicy;
use crate::job::JobConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Address the HTTP API listens on.
    pub bind_addr: SocketAddr,

    /// JSON log output instead of the pretty development format.
    pub json_logs: bool,

    // =========================
    // External services
    // =========================
    /// Base URL of the chart / quote-summary data provider.
    pub market_data_url: String,

    /// Base URL of the generative-language API.
    pub advisory_url: String,

    /// Model used for the per-candidate advisory text.
    pub advisory_model: String,

    /// API key for the advisory model. Without one every advisory call
    /// fails fast and the result carries an error-tagged text.
    pub advisory_api_key: Option<String>,

    // =========================
    // Job configuration
    // =========================
    /// Newline-delimited instrument universe.
    pub tickers_path: PathBuf,

    /// Directory holding the date-keyed result cache files.
    pub cache_dir: PathBuf,

    pub job: JobConfig,

    /// Rate-limit retry and throttle settings of the advisory gateway.
    pub retry: RetryPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let host: IpAddr = std::env::var("BIND_HOST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8001);

        let json_logs = std::env::var("APP_ENV").unwrap_or_default() == "production";

        Self {
            bind_addr: SocketAddr::new(host, port),
            json_logs,

            market_data_url: env_or("YAHOO_BASE_URL", "https://query1.finance.yahoo.com"),
            advisory_url: env_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            advisory_model: env_or("GEMINI_MODEL", "gemini-2.5-flash"),
            advisory_api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),

            tickers_path: PathBuf::from(env_or("TICKERS_PATH", "tickers.txt")),
            cache_dir: PathBuf::from(env_or("CACHE_DIR", ".")),

            // Job defaults:
            // - 50 symbols per download request
            // - advisory calls for the 20 candidates closest to support
            job: JobConfig::default(),

            // Advisory defaults:
            // - 3 attempts on rate limiting, 20s then 40s backoff
            // - 1s pause after every call
            retry: RetryPolicy {
                max_attempts: 3,
                rate_limit_backoff: Duration::from_secs(20),
                throttle: Duration::from_secs(1),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
