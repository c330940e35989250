use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdvisoryError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("advisory api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("advisory api returned no text")]
    EmptyResponse,

    #[error("advisory api key not configured")]
    MissingApiKey,
}

impl AdvisoryError {
    /// Quota / throughput rejections are the only retryable failures.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AdvisoryError::RateLimited(_))
    }
}
