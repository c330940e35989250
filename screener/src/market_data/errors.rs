use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} for {symbol}")]
    Status { symbol: String, status: u16 },

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("provider rejected {symbol}: {message}")]
    Provider { symbol: String, message: String },

    #[error("no usable data for {0}")]
    NoData(String),

    #[error("all {0} symbols of the chunk failed")]
    ChunkFailed(usize),
}
