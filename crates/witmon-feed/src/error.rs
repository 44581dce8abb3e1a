//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider {provider} timed out after {seconds}s")]
    Timeout { provider: String, seconds: u64 },

    #[error("Market {pair} not available on provider {provider}")]
    MarketNotAvailable { provider: String, pair: String },

    #[error("No data: {0}")]
    NoData(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error(transparent)]
    Core(#[from] witmon_core::CoreError),

    #[error(transparent)]
    Rpc(#[from] witmon_rpc::RpcError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
