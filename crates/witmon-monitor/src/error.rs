//! Monitor error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Rpc(#[from] witmon_rpc::RpcError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
