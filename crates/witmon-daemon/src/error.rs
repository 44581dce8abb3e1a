//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed error: {0}")]
    Feed(#[from] witmon_feed::FeedError),

    #[error("RPC error: {0}")]
    Rpc(#[from] witmon_rpc::RpcError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] witmon_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
