//! RPC error taxonomy.
//!
//! The distinction matters to the monitoring loop: an unanswered node
//! (refused, timed out, or rejecting our credentials) counts as
//! offline for the tick, while a well-formed JSON-RPC error means the
//! node is alive and answering.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    /// Credentials rejected by the node. Not retried.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Node is unreachable (connection refused, DNS failure).
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    /// Transport-level failure (timeout, broken pipe).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Response did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RpcError {
    /// True when the node should be treated as offline for this tick.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        matches!(
            self,
            Self::ConnectionRefused(_) | Self::Transport(_) | Self::Unauthorized(_)
        )
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
