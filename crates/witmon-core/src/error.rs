//! Error types for witmon-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid asset pair: {0}")]
    InvalidPair(String),

    #[error("Empty feed set: {0}")]
    EmptyFeedSet(String),

    #[error("Mixed asset pairs in feed set: expected {expected}, found {found}")]
    MixedPairs { expected: String, found: String },

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
