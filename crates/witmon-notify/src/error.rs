//! Notification error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Invalid recipients: {0}")]
    InvalidRecipients(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;
