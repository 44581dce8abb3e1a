//! Fan-out dispatch across configured channels.

use crate::error::NotifyResult;
use crate::notifier::Notifier;
use std::sync::Arc;
use tracing::warn;

/// Dispatches one message to every configured channel.
///
/// Failures are logged per channel and swallowed; the monitoring loop
/// never observes a delivery error.
pub struct NotificationHub {
    channels: Vec<Arc<dyn Notifier>>,
    recipients: Vec<String>,
}

impl NotificationHub {
    pub fn new(channels: Vec<Arc<dyn Notifier>>, recipients: Vec<String>) -> Self {
        Self {
            channels,
            recipients,
        }
    }

    /// Deliver `message` on every channel, best effort.
    pub async fn send(&self, message: &str, alert: bool) {
        for channel in &self.channels {
            if let Err(e) = channel.send(&self.recipients, message, alert).await {
                warn!(
                    channel = channel.name(),
                    error = %e,
                    "Notification delivery failed"
                );
            }
        }
    }
}
