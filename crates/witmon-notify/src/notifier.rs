//! Notifier capability trait.

use crate::error::NotifyResult;
use std::pin::Pin;
use tracing::{info, warn};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// A delivery channel for monitoring notifications.
pub trait Notifier: Send + Sync {
    /// Channel name for logging.
    fn name(&self) -> &str;

    /// Deliver `message` to `recipients`. `alert` marks negative
    /// transitions (offline, missed block); false means informational.
    fn send<'a>(
        &'a self,
        recipients: &'a [String],
        message: &'a str,
        alert: bool,
    ) -> BoxFuture<'a, NotifyResult<()>>;
}

/// Channel that only writes through the log. Always configured as a
/// fallback so transitions remain visible with no other channel set up.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn send<'a>(
        &'a self,
        _recipients: &'a [String],
        message: &'a str,
        alert: bool,
    ) -> BoxFuture<'a, NotifyResult<()>> {
        Box::pin(async move {
            if alert {
                warn!(target: "witmon::notify", "{message}");
            } else {
                info!(target: "witmon::notify", "{message}");
            }
            Ok(())
        })
    }
}
