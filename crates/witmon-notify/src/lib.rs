//! Best-effort notification dispatch.
//!
//! Monitoring transitions produce human-readable messages with a
//! severity; delivery channels (mail, push, webhook) implement the
//! `Notifier` capability. Dispatch is fire-and-forget from the core's
//! perspective: a failing channel is logged and never propagates into
//! the monitoring loop.

pub mod error;
pub mod hub;
pub mod notifier;

pub use error::{NotifyError, NotifyResult};
pub use hub::NotificationHub;
pub use notifier::{BoxFuture, LogNotifier, Notifier};
