//! witmon daemon: configuration and application wiring.

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, FeedsConfig, NotificationConfig};
pub use error::{AppError, AppResult};
