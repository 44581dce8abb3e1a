//! Debounced node-state monitoring.
//!
//! Raw RPC polling is noisy: timeouts and transient network blips
//! would fire a false alert on every hiccup. Every monitored aspect
//! therefore runs through a `StableStateMonitor`, which only reports a
//! transition after N consecutive identical observations.
//! `NodeHealthTracker` owns the per-node monitors and formats
//! notifications; `MonitoringLoop` drives one node group at a fixed
//! tick and never dies on a tick failure.

pub mod error;
pub mod health;
pub mod monitoring;
pub mod stable_state;

pub use error::{MonitorError, MonitorResult};
pub use health::{HealthEvent, NodeHealthTracker, TrackerConfig};
pub use monitoring::{MonitoredNode, MonitoringLoop};
pub use stable_state::StableStateMonitor;
