//! Multi-source price-feed aggregation for witmon.
//!
//! Heterogeneous quote sources implement the `FeedProvider` capability
//! and are assembled into a static `ProviderRegistry` at startup. Each
//! feed cycle fans the configured markets out onto a bounded worker
//! pool (`FeedPoller`), survives individual provider failures, appends
//! aggregates into per-asset bounded history, and lets the
//! `PublishSchedule` decide when the medians are committed on-chain via
//! `FeedPublisher`. `FeedController` composes the whole cycle.

pub mod controller;
pub mod error;
pub mod history;
pub mod http_provider;
pub mod poller;
pub mod provider;
pub mod publisher;
pub mod registry;
pub mod schedule;

pub use controller::{FeedController, FeedControllerConfig};
pub use error::{FeedError, FeedResult};
pub use history::PriceHistory;
pub use http_provider::{JsonHttpProvider, JsonHttpProviderConfig};
pub use poller::{FeedPoller, PollerConfig};
pub use provider::{BoxFuture, FeedProvider};
pub use publisher::{FeedPublisher, PublishOutcome};
pub use registry::{ProviderHealthSnapshot, ProviderRegistry};
pub use schedule::{PublishSchedule, ScheduleConfig};
