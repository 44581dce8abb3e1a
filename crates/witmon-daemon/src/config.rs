//! Application configuration.
//!
//! TOML file with per-field defaults. Malformed specs (unparseable
//! time slot, publish node without a witness account, empty sections)
//! fail at load, never inside the monitoring loop.

use crate::error::{AppError, AppResult};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use witmon_feed::{JsonHttpProviderConfig, PollerConfig};
use witmon_monitor::TrackerConfig;
use witmon_rpc::NodeConfig;

fn default_check_interval_secs() -> u64 {
    60
}
fn default_median_time_span_secs() -> u64 {
    1800
}

/// Notification settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Recipients passed to every channel.
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Feed aggregation and publication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Base symbol all feeds are quoted against.
    pub base: String,
    /// Assets to track and publish.
    pub assets: Vec<String>,
    /// Default consistency tolerance (relative standard deviation).
    #[serde(default)]
    pub tolerance: Option<f64>,
    /// Per-asset tolerance overrides.
    #[serde(default)]
    pub asset_tolerance: HashMap<String, f64>,
    /// Span of the median window in seconds.
    #[serde(default = "default_median_time_span_secs")]
    pub median_time_span_secs: u64,
    /// Publish every N feed checks.
    #[serde(default)]
    pub publish_every_n_checks: Option<u64>,
    /// Publish when this many seconds elapsed since the last
    /// publication.
    #[serde(default)]
    pub publish_interval_secs: Option<u64>,
    /// Publish once per day at this UTC time, `"HH:MM"`.
    #[serde(default)]
    pub publish_time_slot: Option<String>,
    /// Publish when a median moved by more than this relative fraction
    /// since the last publication.
    #[serde(default)]
    pub publish_deviation: Option<f64>,
    /// Polling behavior (concurrency, timeouts, retry, stale budget).
    #[serde(default)]
    pub poller: PollerConfig,
    /// Quote providers, assembled into the registry at startup.
    pub providers: Vec<JsonHttpProviderConfig>,
}

impl FeedsConfig {
    /// Parse the daily publication slot, if configured.
    pub fn time_slot(&self) -> AppResult<Option<NaiveTime>> {
        self.publish_time_slot
            .as_deref()
            .map(|s| {
                NaiveTime::parse_from_str(s, "%H:%M")
                    .map_err(|e| AppError::Config(format!("bad publish_time_slot {s:?}: {e}")))
            })
            .transpose()
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Seconds between monitoring ticks.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Debounce and threshold tuning for health tracking.
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// Notification settings.
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Monitored nodes.
    pub nodes: Vec<NodeConfig>,
    /// Feed aggregation, absent when no node publishes feeds.
    #[serde(default)]
    pub feeds: Option<FeedsConfig>,
}

impl AppConfig {
    /// Load from a TOML file and validate.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read config {path:?}: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed to parse config {path:?}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Fail-fast validation of everything that would otherwise only
    /// surface mid-loop.
    pub fn validate(&self) -> AppResult<()> {
        if self.check_interval_secs == 0 {
            return Err(AppError::Config("check_interval_secs must be > 0".into()));
        }
        if self.nodes.is_empty() {
            return Err(AppError::Config("no nodes configured".into()));
        }

        let publishers: Vec<&NodeConfig> =
            self.nodes.iter().filter(|n| n.publish_feeds).collect();

        match &self.feeds {
            Some(feeds) => {
                if feeds.assets.is_empty() {
                    return Err(AppError::Config("feeds.assets is empty".into()));
                }
                if feeds.providers.is_empty() {
                    return Err(AppError::Config("feeds.providers is empty".into()));
                }
                feeds.time_slot()?;
                if feeds.publish_deviation.is_some_and(|d| d <= 0.0) {
                    return Err(AppError::Config(
                        "feeds.publish_deviation must be > 0".into(),
                    ));
                }
                if publishers.is_empty() {
                    return Err(AppError::Config(
                        "feeds configured but no node has publish_feeds".into(),
                    ));
                }
                for node in &publishers {
                    if node.witness_name.is_none() {
                        return Err(AppError::Config(format!(
                            "node {:?} publishes feeds but has no witness_name",
                            node.name
                        )));
                    }
                }
            }
            None => {
                if !publishers.is_empty() {
                    return Err(AppError::Config(
                        "a node has publish_feeds but no [feeds] section exists".into(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Nodes partitioned into groups; ungrouped nodes form singleton
    /// groups named after themselves.
    pub fn node_groups(&self) -> Vec<(String, Vec<NodeConfig>)> {
        let mut groups: Vec<(String, Vec<NodeConfig>)> = Vec::new();
        for node in &self.nodes {
            let key = node.group.clone().unwrap_or_else(|| node.name.clone());
            match groups.iter_mut().find(|(name, _)| *name == key) {
                Some((_, members)) => members.push(node.clone()),
                None => groups.push((key, vec![node.clone()])),
            }
        }
        groups
    }
}
