//! Per node-group monitoring loop.
//!
//! One loop per node group, running as an independent long-lived task.
//! Each tick: invalidate the node's RPC cache, poll health, push
//! observations into the trackers, dispatch transition notifications,
//! then run the feed duty (if any) for this group. No error inside a
//! tick may terminate the loop, and no node's failure may affect
//! another node's processing in the same tick.

use crate::error::MonitorResult;
use crate::health::{HealthEvent, NodeHealthTracker, TrackerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use witmon_feed::FeedController;
use witmon_notify::NotificationHub;
use witmon_rpc::{NodeClient, NodeConfig, NodeInfo, RpcCache, WitnessInfo};

/// A node under monitoring: immutable config composed with its live
/// client, plus the loop-owned cache and tracker.
pub struct MonitoredNode {
    config: NodeConfig,
    client: Arc<dyn NodeClient>,
    cache: RpcCache,
    tracker: NodeHealthTracker,
}

impl MonitoredNode {
    pub fn new(config: NodeConfig, client: Arc<dyn NodeClient>, tracker: TrackerConfig) -> Self {
        let tracker = NodeHealthTracker::new(config.name.clone(), tracker);
        Self {
            config,
            client,
            cache: RpcCache::new(),
            tracker,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}

/// Monitoring loop over one node group.
pub struct MonitoringLoop {
    nodes: Vec<MonitoredNode>,
    hub: Arc<NotificationHub>,
    feeds: Option<Arc<FeedController>>,
    check_interval: Duration,
}

impl MonitoringLoop {
    pub fn new(
        nodes: Vec<MonitoredNode>,
        hub: Arc<NotificationHub>,
        feeds: Option<Arc<FeedController>>,
        check_interval: Duration,
    ) -> Self {
        Self {
            nodes,
            hub,
            feeds,
            check_interval,
        }
    }

    /// Run until process shutdown. A tick that takes longer than the
    /// interval delays the next one instead of bursting.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            nodes = self.nodes.len(),
            interval_secs = self.check_interval.as_secs(),
            "Monitoring loop started"
        );

        loop {
            interval.tick().await;
            self.tick_all().await;
        }
    }

    /// One full tick over the group. Public so tests can drive the
    /// loop without real time.
    pub async fn tick_all(&mut self) {
        let mut any_online_publisher = None;

        for (idx, node) in self.nodes.iter_mut().enumerate() {
            match Self::tick_node(node, &self.hub).await {
                Ok(online) => {
                    if online && node.config.publish_feeds && any_online_publisher.is_none() {
                        any_online_publisher = Some(idx);
                    }
                }
                Err(e) => {
                    // Tick failures are logged, never fatal.
                    warn!(node = %node.config.name, error = %e, "Monitoring tick failed");
                }
            }
        }

        if let (Some(controller), Some(idx)) = (&self.feeds, any_online_publisher) {
            let node = &self.nodes[idx];
            if let Some(outcome) = controller.run_cycle(&*node.client).await {
                debug!(
                    node = %node.config.name,
                    published = outcome.published.len(),
                    failed = outcome.failed.len(),
                    "Feed publication round finished"
                );
            }
        }
    }

    /// Poll one node's health and dispatch any transition events.
    /// Returns whether the node answered this tick.
    async fn tick_node(node: &mut MonitoredNode, hub: &NotificationHub) -> MonitorResult<bool> {
        // Stale-read prevention: nothing from the previous tick may be
        // served again, but within this tick identical calls memoize.
        node.cache.invalidate();

        let mut events: Vec<HealthEvent> = Vec::new();

        let online = match node.cache.call(&*node.client, "get_info", Vec::new()).await {
            Ok(value) => {
                let info: NodeInfo = serde_json::from_value(value)?;
                events.extend(node.tracker.observe_info(&info, node.config.monitor_wallet));
                true
            }
            Err(e) => {
                debug!(node = %node.config.name, error = %e, "Node did not answer get_info");
                events.extend(node.tracker.observe_offline());
                false
            }
        };

        // Offline: every other sub-monitor's work for this tick is
        // skipped; the offline observation above keeps debouncing.
        if online && node.config.tracks_witness() {
            if let Some(witness_name) = node.config.witness_name.clone() {
                let params = vec![serde_json::Value::String(witness_name.clone())];
                match node.cache.call(&*node.client, "get_witness", params).await {
                    Ok(value) => {
                        let witness: WitnessInfo = serde_json::from_value(value)?;
                        events.extend(node.tracker.observe_witness(
                            &witness_name,
                            &witness,
                            node.config.monitor_voting,
                        ));
                    }
                    Err(e) => {
                        warn!(
                            node = %node.config.name,
                            witness = %witness_name,
                            error = %e,
                            "Failed to fetch witness object"
                        );
                    }
                }
            }
        }

        for event in events {
            hub.send(&event.message, event.alert).await;
        }

        Ok(online)
    }
}
