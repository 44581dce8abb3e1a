//! Per-node health tracking.
//!
//! One `NodeHealthTracker` per monitored node, holding a debounced
//! `StableStateMonitor` per aspect plus the missed-block counter.
//! Observations come in from the monitoring loop; transition edges
//! come out as `HealthEvent`s ready for notification dispatch.
//! Negative transitions are alert severity, recoveries informational.

use crate::stable_state::StableStateMonitor;
use serde::{Deserialize, Serialize};
use witmon_rpc::{NodeInfo, WitnessInfo};

fn default_debounce_window() -> usize {
    3
}
fn default_min_connections() -> u32 {
    5
}
fn default_max_head_block_age_secs() -> i64 {
    60
}

/// Tracker tuning, shared by all nodes of a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Consecutive identical observations required before a state is
    /// authoritative.
    #[serde(default = "default_debounce_window")]
    pub debounce_window: usize,
    /// Below this connection count a node is considered starved.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Head block older than this means the node is out of sync.
    #[serde(default = "default_max_head_block_age_secs")]
    pub max_head_block_age_secs: i64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            debounce_window: default_debounce_window(),
            min_connections: default_min_connections(),
            max_head_block_age_secs: default_max_head_block_age_secs(),
        }
    }
}

/// A transition worth telling someone about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthEvent {
    pub message: String,
    /// True for negative transitions (offline, starved, missed block,
    /// voted out); false for recoveries.
    pub alert: bool,
}

impl HealthEvent {
    fn alert(message: String) -> Self {
        Self {
            message,
            alert: true,
        }
    }

    fn info(message: String) -> Self {
        Self {
            message,
            alert: false,
        }
    }
}

/// Debounced health state of one node.
pub struct NodeHealthTracker {
    node_name: String,
    config: TrackerConfig,
    online: StableStateMonitor<bool>,
    connected: StableStateMonitor<bool>,
    synced: StableStateMonitor<bool>,
    wallet_open: StableStateMonitor<bool>,
    wallet_unlocked: StableStateMonitor<bool>,
    voted_in: StableStateMonitor<bool>,
    producing: StableStateMonitor<bool>,
    version: StableStateMonitor<String>,
    /// Missed count as of the last tick, to detect increases.
    last_seen_missed: Option<u64>,
    /// Missed count we last notified about. Only a strict increase
    /// past this value re-notifies; an ongoing streak at the same
    /// count stays silent.
    last_notified_missed: Option<u64>,
}

impl NodeHealthTracker {
    pub fn new(node_name: impl Into<String>, config: TrackerConfig) -> Self {
        let n = config.debounce_window;
        Self {
            node_name: node_name.into(),
            config,
            online: StableStateMonitor::new(n),
            connected: StableStateMonitor::new(n),
            synced: StableStateMonitor::new(n),
            wallet_open: StableStateMonitor::new(n),
            wallet_unlocked: StableStateMonitor::new(n),
            voted_in: StableStateMonitor::new(n),
            producing: StableStateMonitor::new(n),
            version: StableStateMonitor::new(n),
            last_seen_missed: None,
            last_notified_missed: None,
        }
    }

    /// The node did not answer this tick. Only the online monitor
    /// advances; every other aspect's work is skipped so the offline
    /// observation still debounces while derived metrics stay zeroed.
    pub fn observe_offline(&mut self) -> Vec<HealthEvent> {
        let mut events = Vec::new();
        self.online.push(false);
        if self.online.just_changed() {
            events.push(HealthEvent::alert(format!(
                "Node {} is offline",
                self.node_name
            )));
        }
        events
    }

    /// The node answered `get_info` this tick.
    pub fn observe_info(&mut self, info: &NodeInfo, monitor_wallet: bool) -> Vec<HealthEvent> {
        let mut events = Vec::new();

        self.online.push(true);
        if self.online.just_changed() {
            events.push(HealthEvent::info(format!(
                "Node {} is back online",
                self.node_name
            )));
        }

        self.connected
            .push(info.network_num_connections >= self.config.min_connections);
        if self.connected.just_changed() {
            match self.connected.stable_state() {
                Some(true) => events.push(HealthEvent::info(format!(
                    "Node {} has enough connections again ({})",
                    self.node_name, info.network_num_connections
                ))),
                _ => events.push(HealthEvent::alert(format!(
                    "Node {} is connection-starved ({} connections, need {})",
                    self.node_name, info.network_num_connections, self.config.min_connections
                ))),
            }
        }

        if let Some(age) = info.blockchain_head_block_age {
            self.synced.push(age <= self.config.max_head_block_age_secs);
            if self.synced.just_changed() {
                match self.synced.stable_state() {
                    Some(true) => events.push(HealthEvent::info(format!(
                        "Node {} is in sync again",
                        self.node_name
                    ))),
                    _ => events.push(HealthEvent::alert(format!(
                        "Node {} blockchain is stale (head block age {age}s)",
                        self.node_name
                    ))),
                }
            }
        }

        if let Some(version) = &info.client_version {
            self.version.push(version.clone());
            // A version change is never an outage; it usually means an
            // upgrade landed.
            if self.version.just_changed() {
                events.push(HealthEvent::info(format!(
                    "Node {} is now running client version {version}",
                    self.node_name
                )));
            }
        }

        if monitor_wallet {
            self.wallet_open.push(info.wallet_open);
            if self.wallet_open.just_changed() {
                match self.wallet_open.stable_state() {
                    Some(true) => events.push(HealthEvent::info(format!(
                        "Wallet on node {} is open",
                        self.node_name
                    ))),
                    _ => events.push(HealthEvent::alert(format!(
                        "Wallet on node {} was closed",
                        self.node_name
                    ))),
                }
            }

            self.wallet_unlocked.push(info.wallet_unlocked);
            if self.wallet_unlocked.just_changed() {
                match self.wallet_unlocked.stable_state() {
                    Some(true) => events.push(HealthEvent::info(format!(
                        "Wallet on node {} is unlocked",
                        self.node_name
                    ))),
                    _ => events.push(HealthEvent::alert(format!(
                        "Wallet on node {} is locked",
                        self.node_name
                    ))),
                }
            }
        }

        events
    }

    /// The witness object was fetched this tick.
    pub fn observe_witness(
        &mut self,
        witness_name: &str,
        witness: &WitnessInfo,
        monitor_voting: bool,
    ) -> Vec<HealthEvent> {
        let mut events = Vec::new();

        if monitor_voting {
            self.voted_in.push(witness.is_active);
            if self.voted_in.just_changed() {
                match self.voted_in.stable_state() {
                    Some(true) => events.push(HealthEvent::info(format!(
                        "Witness {witness_name} ({}) has been voted in (active)",
                        self.node_name
                    ))),
                    _ => events.push(HealthEvent::alert(format!(
                        "Witness {witness_name} ({}) has been voted out (standby)",
                        self.node_name
                    ))),
                }
            }
        }

        events.extend(self.observe_missed(witness_name, witness.total_missed));
        events
    }

    /// Missed-block tracking. Not purely debounced: each *strict
    /// increase* of the monotonic counter past the last-notified value
    /// alerts immediately, while the same ongoing count never alerts
    /// twice. The debounced producing monitor additionally reports a
    /// sustained miss streak and its recovery.
    fn observe_missed(&mut self, witness_name: &str, total_missed: u64) -> Vec<HealthEvent> {
        let mut events = Vec::new();

        let missed_this_tick = self
            .last_seen_missed
            .is_some_and(|seen| total_missed > seen);
        self.last_seen_missed = Some(total_missed);

        match self.last_notified_missed {
            // First observation is the baseline, never an alert.
            None => self.last_notified_missed = Some(total_missed),
            Some(notified) if total_missed > notified => {
                events.push(HealthEvent::alert(format!(
                    "Witness {witness_name} ({}) missed {} more block(s), {total_missed} total",
                    self.node_name,
                    total_missed - notified
                )));
                self.last_notified_missed = Some(total_missed);
            }
            Some(_) => {}
        }

        self.producing.push(!missed_this_tick);
        if self.producing.just_changed() {
            match self.producing.stable_state() {
                Some(true) => events.push(HealthEvent::info(format!(
                    "Witness {witness_name} ({}) resumed block production",
                    self.node_name
                ))),
                _ => events.push(HealthEvent::alert(format!(
                    "Witness {witness_name} ({}) is in a sustained miss streak",
                    self.node_name
                ))),
            }
        }

        events
    }

    /// Debounced online state, if established.
    pub fn is_online(&self) -> Option<bool> {
        self.online.stable_state().copied()
    }
}
