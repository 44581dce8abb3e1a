//! Immutable node description.
//!
//! Deliberately separate from the live `NodeClient`: configuration is
//! a value, the RPC capability is a handle, and the two are composed
//! where needed instead of carried by one duck-typed object.

use serde::{Deserialize, Serialize};

/// Role a monitored node plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Block-producing witness/delegate node.
    #[default]
    Witness,
    /// Plain seed/API node, no production duties.
    Seed,
}

/// Static configuration of one monitored node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Display name used in notifications and logs.
    pub name: String,
    /// RPC endpoint URL.
    pub rpc_url: String,
    /// Role of this node.
    #[serde(default)]
    pub role: NodeRole,
    /// Node group; each group runs its own monitoring loop. Nodes
    /// without a group each form a group of their own.
    #[serde(default)]
    pub group: Option<String>,
    /// Witness account name, for missed-block and voted-in tracking.
    /// Only meaningful for `NodeRole::Witness`.
    #[serde(default)]
    pub witness_name: Option<String>,
    /// Track wallet open/locked state on this node.
    #[serde(default)]
    pub monitor_wallet: bool,
    /// Track voted-in (active vs standby) state.
    #[serde(default)]
    pub monitor_voting: bool,
    /// This node carries the feed-publication duty for its group.
    #[serde(default)]
    pub publish_feeds: bool,
}

impl NodeConfig {
    /// True when this node's witness account should be queried at all.
    #[must_use]
    pub fn tracks_witness(&self) -> bool {
        self.role == NodeRole::Witness && self.witness_name.is_some()
    }
}
