//! NodeClient capability trait and typed result views.
//!
//! Trait-based abstraction over the blockchain client's RPC interface.
//! This allows for:
//! - Dependency injection for testing
//! - Separation of monitoring logic from transport
//! - The per-tick cache wrapping any implementation uniformly

use crate::error::{RpcError, RpcResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Health-relevant slice of the node's `get_info` result.
///
/// Unknown fields are ignored; absent fields fall back to defaults so
/// that a node running a slightly different client version still
/// yields a usable observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Number of active p2p connections.
    #[serde(default)]
    pub network_num_connections: u32,
    /// Age of the head block in seconds, if the node reports one.
    #[serde(default)]
    pub blockchain_head_block_age: Option<i64>,
    /// Whether a wallet is open on this node.
    #[serde(default)]
    pub wallet_open: bool,
    /// Whether the open wallet is unlocked.
    #[serde(default)]
    pub wallet_unlocked: bool,
    /// Client software version string, if the node reports one.
    #[serde(default)]
    pub client_version: Option<String>,
}

/// Health-relevant slice of a witness object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WitnessInfo {
    /// Lifetime count of blocks this witness failed to produce.
    /// Monotonically non-decreasing.
    #[serde(default)]
    pub total_missed: u64,
    /// Whether the witness is currently voted into the active set.
    #[serde(default)]
    pub is_active: bool,
}

/// Fallible RPC capability of a blockchain client node.
///
/// Implementations own transport details; consumers only see JSON
/// values or an `RpcError`.
pub trait NodeClient: Send + Sync {
    /// Issue a single RPC call.
    fn call<'a>(&'a self, method: &'a str, params: Vec<Value>) -> BoxFuture<'a, RpcResult<Value>>;

    /// Fetch and decode the node's health info.
    fn get_info(&self) -> BoxFuture<'_, RpcResult<NodeInfo>> {
        Box::pin(async move {
            let value = self.call("get_info", Vec::new()).await?;
            serde_json::from_value(value).map_err(RpcError::from)
        })
    }

    /// Fetch and decode the witness object for the given account.
    fn get_witness<'a>(&'a self, witness: &'a str) -> BoxFuture<'a, RpcResult<WitnessInfo>> {
        Box::pin(async move {
            let value = self
                .call("get_witness", vec![Value::String(witness.to_string())])
                .await?;
            serde_json::from_value(value).map_err(RpcError::from)
        })
    }
}
