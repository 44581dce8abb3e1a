//! Node RPC surface for witmon.
//!
//! The monitoring core never talks to a blockchain client directly; it
//! consumes the `NodeClient` capability, which is a fallible
//! `call(method, params) -> JSON` with a small error taxonomy. This
//! crate provides:
//! - the `NodeClient` trait and typed views over common results
//! - `HttpNodeClient`, a JSON-RPC 2.0 implementation over HTTP
//! - `RpcCache`, the per-tick response memo owned by a monitoring loop
//! - `NodeConfig`, the immutable node description separated from the
//!   live client

pub mod cache;
pub mod client;
pub mod error;
pub mod http;
pub mod node;

pub use cache::RpcCache;
pub use client::{BoxFuture, NodeClient, NodeInfo, WitnessInfo};
pub use error::{RpcError, RpcResult};
pub use http::HttpNodeClient;
pub use node::{NodeConfig, NodeRole};
