//! Per-tick RPC response cache.
//!
//! Owned by the monitoring loop of a single node, never shared across
//! nodes. Within one tick, identical calls are answered from the memo
//! so independent health probes don't re-issue the same `get_info`;
//! the owning loop calls `invalidate()` at the start of every tick so
//! no value is ever served across ticks. Errors are never cached.

use crate::client::NodeClient;
use crate::error::RpcResult;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// Memoizes successful RPC responses for the duration of one tick.
#[derive(Default)]
pub struct RpcCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl RpcCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all memoized responses. Called once per tick before any
    /// of that tick's calls are issued.
    pub fn invalidate(&self) {
        self.entries.lock().clear();
    }

    /// Issue `method(params)` through `client`, memoizing the result.
    pub async fn call(
        &self,
        client: &dyn NodeClient,
        method: &str,
        params: Vec<Value>,
    ) -> RpcResult<Value> {
        let key = format!("{method}:{}", Value::Array(params.clone()));

        if let Some(hit) = self.entries.lock().get(&key).cloned() {
            return Ok(hit);
        }

        let value = client.call(method, params).await?;
        self.entries.lock().insert(key, value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BoxFuture;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingClient {
        calls: AtomicU32,
    }

    impl NodeClient for CountingClient {
        fn call<'a>(
            &'a self,
            _method: &'a str,
            _params: Vec<Value>,
        ) -> BoxFuture<'a, RpcResult<Value>> {
            Box::pin(async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "call": n }))
            })
        }
    }

    #[tokio::test]
    async fn memoizes_within_a_tick() {
        let cache = RpcCache::new();
        let client = CountingClient {
            calls: AtomicU32::new(0),
        };

        let a = cache.call(&client, "get_info", vec![]).await.unwrap();
        let b = cache.call(&client, "get_info", vec![]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_call() {
        let cache = RpcCache::new();
        let client = CountingClient {
            calls: AtomicU32::new(0),
        };

        let a = cache.call(&client, "get_info", vec![]).await.unwrap();
        cache.invalidate();
        let b = cache.call(&client, "get_info", vec![]).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_params_are_distinct_entries() {
        let cache = RpcCache::new();
        let client = CountingClient {
            calls: AtomicU32::new(0),
        };

        cache
            .call(&client, "get_witness", vec![json!("a")])
            .await
            .unwrap();
        cache
            .call(&client, "get_witness", vec![json!("b")])
            .await
            .unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }
}
