//! JSON-RPC 2.0 client over HTTP.
//!
//! Concrete `NodeClient` for blockchain clients exposing an HTTP RPC
//! endpoint. One bounded-timeout POST per call; no session state.

use crate::client::{BoxFuture, NodeClient};
use crate::error::{RpcError, RpcResult};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

/// `NodeClient` over JSON-RPC 2.0 HTTP POST.
pub struct HttpNodeClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpNodeClient {
    /// Create a client for the given RPC endpoint with the default
    /// timeout.
    pub fn new(url: impl Into<String>) -> RpcResult<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit per-call timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> RpcResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    fn map_reqwest_error(e: reqwest::Error) -> RpcError {
        if e.is_connect() {
            RpcError::ConnectionRefused(e.to_string())
        } else if e.is_timeout() {
            RpcError::Transport(format!("request timed out: {e}"))
        } else {
            RpcError::Transport(e.to_string())
        }
    }
}

impl NodeClient for HttpNodeClient {
    fn call<'a>(&'a self, method: &'a str, params: Vec<Value>) -> BoxFuture<'a, RpcResult<Value>> {
        Box::pin(async move {
            let request = JsonRpcRequest {
                jsonrpc: "2.0",
                method,
                params,
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
            };

            let response = self
                .client
                .post(&self.url)
                .json(&request)
                .send()
                .await
                .map_err(Self::map_reqwest_error)?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(RpcError::Unauthorized(format!("HTTP {status}")));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(RpcError::Transport(format!("HTTP {status}: {body}")));
            }

            let body: JsonRpcResponse = response
                .json()
                .await
                .map_err(|e| RpcError::Transport(format!("failed to parse response: {e}")))?;

            if let Some(err) = body.error {
                // Some clients report auth failures inside the RPC
                // error object rather than via HTTP status.
                if err.message.to_lowercase().contains("unauthorized") {
                    return Err(RpcError::Unauthorized(err.message));
                }
                return Err(RpcError::Rpc(format!("{} (code {})", err.message, err.code)));
            }

            body.result
                .ok_or_else(|| RpcError::Rpc("response carried neither result nor error".into()))
        })
    }
}
