/// Raw JSON-RPC client shared by every endpoint
///
/// One reqwest client serves all endpoints; the endpoint URL is an argument
/// to every call so the pool can route the same operation anywhere.
use crate::errors::RpcError;
use crate::rpc::types::{ RawLog, RpcResponse, TxReceipt };
use serde_json::{ json, Value };
use std::sync::atomic::{ AtomicU64, Ordering };
use std::time::Duration;

pub struct RpcClient {
    http: reqwest::Client,
    request_id: AtomicU64,
}

impl RpcClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            request_id: AtomicU64::new(1),
        })
    }

    /// POST one JSON-RPC call and unwrap the result value
    pub async fn request(
        &self,
        endpoint: &str,
        method: &str,
        params: Value
    ) -> Result<Value, RpcError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body =
            json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let response = self.http
            .post(endpoint)
            .json(&body)
            .send().await
            .map_err(|e| RpcError::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        let parsed: RpcResponse = response
            .json().await
            .map_err(|e| RpcError::MalformedResponse {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        if let Some(error) = parsed.error {
            return Err(RpcError::Rpc {
                endpoint: endpoint.to_string(),
                message: format!("{} (code {})", error.message, error.code),
            });
        }

        parsed.result.ok_or_else(|| RpcError::MalformedResponse {
            endpoint: endpoint.to_string(),
            message: "response had neither result nor error".to_string(),
        })
    }

    /// eth_blockNumber - liveness probe and general status call
    pub async fn block_number(&self, endpoint: &str) -> Result<u64, RpcError> {
        let result = self.request(endpoint, "eth_blockNumber", json!([])).await?;
        let hex = result.as_str().ok_or_else(|| RpcError::MalformedResponse {
            endpoint: endpoint.to_string(),
            message: "eth_blockNumber returned non-string".to_string(),
        })?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16).map_err(|e| {
            RpcError::MalformedResponse {
                endpoint: endpoint.to_string(),
                message: format!("invalid block number hex {}: {}", hex, e),
            }
        })
    }

    /// eth_getTransactionReceipt - None when the node does not know the hash yet
    pub async fn get_transaction_receipt(
        &self,
        endpoint: &str,
        tx_hash: &str
    ) -> Result<Option<TxReceipt>, RpcError> {
        let result = self.request(endpoint, "eth_getTransactionReceipt", json!([tx_hash])).await?;
        if result.is_null() {
            return Ok(None);
        }
        let receipt: TxReceipt = serde_json
            ::from_value(result)
            .map_err(|e| RpcError::MalformedResponse {
                endpoint: endpoint.to_string(),
                message: format!("receipt did not deserialize: {}", e),
            })?;
        Ok(Some(receipt))
    }

    /// eth_newFilter - install a log filter, returns the node-local filter id
    pub async fn new_filter(&self, endpoint: &str, filter: Value) -> Result<String, RpcError> {
        let result = self.request(endpoint, "eth_newFilter", json!([filter])).await?;
        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| RpcError::MalformedResponse {
                endpoint: endpoint.to_string(),
                message: "eth_newFilter returned non-string id".to_string(),
            })
    }

    /// eth_getFilterChanges - drain logs accumulated since the last poll
    pub async fn get_filter_changes(
        &self,
        endpoint: &str,
        filter_id: &str
    ) -> Result<Vec<RawLog>, RpcError> {
        let result = self.request(endpoint, "eth_getFilterChanges", json!([filter_id])).await?;
        serde_json::from_value(result).map_err(|e| RpcError::MalformedResponse {
            endpoint: endpoint.to_string(),
            message: format!("filter changes did not deserialize: {}", e),
        })
    }

    /// eth_uninstallFilter - best-effort teardown of a node-local filter
    pub async fn uninstall_filter(
        &self,
        endpoint: &str,
        filter_id: &str
    ) -> Result<bool, RpcError> {
        let result = self.request(endpoint, "eth_uninstallFilter", json!([filter_id])).await?;
        Ok(result.as_bool().unwrap_or(false))
    }
}
