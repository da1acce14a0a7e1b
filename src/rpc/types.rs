/// Wire types for the JSON-RPC layer
///
/// Receipts and logs only deserialize the fields the pipeline consumes;
/// everything else in the node's response is ignored.
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub result: Option<Value>,
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Block-position fields arrive in two shapes depending on the data source:
/// explorer APIs send hex strings ("0x3f3b7a4"), node subscriptions and some
/// SDKs send plain numbers. Normalization happens in one place, here.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BlockTag {
    Number(u64),
    Text(String),
}

impl BlockTag {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            BlockTag::Number(n) => Some(*n),
            BlockTag::Text(s) => {
                if let Some(hex) = s.strip_prefix("0x") {
                    u64::from_str_radix(hex, 16).ok()
                } else {
                    s.parse::<u64>().ok()
                }
            }
        }
    }
}

/// One raw log entry, as delivered by eth_getFilterChanges, a transaction
/// receipt, or an explorer logs API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLog {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    #[serde(default, rename = "blockNumber")]
    pub block_number: Option<BlockTag>,
    /// Explorer APIs only; node subscriptions never carry a timestamp
    #[serde(default, rename = "timeStamp")]
    pub time_stamp: Option<BlockTag>,
    #[serde(default, rename = "transactionHash")]
    pub transaction_hash: Option<String>,
}

impl RawLog {
    /// Leading topic (the event signature hash), if present
    pub fn topic0(&self) -> Option<&str> {
        self.topics.first().map(|s| s.as_str())
    }

    pub fn block_number_u64(&self) -> Option<u64> {
        self.block_number.as_ref().and_then(|b| b.as_u64())
    }

    pub fn timestamp_u64(&self) -> Option<u64> {
        self.time_stamp.as_ref().and_then(|t| t.as_u64())
    }
}

/// A transaction receipt, reduced to the log set the pipeline scans
#[derive(Debug, Clone, Deserialize)]
pub struct TxReceipt {
    #[serde(default, rename = "transactionHash")]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub logs: Vec<RawLog>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_tag_parses_hex_strings() {
        let tag: BlockTag = serde_json::from_str("\"0x3f3b7a4\"").unwrap();
        assert_eq!(tag.as_u64(), Some(0x3f3b7a4));
    }

    #[test]
    fn block_tag_parses_decimal_strings() {
        let tag: BlockTag = serde_json::from_str("\"66330633\"").unwrap();
        assert_eq!(tag.as_u64(), Some(66330633));
    }

    #[test]
    fn block_tag_parses_plain_numbers() {
        let tag: BlockTag = serde_json::from_str("66330633").unwrap();
        assert_eq!(tag.as_u64(), Some(66330633));
    }

    #[test]
    fn raw_log_tolerates_missing_optional_fields() {
        let log: RawLog = serde_json::from_str(
            r#"{"address":"0xabc","topics":["0x01"],"data":"0x"}"#
        ).unwrap();
        assert_eq!(log.topic0(), Some("0x01"));
        assert!(log.block_number_u64().is_none());
        assert!(log.timestamp_u64().is_none());
    }

    #[test]
    fn receipt_deserializes_node_shaped_logs() {
        let receipt: TxReceipt = serde_json::from_str(
            r#"{
                "transactionHash": "0xdead",
                "logs": [
                    {"address":"0xabc","topics":["0x01"],"data":"0x00","blockNumber":"0x10"}
                ],
                "status": "0x1"
            }"#
        ).unwrap();
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].block_number_u64(), Some(16));
    }
}
