/// Logical filter specifications
///
/// A spec is a (contract address, topic pattern) tuple derived once from
/// configuration. Several are in force simultaneously so the same class of
/// transfer is captured under every encoding the chain uses for it.
use serde_json::{ json, Value };

/// OrdersMatched(bytes32 indexed takerOrderHash, address indexed takerOrderMaker,
///               uint256 makerAssetId, uint256 takerAssetId,
///               uint256 makerAmountFilled, uint256 takerAmountFilled)
pub const ORDERS_MATCHED_TOPIC: &str =
    "0x63bf4d16b7fa898ef4c4b2b6d90fd201e9c56313b65638af6088d149d2ce956c";

/// ERC-1155 TransferSingle(address indexed operator, address indexed from,
///                         address indexed to, uint256 id, uint256 value)
pub const TRANSFER_SINGLE_TOPIC: &str =
    "0xc3d58168c5ae7397731d063d5bbf3d657854427343f4c083240f7aacaa2d0f62";

/// ERC-1155 TransferBatch(address indexed operator, address indexed from,
///                        address indexed to, uint256[] ids, uint256[] values)
pub const TRANSFER_BATCH_TOPIC: &str =
    "0x4a39dc06d4c0dbc64b70af90fd698a233a518aa5d07e595d983b8c0526c8f7fb";

/// ERC-20 Transfer(address indexed from, address indexed to, uint256 value)
pub const ERC20_TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// Which filter set the scheduler maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorMode {
    /// All events emitted by the target contract
    Contract,
    /// All ERC-1155 transfers touching the target address, both orientations
    Transfer,
    /// ERC-1155 transfer events emitted by the target contract
    ContractTransfer,
}

impl MonitorMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "contract" => Some(MonitorMode::Contract),
            "transfer" => Some(MonitorMode::Transfer),
            "contract-transfer" => Some(MonitorMode::ContractTransfer),
            _ => None,
        }
    }
}

/// One logical subscription descriptor. Immutable after construction.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    pub address: Option<String>,
    /// Topic pattern; None entries are wildcards
    pub topics: Vec<Option<String>>,
}

impl FilterSpec {
    /// The eth_newFilter parameter object for this spec
    pub fn to_params(&self) -> Value {
        let topics: Vec<Value> = self.topics
            .iter()
            .map(|t| {
                match t {
                    Some(topic) => json!(topic),
                    None => Value::Null,
                }
            })
            .collect();

        let mut params = json!({ "fromBlock": "latest" });
        if let Some(address) = &self.address {
            params["address"] = json!(address);
        }
        if !topics.is_empty() {
            params["topics"] = json!(topics);
        }
        params
    }
}

/// Convert an address into its 32-byte indexed-topic form (left-zero-padded)
pub fn address_topic(address: &str) -> String {
    let stripped = address.trim_start_matches("0x").to_lowercase();
    format!("0x{:0>64}", stripped)
}

/// Build the filter set for a mode, mirroring every encoding of the
/// transfer class the mode cares about.
pub fn filter_specs(mode: MonitorMode, target_address: &str) -> Vec<FilterSpec> {
    let target = target_address.to_lowercase();

    match mode {
        MonitorMode::Contract => {
            vec![FilterSpec {
                address: Some(target),
                topics: vec![],
            }]
        }
        MonitorMode::Transfer => {
            let topic = address_topic(&target);
            // from=target and to=target orientations, single and batch variants
            vec![
                FilterSpec {
                    address: None,
                    topics: vec![Some(TRANSFER_SINGLE_TOPIC.to_string()), None, Some(topic.clone())],
                },
                FilterSpec {
                    address: None,
                    topics: vec![
                        Some(TRANSFER_SINGLE_TOPIC.to_string()),
                        None,
                        None,
                        Some(topic.clone())
                    ],
                },
                FilterSpec {
                    address: None,
                    topics: vec![Some(TRANSFER_BATCH_TOPIC.to_string()), None, Some(topic.clone())],
                },
                FilterSpec {
                    address: None,
                    topics: vec![Some(TRANSFER_BATCH_TOPIC.to_string()), None, None, Some(topic)],
                }
            ]
        }
        MonitorMode::ContractTransfer => {
            vec![
                FilterSpec {
                    address: Some(target.clone()),
                    topics: vec![Some(TRANSFER_SINGLE_TOPIC.to_string())],
                },
                FilterSpec {
                    address: Some(target),
                    topics: vec![Some(TRANSFER_BATCH_TOPIC.to_string())],
                }
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_topic_pads_to_32_bytes() {
        let topic = address_topic("0x55d398326f99059fF775485246999027B3197955");
        assert_eq!(topic.len(), 66);
        assert_eq!(
            topic,
            "0x00000000000000000000000055d398326f99059ff775485246999027b3197955"
        );
    }

    #[test]
    fn transfer_mode_covers_both_orientations_of_both_variants() {
        let specs = filter_specs(MonitorMode::Transfer, "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B");
        assert_eq!(specs.len(), 4);
        // from-orientation puts the address in topic slot 2, to-orientation in slot 3
        assert!(specs[0].topics[2].is_some() && specs[0].topics.len() == 3);
        assert!(specs[1].topics[3].is_some() && specs[1].topics.len() == 4);
    }

    #[test]
    fn contract_transfer_mode_scopes_to_the_contract() {
        let specs = filter_specs(MonitorMode::ContractTransfer, "0xDEAD00000000000000000000000000000000BEEF");
        assert_eq!(specs.len(), 2);
        for spec in &specs {
            assert_eq!(
                spec.address.as_deref(),
                Some("0xdead00000000000000000000000000000000beef")
            );
        }
    }

    #[test]
    fn spec_params_serialize_with_latest_from_block() {
        let specs = filter_specs(MonitorMode::Contract, "0xDEAD00000000000000000000000000000000BEEF");
        let params = specs[0].to_params();
        assert_eq!(params["fromBlock"], "latest");
        assert_eq!(params["address"], "0xdead00000000000000000000000000000000beef");
    }
}
