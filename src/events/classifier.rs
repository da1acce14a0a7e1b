/// BUY/SELL inference from settlement-token flow
///
/// The OrdersMatched event itself does not say which side the taker's maker
/// was on; the settlement token's transfers in the same transaction do. A
/// maker who received net settlement value disposed of the traded asset
/// (SELL); one who paid net value acquired it (BUY).
use crate::events::types::Side;
use crate::filters::specs::ERC20_TRANSFER_TOPIC;
use crate::rpc::types::RawLog;
use alloy_primitives::{ Address, U256 };

use super::decoder::{ parse_address, parse_topic_address };

/// One decoded settlement-token transfer
#[derive(Debug, Clone)]
pub struct SettlementTransfer {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// Decode a log as a Transfer of the settlement token; anything else is None
pub fn parse_settlement_transfer(log: &RawLog, settlement_token: &Address) -> Option<SettlementTransfer> {
    if log.topics.len() < 3 {
        return None;
    }
    if !log.topics[0].eq_ignore_ascii_case(ERC20_TRANSFER_TOPIC) {
        return None;
    }
    if parse_address(&log.address)? != *settlement_token {
        return None;
    }

    let from = parse_topic_address(&log.topics[1])?;
    let to = parse_topic_address(&log.topics[2])?;

    let clean = log.data.trim_start_matches("0x");
    let bytes = hex::decode(clean).ok()?;
    if bytes.len() > 32 {
        return None;
    }
    let value = U256::from_be_slice(&bytes);

    Some(SettlementTransfer { from, to, value })
}

/// Net settlement flow for `subject` across every log in the receipt,
/// resolved to a side by sign.
///
/// Known limitation: this conflates every settlement-token transfer in the
/// transaction, related to the match or not. A fee or unrelated transfer in
/// the same transaction skews the net flow; such cases resolve to whatever
/// the combined sign says, and an exactly offsetting set resolves to Unknown.
pub fn classify_side(logs: &[RawLog], subject: &Address, settlement_token: &Address) -> Side {
    let mut received = U256::ZERO;
    let mut sent = U256::ZERO;

    for log in logs {
        let Some(transfer) = parse_settlement_transfer(log, settlement_token) else {
            continue;
        };
        if transfer.to == *subject {
            received = received.saturating_add(transfer.value);
        }
        if transfer.from == *subject {
            sent = sent.saturating_add(transfer.value);
        }
    }

    // Net inflow: the subject was paid, so it sold. Net outflow: it paid,
    // so it bought. No settlement movement at all stays Unknown.
    if received > sent {
        Side::Sell
    } else if sent > received {
        Side::Buy
    } else {
        Side::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::specs::address_topic;
    use serde_json::json;

    const SETTLEMENT: &str = "0x55d398326f99059ff775485246999027b3197955";
    const SUBJECT: &str = "0xab5801a7d398351b8be11c439e05c5b3259aec9b";
    const OTHER: &str = "0x1111111111111111111111111111111111111111";

    fn transfer_log(token: &str, from: &str, to: &str, value: u128) -> RawLog {
        serde_json
            ::from_value(
                json!({
                    "address": token,
                    "topics": [
                        ERC20_TRANSFER_TOPIC,
                        address_topic(from),
                        address_topic(to),
                    ],
                    "data": format!("0x{:064x}", value),
                    "blockNumber": "0x10",
                    "transactionHash": "0xfeed",
                })
            )
            .unwrap()
    }

    fn subject_address() -> Address {
        parse_address(SUBJECT).unwrap()
    }

    fn settlement_address() -> Address {
        parse_address(SETTLEMENT).unwrap()
    }

    #[test]
    fn net_inflow_classifies_as_sell() {
        let logs = vec![
            transfer_log(SETTLEMENT, OTHER, SUBJECT, 100),
            transfer_log(SETTLEMENT, SUBJECT, OTHER, 30)
        ];
        assert_eq!(classify_side(&logs, &subject_address(), &settlement_address()), Side::Sell);
    }

    #[test]
    fn net_outflow_classifies_as_buy() {
        let logs = vec![transfer_log(SETTLEMENT, SUBJECT, OTHER, 50)];
        assert_eq!(classify_side(&logs, &subject_address(), &settlement_address()), Side::Buy);
    }

    #[test]
    fn no_settlement_transfers_stays_unknown() {
        let logs = vec![transfer_log(OTHER, OTHER, SUBJECT, 100)];
        assert_eq!(classify_side(&logs, &subject_address(), &settlement_address()), Side::Unknown);
    }

    #[test]
    fn offsetting_flows_stay_unknown() {
        let logs = vec![
            transfer_log(SETTLEMENT, OTHER, SUBJECT, 40),
            transfer_log(SETTLEMENT, SUBJECT, OTHER, 40)
        ];
        assert_eq!(classify_side(&logs, &subject_address(), &settlement_address()), Side::Unknown);
    }

    #[test]
    fn transfers_of_other_tokens_are_ignored() {
        let settlement_in = transfer_log(SETTLEMENT, OTHER, SUBJECT, 10);
        let unrelated_out = transfer_log(OTHER, SUBJECT, OTHER, 1_000_000);
        assert_eq!(
            classify_side(&[settlement_in, unrelated_out], &subject_address(), &settlement_address()),
            Side::Sell
        );
    }

    #[test]
    fn malformed_transfer_logs_are_skipped() {
        let mut bad = transfer_log(SETTLEMENT, OTHER, SUBJECT, 10);
        bad.topics.truncate(2);
        assert_eq!(classify_side(&[bad], &subject_address(), &settlement_address()), Side::Unknown);
    }
}
