/// OrdersMatched log decoding
///
/// Most logs in a receipt are unrelated events; a non-matching leading topic
/// is the common case and returns None rather than an error.
use crate::events::types::{ OrderFill, Side };
use crate::filters::specs::ORDERS_MATCHED_TOPIC;
use crate::logger::{ self, LogTag };
use crate::rpc::types::RawLog;
use alloy_primitives::{ Address, U256 };
use chrono::Utc;

/// Parse a 20-byte address from its 0x-prefixed 40-char hex form
pub fn parse_address(s: &str) -> Option<Address> {
    let bytes = hex::decode(s.trim_start_matches("0x")).ok()?;
    if bytes.len() != 20 {
        return None;
    }
    let raw: [u8; 20] = bytes.try_into().ok()?;
    Some(Address::from(raw))
}

/// Indexed address parameters occupy the trailing 20 bytes of a 32-byte topic
pub fn parse_topic_address(topic: &str) -> Option<Address> {
    let bytes = hex::decode(topic.trim_start_matches("0x")).ok()?;
    if bytes.len() != 32 {
        return None;
    }
    let raw: [u8; 20] = bytes[12..32].try_into().ok()?;
    Some(Address::from(raw))
}

/// One 32-byte big-endian word out of the unindexed data payload
pub fn parse_data_word(data: &str, word_index: usize) -> Option<U256> {
    let clean = data.trim_start_matches("0x");
    let start = word_index * 64;
    let slice = clean.get(start..start + 64)?;
    let bytes = hex::decode(slice).ok()?;
    Some(U256::from_be_slice(&bytes))
}

/// Decode one raw log into an OrderFill.
///
/// Layout:
/// - topics[0]: event signature
/// - topics[1]: takerOrderHash (indexed)
/// - topics[2]: takerOrderMaker (indexed address)
/// - data: makerAssetId, takerAssetId, makerAmountFilled, takerAmountFilled
///   as four consecutive 32-byte big-endian words
pub fn decode_orders_matched(log: &RawLog) -> Option<OrderFill> {
    let topic0 = log.topic0()?;
    if !topic0.eq_ignore_ascii_case(ORDERS_MATCHED_TOPIC) {
        return None;
    }

    if log.topics.len() < 3 {
        logger::debug(LogTag::Decoder, "OrdersMatched log with missing indexed topics");
        return None;
    }

    let taker_order_hash = log.topics[1].to_lowercase();
    let taker_order_maker = parse_topic_address(&log.topics[2])?;

    let maker_asset_id = parse_data_word(&log.data, 0)?;
    let taker_asset_id = parse_data_word(&log.data, 1)?;
    let maker_amount_filled = parse_data_word(&log.data, 2)?;
    let taker_amount_filled = parse_data_word(&log.data, 3)?;

    let block_number = log.block_number_u64().unwrap_or(0);

    // Explorer logs carry the chain timestamp; live filter logs do not, so
    // the decode-time clock stands in as an approximation
    let timestamp = match log.timestamp_u64() {
        Some(ts) => ts as i64,
        None => Utc::now().timestamp(),
    };

    Some(OrderFill {
        taker_order_hash,
        taker_order_maker,
        maker_asset_id,
        taker_asset_id,
        maker_amount_filled,
        taker_amount_filled,
        block_number,
        timestamp,
        tx_hash: log.transaction_hash.clone().unwrap_or_default(),
        side: Side::Unknown,
    })
}

/// Every OrdersMatched event in a receipt's log set. A transaction can
/// batch several matches; zero is just as legitimate.
pub fn extract_order_fills(logs: &[RawLog]) -> Vec<OrderFill> {
    logs.iter().filter_map(decode_orders_matched).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MAKER: &str = "ab5801a7d398351b8be11c439e05c5b3259aec9b";

    fn word_from_dec(dec: &str) -> String {
        format!("{:064x}", U256::from_str_radix(dec, 10).unwrap())
    }

    fn synthetic_log(block_number: serde_json::Value, time_stamp: Option<&str>) -> RawLog {
        // makerAssetId=7, takerAssetId=9, amounts exceed 2^63
        let data = format!(
            "0x{}{}{}{}",
            word_from_dec("7"),
            word_from_dec("9"),
            word_from_dec("184467440737095516160"), // 10 * 2^64
            word_from_dec("36893488147419103232") // 2^65
        );
        let mut value =
            json!({
            "address": "0xcafe00000000000000000000000000000000cafe",
            "topics": [
                ORDERS_MATCHED_TOPIC,
                "0x1111111111111111111111111111111111111111111111111111111111111111",
                format!("0x000000000000000000000000{}", MAKER),
            ],
            "data": data,
            "blockNumber": block_number,
            "transactionHash": "0xfeedbeef",
        });
        if let Some(ts) = time_stamp {
            value["timeStamp"] = json!(ts);
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn round_trip_preserves_every_field_including_huge_amounts() {
        let log = synthetic_log(json!("0x3f3b7a4"), Some("0x674a1234"));
        let fill = decode_orders_matched(&log).expect("log should decode");

        assert_eq!(
            fill.taker_order_hash,
            "0x1111111111111111111111111111111111111111111111111111111111111111"
        );
        assert_eq!(
            crate::events::types::address_to_hex(&fill.taker_order_maker),
            format!("0x{}", MAKER)
        );
        assert_eq!(fill.maker_asset_id, U256::from(7u64));
        assert_eq!(fill.taker_asset_id, U256::from(9u64));
        assert_eq!(
            fill.maker_amount_filled.to_string(),
            "184467440737095516160"
        );
        assert_eq!(fill.taker_amount_filled.to_string(), "36893488147419103232");
        assert_eq!(fill.block_number, 0x3f3b7a4);
        assert_eq!(fill.timestamp, 0x674a1234);
        assert_eq!(fill.tx_hash, "0xfeedbeef");
        assert_eq!(fill.side, Side::Unknown);
    }

    #[test]
    fn numeric_block_number_is_normalized_like_hex() {
        let log = synthetic_log(json!(66330633), Some("1732842036"));
        let fill = decode_orders_matched(&log).unwrap();
        assert_eq!(fill.block_number, 66330633);
        assert_eq!(fill.timestamp, 1732842036);
    }

    #[test]
    fn missing_timestamp_falls_back_to_wall_clock() {
        let before = Utc::now().timestamp();
        let log = synthetic_log(json!("0x10"), None);
        let fill = decode_orders_matched(&log).unwrap();
        assert!(fill.timestamp >= before);
    }

    #[test]
    fn unrelated_topic_returns_none() {
        let mut log = synthetic_log(json!("0x10"), None);
        log.topics[0] = crate::filters::specs::TRANSFER_SINGLE_TOPIC.to_string();
        assert!(decode_orders_matched(&log).is_none());
    }

    #[test]
    fn truncated_data_returns_none() {
        let mut log = synthetic_log(json!("0x10"), None);
        log.data = "0x1234".to_string();
        assert!(decode_orders_matched(&log).is_none());
    }

    #[test]
    fn extract_collects_only_matching_logs() {
        let matching = synthetic_log(json!("0x10"), None);
        let mut other = synthetic_log(json!("0x10"), None);
        other.topics[0] = crate::filters::specs::TRANSFER_BATCH_TOPIC.to_string();
        let fills = extract_order_fills(&[other, matching.clone(), matching]);
        assert_eq!(fills.len(), 2);
    }
}
