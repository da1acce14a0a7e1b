/// Ingestion orchestration
///
/// Consumes deduplicated raw detections from the scheduler, pulls the full
/// transaction receipt through the endpoint pool, and turns every
/// OrdersMatched event in it into a classified, persisted record. A receipt
/// that cannot be fetched after the pool exhausts its endpoints is dropped
/// with an error log; there is no persistent retry queue.
use crate::database::OrderDatabase;
use crate::events::classifier::classify_side;
use crate::events::decoder::extract_order_fills;
use crate::events::types::{ address_to_hex, OrderFill };
use crate::filters::specs::{
    ORDERS_MATCHED_TOPIC,
    TRANSFER_BATCH_TOPIC,
    TRANSFER_SINGLE_TOPIC,
};
use crate::logger::{ self, LogTag };
use crate::rpc::pool::RpcPool;
use crate::rpc::types::RawLog;
use crate::utils::short_hash;
use alloy_primitives::Address;
use std::sync::Arc;
use tokio::sync::{ mpsc, Notify };

/// Decode every OrdersMatched event in a receipt's log set and label each
/// fill from the settlement flow of the same receipt.
pub fn process_receipt(logs: &[RawLog], settlement_token: &Address) -> Vec<OrderFill> {
    let mut fills = extract_order_fills(logs);
    for fill in &mut fills {
        fill.side = classify_side(logs, &fill.taker_order_maker, settlement_token);
    }
    fills
}

/// Detections worth a receipt fetch: transfer events in either encoding,
/// or the match event itself when a contract-wide filter reports it directly
fn is_relevant_detection(topic: &str) -> bool {
    topic.eq_ignore_ascii_case(TRANSFER_SINGLE_TOPIC) ||
        topic.eq_ignore_ascii_case(TRANSFER_BATCH_TOPIC) ||
        topic.eq_ignore_ascii_case(ORDERS_MATCHED_TOPIC)
}

/// Process one deduplicated detection end to end
pub async fn handle_detection(
    log: RawLog,
    pool: Arc<RpcPool>,
    db: Arc<OrderDatabase>,
    settlement_token: Address
) {
    let Some(topic0) = log.topic0() else {
        logger::debug(LogTag::Monitor, "Detection without topics, skipping");
        return;
    };
    if !is_relevant_detection(topic0) {
        logger::debug(LogTag::Monitor, &format!("Ignoring unrelated event {}", short_hash(topic0)));
        return;
    }

    let Some(tx_hash) = log.transaction_hash.clone() else {
        logger::debug(LogTag::Monitor, "Detection without transaction hash, skipping");
        return;
    };

    logger::debug(
        LogTag::Monitor,
        &format!("Fetching receipt for {} to look for order matches", short_hash(&tx_hash))
    );

    let receipt = match pool.get_transaction_receipt(&tx_hash).await {
        Ok(Some(receipt)) => receipt,
        Ok(None) => {
            logger::warning(
                LogTag::Monitor,
                &format!("No receipt available for {}, dropping detection", short_hash(&tx_hash))
            );
            return;
        }
        Err(e) => {
            logger::error(
                LogTag::Monitor,
                &format!("Receipt fetch failed for {}: {}", short_hash(&tx_hash), e)
            );
            return;
        }
    };

    let fills = process_receipt(&receipt.logs, &settlement_token);
    if fills.is_empty() {
        logger::debug(
            LogTag::Monitor,
            &format!("No OrdersMatched events in {}", short_hash(&tx_hash))
        );
        return;
    }

    logger::info(
        LogTag::Monitor,
        &format!("Found {} order match(es) in {}", fills.len(), short_hash(&tx_hash))
    );

    for fill in fills {
        match db.insert_order(&fill) {
            Ok(true) => {
                logger::info(
                    LogTag::Monitor,
                    &format!(
                        "Stored order {} maker={} side={} block={}",
                        short_hash(&fill.taker_order_hash),
                        address_to_hex(&fill.taker_order_maker),
                        fill.side,
                        fill.block_number
                    )
                );
            }
            Ok(false) => {
                logger::debug(
                    LogTag::Monitor,
                    &format!("Order {} already stored", short_hash(&fill.taker_order_hash))
                );
            }
            Err(e) => {
                logger::error(
                    LogTag::Monitor,
                    &format!("Error storing order {}: {}", short_hash(&fill.taker_order_hash), e)
                );
            }
        }
    }
}

/// Ingestion loop: one spawned task per detection so several receipt
/// fetches can be in flight while the loop keeps draining the channel.
pub async fn run_ingestion(
    mut detections: mpsc::Receiver<RawLog>,
    pool: Arc<RpcPool>,
    db: Arc<OrderDatabase>,
    settlement_token: Address,
    shutdown: Arc<Notify>
) {
    logger::info(LogTag::Monitor, "Ingestion pipeline started");

    // One registration for the whole loop so a notification can never fall
    // between two select iterations
    let stopped = shutdown.notified();
    tokio::pin!(stopped);

    loop {
        tokio::select! {
            _ = &mut stopped => {
                break;
            }
            maybe_log = detections.recv() => {
                match maybe_log {
                    Some(log) => {
                        tokio::spawn(
                            handle_detection(
                                log,
                                Arc::clone(&pool),
                                Arc::clone(&db),
                                settlement_token
                            )
                        );
                    }
                    None => {
                        logger::debug(LogTag::Monitor, "Detection channel closed");
                        break;
                    }
                }
            }
        }
    }

    logger::info(LogTag::Monitor, "Ingestion pipeline stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::TxDedup;
    use crate::events::decoder::parse_address;
    use crate::events::types::Side;
    use crate::filters::specs::{ address_topic, ERC20_TRANSFER_TOPIC };
    use alloy_primitives::U256;
    use serde_json::json;
    use std::time::Duration;

    const SETTLEMENT: &str = "0x55d398326f99059ff775485246999027b3197955";
    const MAKER: &str = "0xab5801a7d398351b8be11c439e05c5b3259aec9b";
    const COUNTERPARTY: &str = "0x1111111111111111111111111111111111111111";

    fn orders_matched_log(order_hash_byte: u8, tx_hash: &str) -> RawLog {
        let data = format!(
            "0x{:064x}{:064x}{:064x}{:064x}",
            7u64,
            9u64,
            u128::MAX, // far past 2^63
            500u64
        );
        serde_json
            ::from_value(
                json!({
                    "address": "0xcafe00000000000000000000000000000000cafe",
                    "topics": [
                        ORDERS_MATCHED_TOPIC,
                        format!("0x{:064x}", order_hash_byte),
                        address_topic(MAKER),
                    ],
                    "data": data,
                    "blockNumber": "0x20",
                    "transactionHash": tx_hash,
                })
            )
            .unwrap()
    }

    fn settlement_transfer_log(from: &str, to: &str, value: u64, tx_hash: &str) -> RawLog {
        serde_json
            ::from_value(
                json!({
                    "address": SETTLEMENT,
                    "topics": [
                        ERC20_TRANSFER_TOPIC,
                        address_topic(from),
                        address_topic(to),
                    ],
                    "data": format!("0x{:064x}", value),
                    "blockNumber": "0x20",
                    "transactionHash": tx_hash,
                })
            )
            .unwrap()
    }

    #[test]
    fn one_receipt_can_yield_multiple_fills_sharing_a_side() {
        let tx = "0xfeedbeef";
        let logs = vec![
            orders_matched_log(1, tx),
            settlement_transfer_log(COUNTERPARTY, MAKER, 1_000, tx),
            orders_matched_log(2, tx)
        ];

        let fills = process_receipt(&logs, &parse_address(SETTLEMENT).unwrap());
        assert_eq!(fills.len(), 2);
        for fill in &fills {
            assert_eq!(fill.side, Side::Sell);
            assert_eq!(fill.maker_amount_filled, U256::from(u128::MAX));
        }
        assert_ne!(fills[0].taker_order_hash, fills[1].taker_order_hash);
    }

    #[test]
    fn receipt_without_matches_yields_nothing() {
        let tx = "0xfeedbeef";
        let logs = vec![settlement_transfer_log(COUNTERPARTY, MAKER, 1_000, tx)];
        assert!(process_receipt(&logs, &parse_address(SETTLEMENT).unwrap()).is_empty());
    }

    /// End to end without the network: detection -> dedup gate ->
    /// receipt processing -> idempotent persistence. A repeat detection of
    /// the same transaction inside the window stores nothing new.
    #[test]
    fn repeated_detection_within_window_stores_no_additional_records() {
        let dir = tempfile::tempdir().unwrap();
        let db = OrderDatabase::open(dir.path().join("orders.db").to_str().unwrap()).unwrap();
        let dedup = TxDedup::new(Duration::from_secs(60));
        let settlement = parse_address(SETTLEMENT).unwrap();

        let tx = "0xfeedbeef";
        let receipt_logs = vec![
            orders_matched_log(1, tx),
            settlement_transfer_log(COUNTERPARTY, MAKER, 1_000, tx),
            orders_matched_log(2, tx)
        ];

        let mut stored = 0;
        for _ in 0..2 {
            if !dedup.check_and_mark(tx) {
                continue;
            }
            for fill in process_receipt(&receipt_logs, &settlement) {
                if db.insert_order(&fill).unwrap() {
                    stored += 1;
                }
            }
        }

        assert_eq!(stored, 2);
        assert_eq!(db.total_orders().unwrap(), 2);
    }

    #[test]
    fn unrelated_detection_topics_are_not_relevant() {
        assert!(is_relevant_detection(TRANSFER_SINGLE_TOPIC));
        assert!(is_relevant_detection(TRANSFER_BATCH_TOPIC));
        assert!(is_relevant_detection(ORDERS_MATCHED_TOPIC));
        assert!(!is_relevant_detection(ERC20_TRANSFER_TOPIC));
    }
}
