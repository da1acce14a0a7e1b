/// SQLite order store
///
/// Inserts are idempotent on the taker order hash (UNIQUE + INSERT OR
/// IGNORE), which is what makes at-most-once delivery within a run safe to
/// combine with redundant detection across runs.
use crate::events::types::{ address_to_hex, OrderFill, Side };
use crate::logger::{ self, LogTag };
use anyhow::{ Context, Result };
use rusqlite::{ params, Connection };
use std::path::Path;
use std::sync::Mutex;

pub struct OrderDatabase {
    conn: Mutex<Connection>,
}

/// Outcome of a batch insert
#[derive(Debug, Clone, Default)]
pub struct BatchInsertResult {
    pub inserted: usize,
    pub max_block_number: u64,
}

/// One stored order row, string-typed the way it is persisted
#[derive(Debug, Clone)]
pub struct StoredOrder {
    pub taker_order_hash: String,
    pub taker_order_maker: String,
    pub maker_asset_id: String,
    pub taker_asset_id: String,
    pub maker_amount_filled: String,
    pub taker_amount_filled: String,
    pub block_number: u64,
    pub timestamp: i64,
    pub tx_hash: String,
    pub side: String,
}

/// Periodic observational snapshot persisted next to the orders
#[derive(Debug, Clone)]
pub struct PoolStatsSnapshot {
    pub healthy_endpoints: usize,
    pub active_slots: usize,
    pub dedup_cache_size: usize,
    pub total_orders: u64,
}

impl OrderDatabase {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs
                    ::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory {:?}", parent))?;
            }
        }

        let conn = Connection::open(path).with_context(||
            format!("Failed to open database at {}", path)
        )?;

        conn.pragma_update(None, "journal_mode", "WAL").context("Failed to set journal mode")?;
        conn
            .pragma_update(None, "synchronous", "NORMAL")
            .context("Failed to set synchronous mode")?;
        conn
            .busy_timeout(std::time::Duration::from_millis(5_000))
            .context("Failed to set busy timeout")?;

        let db = Self { conn: Mutex::new(conn) };
        db.init_schema()?;

        logger::info(LogTag::Database, &format!("Order database ready at {}", path));
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");

        conn
            .execute(
                "CREATE TABLE IF NOT EXISTS orders (
                id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                taker_order_hash     TEXT    NOT NULL UNIQUE,
                taker_order_maker    TEXT    NOT NULL,
                maker_asset_id       TEXT    NOT NULL,
                taker_asset_id       TEXT    NOT NULL,
                maker_amount_filled  TEXT    NOT NULL,
                taker_amount_filled  TEXT    NOT NULL,
                block_number         INTEGER NOT NULL,
                timestamp            INTEGER NOT NULL,
                tx_hash              TEXT    NOT NULL,
                side                 TEXT    NOT NULL DEFAULT 'UNKNOWN',
                created_at           INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
                []
            )
            .context("Failed to create orders table")?;

        conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_orders_maker_asset ON orders(maker_asset_id)",
                []
            )
            .context("Failed to create maker asset index")?;
        conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_orders_taker_asset ON orders(taker_asset_id)",
                []
            )
            .context("Failed to create taker asset index")?;
        conn
            .execute("CREATE INDEX IF NOT EXISTS idx_orders_block ON orders(block_number)", [])
            .context("Failed to create block index")?;
        conn
            .execute("CREATE INDEX IF NOT EXISTS idx_orders_timestamp ON orders(timestamp)", [])
            .context("Failed to create timestamp index")?;

        conn
            .execute(
                "CREATE TABLE IF NOT EXISTS pool_stats (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                recorded_at       INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
                healthy_endpoints INTEGER NOT NULL,
                active_slots      INTEGER NOT NULL,
                dedup_cache_size  INTEGER NOT NULL,
                total_orders      INTEGER NOT NULL
            )",
                []
            )
            .context("Failed to create pool_stats table")?;

        Ok(())
    }

    /// Insert one order. Returns true when the row was new, false when the
    /// order hash was already stored.
    pub fn insert_order(&self, fill: &OrderFill) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO orders
                (taker_order_hash, taker_order_maker, maker_asset_id, taker_asset_id,
                 maker_amount_filled, taker_amount_filled, block_number, timestamp, tx_hash, side)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    fill.taker_order_hash,
                    address_to_hex(&fill.taker_order_maker),
                    fill.maker_asset_id.to_string(),
                    fill.taker_asset_id.to_string(),
                    fill.maker_amount_filled.to_string(),
                    fill.taker_amount_filled.to_string(),
                    fill.block_number,
                    fill.timestamp,
                    fill.tx_hash,
                    fill.side.as_str()
                ]
            )
            .context("Failed to insert order")?;
        Ok(changed > 0)
    }

    /// Insert many orders inside one transaction. Per-row failures are
    /// logged and skipped so one bad record cannot sink a backfill batch.
    pub fn batch_insert_orders(&self, fills: &[OrderFill]) -> Result<BatchInsertResult> {
        if fills.is_empty() {
            return Ok(BatchInsertResult::default());
        }

        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction().context("Failed to open insert transaction")?;
        let mut result = BatchInsertResult::default();

        for fill in fills {
            let insert = tx.execute(
                "INSERT OR IGNORE INTO orders
                (taker_order_hash, taker_order_maker, maker_asset_id, taker_asset_id,
                 maker_amount_filled, taker_amount_filled, block_number, timestamp, tx_hash, side)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    fill.taker_order_hash,
                    address_to_hex(&fill.taker_order_maker),
                    fill.maker_asset_id.to_string(),
                    fill.taker_asset_id.to_string(),
                    fill.maker_amount_filled.to_string(),
                    fill.taker_amount_filled.to_string(),
                    fill.block_number,
                    fill.timestamp,
                    fill.tx_hash,
                    fill.side.as_str()
                ]
            );
            match insert {
                Ok(changed) => {
                    if changed > 0 {
                        result.inserted += 1;
                        result.max_block_number = result.max_block_number.max(fill.block_number);
                    }
                }
                Err(e) => {
                    logger::error(
                        LogTag::Database,
                        &format!("Error inserting order {}: {}", fill.taker_order_hash, e)
                    );
                }
            }
        }

        tx.commit().context("Failed to commit insert transaction")?;
        Ok(result)
    }

    pub fn update_order_side(&self, taker_order_hash: &str, side: Side) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn
            .execute(
                "UPDATE orders SET side = ?1 WHERE taker_order_hash = ?2",
                params![side.as_str(), taker_order_hash]
            )
            .context("Failed to update order side")?;
        Ok(())
    }

    pub fn orders_by_asset_id(&self, asset_id: &str) -> Result<Vec<StoredOrder>> {
        self.orders_by_asset_ids(std::slice::from_ref(&asset_id.to_string()))
    }

    pub fn orders_by_asset_ids(&self, asset_ids: &[String]) -> Result<Vec<StoredOrder>> {
        if asset_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (1..=asset_ids.len())
            .map(|i| format!("?{}", i))
            .collect();
        let placeholders = placeholders.join(",");
        let query = format!(
            "SELECT taker_order_hash, taker_order_maker, maker_asset_id, taker_asset_id,
                    maker_amount_filled, taker_amount_filled, block_number, timestamp, tx_hash, side
             FROM orders
             WHERE maker_asset_id IN ({placeholders}) OR taker_asset_id IN ({placeholders})
             ORDER BY timestamp ASC"
        );

        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&query).context("Failed to prepare asset query")?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(asset_ids.iter()), |row| {
                Ok(StoredOrder {
                    taker_order_hash: row.get(0)?,
                    taker_order_maker: row.get(1)?,
                    maker_asset_id: row.get(2)?,
                    taker_asset_id: row.get(3)?,
                    maker_amount_filled: row.get(4)?,
                    taker_amount_filled: row.get(5)?,
                    block_number: row.get(6)?,
                    timestamp: row.get(7)?,
                    tx_hash: row.get(8)?,
                    side: row.get(9)?,
                })
            })
            .context("Failed to run asset query")?;

        let mut orders = Vec::new();
        for row in rows {
            orders.push(row.context("Failed to read order row")?);
        }
        Ok(orders)
    }

    pub fn latest_block_number(&self) -> Result<u64> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let max: Option<u64> = conn
            .query_row("SELECT MAX(block_number) FROM orders", [], |row| row.get(0))
            .context("Failed to read max block number")?;
        Ok(max.unwrap_or(0))
    }

    pub fn total_orders(&self) -> Result<u64> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count: u64 = conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .context("Failed to count orders")?;
        Ok(count)
    }

    pub fn record_pool_stats(&self, snapshot: &PoolStatsSnapshot) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn
            .execute(
                "INSERT INTO pool_stats
                (healthy_endpoints, active_slots, dedup_cache_size, total_orders)
                VALUES (?1, ?2, ?3, ?4)",
                params![
                    snapshot.healthy_endpoints as i64,
                    snapshot.active_slots as i64,
                    snapshot.dedup_cache_size as i64,
                    snapshot.total_orders
                ]
            )
            .context("Failed to record pool stats")?;
        Ok(())
    }
}
