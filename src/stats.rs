/// Periodic operational stats
///
/// Purely observational: one log line per interval plus a snapshot row in
/// the pool_stats table. The one alarm condition surfaced here is a fully
/// dark slot table while the scheduler believes it is running.
use crate::database::{ OrderDatabase, PoolStatsSnapshot };
use crate::dedup::TxDedup;
use crate::filters::scheduler::FilterScheduler;
use crate::logger::{ self, LogTag };
use crate::rpc::pool::RpcPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub async fn run_stats_loop(
    scheduler: Arc<FilterScheduler>,
    pool: Arc<RpcPool>,
    dedup: Arc<TxDedup>,
    db: Arc<OrderDatabase>,
    interval: Duration,
    shutdown: Arc<Notify>
) {
    let stopped = shutdown.notified();
    tokio::pin!(stopped);

    loop {
        tokio::select! {
            _ = &mut stopped => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let scheduler_stats = scheduler.stats();
        let healthy_endpoints = pool.healthy_count();
        let dedup_cache_size = dedup.len();
        let total_orders = match db.total_orders() {
            Ok(count) => count,
            Err(e) => {
                logger::warning(LogTag::Stats, &format!("Could not count orders: {}", e));
                0
            }
        };

        logger::info(
            LogTag::Stats,
            &format!(
                "{}/{} filters active, {}/{} endpoints healthy, {} txs cached, {} orders stored",
                scheduler_stats.active_slots,
                scheduler_stats.total_slots,
                healthy_endpoints,
                pool.endpoint_count(),
                dedup_cache_size,
                total_orders
            )
        );

        if
            scheduler.is_running() &&
            scheduler_stats.total_slots > 0 &&
            scheduler_stats.active_slots == 0
        {
            logger::error(
                LogTag::Stats,
                "All filter slots are dark - no events will be observed until a refresh succeeds"
            );
        }

        let snapshot = PoolStatsSnapshot {
            healthy_endpoints,
            active_slots: scheduler_stats.active_slots,
            dedup_cache_size,
            total_orders,
        };
        if let Err(e) = db.record_pool_stats(&snapshot) {
            logger::warning(LogTag::Stats, &format!("Could not record stats snapshot: {}", e));
        }
    }

    logger::debug(LogTag::Stats, "Stats loop stopped");
}
