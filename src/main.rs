use matchbot::{
    arguments::{ self, get_arg_value, patterns, print_help },
    config::Config,
    database::OrderDatabase,
    dedup::TxDedup,
    events::decoder::parse_address,
    filters::{ filter_specs, FilterScheduler, MonitorMode, RpcTransport, SchedulerConfig },
    logger::{ self, LogTag },
    monitor,
    rpc::{ connect_providers, RpcClient, RpcPool },
    stats,
};
use anyhow::{ Context, Result };
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{ mpsc, Notify };

/// Main entry point for matchbot
///
/// Runs the full monitoring pipeline: endpoint pool, rotating filter
/// scheduler, dedup gate, ingestion, persistence and periodic stats.
#[tokio::main]
async fn main() {
    // Ensure all directories exist BEFORE logger initialization
    // (Logger needs the logs directory to create log files)
    if let Err(e) = matchbot::paths::ensure_all_directories() {
        eprintln!("Failed to create required directories: {}", e);
        std::process::exit(1);
    }

    logger::init();

    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "🚀 matchbot starting up...");
    arguments::print_debug_info();

    let config_path = get_arg_value("--config").unwrap_or_else(|| "config.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            logger::error(LogTag::System, &format!("Failed to load {}: {:#}", config_path, e));
            std::process::exit(1);
        }
    };

    match run_monitor(config).await {
        Ok(_) => {
            logger::info(LogTag::System, "✅ matchbot shut down cleanly");
        }
        Err(e) => {
            logger::error(LogTag::System, &format!("❌ matchbot failed: {:#}", e));
            logger::flush();
            std::process::exit(1);
        }
    }

    logger::flush();
}

async fn run_monitor(config: Config) -> Result<()> {
    let settlement_token = parse_address(&config.settlement.token_address).context(
        "settlement.token_address is not a valid address"
    )?;
    let mode = MonitorMode::parse(&config.contract.monitor_mode).context(
        "contract.monitor_mode is not a known mode"
    )?;

    logger::info(LogTag::System, &format!("Contract: {}", config.contract.address));
    logger::info(
        LogTag::System,
        &format!("Monitoring mode: {}", config.contract.monitor_mode)
    );

    let db = Arc::new(OrderDatabase::open(&config.database.path)?);

    let client = Arc::new(
        RpcClient::new(Duration::from_secs(config.monitor.rpc_timeout_secs)).context(
            "Failed to build HTTP client"
        )?
    );

    // Zero reachable endpoints is the one startup condition that must stop
    // the process: nothing can be monitored.
    let providers = connect_providers(&config.rpc_urls, Arc::clone(&client)).await.context(
        "Startup probe failed"
    )?;

    let pool = Arc::new(
        RpcPool::new(
            config.rpc_urls.clone(),
            Arc::clone(&client),
            Duration::from_secs(config.monitor.endpoint_quarantine_secs)
        )
    );

    let dedup = Arc::new(TxDedup::new(Duration::from_secs(config.monitor.dedup_window_secs)));

    let (detections_tx, detections_rx) = mpsc::channel(256);

    let specs = filter_specs(mode, &config.contract.address);
    let scheduler = Arc::new(
        FilterScheduler::new(
            Arc::new(RpcTransport::new(Arc::clone(&client))),
            providers
                .iter()
                .map(|p| p.url.clone())
                .collect(),
            specs,
            SchedulerConfig {
                refresh_interval: Duration::from_secs(config.monitor.filter_refresh_secs),
                poll_interval: Duration::from_secs(config.monitor.filter_poll_secs),
                provider_quarantine: Duration::from_secs(config.monitor.endpoint_quarantine_secs),
                sweep_interval: Duration::from_secs(config.monitor.dedup_sweep_secs),
            },
            Arc::clone(&dedup),
            detections_tx
        )
    );

    let shutdown = Arc::new(Notify::new());
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc
            ::set_handler(move || {
                shutdown.notify_waiters();
            })
            .context("Failed to install shutdown handler")?;
    }

    scheduler.start().await;

    let ingestion = tokio::spawn(
        monitor::run_ingestion(
            detections_rx,
            Arc::clone(&pool),
            Arc::clone(&db),
            settlement_token,
            Arc::clone(&shutdown)
        )
    );

    let stats_loop = tokio::spawn(
        stats::run_stats_loop(
            Arc::clone(&scheduler),
            Arc::clone(&pool),
            Arc::clone(&dedup),
            Arc::clone(&db),
            Duration::from_secs(config.monitor.stats_interval_secs),
            Arc::clone(&shutdown)
        )
    );

    logger::info(LogTag::System, "✅ Monitoring started, Ctrl-C to stop");

    shutdown.notified().await;
    logger::info(LogTag::System, "Shutting down...");

    scheduler.stop().await;
    let _ = ingestion.await;
    let _ = stats_loop.await;

    Ok(())
}
