/// Rotating-filter subscription scheduler
///
/// Maintains the full cross-product of (provider x filter spec) as an
/// integer-indexed slot table. Slot creation is staggered across the refresh
/// period so a refresh cycle never spikes load on rate-limited endpoints,
/// and every slot refreshes on its own timer so one slow provider cannot
/// stall the rest. A slot whose provider fails re-installs on a random
/// healthy provider; a slot that stays dark is retried at its next refresh
/// tick.
use crate::dedup::{ self, TxDedup };
use crate::errors::RpcError;
use crate::filters::specs::FilterSpec;
use crate::logger::{ self, LogTag };
use crate::rpc::client::RpcClient;
use crate::rpc::types::RawLog;
use crate::utils::{ check_shutdown_or_delay, short_hash };
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::{ Arc, Mutex };
use std::time::{ Duration, Instant };
use tokio::sync::{ mpsc, Notify };
use tokio::task::JoinHandle;

/// Filter operations the scheduler needs from a node. Kept as a trait so
/// the scheduler can run against a mock transport in tests.
#[async_trait]
pub trait FilterTransport: Send + Sync {
    async fn install(&self, provider_url: &str, params: Value) -> Result<String, RpcError>;
    async fn poll(&self, provider_url: &str, filter_id: &str) -> Result<Vec<RawLog>, RpcError>;
    async fn uninstall(&self, provider_url: &str, filter_id: &str) -> Result<(), RpcError>;
}

/// The production transport: eth_newFilter / eth_getFilterChanges /
/// eth_uninstallFilter against whichever provider the slot is bound to.
pub struct RpcTransport {
    client: Arc<RpcClient>,
}

impl RpcTransport {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FilterTransport for RpcTransport {
    async fn install(&self, provider_url: &str, params: Value) -> Result<String, RpcError> {
        self.client.new_filter(provider_url, params).await
    }

    async fn poll(&self, provider_url: &str, filter_id: &str) -> Result<Vec<RawLog>, RpcError> {
        self.client.get_filter_changes(provider_url, filter_id).await
    }

    async fn uninstall(&self, provider_url: &str, filter_id: &str) -> Result<(), RpcError> {
        self.client.uninstall_filter(provider_url, filter_id).await.map(|_| ())
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Full lifetime of an installed filter before it is replaced
    pub refresh_interval: Duration,
    /// Cadence of eth_getFilterChanges polls per active slot
    pub poll_interval: Duration,
    /// Cooldown for providers whose filter operations fail
    pub provider_quarantine: Duration,
    /// Dedup sweep cadence
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct SchedulerStats {
    pub total_slots: usize,
    pub active_slots: usize,
    pub available_providers: usize,
    pub quarantined_providers: usize,
}

/// Runtime binding of one spec to one provider. Index-addressable so a
/// replacement never disturbs the other slots.
struct Slot {
    spec_index: usize,
    provider_url: String,
    filter_id: Option<String>,
    installed_at: Option<Instant>,
}

struct SchedulerInner {
    transport: Arc<dyn FilterTransport>,
    specs: Vec<FilterSpec>,
    config: SchedulerConfig,
    slots: Mutex<Vec<Slot>>,
    /// provider url -> quarantine expiry
    quarantined: Mutex<HashMap<String, Instant>>,
    providers: Vec<String>,
    dedup: Arc<TxDedup>,
    detections: mpsc::Sender<RawLog>,
    shutdown: Arc<Notify>,
    running: AtomicBool,
}

pub struct FilterScheduler {
    inner: Arc<SchedulerInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl FilterScheduler {
    pub fn new(
        transport: Arc<dyn FilterTransport>,
        provider_urls: Vec<String>,
        specs: Vec<FilterSpec>,
        config: SchedulerConfig,
        dedup: Arc<TxDedup>,
        detections: mpsc::Sender<RawLog>
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                transport,
                specs,
                config,
                slots: Mutex::new(Vec::new()),
                quarantined: Mutex::new(HashMap::new()),
                providers: provider_urls,
                dedup,
                detections,
                shutdown: Arc::new(Notify::new()),
                running: AtomicBool::new(false),
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Plan the slot table and launch one task per slot, staggered across
    /// the refresh period, plus the dedup sweep task.
    pub async fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            logger::warning(LogTag::Filter, "Scheduler already running");
            return;
        }

        let total_slots = self.inner.providers.len() * self.inner.specs.len();
        if total_slots == 0 {
            logger::error(LogTag::Filter, "No slots to schedule (no providers or no specs)");
            return;
        }

        {
            let mut slots = self.inner.slots.lock().expect("slot table lock poisoned");
            slots.clear();
            for provider_url in &self.inner.providers {
                for spec_index in 0..self.inner.specs.len() {
                    slots.push(Slot {
                        spec_index,
                        provider_url: provider_url.clone(),
                        filter_id: None,
                        installed_at: None,
                    });
                }
            }
        }

        // Spread first installs across the whole refresh period so a
        // refresh rollover never lands on every provider at once
        let stagger = self.inner.config.refresh_interval / (total_slots as u32);

        logger::info(
            LogTag::Filter,
            &format!(
                "Scheduling {} filters ({} providers x {} specs), one every {:.2}s, refresh every {}s",
                total_slots,
                self.inner.providers.len(),
                self.inner.specs.len(),
                stagger.as_secs_f64(),
                self.inner.config.refresh_interval.as_secs()
            )
        );

        let mut tasks = self.tasks.lock().expect("task list lock poisoned");
        for slot_index in 0..total_slots {
            let inner = Arc::clone(&self.inner);
            let initial_delay = stagger * (slot_index as u32);
            tasks.push(tokio::spawn(run_slot(inner, slot_index, initial_delay)));
        }

        tasks.push(
            tokio::spawn(
                dedup::run_sweep_loop(
                    Arc::clone(&self.inner.dedup),
                    self.inner.config.sweep_interval,
                    Arc::clone(&self.inner.shutdown)
                )
            )
        );
    }

    /// Cancel every slot task and tear down every live filter.
    /// Unconditional and idempotent: a second call is a no-op.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            logger::debug(LogTag::Filter, "Scheduler not running, stop is a no-op");
            return;
        }

        logger::info(LogTag::Filter, "Stopping filter scheduler...");
        self.inner.shutdown.notify_waiters();

        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().expect("task list lock poisoned");
            tasks.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }

        self.inner.dedup.clear();
        self.inner.quarantined.lock().expect("quarantine lock poisoned").clear();
        logger::info(LogTag::Filter, "Filter scheduler stopped");
    }

    pub fn stats(&self) -> SchedulerStats {
        let slots = self.inner.slots.lock().expect("slot table lock poisoned");
        SchedulerStats {
            total_slots: slots.len(),
            active_slots: slots
                .iter()
                .filter(|s| s.filter_id.is_some())
                .count(),
            available_providers: self.inner.available_providers().len(),
            quarantined_providers: self.inner.quarantined
                .lock()
                .expect("quarantine lock poisoned")
                .len(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }
}

/// One slot's full lifecycle: staggered first install, periodic polls,
/// periodic refresh, teardown on shutdown.
async fn run_slot(inner: Arc<SchedulerInner>, slot_index: usize, initial_delay: Duration) {
    logger::debug(
        LogTag::Filter,
        &format!("Slot #{} first install in {:.2}s", slot_index, initial_delay.as_secs_f64())
    );

    if check_shutdown_or_delay(&inner.shutdown, initial_delay).await {
        return;
    }

    inner.install_slot(slot_index).await;
    let mut next_refresh = Instant::now() + inner.config.refresh_interval;

    loop {
        if check_shutdown_or_delay(&inner.shutdown, inner.config.poll_interval).await {
            break;
        }
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }

        if Instant::now() >= next_refresh {
            inner.refresh_slot(slot_index).await;
            next_refresh = Instant::now() + inner.config.refresh_interval;
        } else {
            inner.poll_slot(slot_index).await;
        }
    }

    inner.teardown_slot(slot_index).await;
}

impl SchedulerInner {
    /// Providers currently eligible for slot placement
    fn available_providers(&self) -> Vec<String> {
        let mut quarantined = self.quarantined.lock().expect("quarantine lock poisoned");
        let now = Instant::now();
        quarantined.retain(|_, until| *until > now);
        self.providers
            .iter()
            .filter(|url| !quarantined.contains_key(*url))
            .cloned()
            .collect()
    }

    /// Filter-operation failures are a distinct failure mode from basic
    /// liveness, so the scheduler keeps its own quarantine.
    fn quarantine_provider(&self, provider_url: &str, reason: &str) {
        let until = Instant::now() + self.config.provider_quarantine;
        self.quarantined
            .lock()
            .expect("quarantine lock poisoned")
            .insert(provider_url.to_string(), until);
        logger::warning(
            LogTag::Filter,
            &format!(
                "Quarantined provider {} for {}s: {}",
                provider_url,
                self.config.provider_quarantine.as_secs(),
                reason
            )
        );
    }

    async fn try_install(&self, slot_index: usize, provider_url: &str) -> bool {
        let params = {
            let slots = self.slots.lock().expect("slot table lock poisoned");
            self.specs[slots[slot_index].spec_index].to_params()
        };

        match self.transport.install(provider_url, params).await {
            Ok(filter_id) => {
                let mut slots = self.slots.lock().expect("slot table lock poisoned");
                let slot = &mut slots[slot_index];
                slot.provider_url = provider_url.to_string();
                slot.filter_id = Some(filter_id);
                slot.installed_at = Some(Instant::now());
                logger::info(
                    LogTag::Filter,
                    &format!("Installed filter #{} on {}", slot_index, provider_url)
                );
                true
            }
            Err(e) => {
                logger::warning(
                    LogTag::Filter,
                    &format!("Failed to install filter #{} on {}: {}", slot_index, provider_url, e)
                );
                self.quarantine_provider(provider_url, "filter creation failed");
                false
            }
        }
    }

    fn is_quarantined(&self, provider_url: &str) -> bool {
        let mut quarantined = self.quarantined.lock().expect("quarantine lock poisoned");
        match quarantined.get(provider_url) {
            Some(until) if *until > Instant::now() => true,
            Some(_) => {
                quarantined.remove(provider_url);
                false
            }
            None => false,
        }
    }

    /// Install on the slot's own provider; on failure retry once on a
    /// random healthy provider. A slot that stays dark is picked up again
    /// at its next refresh tick.
    async fn install_slot(&self, slot_index: usize) {
        let home_provider = {
            let slots = self.slots.lock().expect("slot table lock poisoned");
            slots[slot_index].provider_url.clone()
        };

        if self.is_quarantined(&home_provider) {
            logger::debug(
                LogTag::Filter,
                &format!("Skipping quarantined provider {} for filter #{}", home_provider, slot_index)
            );
        } else if self.try_install(slot_index, &home_provider).await {
            return;
        }

        let alternative = {
            let available = self.available_providers();
            available.choose(&mut rand::thread_rng()).cloned()
        };

        match alternative {
            Some(provider_url) => {
                logger::info(
                    LogTag::Filter,
                    &format!("Trying alternative provider for filter #{}: {}", slot_index, provider_url)
                );
                if !self.try_install(slot_index, &provider_url).await {
                    logger::warning(
                        LogTag::Filter,
                        &format!("Filter #{} dark until next refresh", slot_index)
                    );
                }
            }
            None => {
                logger::warning(
                    LogTag::Filter,
                    &format!(
                        "No healthy provider for filter #{}, dark until next refresh",
                        slot_index
                    )
                );
            }
        }
    }

    /// Drain new logs for an active slot and forward them through the
    /// dedup gate. A poll failure darkens the slot and quarantines its
    /// provider.
    async fn poll_slot(&self, slot_index: usize) {
        let (provider_url, filter_id) = {
            let slots = self.slots.lock().expect("slot table lock poisoned");
            let slot = &slots[slot_index];
            match &slot.filter_id {
                Some(filter_id) => (slot.provider_url.clone(), filter_id.clone()),
                None => {
                    return;
                }
            }
        };

        match self.transport.poll(&provider_url, &filter_id).await {
            Ok(logs) => {
                for log in logs {
                    self.forward_detection(log).await;
                }
            }
            Err(e) => {
                logger::warning(
                    LogTag::Filter,
                    &format!("Poll failed for filter #{} on {}: {}", slot_index, provider_url, e)
                );
                self.quarantine_provider(&provider_url, "filter poll failed");
                let mut slots = self.slots.lock().expect("slot table lock poisoned");
                slots[slot_index].filter_id = None;
                slots[slot_index].installed_at = None;
            }
        }
    }

    /// Dedup gate between raw detection and the ingestion pipeline
    async fn forward_detection(&self, log: RawLog) {
        if let Some(tx_hash) = log.transaction_hash.clone() {
            if !self.dedup.check_and_mark(&tx_hash) {
                logger::debug(
                    LogTag::Dedup,
                    &format!("Suppressed duplicate detection of {}", short_hash(&tx_hash))
                );
                return;
            }
            logger::info(LogTag::Filter, &format!("New transaction detected: {}", short_hash(&tx_hash)));
        }

        if self.detections.send(log).await.is_err() {
            logger::debug(LogTag::Filter, "Detection channel closed, dropping log");
        }
    }

    /// Tear down the old filter and re-install on the same provider,
    /// falling back to a random healthy one.
    async fn refresh_slot(&self, slot_index: usize) {
        logger::debug(LogTag::Filter, &format!("Refreshing filter #{}...", slot_index));

        let old = {
            let mut slots = self.slots.lock().expect("slot table lock poisoned");
            let slot = &mut slots[slot_index];
            slot.installed_at = None;
            slot.filter_id.take().map(|filter_id| (slot.provider_url.clone(), filter_id))
        };

        if let Some((provider_url, filter_id)) = old {
            if let Err(e) = self.transport.uninstall(&provider_url, &filter_id).await {
                logger::debug(
                    LogTag::Filter,
                    &format!("Uninstall of stale filter #{} failed: {}", slot_index, e)
                );
            }
        }

        self.install_slot(slot_index).await;
    }

    /// Shutdown teardown: best-effort uninstall of whatever is live
    async fn teardown_slot(&self, slot_index: usize) {
        let old = {
            let mut slots = self.slots.lock().expect("slot table lock poisoned");
            let slot = &mut slots[slot_index];
            slot.installed_at = None;
            slot.filter_id.take().map(|filter_id| (slot.provider_url.clone(), filter_id))
        };

        if let Some((provider_url, filter_id)) = old {
            let _ = self.transport.uninstall(&provider_url, &filter_id).await;
            logger::debug(LogTag::Filter, &format!("Removed filter #{} from {}", slot_index, provider_url));
        }
    }
}
