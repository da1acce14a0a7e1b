/// RPC endpoint pool with quarantine and retry routing
///
/// The pool owns endpoint health. Selection is round-robin over the
/// non-quarantined subset; a failed operation quarantines its endpoint for a
/// cooldown so repeated failures rotate traffic away without operator
/// intervention.
use crate::errors::RpcError;
use crate::logger::{ self, LogTag };
use crate::rpc::client::RpcClient;
use crate::rpc::types::TxReceipt;
use crate::utils::short_hash;
use futures::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{ Arc, Mutex };
use std::time::{ Duration, Instant };

/// How long to park when every endpoint is quarantined at once
const ALL_QUARANTINED_BACKOFF: Duration = Duration::from_secs(5);

struct PoolState {
    current_index: usize,
    /// endpoint url -> quarantine expiry
    quarantined: HashMap<String, Instant>,
}

pub struct RpcPool {
    endpoints: Vec<String>,
    client: Arc<RpcClient>,
    quarantine_duration: Duration,
    state: Mutex<PoolState>,
}

impl RpcPool {
    pub fn new(endpoints: Vec<String>, client: Arc<RpcClient>, quarantine_duration: Duration) -> Self {
        Self {
            endpoints,
            client,
            quarantine_duration,
            state: Mutex::new(PoolState {
                current_index: 0,
                quarantined: HashMap::new(),
            }),
        }
    }

    pub fn client(&self) -> Arc<RpcClient> {
        Arc::clone(&self.client)
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Endpoints currently eligible for selection. Expired quarantine
    /// entries are pruned as a side effect.
    pub fn available_endpoints(&self) -> Vec<String> {
        let mut state = self.state.lock().expect("pool state lock poisoned");
        let now = Instant::now();
        state.quarantined.retain(|_, until| *until > now);
        self.endpoints
            .iter()
            .filter(|url| !state.quarantined.contains_key(*url))
            .cloned()
            .collect()
    }

    pub fn healthy_count(&self) -> usize {
        self.available_endpoints().len()
    }

    /// Next non-quarantined endpoint, round-robin. Parks with bounded
    /// backoff while every endpoint is quarantined, then resumes.
    pub async fn next_endpoint(&self) -> String {
        loop {
            let available = self.available_endpoints();
            if !available.is_empty() {
                let mut state = self.state.lock().expect("pool state lock poisoned");
                let url = available[state.current_index % available.len()].clone();
                state.current_index = state.current_index.wrapping_add(1);
                return url;
            }

            logger::warning(
                LogTag::Rpc,
                &format!(
                    "All {} endpoints quarantined, waiting {}s for one to recover",
                    self.endpoints.len(),
                    ALL_QUARANTINED_BACKOFF.as_secs()
                )
            );
            tokio::time::sleep(ALL_QUARANTINED_BACKOFF).await;
        }
    }

    /// Quarantine an endpoint for the configured cooldown
    pub fn mark_failed(&self, endpoint: &str) {
        let until = Instant::now() + self.quarantine_duration;
        let mut state = self.state.lock().expect("pool state lock poisoned");
        state.quarantined.insert(endpoint.to_string(), until);
        logger::warning(
            LogTag::Rpc,
            &format!(
                "Quarantined endpoint {} for {}s",
                endpoint,
                self.quarantine_duration.as_secs()
            )
        );
    }

    /// Run an operation against successive endpoints until it succeeds or
    /// every endpoint has been tried once in this attempt cycle.
    pub async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T, RpcError>
        where F: Fn(String) -> Fut, Fut: Future<Output = Result<T, RpcError>>
    {
        let max_attempts = self.endpoints.len();
        let mut last_error = String::new();

        for attempt in 0..max_attempts {
            let endpoint = self.next_endpoint().await;
            match op(endpoint.clone()).await {
                Ok(value) => {
                    return Ok(value);
                }
                Err(e) => {
                    logger::debug(
                        LogTag::Rpc,
                        &format!("Attempt {}/{} failed on {}: {}", attempt + 1, max_attempts, endpoint, e)
                    );
                    if e.is_endpoint_failure() {
                        self.mark_failed(&endpoint);
                    }
                    last_error = e.to_string();
                }
            }
        }

        Err(RpcError::AllEndpointsFailed {
            attempts: max_attempts,
            last_error,
        })
    }

    /// Latest block height through the retry wrapper
    pub async fn latest_block_number(&self) -> Result<u64, RpcError> {
        let client = Arc::clone(&self.client);
        self.with_retry(|endpoint| {
            let client = Arc::clone(&client);
            async move { client.block_number(&endpoint).await }
        }).await
    }

    /// Full transaction receipt through the retry wrapper
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: &str
    ) -> Result<Option<TxReceipt>, RpcError> {
        let client = Arc::clone(&self.client);
        let tx_hash = tx_hash.to_string();
        self.with_retry(move |endpoint| {
            let client = Arc::clone(&client);
            let tx_hash = tx_hash.clone();
            async move { client.get_transaction_receipt(&endpoint, &tx_hash).await }
        }).await
    }

    /// Fetch receipts for many hashes with bounded concurrency.
    /// Per-hash failures resolve to None instead of failing the batch.
    pub async fn batch_get_receipts(
        &self,
        tx_hashes: &[String],
        concurrency: usize
    ) -> Vec<Option<TxReceipt>> {
        let mut results = Vec::with_capacity(tx_hashes.len());
        let chunk_size = concurrency.max(1);

        for chunk in tx_hashes.chunks(chunk_size) {
            let fetches = chunk.iter().map(|tx_hash| async move {
                match self.get_transaction_receipt(tx_hash).await {
                    Ok(receipt) => receipt,
                    Err(e) => {
                        logger::error(
                            LogTag::Rpc,
                            &format!("Receipt fetch failed for {}: {}", short_hash(tx_hash), e)
                        );
                        None
                    }
                }
            });
            results.extend(join_all(fetches).await);

            // Small pause between chunks to stay under endpoint rate limits
            if results.len() < tx_hashes.len() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    fn test_pool(urls: &[&str], quarantine: Duration) -> RpcPool {
        let client = Arc::new(RpcClient::new(Duration::from_secs(1)).unwrap());
        RpcPool::new(
            urls.iter().map(|u| u.to_string()).collect(),
            client,
            quarantine
        )
    }

    #[tokio::test]
    async fn round_robin_cycles_through_endpoints() {
        let pool = test_pool(&["http://a", "http://b", "http://c"], Duration::from_secs(300));
        assert_eq!(pool.next_endpoint().await, "http://a");
        assert_eq!(pool.next_endpoint().await, "http://b");
        assert_eq!(pool.next_endpoint().await, "http://c");
        assert_eq!(pool.next_endpoint().await, "http://a");
    }

    #[tokio::test]
    async fn quarantined_endpoint_is_never_selected() {
        let pool = test_pool(&["http://a", "http://b"], Duration::from_secs(300));
        pool.mark_failed("http://a");
        for _ in 0..10 {
            assert_eq!(pool.next_endpoint().await, "http://b");
        }
    }

    #[tokio::test]
    async fn quarantine_expires_after_configured_duration() {
        let pool = test_pool(&["http://a"], Duration::from_millis(50));
        pool.mark_failed("http://a");
        assert_eq!(pool.healthy_count(), 0);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(pool.healthy_count(), 1);
        assert_eq!(pool.next_endpoint().await, "http://a");
    }

    #[tokio::test]
    async fn with_retry_rotates_to_a_working_endpoint() {
        let pool = test_pool(&["http://bad", "http://good"], Duration::from_secs(300));
        let calls = AtomicUsize::new(0);
        let result = pool.with_retry(|endpoint| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if endpoint == "http://bad" {
                    Err(RpcError::Transport {
                        endpoint,
                        message: "refused".to_string(),
                    })
                } else {
                    Ok(42u64)
                }
            }
        }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // The failing endpoint was quarantined along the way
        assert_eq!(pool.healthy_count(), 1);
    }

    #[tokio::test]
    async fn with_retry_exhausts_after_one_full_cycle() {
        let pool = test_pool(&["http://a", "http://b", "http://c"], Duration::from_millis(10_000));
        let calls = AtomicUsize::new(0);
        let result: Result<u64, RpcError> = pool.with_retry(|endpoint| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Err(RpcError::Transport {
                    endpoint,
                    message: "down".to_string(),
                })
            }
        }).await;
        match result {
            Err(RpcError::AllEndpointsFailed { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {:?}", other.map(|_| ())),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn next_endpoint_blocks_until_quarantine_lifts() {
        let pool = test_pool(&["http://a"], Duration::from_millis(100));
        pool.mark_failed("http://a");
        // Selection must not return while quarantined...
        let short_wait = tokio::time::timeout(
            Duration::from_millis(20),
            pool.next_endpoint()
        ).await;
        assert!(short_wait.is_err());
    }
}
