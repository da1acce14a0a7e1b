/// Time-windowed transaction dedup cache
///
/// Overlapping filters report the same transaction several times; the cache
/// remembers each hash long enough to suppress the repeats, then a periodic
/// sweep evicts aged-out entries. The window only has to outlive the worst
/// observed gap between two filters reporting the same transaction.
use crate::logger::{ self, LogTag };
use std::collections::HashMap;
use std::sync::{ Arc, Mutex };
use std::time::{ Duration, Instant };
use tokio::sync::Notify;

pub struct TxDedup {
    window: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl TxDedup {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Whether this hash is inside the dedup window
    pub fn seen(&self, tx_hash: &str) -> bool {
        let seen = self.seen.lock().expect("dedup lock poisoned");
        match seen.get(tx_hash) {
            Some(first_seen) => first_seen.elapsed() <= self.window,
            None => false,
        }
    }

    /// Remember a hash from now
    pub fn mark_seen(&self, tx_hash: &str) {
        let mut seen = self.seen.lock().expect("dedup lock poisoned");
        seen.insert(tx_hash.to_string(), Instant::now());
    }

    /// Atomic check-then-mark: returns true when the hash was not already
    /// inside the window (i.e. the caller should process it).
    pub fn check_and_mark(&self, tx_hash: &str) -> bool {
        let mut seen = self.seen.lock().expect("dedup lock poisoned");
        let now = Instant::now();
        match seen.get(tx_hash) {
            Some(first_seen) if now.duration_since(*first_seen) <= self.window => false,
            _ => {
                seen.insert(tx_hash.to_string(), now);
                true
            }
        }
    }

    /// Evict entries older than the window. Returns the eviction count.
    pub fn sweep(&self) -> usize {
        let mut seen = self.seen.lock().expect("dedup lock poisoned");
        let before = seen.len();
        seen.retain(|_, first_seen| first_seen.elapsed() <= self.window);
        let cleaned = before - seen.len();
        if cleaned > 0 {
            logger::debug(
                LogTag::Dedup,
                &format!("Cleaned {} expired tx records, {} still cached", cleaned, seen.len())
            );
        }
        cleaned
    }

    pub fn len(&self) -> usize {
        self.seen.lock().expect("dedup lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.seen.lock().expect("dedup lock poisoned").clear();
    }
}

/// Periodic sweep task, runs until shutdown
pub async fn run_sweep_loop(dedup: Arc<TxDedup>, sweep_period: Duration, shutdown: Arc<Notify>) {
    let stopped = shutdown.notified();
    tokio::pin!(stopped);

    loop {
        tokio::select! {
            _ = &mut stopped => break,
            _ = tokio::time::sleep(sweep_period) => {
                dedup.sweep();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_then_seen_is_true() {
        let dedup = TxDedup::new(Duration::from_secs(60));
        assert!(!dedup.seen("0xabc"));
        dedup.mark_seen("0xabc");
        assert!(dedup.seen("0xabc"));
    }

    #[test]
    fn check_and_mark_accepts_first_and_rejects_second() {
        let dedup = TxDedup::new(Duration::from_secs(60));
        assert!(dedup.check_and_mark("0xabc"));
        assert!(!dedup.check_and_mark("0xabc"));
    }

    #[test]
    fn entries_age_out_after_the_window() {
        let dedup = TxDedup::new(Duration::from_millis(30));
        dedup.mark_seen("0xabc");
        assert!(dedup.seen("0xabc"));
        std::thread::sleep(Duration::from_millis(50));
        // Past the window the hash reads as unseen even before a sweep runs
        assert!(!dedup.seen("0xabc"));
        assert!(dedup.check_and_mark("0xabc"));
    }

    #[test]
    fn sweep_evicts_only_expired_entries() {
        let dedup = TxDedup::new(Duration::from_millis(40));
        dedup.mark_seen("0xold");
        std::thread::sleep(Duration::from_millis(60));
        dedup.mark_seen("0xnew");
        let cleaned = dedup.sweep();
        assert_eq!(cleaned, 1);
        assert_eq!(dedup.len(), 1);
        assert!(dedup.seen("0xnew"));
    }

    #[test]
    fn sweep_on_fresh_entries_evicts_nothing() {
        let dedup = TxDedup::new(Duration::from_secs(60));
        dedup.mark_seen("0xabc");
        assert_eq!(dedup.sweep(), 0);
        assert!(dedup.seen("0xabc"));
    }
}
