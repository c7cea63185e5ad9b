/// TTL cache manager
///
/// Keys map to values with an absolute expiration instant and an
/// estimated byte size. A single reader/writer lock guards the map and
/// the size counter: reads take the read lock, mutation (set, eviction,
/// sweep, clear) takes the write lock. Expired entries are treated as
/// absent on read and reclaimed by a background sweep.
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use super::config::CacheConfig;
use super::size::EstimateSize;
use crate::core::{AnalyzerError, AnalyzerResult};
use crate::logger::{self, LogTag};

struct Item<V> {
    value: V,
    expires_at: Instant,
    size: u64,
}

impl<V> Item<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

struct CacheInner<V> {
    items: HashMap<String, Item<V>>,
    current_size: u64,
}

impl<V> CacheInner<V> {
    /// Remove entries in expiration order until `required` extra bytes
    /// fit under `max_size`, or no entries remain. Not an LRU: the
    /// entries that would die soonest go first.
    fn evict(&mut self, required: u64, max_size: u64) {
        let mut candidates: Vec<(String, Instant, u64)> = self
            .items
            .iter()
            .map(|(key, item)| (key.clone(), item.expires_at, item.size))
            .collect();

        candidates.sort_by_key(|(_, expires_at, _)| *expires_at);

        for (key, _, size) in candidates {
            if self.current_size + required <= max_size {
                break;
            }
            if self.items.remove(&key).is_some() {
                self.current_size -= size;
            }
        }
    }

    /// Remove every entry past its expiration and reclaim its size
    fn sweep(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .items
            .iter()
            .filter(|(_, item)| item.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            if let Some(item) = self.items.remove(key) {
                self.current_size -= item.size;
            }
        }
        expired.len()
    }
}

/// Cache usage statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub item_count: usize,
    pub current_size: u64,
    pub max_size: u64,
    pub usage_percent: f64,
}

pub struct Manager<V> {
    inner: Arc<RwLock<CacheInner<V>>>,
    max_size: u64,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl<V> Manager<V>
where
    V: EstimateSize + Clone + Send + Sync + 'static,
{
    /// Create a cache manager and start its background sweep
    pub fn new(config: CacheConfig) -> Self {
        let inner = Arc::new(RwLock::new(CacheInner {
            items: HashMap::new(),
            current_size: 0,
        }));
        let shutdown = CancellationToken::new();

        tokio::spawn(run_sweep(
            Arc::clone(&inner),
            config.cleanup_interval,
            shutdown.clone(),
        ));

        Self {
            inner,
            max_size: config.max_size,
            closed: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Get the value stored under `key`
    ///
    /// An entry past its expiration is treated as absent even before the
    /// sweep has removed it.
    pub fn get(&self, key: &str) -> AnalyzerResult<V> {
        let inner = self.inner.read();

        match inner.items.get(key) {
            Some(item) if !item.is_expired(Instant::now()) => Ok(item.value.clone()),
            _ => Err(AnalyzerError::KeyNotFound),
        }
    }

    /// Insert or overwrite the value under `key` with the given TTL
    ///
    /// Fails with `SizeExceeded` when the value can never fit, and with
    /// `InsufficientCapacity` when eviction could not make enough room.
    /// Overwriting accounts the net size delta; the previous entry for
    /// the key is released first.
    pub fn set(&self, key: &str, value: V, ttl: Duration) -> AnalyzerResult<()> {
        let size = value.estimate_size();
        if size > self.max_size {
            return Err(AnalyzerError::SizeExceeded);
        }

        let mut inner = self.inner.write();

        // Release the entry being overwritten before making room, so the
        // budget check sees the net delta rather than double-counting.
        if let Some(previous) = inner.items.remove(key) {
            inner.current_size -= previous.size;
        }

        if inner.current_size + size > self.max_size {
            inner.evict(size, self.max_size);
            if inner.current_size + size > self.max_size {
                return Err(AnalyzerError::InsufficientCapacity);
            }
        }

        inner.items.insert(
            key.to_string(),
            Item {
                value,
                expires_at: Instant::now() + ttl,
                size,
            },
        );
        inner.current_size += size;
        Ok(())
    }

    /// Get the cached value, or compute and store it
    ///
    /// The compute step runs outside the cache lock, so concurrent
    /// callers racing on the same missing key may each invoke `compute`;
    /// last store wins. A failed compute caches nothing.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl: Duration,
    ) -> AnalyzerResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AnalyzerResult<V>>,
    {
        match self.get(key) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        let value = compute().await?;
        self.set(key, value.clone(), ttl)?;
        Ok(value)
    }

    /// Current usage statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read();

        CacheStats {
            item_count: inner.items.len(),
            current_size: inner.current_size,
            max_size: self.max_size,
            usage_percent: inner.current_size as f64 / self.max_size as f64 * 100.0,
        }
    }

    /// Remove every entry and reset the size counter
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.items.clear();
        inner.current_size = 0;
    }

    /// Stop the background sweep. Idempotent; the map itself stays
    /// usable, only periodic reclamation ends.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shutdown.cancel();
        }
    }
}

impl<V> Drop for Manager<V> {
    fn drop(&mut self) {
        // Stop the sweep task even when close() was never called
        self.shutdown.cancel();
    }
}

async fn run_sweep<V: Send + Sync + 'static>(
    inner: Arc<RwLock<CacheInner<V>>>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so sweeps start one
    // interval after creation.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let removed = inner.write().sweep(Instant::now());
        if removed > 0 {
            logger::debug(
                LogTag::Cache,
                &format!("Sweep removed {} expired entries", removed),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(max_size: u64) -> CacheConfig {
        CacheConfig::custom(max_size, Duration::from_millis(100))
    }

    #[tokio::test]
    async fn basic_set_and_get() {
        let manager = Manager::new(test_config(1024 * 1024));

        manager
            .set("test-key", b"test-value".to_vec(), Duration::from_secs(1))
            .unwrap();

        let got = manager.get("test-key").unwrap();
        assert_eq!(got, b"test-value".to_vec());
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let manager: Manager<Vec<u8>> = Manager::new(test_config(1024));

        let err = manager.get("absent").unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn expired_entry_is_absent_on_read() {
        let manager = Manager::new(test_config(1024 * 1024));

        manager
            .set("test-key", b"test-value".to_vec(), Duration::from_millis(200))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;

        let err = manager.get("test-key").unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn oversized_value_is_rejected_without_side_effects() {
        let manager = Manager::new(test_config(10));

        let err = manager
            .set("test-key", b"test-value-long".to_vec(), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::SizeExceeded));
        assert_eq!(manager.stats().current_size, 0);
    }

    #[tokio::test]
    async fn eviction_removes_earliest_expiring_first() {
        let manager = Manager::new(test_config(300));

        // Three entries with distinct expirations; "soon" dies first
        manager
            .set("soon", vec![0u8; 100], Duration::from_secs(10))
            .unwrap();
        manager
            .set("later", vec![0u8; 100], Duration::from_secs(60))
            .unwrap();
        manager
            .set("latest", vec![0u8; 100], Duration::from_secs(120))
            .unwrap();

        // Forces eviction of exactly one entry
        manager
            .set("incoming", vec![0u8; 100], Duration::from_secs(30))
            .unwrap();

        assert!(manager.get("soon").unwrap_err().is_not_found());
        assert!(manager.get("later").is_ok());
        assert!(manager.get("latest").is_ok());
        assert!(manager.get("incoming").is_ok());
        assert!(manager.stats().current_size <= 300);
    }

    #[tokio::test]
    async fn overwrite_accounts_net_delta() {
        let manager = Manager::new(test_config(1024));

        manager
            .set("test-key", vec![0u8; 100], Duration::from_secs(10))
            .unwrap();
        manager
            .set("test-key", vec![0u8; 40], Duration::from_secs(10))
            .unwrap();

        let stats = manager.stats();
        assert_eq!(stats.current_size, 40);
        assert_eq!(stats.item_count, 1);
    }

    #[tokio::test]
    async fn get_or_compute_runs_once_until_expiry() {
        let manager = Manager::new(test_config(1024 * 1024));
        let mut calls = 0;

        let value = manager
            .get_or_compute(
                "test-key",
                || {
                    calls += 1;
                    async { Ok(b"computed-value".to_vec()) }
                },
                Duration::from_millis(500),
            )
            .await
            .unwrap();
        assert_eq!(value, b"computed-value".to_vec());
        assert_eq!(calls, 1);

        // Served from cache before expiry
        manager
            .get_or_compute(
                "test-key",
                || {
                    calls += 1;
                    async { Ok(b"computed-value".to_vec()) }
                },
                Duration::from_millis(500),
            )
            .await
            .unwrap();
        assert_eq!(calls, 1);

        // Recomputed after expiry
        tokio::time::sleep(Duration::from_millis(600)).await;
        manager
            .get_or_compute(
                "test-key",
                || {
                    calls += 1;
                    async { Ok(b"computed-value".to_vec()) }
                },
                Duration::from_millis(500),
            )
            .await
            .unwrap();
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn failed_compute_caches_nothing() {
        let manager: Manager<Vec<u8>> = Manager::new(test_config(1024));

        let err = manager
            .get_or_compute(
                "test-key",
                || async { Err(AnalyzerError::Analysis("boom".to_string())) },
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Analysis(_)));
        assert_eq!(manager.stats().item_count, 0);
    }

    #[tokio::test]
    async fn background_sweep_reclaims_expired_entries() {
        let manager = Manager::new(CacheConfig::custom(1024, Duration::from_millis(50)));

        manager
            .set("test-key", vec![0u8; 100], Duration::from_millis(100))
            .unwrap();
        assert_eq!(manager.stats().item_count, 1);

        tokio::time::sleep(Duration::from_millis(400)).await;

        let stats = manager.stats();
        assert_eq!(stats.item_count, 0);
        assert_eq!(stats.current_size, 0);
    }

    #[tokio::test]
    async fn clear_resets_size() {
        let manager = Manager::new(test_config(1024));

        manager
            .set("a", vec![0u8; 100], Duration::from_secs(10))
            .unwrap();
        manager
            .set("b", vec![0u8; 100], Duration::from_secs(10))
            .unwrap();

        manager.clear();
        let stats = manager.stats();
        assert_eq!(stats.item_count, 0);
        assert_eq!(stats.current_size, 0);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let manager: Manager<Vec<u8>> = Manager::new(test_config(1024));
        manager.close();
        manager.close();
    }

    #[tokio::test]
    async fn concurrent_access() {
        let manager = Arc::new(Manager::new(test_config(1024 * 1024)));
        let mut handles = Vec::new();

        for id in 0..5 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                for j in 0..10 {
                    let key = format!("key-{}-{}", id, j);
                    let value = format!("value-{}-{}", id, j).into_bytes();
                    manager.set(&key, value.clone(), Duration::from_millis(500)).unwrap();
                    assert_eq!(manager.get(&key).unwrap(), value);
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn stats_report_usage_percent() {
        let manager = Manager::new(test_config(200));

        manager
            .set("half", vec![0u8; 100], Duration::from_secs(10))
            .unwrap();

        let stats = manager.stats();
        assert_eq!(stats.max_size, 200);
        assert!((stats.usage_percent - 50.0).abs() < f64::EPSILON);
    }
}
