/// Metrics collection
///
/// Reads the plain statistics structures the pool and cache expose and
/// publishes them under this module's naming, together with process
/// resource usage. The cores stay free of any metrics-system types.
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::{Pid, System};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheStats, EstimateSize, Manager};
use crate::logger::{self, LogTag};
use crate::worker::{Pool, PoolStats};

/// How often the background reporter logs a metrics summary
const REPORT_INTERVAL: Duration = Duration::from_secs(15);

/// Worker pool metrics as published to the API
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub current_workers: usize,
    pub max_workers: usize,
    pub tasks_processed: u64,
    pub tasks_queued: u64,
    pub average_latency_ms: f64,
    pub error_rate: f64,
    pub queue_utilization: f64,
}

impl From<PoolStats> for PoolSnapshot {
    fn from(stats: PoolStats) -> Self {
        Self {
            current_workers: stats.current_workers,
            max_workers: stats.max_workers,
            tasks_processed: stats.tasks_processed,
            tasks_queued: stats.tasks_queued,
            average_latency_ms: stats.average_latency.as_secs_f64() * 1000.0,
            error_rate: stats.error_rate,
            queue_utilization: stats.queue_utilization,
        }
    }
}

/// Cache metrics as published to the API
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    pub item_count: usize,
    pub current_size_bytes: u64,
    pub max_size_bytes: u64,
    pub usage_percent: f64,
}

impl From<CacheStats> for CacheSnapshot {
    fn from(stats: CacheStats) -> Self {
        Self {
            item_count: stats.item_count,
            current_size_bytes: stats.current_size,
            max_size_bytes: stats.max_size,
            usage_percent: stats.usage_percent,
        }
    }
}

/// Full metrics snapshot served by `/api/metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub memory_bytes: u64,
    pub cpu_percent: f32,
    pub pool: PoolSnapshot,
    pub cache: CacheSnapshot,
}

pub struct MetricsCollector {
    system: Mutex<System>,
    pid: Pid,
    startup: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_all()),
            pid: Pid::from_u32(std::process::id()),
            startup: Instant::now(),
        }
    }

    /// Gather a complete snapshot from the cores and the process
    pub fn gather<V>(&self, pool: &Pool, cache: &Manager<V>) -> MetricsSnapshot
    where
        V: EstimateSize + Clone + Send + Sync + 'static,
    {
        let (memory_bytes, cpu_percent) = {
            let mut system = self.system.lock();
            system.refresh_all();
            system
                .process(self.pid)
                .map(|process| (process.memory(), process.cpu_usage()))
                .unwrap_or((0, 0.0))
        };

        MetricsSnapshot {
            uptime_seconds: self.startup.elapsed().as_secs(),
            memory_bytes,
            cpu_percent,
            pool: pool.stats().into(),
            cache: cache.stats().into(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the periodic reporter that logs a metrics summary
pub fn spawn_reporter<V>(
    collector: Arc<MetricsCollector>,
    pool: Arc<Pool>,
    cache: Arc<Manager<V>>,
    shutdown: CancellationToken,
) where
    V: EstimateSize + Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REPORT_INTERVAL);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let snapshot = collector.gather(&pool, &cache);
            logger::debug(
                LogTag::Metrics,
                &format!(
                    "workers={}/{} processed={} err_rate={:.3} queue={:.0}% cache={}B ({:.1}%) mem={}MB",
                    snapshot.pool.current_workers,
                    snapshot.pool.max_workers,
                    snapshot.pool.tasks_processed,
                    snapshot.pool.error_rate,
                    snapshot.pool.queue_utilization * 100.0,
                    snapshot.cache.current_size_bytes,
                    snapshot.cache.usage_percent,
                    snapshot.memory_bytes / (1024 * 1024),
                ),
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn snapshot_reflects_core_stats() {
        let collector = MetricsCollector::new();
        let pool = Pool::new(2, 4);
        let cache: Manager<Vec<u8>> =
            Manager::new(CacheConfig::custom(1024, Duration::from_secs(60)));

        cache
            .set("test-key", vec![0u8; 512], Duration::from_secs(10))
            .unwrap();

        let snapshot = collector.gather(&pool, &cache);
        assert_eq!(snapshot.pool.current_workers, 2);
        assert_eq!(snapshot.cache.current_size_bytes, 512);
        assert!((snapshot.cache.usage_percent - 50.0).abs() < f64::EPSILON);

        pool.shutdown(&CancellationToken::new()).await.unwrap();
    }
}
