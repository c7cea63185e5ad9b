/// Cache configuration
///
/// The byte budget bounds total memory; the cleanup interval trades
/// reclamation latency against a full O(n) scan per tick.
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Total byte budget across all live entries
    pub max_size: u64,

    /// Interval between background sweeps of expired entries
    pub cleanup_interval: Duration,
}

impl CacheConfig {
    /// Memoized analysis results (bounded, swept every minute)
    pub fn analysis_results() -> Self {
        Self {
            max_size: 32 * 1024 * 1024,
            cleanup_interval: Duration::from_secs(60),
        }
    }

    /// Custom configuration
    pub fn custom(max_size: u64, cleanup_interval: Duration) -> Self {
        Self {
            max_size,
            cleanup_interval,
        }
    }
}
