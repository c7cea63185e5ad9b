/// Shared application state for the webserver
///
/// Route handlers receive the core subsystems through this state:
/// the worker pool that executes analysis tasks, the result cache,
/// the analysis engine, and the metrics collector.
use std::sync::Arc;

use crate::analyzer::{AnalysisResult, FaceAnalyzer};
use crate::cache::Manager;
use crate::config::Config;
use crate::metrics::MetricsCollector;
use crate::webserver::middleware::RateLimiter;
use crate::worker::Pool;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: Arc<Pool>,
    pub cache: Arc<Manager<AnalysisResult>>,
    pub analyzer: Arc<FaceAnalyzer>,
    pub metrics: Arc<MetricsCollector>,
    pub rate_limiter: Arc<RateLimiter>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        pool: Arc<Pool>,
        cache: Arc<Manager<AnalysisResult>>,
        analyzer: Arc<FaceAnalyzer>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.security.rate_limit.requests_per_minute,
            config.security.rate_limit.burst,
        ));

        Self {
            config,
            pool,
            cache,
            analyzer,
            metrics,
            rate_limiter,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time).num_seconds().max(0) as u64
    }
}
