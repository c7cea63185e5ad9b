use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use emolens::analyzer::{FaceAnalyzer, FullFrameDetector};
use emolens::cache::{CacheConfig, Manager};
use emolens::config::Config;
use emolens::core::constants::DEFAULT_CONFIG_PATH;
use emolens::logger::{self, LogTag};
use emolens::metrics::{self, MetricsCollector};
use emolens::webserver::{self, state::AppState};
use emolens::worker::Pool;
use emolens::{arguments, webserver::start_server};

/// How long shutdown waits for in-flight analysis tasks to drain
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Main entry point for emolens
///
/// Loads configuration, builds the worker pool / cache / analyzer,
/// starts the webserver, and tears everything down on Ctrl-C.
#[tokio::main]
async fn main() {
    logger::init();

    if arguments::is_help_requested() {
        arguments::print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "🚀 emolens starting up...");

    if let Err(e) = run().await {
        logger::error(LogTag::System, &format!("❌ emolens failed: {}", e));
        std::process::exit(1);
    }

    logger::info(LogTag::System, "✅ emolens stopped");
}

async fn run() -> Result<(), String> {
    // 1. Configuration (file + env overrides + CLI overrides)
    let config_path = arguments::get_config_override().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut config =
        Config::load(config_path).map_err(|e| format!("Configuration error: {:#}", e))?;

    if let Some(host) = arguments::get_host_override() {
        config.server.host = host.to_string();
    }
    if let Some(port) = arguments::get_port_override() {
        config.server.port = port;
    }
    if config.app.debug {
        logger::enable_debug_all();
    }

    logger::info(
        LogTag::Config,
        &format!(
            "Loaded {} (env: {}, workers: {}-{}, cache: {}MB)",
            config_path,
            config.app.env,
            config.worker.min_workers,
            config.worker.max_workers,
            config.cache.max_size_bytes / (1024 * 1024),
        ),
    );

    let config = Arc::new(config);

    // 2. Core subsystems
    let pool = Arc::new(Pool::new(
        config.worker.min_workers,
        config.worker.max_workers,
    ));
    let cache = Arc::new(Manager::new(CacheConfig::custom(
        config.cache.max_size_bytes,
        config.cache.cleanup_interval(),
    )));
    let analyzer = Arc::new(
        FaceAnalyzer::new(Box::new(FullFrameDetector))
            .with_max_dimension(config.image.max_dimension),
    );
    let collector = Arc::new(MetricsCollector::new());

    // 3. Background metrics reporter
    let reporter_shutdown = CancellationToken::new();
    metrics::spawn_reporter(
        Arc::clone(&collector),
        Arc::clone(&pool),
        Arc::clone(&cache),
        reporter_shutdown.clone(),
    );

    // 4. Ctrl-C triggers the webserver's graceful shutdown
    ctrlc::set_handler(|| {
        webserver::shutdown();
    })
    .map_err(|e| format!("Failed to install signal handler: {}", e))?;

    // 5. Webserver (blocks until shutdown)
    let state = Arc::new(AppState::new(
        Arc::clone(&config),
        Arc::clone(&pool),
        Arc::clone(&cache),
        analyzer,
        collector,
    ));
    start_server(state).await?;

    // 6. Drain and close the cores
    logger::info(LogTag::System, "Shutting down core subsystems...");
    reporter_shutdown.cancel();

    let deadline = CancellationToken::new();
    let timer = deadline.clone();
    tokio::spawn(async move {
        tokio::time::sleep(SHUTDOWN_GRACE).await;
        timer.cancel();
    });
    if let Err(e) = pool.shutdown(&deadline).await {
        logger::warning(
            LogTag::System,
            &format!("Worker pool did not drain cleanly: {}", e),
        );
    }
    cache.close();

    Ok(())
}
