//! Structured console logging for emolens
//!
//! Tag-based logging with standard levels (Error/Warning/Info/Debug) and
//! per-module debug control via `--debug-<module>` command-line flags.
//!
//! ## Usage
//!
//! ```rust
//! use emolens::logger::{self, LogTag};
//!
//! logger::error(LogTag::Webserver, "Connection failed");
//! logger::info(LogTag::Worker, "Pool started");
//! logger::debug(LogTag::Cache, "Sweep removed 3 entries"); // Only with --debug-cache
//! ```
//!
//! Call `logger::init()` once at startup before any logging occurs.

mod levels;
mod tags;

use std::collections::HashSet;
use std::io::{self, Write};

use chrono::Utc;
use colored::Colorize;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

pub use levels::LogLevel;
pub use tags::LogTag;

/// Runtime logger configuration
#[derive(Debug, Clone, Default)]
pub struct LoggerConfig {
    /// Tags with DEBUG output enabled
    pub debug_tags: HashSet<&'static str>,

    /// Enable DEBUG output for every tag
    pub debug_all: bool,
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> = Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Initialize the logger from command-line arguments
///
/// Scans the process arguments for `--debug-<module>` and `--debug-all`
/// flags and configures per-tag filtering. Must be called once at startup.
pub fn init() {
    let mut config = LoggerConfig::default();

    for tag in ALL_TAGS {
        if crate::arguments::has_flag(&format!("--debug-{}", tag.flag_name())) {
            config.debug_tags.insert(tag.flag_name());
        }
    }
    config.debug_all = crate::arguments::has_flag("--debug-all");

    *LOGGER_CONFIG.write() = config;
}

/// Enable DEBUG output for every tag (used when `app.debug` is set in config)
pub fn enable_debug_all() {
    LOGGER_CONFIG.write().debug_all = true;
}

const ALL_TAGS: &[LogTag] = &[
    LogTag::System,
    LogTag::Config,
    LogTag::Worker,
    LogTag::Cache,
    LogTag::Analyzer,
    LogTag::Webserver,
    LogTag::Security,
    LogTag::Metrics,
];

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (always shown)
pub fn warning(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (always shown)
pub fn info(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level
///
/// Only shown when `--debug-<module>` or `--debug-all` was provided,
/// or debug mode was enabled from configuration.
pub fn debug(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Debug, message);
}

fn debug_enabled(tag: LogTag) -> bool {
    let config = LOGGER_CONFIG.read();
    config.debug_all || config.debug_tags.contains(tag.flag_name())
}

fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if level == LogLevel::Debug && !debug_enabled(tag) {
        return;
    }

    let timestamp = Utc::now().format("%H:%M:%S%.3f");
    println!(
        "{} {} {} {}",
        level.symbol(),
        tag.colored(),
        format!("[{}]", timestamp).dimmed(),
        level.style_message(message)
    );
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_filtering_follows_configuration() {
        // Single test so the shared logger state never races
        assert!(!debug_enabled(LogTag::Worker));

        enable_debug_all();
        assert!(debug_enabled(LogTag::Cache));

        LOGGER_CONFIG.write().debug_all = false;
        assert!(!debug_enabled(LogTag::Cache));
    }
}
