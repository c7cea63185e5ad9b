/// Command-line argument helpers
///
/// Arguments are captured once at startup; all lookups go through the
/// cached list so flags behave consistently for the whole process.
use once_cell::sync::Lazy;
use std::env;

static CMD_ARGS: Lazy<Vec<String>> = Lazy::new(|| env::args().collect());

/// Check whether a literal flag was provided (e.g. `--debug-worker`)
pub fn has_flag(flag: &str) -> bool {
    CMD_ARGS.iter().any(|arg| arg == flag)
}

/// Get the value following a flag (e.g. `--port 9090`)
fn get_flag_value(flag: &str) -> Option<&'static str> {
    let args = &*CMD_ARGS;
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|idx| args.get(idx + 1))
        .map(|value| value.as_str())
}

/// `--config <path>` override for the configuration file location
pub fn get_config_override() -> Option<&'static str> {
    get_flag_value("--config")
}

/// `--port <port>` override for the webserver port
pub fn get_port_override() -> Option<u16> {
    get_flag_value("--port").and_then(|value| value.parse().ok())
}

/// `--host <addr>` override for the webserver bind address
pub fn get_host_override() -> Option<&'static str> {
    get_flag_value("--host")
}

pub fn is_help_requested() -> bool {
    has_flag("--help") || has_flag("-h")
}

pub fn print_help() {
    println!("emolens - face emotion analyzer webserver");
    println!();
    println!("USAGE:");
    println!("    emolens [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>       Configuration file (default: config.json)");
    println!("    --host <addr>         Bind address override");
    println!("    --port <port>         Port override");
    println!("    --debug-<module>      Enable debug logs for one module");
    println!("                          (system, config, worker, cache, analyzer,");
    println!("                           webserver, security, metrics)");
    println!("    --debug-all           Enable debug logs for all modules");
    println!("    -h, --help            Show this help");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_flag_is_not_detected() {
        assert!(!has_flag("--definitely-not-passed"));
    }

    #[test]
    fn absent_value_flag_returns_none() {
        assert!(get_flag_value("--definitely-not-passed").is_none());
    }
}
