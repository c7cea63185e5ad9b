use colored::{Color, ColoredString, Colorize};

/// Log tags identify the subsystem that produced a message
///
/// Each tag maps to a `--debug-<tag>` command-line flag that enables
/// DEBUG output for that subsystem only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Worker,
    Cache,
    Analyzer,
    Webserver,
    Security,
    Metrics,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Config => "CONFIG",
            LogTag::Worker => "WORKER",
            LogTag::Cache => "CACHE",
            LogTag::Analyzer => "ANALYZER",
            LogTag::Webserver => "WEBSERVER",
            LogTag::Security => "SECURITY",
            LogTag::Metrics => "METRICS",
        }
    }

    /// Flag suffix for per-module debug control (e.g. `--debug-worker`)
    pub fn flag_name(&self) -> &'static str {
        match self {
            LogTag::System => "system",
            LogTag::Config => "config",
            LogTag::Worker => "worker",
            LogTag::Cache => "cache",
            LogTag::Analyzer => "analyzer",
            LogTag::Webserver => "webserver",
            LogTag::Security => "security",
            LogTag::Metrics => "metrics",
        }
    }

    pub fn colored(&self) -> ColoredString {
        let color = match self {
            LogTag::System => Color::Cyan,
            LogTag::Config => Color::Blue,
            LogTag::Worker => Color::Yellow,
            LogTag::Cache => Color::Green,
            LogTag::Analyzer => Color::Magenta,
            LogTag::Webserver => Color::BrightGreen,
            LogTag::Security => Color::Red,
            LogTag::Metrics => Color::BrightBlue,
        };
        self.as_str().color(color).bold()
    }
}
