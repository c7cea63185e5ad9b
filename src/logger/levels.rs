use colored::{ColoredString, Colorize};

/// Standard log levels, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    pub fn symbol(&self) -> ColoredString {
        match self {
            LogLevel::Error => "❌".red().bold(),
            LogLevel::Warning => "⚠".yellow().bold(),
            LogLevel::Info => "ℹ".blue().bold(),
            LogLevel::Debug => "🐛".purple().bold(),
        }
    }

    pub fn style_message(&self, message: &str) -> ColoredString {
        match self {
            LogLevel::Error => message.red(),
            LogLevel::Warning => message.yellow(),
            LogLevel::Info => message.normal(),
            LogLevel::Debug => message.dimmed(),
        }
    }
}
