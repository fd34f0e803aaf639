//! Log levels, batch log configuration and line prefixes.

use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

/// Ordered from most to least verbose, so `level < threshold` filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive for `EnvFilter`.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How a [`BatchLogger`](super::BatchLogger) filters and formats lines.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Per-file detail stays in the tail unless the file fails.
    pub compact: bool,
    /// Detail lines kept per file; 0 disables the tail.
    pub error_tail: usize,
    /// `[HH:MM:SS] ` before every line.
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

impl LogConfig {
    /// Everything written as it happens, with a longer tail.
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
            compact: false,
            error_tail: 50,
            show_timestamps: true,
        }
    }

    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level,
            compact: settings.compact,
            error_tail: settings.error_tail as usize,
            show_timestamps: true,
        }
    }
}

/// Receives every formatted batch log line.
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Marker put in front of a batch log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePrefix {
    /// `=== Dump ===`
    Phase,
    Success,
    Warning,
    Error,
    None,
}

impl MessagePrefix {
    pub fn format(&self, message: &str) -> String {
        match self {
            MessagePrefix::Phase => format!("=== {} ===", message),
            MessagePrefix::Success => format!("[SUCCESS] {}", message),
            MessagePrefix::Warning => format!("[WARNING] {}", message),
            MessagePrefix::Error => format!("[ERROR] {}", message),
            MessagePrefix::None => message.to_string(),
        }
    }
}
