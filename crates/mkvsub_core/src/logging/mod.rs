//! Logging for mkv-subset.
//!
//! - [`init_tracing`]: process-wide `tracing` subscriber, stderr plus an
//!   optional daily file
//! - [`BatchLogger`]: one log per batch run, with the `"<Flow> (i/N) done."`
//!   progress lines and a failure tail per file
//!
//! ```no_run
//! use mkvsub_core::logging::{batch_log_name, BatchLogger, LogConfig};
//!
//! let logger = BatchLogger::new(batch_log_name("Dump"), ".logs", LogConfig::default(), None)?;
//! logger.phase("Dump");
//! logger.progress("Dump", 1, 4);
//! # Ok::<(), std::io::Error>(())
//! ```

mod batch_logger;
mod types;

pub use batch_logger::{BatchLogger, BatchLoggerBuilder};
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use std::path::Path;

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// - Respects `RUST_LOG`, falling back to `default_level`
/// - Writes to stderr
/// - When `log_dir` is given, also writes a daily-rolling file there
///
/// Keep the returned guard alive until exit so the file writer flushes.
/// Should be called once at startup.
pub fn init_tracing(default_level: LogLevel, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mkv-subset.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();

            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

/// Log file stem for one batch run: `<flow>_<YYYYmmdd_HHMMSS>`.
pub fn batch_log_name(flow: &str) -> String {
    format!(
        "{}_{}",
        flow.to_lowercase(),
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_log_name_starts_with_flow() {
        let name = batch_log_name("Dump");
        assert!(name.starts_with("dump_"));
        // dump_ + 8 date digits + _ + 6 time digits
        assert_eq!(name.len(), "dump_".len() + 15);
    }

    #[test]
    fn test_tracing_can_init_twice() {
        init_test_tracing();
        init_test_tracing();
    }
}
