//! Per-batch log: one file per run, plus an optional line callback.
//!
//! Every line is mirrored into `tracing`. Detail about the file being
//! processed goes into a bounded tail; in compact mode it is only written
//! out when that file fails.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Recent detail lines for the current file.
#[derive(Default)]
struct Tail {
    file: String,
    lines: VecDeque<String>,
}

pub struct BatchLogger {
    name: String,
    log_path: Option<PathBuf>,
    writer: Mutex<Option<BufWriter<File>>>,
    callback: Option<LogCallback>,
    config: LogConfig,
    tail: Mutex<Tail>,
}

impl BatchLogger {
    /// Log to `<log_dir>/<name>.log`, creating the directory.
    pub fn new(
        name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> io::Result<Self> {
        let mut logger = Self::detached(name, config, callback);
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let path = log_dir.join(format!("{}.log", sanitize_filename(&logger.name)));
        let file = File::create(&path)?;
        *logger.writer.get_mut() = Some(BufWriter::new(file));
        logger.log_path = Some(path);
        Ok(logger)
    }

    /// No log file; lines go to `tracing` and the callback only.
    pub fn detached(
        name: impl Into<String>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> Self {
        Self {
            name: name.into(),
            log_path: None,
            writer: Mutex::new(None),
            callback,
            tail: Mutex::new(Tail {
                file: String::new(),
                lines: VecDeque::with_capacity(config.error_tail),
            }),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, MessagePrefix::None, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, MessagePrefix::None, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, MessagePrefix::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, MessagePrefix::Error, message);
    }

    pub fn phase(&self, name: &str) {
        self.emit(LogLevel::Info, MessagePrefix::Phase, name);
    }

    pub fn success(&self, message: &str) {
        self.emit(LogLevel::Info, MessagePrefix::Success, message);
    }

    /// `"<Flow> (i/N) done."`, written whatever the level filter says.
    pub fn progress(&self, flow: &str, done: usize, total: usize) {
        let line = format!("{} ({}/{}) done.", flow, done, total);
        tracing::info!(batch = %self.name, "{}", line);
        self.write_line(&line);
    }

    /// Reset the tail for `path` and note that it started.
    pub fn begin_file(&self, path: &Path) {
        {
            let mut tail = self.tail.lock();
            tail.file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            tail.lines.clear();
        }
        self.detail(&format!("Processing {}", path.display()));
    }

    /// Detail about the current file. Compact mode keeps it in the tail only.
    pub fn detail(&self, line: &str) {
        if self.config.error_tail > 0 {
            let mut tail = self.tail.lock();
            if tail.lines.len() >= self.config.error_tail {
                tail.lines.pop_front();
            }
            tail.lines.push_back(line.to_string());
        }

        if !self.config.compact {
            self.emit(LogLevel::Debug, MessagePrefix::None, line);
        }
    }

    /// Write out the current file's tail, typically after it failed.
    pub fn dump_tail(&self) {
        let (file, lines) = {
            let tail = self.tail.lock();
            (tail.file.clone(), tail.lines.iter().cloned().collect::<Vec<_>>())
        };
        if lines.is_empty() {
            return;
        }

        self.write_line(&format!("[{}/tail]", file));
        for line in &lines {
            self.write_line(&format!("  {}", line));
        }
    }

    pub fn tail(&self) -> Vec<String> {
        self.tail.lock().lines.iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(writer) = self.writer.lock().as_mut() {
            let _ = writer.flush();
        }
    }

    /// Flush and release the log file. Later lines reach the callback only.
    pub fn close(&self) {
        self.flush();
        *self.writer.lock() = None;
    }

    fn emit(&self, level: LogLevel, prefix: MessagePrefix, message: &str) {
        if level < self.config.level {
            return;
        }

        let message = prefix.format(message);
        match level {
            LogLevel::Trace => tracing::trace!(batch = %self.name, "{}", message),
            LogLevel::Debug => tracing::debug!(batch = %self.name, "{}", message),
            LogLevel::Info => tracing::info!(batch = %self.name, "{}", message),
            LogLevel::Warn => tracing::warn!(batch = %self.name, "{}", message),
            LogLevel::Error => tracing::error!(batch = %self.name, "{}", message),
        }
        self.write_line(&message);
    }

    fn write_line(&self, message: &str) {
        let line = if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        };

        if let Some(writer) = self.writer.lock().as_mut() {
            let _ = writeln!(writer, "{}", line);
        }
        if let Some(callback) = &self.callback {
            callback(&line);
        }
    }
}

impl Drop for BatchLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Replace characters that are not allowed in file names.
pub(crate) fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Fluent construction; a logger without `log_dir` is detached.
pub struct BatchLoggerBuilder {
    name: String,
    log_dir: Option<PathBuf>,
    config: LogConfig,
    callback: Option<LogCallback>,
}

impl BatchLoggerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log_dir: None,
            config: LogConfig::default(),
            callback: None,
        }
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn compact(mut self, compact: bool) -> Self {
        self.config.compact = compact;
        self
    }

    pub fn callback(mut self, callback: LogCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn build(self) -> io::Result<BatchLogger> {
        match self.log_dir {
            Some(dir) => BatchLogger::new(self.name, dir, self.config, self.callback),
            None => Ok(BatchLogger::detached(self.name, self.config, self.callback)),
        }
    }
}
