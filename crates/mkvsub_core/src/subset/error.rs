//! Error types for the subset pipeline.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fonts::FontError;

/// Errors reading or writing ASS files.
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// Failed to read subtitle file.
    #[error("Failed to read file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write subtitle file.
    #[error("Failed to write file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid style definition.
    #[error("Invalid style at line {line}: {message}")]
    InvalidStyle { line: usize, message: String },

    /// Invalid dialogue line.
    #[error("Invalid event at line {line}: {message}")]
    InvalidEvent { line: usize, message: String },
}

impl SubtitleError {
    pub fn read(path: &Path, source: io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn write(path: &Path, source: io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn invalid_style(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidStyle {
            line,
            message: message.into(),
        }
    }

    pub fn invalid_event(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            line,
            message: message.into(),
        }
    }
}

/// Error from one subset stage.
#[derive(Error, Debug)]
pub enum StageError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// An ASS file could not be read, parsed or written.
    #[error(transparent)]
    Subtitle(#[from] SubtitleError),

    /// A font operation failed.
    #[error(transparent)]
    Font(#[from] FontError),

    /// Strict matching is on and some families have no font.
    #[error("No font found for: {}", .0.join(", "))]
    Unmatched(Vec<String>),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Generic stage error with message.
    #[error("{0}")]
    Other(String),
}

impl StageError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Result type for stage operations.
pub type StageResult<T> = Result<T, StageError>;
