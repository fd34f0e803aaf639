//! Error types for per-file processing.
//!
//! Errors carry context that chains through layers:
//! Batch → File → Operation → Detail

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::subset::StageError;
use crate::tools::ToolError;

/// Failure of one operation on one file.
///
/// Batches never abort on these; they count them and move on.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// `mkvmerge -J` failed or produced output we could not read.
    #[error("Failed to inspect '{}': {message}", path.display())]
    Inspection { path: PathBuf, message: String },

    /// An external tool could not be launched or exited nonzero.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// A font subset stage failed; later stages did not run.
    #[error("Font subset failed at stage '{stage}': {source}")]
    Subset {
        stage: String,
        #[source]
        source: StageError,
    },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Nothing to operate on.
    #[error("No input: {0}")]
    NoInput(String),
}

impl ProcessError {
    /// Create an inspection error.
    pub fn inspection(path: &Path, message: impl Into<String>) -> Self {
        Self::Inspection {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a subset stage error.
    pub fn subset(stage: impl Into<String>, source: StageError) -> Self {
        Self::Subset {
            stage: stage.into(),
            source,
        }
    }

    /// Create an I/O error with context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a no-input error.
    pub fn no_input(message: impl Into<String>) -> Self {
        Self::NoInput(message.into())
    }

    /// Short label for the failure kind, used in batch summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Inspection { .. } => "inspection",
            Self::Tool(_) => "tool",
            Self::Subset { .. } => "subset",
            Self::Io { .. } => "io",
            Self::NoInput(_) => "no-input",
        }
    }

    /// True when the container itself could not be read.
    pub fn is_inspection(&self) -> bool {
        matches!(self, Self::Inspection { .. })
    }
}

/// Result type for processing operations.
pub type ProcessResult<T> = Result<T, ProcessError>;
