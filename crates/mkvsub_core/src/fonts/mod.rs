//! Font pool handling: face discovery, matching and the fonttools bridge.
//!
//! - [`signature`]: the `<stem>.<ID>.<ext>` contract for subset fonts
//! - [`FontIndex`]: faces of a pool, matched by family and style
//! - [`FontToolkit`]: inspection, subsetting and renaming

mod face;
pub mod signature;
mod toolkit;

#[cfg(test)]
pub(crate) mod fake;

pub use face::{missing_chars, read_faces, FontFace, FontIndex};
pub use toolkit::{pyftsubset_args, rewrite_name_records, FontToolkit, FontTools};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::tools::ToolError;

/// Font file extensions accepted in a pool.
pub const FONT_EXTENSIONS: [&str; 4] = ["ttf", "otf", "ttc", "otc"];

/// Whether `path` has a font extension (case-insensitive).
pub fn is_font_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| FONT_EXTENSIONS.contains(&e.as_str()))
}

/// Errors from font operations.
#[derive(Error, Debug)]
pub enum FontError {
    #[error("Failed to read font '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse font '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl FontError {
    pub fn read(path: &Path, source: io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn parse(path: &Path, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for font operations.
pub type FontResult<T> = Result<T, FontError>;
