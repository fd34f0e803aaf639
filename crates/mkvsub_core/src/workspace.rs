//! On-disk working areas.
//!
//! A [`WorkspaceLayout`] names the fixed sub-directories of one file's
//! working area. A [`BatchWorkspace`] is the random-named temporary root a
//! Create batch works under; it is removed when the batch ends.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::PathSettings;
use crate::fonts::signature::{NameGenerator, RandomNames};

/// Font pool directory name.
pub const FONTS_DIR: &str = "fonts";
/// Subset output directory name.
pub const SUBSETTED_DIR: &str = "subsetted";

/// `fonts/` and `subsetted/` under one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.root.join(FONTS_DIR)
    }

    pub fn subsetted_dir(&self) -> PathBuf {
        self.root.join(SUBSETTED_DIR)
    }

    /// Create the font pool directory if needed.
    pub fn ensure_fonts_dir(&self) -> io::Result<PathBuf> {
        let dir = self.fonts_dir();
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// Creates batch workspaces under a temp root.
#[derive(Clone)]
pub struct WorkspaceFactory {
    temp_root: PathBuf,
    names: Arc<dyn NameGenerator>,
}

impl WorkspaceFactory {
    pub fn new(temp_root: impl Into<PathBuf>, names: Arc<dyn NameGenerator>) -> Self {
        Self {
            temp_root: temp_root.into(),
            names,
        }
    }

    /// Random names under the configured temp root (system temp when empty).
    pub fn from_settings(paths: &PathSettings) -> Self {
        let temp_root = if paths.temp_root.is_empty() {
            std::env::temp_dir()
        } else {
            PathBuf::from(&paths.temp_root)
        };
        Self::new(temp_root, Arc::new(RandomNames))
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Reserve a fresh workspace root. Directories are created lazily.
    pub fn create(&self) -> BatchWorkspace {
        let mut root = self.temp_root.join(self.names.next_name());
        while root.exists() {
            root = self.temp_root.join(self.names.next_name());
        }
        tracing::debug!("Batch workspace: {}", root.display());
        BatchWorkspace {
            root,
            closed: false,
        }
    }
}

/// Temporary root shared by every file of one batch.
#[derive(Debug)]
pub struct BatchWorkspace {
    root: PathBuf,
    closed: bool,
}

impl BatchWorkspace {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Working directory for one input file: `<root>/<stem>`.
    pub fn file_dir(&self, stem: &str) -> PathBuf {
        self.root.join(stem)
    }

    /// Remove the workspace and everything in it.
    pub fn close(mut self) -> io::Result<()> {
        self.closed = true;
        remove_if_present(&self.root)
    }
}

impl Drop for BatchWorkspace {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = remove_if_present(&self.root) {
                tracing::warn!(
                    "Failed to remove workspace {}: {}",
                    self.root.display(),
                    e
                );
            }
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
