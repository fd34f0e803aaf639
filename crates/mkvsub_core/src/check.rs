//! Whether a container already carries subset fonts.

use std::path::Path;

use crate::extraction::ContainerInspector;
use crate::fonts::signature::is_subsetted_font_name;
use crate::models::{ContainerMetadata, SubsetVerdict};
use crate::tools::{CommandRunner, Toolchain};

/// A container is complete when it has no ASS subtitles, or when at least
/// one font attachment carries the subset signature.
pub fn is_complete(metadata: &ContainerMetadata) -> bool {
    if !metadata.has_ass_subtitle() {
        return true;
    }
    metadata
        .font_attachments()
        .any(|a| is_subsetted_font_name(&a.file_name))
}

/// Checks containers through a [`ContainerInspector`].
pub struct SubsetCompletenessChecker<'a> {
    inspector: ContainerInspector<'a>,
}

impl<'a> SubsetCompletenessChecker<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: &Toolchain) -> Self {
        Self {
            inspector: ContainerInspector::new(runner, toolchain),
        }
    }

    /// Inspect and judge one container. Inspection failures are reported
    /// as such, never as incomplete.
    pub fn check(&self, path: &Path) -> SubsetVerdict {
        match self.inspector.inspect(path) {
            Ok(metadata) => SubsetVerdict::judged(is_complete(&metadata)),
            Err(e) => {
                tracing::warn!("{}", e);
                SubsetVerdict::inspection_failed()
            }
        }
    }
}
