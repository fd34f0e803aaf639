//! mkvextract planning: which attachment and track goes where.

use std::path::{Path, PathBuf};

use crate::models::ContainerMetadata;
use crate::naming;
use crate::workspace::WorkspaceLayout;

/// Destinations for one batched mkvextract call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractPlan {
    /// `(attachment id, destination)`.
    pub attachments: Vec<(u32, PathBuf)>,
    /// `(track id, destination)`, subtitle tracks only.
    pub tracks: Vec<(u32, PathBuf)>,
}

impl ExtractPlan {
    /// Every attachment goes to `<out>/fonts/<file name>`, every subtitle
    /// track to `<out>/<trackID>_<language>_<title>.<ext>`.
    pub fn for_container(metadata: &ContainerMetadata, output_dir: &Path) -> Self {
        let fonts_dir = WorkspaceLayout::new(output_dir).fonts_dir();

        let attachments = metadata
            .attachments
            .iter()
            .filter_map(|a| match Path::new(&a.file_name).file_name() {
                Some(name) => Some((a.id, fonts_dir.join(name))),
                None => {
                    tracing::warn!(
                        "Skipping attachment {} with unusable name '{}'",
                        a.id,
                        a.file_name
                    );
                    None
                }
            })
            .collect();

        let tracks = metadata
            .subtitle_tracks()
            .map(|t| {
                (
                    t.id,
                    output_dir.join(naming::encode(t.id, &t.language, &t.track_name, &t.codec)),
                )
            })
            .collect();

        Self {
            attachments,
            tracks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty() && self.tracks.is_empty()
    }

    /// `<file> attachments <id:path>... tracks <id:path>...`, omitting
    /// empty modes.
    pub fn args(&self, container: &Path) -> Vec<String> {
        let mut args = vec![container.to_string_lossy().into_owned()];
        for (mode, specs) in [("attachments", &self.attachments), ("tracks", &self.tracks)] {
            if specs.is_empty() {
                continue;
            }
            args.push(mode.to_string());
            args.extend(
                specs
                    .iter()
                    .map(|(id, path)| format!("{}:{}", id, path.display())),
            );
        }
        args
    }

    /// Destinations of ASS tracks.
    pub fn ass_files(&self) -> Vec<PathBuf> {
        self.tracks
            .iter()
            .map(|(_, path)| path)
            .filter(|p| {
                p.extension()
                    .is_some_and(|e| e == naming::ASS_EXTENSION)
            })
            .cloned()
            .collect()
    }
}
