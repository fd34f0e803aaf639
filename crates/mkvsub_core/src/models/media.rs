//! Container metadata (tracks and attachments) as reported by `mkvmerge -J`.

use serde::{Deserialize, Serialize};

use super::enums::{TrackType, ASS_CODEC};

/// Everything the inspector learns about one container.
///
/// Built once per file and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    /// Attachments in container order.
    pub attachments: Vec<Attachment>,
    /// Tracks in container order.
    pub tracks: Vec<Track>,
}

impl ContainerMetadata {
    /// Iterate the subtitle tracks.
    pub fn subtitle_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks
            .iter()
            .filter(|t| t.track_type == TrackType::Subtitles)
    }

    /// Whether any subtitle track carries ASS/SSA.
    pub fn has_ass_subtitle(&self) -> bool {
        self.subtitle_tracks().any(Track::is_ass)
    }

    /// Iterate the attachments that declare a font content type.
    pub fn font_attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| a.is_font())
    }
}

/// A single track within a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Track ID within the container (mkvmerge numbering).
    pub id: u32,
    /// Type of track.
    #[serde(rename = "type")]
    pub track_type: TrackType,
    /// Codec name (e.g. "SubStationAlpha", "SubRip/SRT").
    pub codec: String,
    /// Language code, empty when the container does not set one.
    #[serde(default)]
    pub language: String,
    /// Track name, empty when unset.
    #[serde(default)]
    pub track_name: String,
}

impl Track {
    /// Create a track with empty language and name.
    pub fn new(id: u32, track_type: TrackType, codec: impl Into<String>) -> Self {
        Self {
            id,
            track_type,
            codec: codec.into(),
            language: String::new(),
            track_name: String::new(),
        }
    }

    /// Set the language code.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the track name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.track_name = name.into();
        self
    }

    /// True for subtitle tracks coded as ASS/SSA.
    pub fn is_ass(&self) -> bool {
        self.track_type == TrackType::Subtitles && self.codec == ASS_CODEC
    }

}

/// A file attached to a container (fonts, cover art, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment ID within the container.
    pub id: u32,
    /// Original filename.
    pub file_name: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// MIME type as stored in the container.
    #[serde(default)]
    pub content_type: String,
}

impl Attachment {
    /// Create a new attachment.
    pub fn new(
        id: u32,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            size: 0,
            content_type: content_type.into(),
        }
    }

    /// Set the size in bytes.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Whether the content type is in the `font/` family.
    pub fn is_font(&self) -> bool {
        self.content_type.starts_with("font/")
    }
}

/// Result of checking whether a container already carries subset fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetVerdict {
    /// The container needs no further subsetting.
    pub complete: bool,
    /// The container could not be inspected; `complete` is meaningless.
    pub inspection_failed: bool,
}

impl SubsetVerdict {
    /// Verdict for a file whose metadata could be judged.
    pub fn judged(complete: bool) -> Self {
        Self {
            complete,
            inspection_failed: false,
        }
    }

    /// Verdict for a file that could not be inspected.
    pub fn inspection_failed() -> Self {
        Self {
            complete: false,
            inspection_failed: true,
        }
    }

    /// The file was judged and still needs subsetting.
    pub fn needs_subset(&self) -> bool {
        !self.inspection_failed && !self.complete
    }
}
