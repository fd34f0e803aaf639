//! Core enums used throughout the application.

use serde::{Deserialize, Serialize};

/// Codec name mkvmerge reports for ASS/SSA subtitle tracks.
pub const ASS_CODEC: &str = "SubStationAlpha";

/// Type of media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Video,
    Audio,
    Subtitles,
    /// Anything else mkvmerge reports (buttons, unknown stream kinds).
    Other,
}

impl TrackType {
    /// Map the `type` string from `mkvmerge -J` output.
    pub fn from_mkvmerge(value: &str) -> Self {
        match value {
            "video" => TrackType::Video,
            "audio" => TrackType::Audio,
            "subtitles" => TrackType::Subtitles,
            _ => TrackType::Other,
        }
    }
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackType::Video => write!(f, "video"),
            TrackType::Audio => write!(f, "audio"),
            TrackType::Subtitles => write!(f, "subtitles"),
            TrackType::Other => write!(f, "other"),
        }
    }
}

/// The batch flows the driver can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFlow {
    /// Check which containers still need subsetting.
    Query,
    /// Extract subtitles and fonts (optionally subsetting them).
    Dump,
    /// Build containers from loose video, subtitle and font trees.
    Create,
    /// Rebuild containers from a previous dump.
    Make,
}

impl BatchFlow {
    /// Label used in progress lines and log file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Dump => "Dump",
            Self::Create => "Create",
            Self::Make => "Make",
        }
    }
}

impl std::fmt::Display for BatchFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
