//! Data models for mkv-subset.
//!
//! - Enums for track types and batch flows
//! - Container metadata (tracks, attachments)
//! - Subset verdicts

mod enums;
mod media;

pub use enums::{BatchFlow, TrackType, ASS_CODEC};
pub use media::{Attachment, ContainerMetadata, SubsetVerdict, Track};
