//! Container inspection using mkvmerge -J.

use std::path::Path;

use serde_json::Value;

use crate::errors::{ProcessError, ProcessResult};
use crate::models::{Attachment, ContainerMetadata, Track, TrackType};
use crate::tools::{CommandRunner, Toolchain};

/// Reads tracks and attachments of a container through `mkvmerge -J`.
pub struct ContainerInspector<'a> {
    runner: &'a dyn CommandRunner,
    mkvmerge: String,
}

impl<'a> ContainerInspector<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: &Toolchain) -> Self {
        Self {
            runner,
            mkvmerge: toolchain.mkvmerge.clone(),
        }
    }

    /// Inspect one container.
    ///
    /// Launch failures, nonzero exits and unreadable JSON all come back as
    /// [`ProcessError::Inspection`].
    pub fn inspect(&self, path: &Path) -> ProcessResult<ContainerMetadata> {
        tracing::debug!("Inspecting {}", path.display());

        let args = vec!["-J".to_string(), path.to_string_lossy().into_owned()];
        let output = self
            .runner
            .run(&self.mkvmerge, &args)
            .map_err(|e| ProcessError::inspection(path, e.to_string()))?;

        if !output.success() {
            return Err(ProcessError::inspection(
                path,
                format!(
                    "{} exited with code {}: {}",
                    self.mkvmerge,
                    output.exit_code,
                    output.diagnostic()
                ),
            ));
        }

        let json: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ProcessError::inspection(path, format!("invalid JSON: {}", e)))?;

        parse_identify_json(&json).map_err(|message| ProcessError::inspection(path, message))
    }
}

/// Parse the JSON output from mkvmerge -J.
pub fn parse_identify_json(json: &Value) -> Result<ContainerMetadata, String> {
    if !json.is_object() {
        return Err("expected a JSON object".to_string());
    }

    let recognized = json
        .get("container")
        .and_then(|c| c.get("recognized"))
        .and_then(|r| r.as_bool())
        .unwrap_or(true);
    if !recognized {
        return Err("container format not recognized".to_string());
    }

    let mut metadata = ContainerMetadata::default();

    if let Some(tracks) = json.get("tracks").and_then(|t| t.as_array()) {
        for track in tracks {
            metadata.tracks.push(parse_track(track)?);
        }
    }

    if let Some(attachments) = json.get("attachments").and_then(|a| a.as_array()) {
        for attachment in attachments {
            metadata.attachments.push(parse_attachment(attachment)?);
        }
    }

    Ok(metadata)
}

fn parse_id(value: &Value, what: &str) -> Result<u32, String> {
    value
        .get("id")
        .and_then(|id| id.as_u64())
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| format!("{} without a valid id", what))
}

fn str_field<'v>(value: Option<&'v Value>, key: &str) -> &'v str {
    value
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

/// Parse a single track's information.
fn parse_track(track: &Value) -> Result<Track, String> {
    let id = parse_id(track, "track")?;
    let track_type = TrackType::from_mkvmerge(str_field(Some(track), "type"));
    let properties = track.get("properties");

    Ok(Track::new(id, track_type, str_field(Some(track), "codec"))
        .with_language(str_field(properties, "language"))
        .with_name(str_field(properties, "track_name")))
}

/// Parse a single attachment's information.
fn parse_attachment(attachment: &Value) -> Result<Attachment, String> {
    let id = parse_id(attachment, "attachment")?;
    let size = attachment
        .get("size")
        .and_then(|s| s.as_u64())
        .unwrap_or(0);

    Ok(Attachment::new(
        id,
        str_field(Some(attachment), "file_name"),
        str_field(Some(attachment), "content_type"),
    )
    .with_size(size))
}
