//! Track metadata carried in file names: `<trackID>_<language>_<title>.<ext>`.
//!
//! Extraction encodes, remuxing decodes. Both go through this module so the
//! convention lives in one place.
//!
//! Decoding rules:
//! - the track id is the first `_` segment, absent if it is not an integer
//! - the language is the second segment
//! - the title is everything after the second `_`
//! - empty or missing fields are absent and fall back to caller defaults

use std::path::Path;

use crate::models::ASS_CODEC;

/// Extension for ASS/SSA subtitle tracks.
pub const ASS_EXTENSION: &str = "ass";
/// Extension for every other subtitle codec.
pub const OTHER_SUBTITLE_EXTENSION: &str = "sub";

/// Pick the file extension (without dot) for a subtitle codec.
pub fn extension_for_codec(codec: &str) -> &'static str {
    if codec == ASS_CODEC {
        ASS_EXTENSION
    } else {
        OTHER_SUBTITLE_EXTENSION
    }
}

/// Build the base name for an extracted subtitle track.
///
/// Characters that are not allowed in file names are replaced with `-` so
/// the result is always a single path component.
pub fn encode(track_id: u32, language: &str, title: &str, codec: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        track_id,
        sanitize_field(language),
        sanitize_field(title),
        extension_for_codec(codec)
    )
}

fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect()
}

/// Metadata recovered from an encoded file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedName {
    pub track_id: Option<u32>,
    pub language: Option<String>,
    pub title: Option<String>,
}

impl DecodedName {
    /// Fill absent fields from the defaults.
    ///
    /// The result may still be empty when the default is empty; callers
    /// skip the corresponding mux option in that case.
    pub fn resolve(&self, default_language: &str, default_title: &str) -> ResolvedName {
        ResolvedName {
            language: self
                .language
                .clone()
                .unwrap_or_else(|| default_language.to_string()),
            title: self
                .title
                .clone()
                .unwrap_or_else(|| default_title.to_string()),
        }
    }
}

/// Language and title to apply to a remuxed track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedName {
    pub language: String,
    pub title: String,
}

/// Decode the metadata fields from a track file path.
///
/// Never fails: anything that cannot be read is reported as absent.
pub fn decode(path: &Path) -> DecodedName {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut fields = stem.splitn(3, '_');
    let track_id = fields.next().and_then(|s| s.parse::<u32>().ok());
    let language = fields.next().and_then(non_empty);
    let title = fields.next().and_then(non_empty);

    DecodedName {
        track_id,
        language,
        title,
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
