//! The subsetted-font signature.
//!
//! Renamed subset fonts are written as `<stem>.<ID>.<ext>` where `ID` is
//! eight characters from `[A-Z0-9]`. The completeness check recognises
//! already-processed containers by the same shape, so both sides use the
//! constants and helpers here.

use std::path::Path;

use parking_lot::Mutex;
use rand::Rng;

/// Identifier length.
pub const ID_LEN: usize = 8;

/// Identifier alphabet.
pub const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// File name pattern of a renamed subset font.
pub const SIGNATURE_PATTERN: &str = r"\.[A-Z0-9]{8}\.\S+$";

/// Whether `file_name` carries the subset signature.
pub fn is_subsetted_font_name(file_name: &str) -> bool {
    regex!(SIGNATURE_PATTERN).is_match(file_name)
}

/// Whether `id` is a well-formed identifier.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| ID_ALPHABET.contains(&b))
}

/// Output extension for a font file: collections become single fonts.
pub fn subset_extension(source: &Path) -> String {
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "ttc" => "ttf".to_string(),
        "otc" => "otf".to_string(),
        "" => "ttf".to_string(),
        _ => ext,
    }
}

/// Signed file name for a subset of `source`: `<stem>.<ID>.<ext>`.
///
/// `face_index` is appended to the stem for faces after the first in a
/// collection so faces of one file do not collide.
pub fn signed_file_name(source: &Path, face_index: u32, id: &str) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "font".to_string());
    let stem = if face_index > 0 {
        format!("{}-{}", stem, face_index)
    } else {
        stem
    };
    format!("{}.{}.{}", stem, id, subset_extension(source))
}

/// Source of identifiers for subset fonts and batch workspaces.
pub trait NameGenerator: Send + Sync {
    /// Produce the next identifier.
    fn next_name(&self) -> String;
}

/// Random identifiers from the thread RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNames;

impl NameGenerator for RandomNames {
    fn next_name(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..ID_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect()
    }
}

/// Deterministic identifiers for tests and reproducible runs.
///
/// Hands out the given names in order, then zero-padded counters.
#[derive(Debug, Default)]
pub struct FixedNames {
    names: Vec<String>,
    next: Mutex<usize>,
}

impl FixedNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            next: Mutex::new(0),
        }
    }

    /// Only counters: `00000001`, `00000002`, ...
    pub fn counting() -> Self {
        Self::default()
    }
}

impl NameGenerator for FixedNames {
    fn next_name(&self) -> String {
        let mut next = self.next.lock();
        let index = *next;
        *next += 1;
        match self.names.get(index) {
            Some(name) => name.clone(),
            None => format!("{:0width$}", index + 1, width = ID_LEN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_signed_names() {
        assert!(is_subsetted_font_name("foo.AB12CD34.ttf"));
        assert!(is_subsetted_font_name("Noto Sans.00000001.otf"));
        assert!(!is_subsetted_font_name("foo.ttf"));
        assert!(!is_subsetted_font_name("foo.ab12cd34.ttf"));
        assert!(!is_subsetted_font_name("foo.AB12CD3.ttf"));
        assert!(!is_subsetted_font_name("foo.AB12CD34."));
    }

    #[test]
    fn random_names_are_valid_signatures() {
        let gen = RandomNames;
        for _ in 0..50 {
            let id = gen.next_name();
            assert!(is_valid_id(&id), "{}", id);
            assert!(is_subsetted_font_name(&signed_file_name(
                Path::new("/f/Arial.ttf"),
                0,
                &id
            )));
        }
    }

    #[test]
    fn fixed_names_then_counters() {
        let gen = FixedNames::new(["AB12CD34"]);
        assert_eq!(gen.next_name(), "AB12CD34");
        assert_eq!(gen.next_name(), "00000002");
        assert!(is_valid_id(&FixedNames::counting().next_name()));
    }

    #[test]
    fn signed_names_convert_collections() {
        assert_eq!(
            signed_file_name(Path::new("/f/msgothic.ttc"), 1, "AAAAAAAA"),
            "msgothic-1.AAAAAAAA.ttf"
        );
        assert_eq!(
            signed_file_name(Path::new("/f/Source.OTC"), 0, "BBBBBBBB"),
            "Source.BBBBBBBB.otf"
        );
        assert_eq!(
            signed_file_name(Path::new("/f/Font.otf"), 0, "CCCCCCCC"),
            "Font.CCCCCCCC.otf"
        );
    }
}
