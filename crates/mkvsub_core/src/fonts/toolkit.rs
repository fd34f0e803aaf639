//! Font operations the subset pipeline needs, behind one trait.
//!
//! [`FontTools`] reads faces with ttf-parser and delegates subsetting and
//! renaming to fonttools (`pyftsubset`, `ttx`).

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use super::face::{self, FontFace};
use super::{FontError, FontResult};
use crate::tools::{CommandRunner, Toolchain};

/// Name records rewritten on rename: family, unique ID, full name,
/// PostScript name, typographic family and WWS family.
pub const RENAMED_NAME_IDS: [u16; 6] = [1, 3, 4, 6, 16, 21];

/// Font inspection, subsetting and renaming.
pub trait FontToolkit {
    /// All faces in a font file.
    fn faces(&self, path: &Path) -> FontResult<Vec<FontFace>>;

    /// Characters the face cannot draw.
    fn missing_chars(&self, face: &FontFace, chars: &BTreeSet<char>) -> FontResult<Vec<char>>;

    /// Write a font with only the characters listed in `text_file`.
    fn subset(&self, face: &FontFace, text_file: &Path, output: &Path) -> FontResult<()>;

    /// Rewrite the font's internal names to `id`, in place.
    fn rename(&self, font: &Path, id: &str) -> FontResult<()>;
}

/// fonttools-backed toolkit.
pub struct FontTools<'a> {
    runner: &'a dyn CommandRunner,
    pyftsubset: String,
    ttx: String,
    keep_intermediates: bool,
}

impl<'a> FontTools<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: &Toolchain) -> Self {
        Self {
            runner,
            pyftsubset: toolchain.pyftsubset.clone(),
            ttx: toolchain.ttx.clone(),
            keep_intermediates: false,
        }
    }

    /// Keep the `.ttx` dumps written during renaming.
    pub fn keep_intermediates(mut self, keep: bool) -> Self {
        self.keep_intermediates = keep;
        self
    }
}

impl FontToolkit for FontTools<'_> {
    fn faces(&self, path: &Path) -> FontResult<Vec<FontFace>> {
        face::read_faces(path)
    }

    fn missing_chars(&self, face: &FontFace, chars: &BTreeSet<char>) -> FontResult<Vec<char>> {
        face::missing_chars(face, chars)
    }

    fn subset(&self, face: &FontFace, text_file: &Path, output: &Path) -> FontResult<()> {
        let args = pyftsubset_args(face, text_file, output);
        self.runner.run_checked(&self.pyftsubset, &args)?;
        Ok(())
    }

    fn rename(&self, font: &Path, id: &str) -> FontResult<()> {
        let xml_path = font.with_extension("ttx");

        let dump = vec![
            "-f".to_string(),
            "-o".to_string(),
            xml_path.display().to_string(),
            font.display().to_string(),
        ];
        self.runner.run_checked(&self.ttx, &dump)?;

        let xml = fs::read_to_string(&xml_path).map_err(|e| FontError::read(&xml_path, e))?;
        let rewritten = rewrite_name_records(&xml, id);
        fs::write(&xml_path, rewritten.as_bytes())
            .map_err(|e| FontError::io("write ttx dump", e))?;

        let compile = vec![
            "-f".to_string(),
            "-o".to_string(),
            font.display().to_string(),
            xml_path.display().to_string(),
        ];
        self.runner.run_checked(&self.ttx, &compile)?;

        if !self.keep_intermediates {
            if let Err(e) = fs::remove_file(&xml_path) {
                tracing::warn!("Failed to remove {}: {}", xml_path.display(), e);
            }
        }
        Ok(())
    }
}

/// Arguments for one `pyftsubset` run.
pub fn pyftsubset_args(face: &FontFace, text_file: &Path, output: &Path) -> Vec<String> {
    vec![
        face.path.display().to_string(),
        format!("--font-number={}", face.index),
        format!("--text-file={}", text_file.display()),
        format!("--output-file={}", output.display()),
        "--name-IDs=*".to_string(),
        "--name-languages=*".to_string(),
        "--layout-features=*".to_string(),
        "--glyph-names".to_string(),
        "--symbol-cmap".to_string(),
        "--legacy-cmap".to_string(),
        "--notdef-glyph".to_string(),
        "--notdef-outline".to_string(),
        "--recommended-glyphs".to_string(),
        "--name-legacy".to_string(),
    ]
}

/// Replace the text of every renamed name record in a `ttx` dump with `id`.
pub fn rewrite_name_records(xml: &str, id: &str) -> String {
    regex!(r#"(?s)(<namerecord nameID="(\d+)"[^>]*>).*?(</namerecord>)"#)
        .replace_all(xml, |caps: &regex::Captures| {
            let renamed = caps[2]
                .parse::<u16>()
                .map_or(false, |n| RENAMED_NAME_IDS.contains(&n));
            if renamed {
                format!("{}\n      {}\n    {}", &caps[1], id, &caps[3])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}
