//! A toolkit over text "fonts", for pipeline tests.
//!
//! A fake font file holds `family=<name>`, `bold=<0|1>` and `italic=<0|1>`
//! lines. Subsetting copies the glyph list into the output and renaming
//! appends `name=<id>`, so tests can read back what happened.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use parking_lot::Mutex;

use super::{FontError, FontFace, FontResult, FontToolkit};

/// Contents of a fake font file.
pub(crate) fn fake_font(family: &str, bold: bool, italic: bool) -> String {
    format!(
        "family={}\nbold={}\nitalic={}\n",
        family, bold as u8, italic as u8
    )
}

#[derive(Default)]
pub(crate) struct FakeFontKit {
    /// Characters no face can draw.
    missing: BTreeSet<char>,
    /// Fail subsetting of faces with this family.
    fail_subset_of: Option<String>,
    subsets: Mutex<Vec<(String, String)>>,
    renames: Mutex<Vec<String>>,
}

impl FakeFontKit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.missing = chars.into_iter().collect();
        self
    }

    pub fn failing_subset_of(mut self, family: &str) -> Self {
        self.fail_subset_of = Some(family.to_string());
        self
    }

    /// `(family, text)` per subset call.
    pub fn subsets(&self) -> Vec<(String, String)> {
        self.subsets.lock().clone()
    }

    /// Identifiers passed to rename, in call order.
    pub fn renames(&self) -> Vec<String> {
        self.renames.lock().clone()
    }
}

impl FontToolkit for FakeFontKit {
    fn faces(&self, path: &Path) -> FontResult<Vec<FontFace>> {
        let text = fs::read_to_string(path).map_err(|e| FontError::read(path, e))?;
        let mut family = None;
        let mut bold = false;
        let mut italic = false;
        for line in text.lines() {
            match line.split_once('=') {
                Some(("family", v)) => family = Some(v.to_string()),
                Some(("bold", v)) => bold = v == "1",
                Some(("italic", v)) => italic = v == "1",
                _ => {}
            }
        }
        let family = family.ok_or_else(|| FontError::parse(path, "no family line"))?;
        Ok(vec![FontFace::new(path, 0, family).with_style(bold, italic)])
    }

    fn missing_chars(&self, _face: &FontFace, chars: &BTreeSet<char>) -> FontResult<Vec<char>> {
        Ok(chars.intersection(&self.missing).copied().collect())
    }

    fn subset(&self, face: &FontFace, text_file: &Path, output: &Path) -> FontResult<()> {
        if self.fail_subset_of.as_deref() == Some(face.display_name()) {
            return Err(FontError::parse(&face.path, "subset refused"));
        }
        let text = fs::read_to_string(text_file).map_err(|e| FontError::read(text_file, e))?;
        let source = fs::read_to_string(&face.path).map_err(|e| FontError::read(&face.path, e))?;
        fs::write(output, format!("{}glyphs={}\n", source, text))
            .map_err(|e| FontError::io("write subset", e))?;
        self.subsets
            .lock()
            .push((face.display_name().to_string(), text));
        Ok(())
    }

    fn rename(&self, font: &Path, id: &str) -> FontResult<()> {
        let mut text = fs::read_to_string(font).map_err(|e| FontError::read(font, e))?;
        text.push_str(&format!("name={}\n", id));
        fs::write(font, text).map_err(|e| FontError::io("rename font", e))?;
        self.renames.lock().push(id.to_string());
        Ok(())
    }
}
