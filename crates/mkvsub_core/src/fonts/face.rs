//! Font faces and the pool index used to match ASS font references.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use ttf_parser::{name_id, Face};

use super::{FontError, FontResult};

/// One face inside a font file (collections hold several).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFace {
    /// File the face lives in.
    pub path: PathBuf,
    /// Face index within the file (0 for single fonts).
    pub index: u32,
    /// Every family, typographic family and full name, in every language.
    pub names: Vec<String>,
    pub bold: bool,
    pub italic: bool,
}

impl FontFace {
    /// Create a regular face known by one name.
    pub fn new(path: impl Into<PathBuf>, index: u32, family: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            index,
            names: vec![family.into()],
            bold: false,
            italic: false,
        }
    }

    /// Set the style flags.
    pub fn with_style(mut self, bold: bool, italic: bool) -> Self {
        self.bold = bold;
        self.italic = italic;
        self
    }

    /// Add another name the face answers to.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// First name, for log messages.
    pub fn display_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or("?")
    }

    /// Case-insensitive match against the face's names.
    pub fn answers_to(&self, family: &str) -> bool {
        let wanted = family.to_lowercase();
        self.names.iter().any(|n| n.to_lowercase() == wanted)
    }
}

/// Read every face of a font file with ttf-parser.
pub fn read_faces(path: &Path) -> FontResult<Vec<FontFace>> {
    let data = fs::read(path).map_err(|e| FontError::read(path, e))?;
    let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);

    let mut faces = Vec::with_capacity(count as usize);
    for index in 0..count {
        let face = Face::parse(&data, index)
            .map_err(|e| FontError::parse(path, format!("face {}: {}", index, e)))?;

        let mut names: Vec<String> = Vec::new();
        for name in face.names() {
            let Some(value) = name.to_string() else {
                continue;
            };
            match name.name_id {
                name_id::FAMILY | name_id::FULL_NAME | name_id::TYPOGRAPHIC_FAMILY => {
                    if !value.is_empty() && !names.contains(&value) {
                        names.push(value);
                    }
                }
                _ => {}
            }
        }

        faces.push(FontFace {
            path: path.to_path_buf(),
            index,
            names,
            bold: face.is_bold(),
            italic: face.is_italic(),
        });
    }

    Ok(faces)
}

/// Characters from `chars` the face has no glyph for.
pub fn missing_chars(face: &FontFace, chars: &BTreeSet<char>) -> FontResult<Vec<char>> {
    let data = fs::read(&face.path).map_err(|e| FontError::read(&face.path, e))?;
    let parsed = Face::parse(&data, face.index)
        .map_err(|e| FontError::parse(&face.path, e.to_string()))?;

    Ok(chars
        .iter()
        .copied()
        .filter(|c| !c.is_control() && parsed.glyph_index(*c).is_none())
        .collect())
}

/// All faces of a font pool, searchable by family and style.
#[derive(Debug, Clone, Default)]
pub struct FontIndex {
    faces: Vec<FontFace>,
}

impl FontIndex {
    pub fn new(faces: Vec<FontFace>) -> Self {
        Self { faces }
    }

    /// Best face for a family reference.
    ///
    /// Among faces answering to `family`, an exact bold/italic match wins,
    /// then a matching italic flag, then a matching bold flag, then the
    /// first candidate in pool order.
    pub fn find(&self, family: &str, bold: bool, italic: bool) -> Option<&FontFace> {
        let mut best: Option<(&FontFace, u8)> = None;
        for face in self.faces.iter().filter(|f| f.answers_to(family)) {
            let score = match (face.bold == bold, face.italic == italic) {
                (true, true) => 3,
                (false, true) => 2,
                (true, false) => 1,
                (false, false) => 0,
            };
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((face, score));
            }
        }
        best.map(|(face, _)| face)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> FontIndex {
        FontIndex::new(vec![
            FontFace::new("/f/Arial.ttf", 0, "Arial").with_name("Arial Regular"),
            FontFace::new("/f/ArialBd.ttf", 0, "Arial").with_style(true, false),
            FontFace::new("/f/ArialI.ttf", 0, "Arial").with_style(false, true),
            FontFace::new("/f/simhei.ttf", 0, "SimHei").with_name("黑体"),
        ])
    }

    #[test]
    fn finds_case_insensitively() {
        let index = pool();
        let face = index.find("arial", false, false).unwrap();
        assert_eq!(face.path, PathBuf::from("/f/Arial.ttf"));
        assert!(index.find("ARIAL REGULAR", false, false).is_some());
        assert!(index.find("Helvetica", false, false).is_none());
    }

    #[test]
    fn prefers_matching_style() {
        let index = pool();
        assert_eq!(
            index.find("Arial", true, false).unwrap().path,
            PathBuf::from("/f/ArialBd.ttf")
        );
        assert_eq!(
            index.find("Arial", false, true).unwrap().path,
            PathBuf::from("/f/ArialI.ttf")
        );
        // No bold italic face: the italic one is closer
        assert_eq!(
            index.find("Arial", true, true).unwrap().path,
            PathBuf::from("/f/ArialI.ttf")
        );
    }

    #[test]
    fn matches_localized_names() {
        let index = pool();
        assert_eq!(
            index.find("黑体", false, false).unwrap().display_name(),
            "SimHei"
        );
    }

    fn u16s(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    /// A minimal TrueType font: head, hhea, maxp, OS/2, cmap and name.
    ///
    /// `chars` map to glyphs 1.. through a format 6 cmap; `fs_selection`
    /// carries the italic (bit 0) and bold (bit 5) flags.
    fn truetype(
        names: &[(u16, &str)],
        fs_selection: u16,
        chars: std::ops::RangeInclusive<char>,
    ) -> Vec<u8> {
        let first = *chars.start() as u16;
        let count = *chars.end() as u16 - first + 1;

        let mut head = vec![0u8; 54];
        head[..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
        head[18..20].copy_from_slice(&1000u16.to_be_bytes());

        let mut hhea = vec![0u8; 36];
        hhea[..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        hhea[34..36].copy_from_slice(&1u16.to_be_bytes());

        let mut maxp = 0x0000_5000u32.to_be_bytes().to_vec();
        maxp.extend(u16s(&[count + 1]));

        let mut os2 = vec![0u8; 78];
        os2[62..64].copy_from_slice(&fs_selection.to_be_bytes());

        // One Unicode BMP encoding record pointing at a format 6 subtable
        let mut cmap = u16s(&[0, 1, 0, 3]);
        cmap.extend(12u32.to_be_bytes());
        cmap.extend(u16s(&[6, 10 + 2 * count, 0, first, count]));
        cmap.extend(u16s(&(1..=count).collect::<Vec<_>>()));

        let strings: Vec<Vec<u8>> = names
            .iter()
            .map(|(_, value)| u16s(&value.encode_utf16().collect::<Vec<_>>()))
            .collect();
        let mut name = u16s(&[0, names.len() as u16, 6 + 12 * names.len() as u16]);
        let mut offset = 0u16;
        for ((id, _), bytes) in names.iter().zip(&strings) {
            name.extend(u16s(&[3, 1, 0x0409, *id, bytes.len() as u16, offset]));
            offset += bytes.len() as u16;
        }
        name.extend(strings.concat());

        let mut tables: Vec<(&[u8; 4], Vec<u8>)> = vec![
            (b"OS/2", os2),
            (b"cmap", cmap),
            (b"head", head),
            (b"hhea", hhea),
            (b"maxp", maxp),
            (b"name", name),
        ];
        tables.sort_by_key(|(tag, _)| **tag);

        let mut font = 0x0001_0000u32.to_be_bytes().to_vec();
        font.extend(u16s(&[tables.len() as u16, 0, 0, 0]));
        let mut offset = 12 + 16 * tables.len();
        let mut body = Vec::new();
        for (tag, data) in &tables {
            font.extend_from_slice(*tag);
            font.extend(0u32.to_be_bytes());
            font.extend((offset as u32).to_be_bytes());
            font.extend((data.len() as u32).to_be_bytes());
            let padded = (data.len() + 3) & !3;
            body.extend_from_slice(data);
            body.resize(body.len() + padded - data.len(), 0);
            offset += padded;
        }
        font.extend(body);
        font
    }

    #[test]
    fn reads_names_style_and_glyphs_from_truetype() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.ttf");
        let font = truetype(
            &[
                (name_id::FAMILY, "Fixture Sans"),
                (name_id::SUBFAMILY, "Bold Italic"),
                (name_id::FULL_NAME, "Fixture Sans Bold Italic"),
                (name_id::POST_SCRIPT_NAME, "FixtureSans-BoldItalic"),
                (name_id::TYPOGRAPHIC_FAMILY, "Fixture"),
                (name_id::FAMILY, "Fixture Sans"),
            ],
            (1 << 5) | 1,
            'a'..='e',
        );
        fs::write(&path, font).unwrap();

        let faces = read_faces(&path).unwrap();
        assert_eq!(faces.len(), 1);
        let face = &faces[0];
        assert_eq!(face.path, path);
        assert_eq!(face.index, 0);
        assert_eq!(
            face.names,
            vec!["Fixture Sans", "Fixture Sans Bold Italic", "Fixture"]
        );
        assert!(face.bold && face.italic);

        let index = FontIndex::new(faces.clone());
        assert_eq!(index.find("fixture sans", true, true), Some(face));
        assert_eq!(index.find("Fixture", false, false), Some(face));
        assert!(index.find("FixtureSans-BoldItalic", true, true).is_none());

        let chars: BTreeSet<char> = "abz\n".chars().collect();
        assert_eq!(missing_chars(face, &chars).unwrap(), vec!['z']);
    }

    #[test]
    fn regular_truetype_has_no_style_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.ttf");
        let font = truetype(&[(name_id::FAMILY, "Plain")], 1 << 6, 'x'..='x');
        fs::write(&path, font).unwrap();

        let face = read_faces(&path).unwrap().remove(0);
        assert_eq!(face.names, vec!["Plain"]);
        assert!(!face.bold && !face.italic);
        assert!(missing_chars(&face, &['x'].into()).unwrap().is_empty());
    }

    #[test]
    fn read_faces_rejects_non_fonts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        fs::write(&path, b"not a font").unwrap();
        assert!(matches!(read_faces(&path), Err(FontError::Parse { .. })));
    }
}
