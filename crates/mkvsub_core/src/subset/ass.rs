//! ASS/SSA reading for font subsetting.
//!
//! Only what subsetting needs is interpreted:
//! - `[V4+ Styles]` / `[V4 Styles]`: style name, font name, bold, italic
//! - `[Events]`: dialogue text with `\fn`, `\r`, `\b`, `\i` and `\p` overrides
//!
//! Every other line is kept verbatim so a rewritten file differs from the
//! source only in font names and the added `[Script Info]` comments.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::SubtitleError;

/// A style as far as font selection is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssStyle {
    pub name: String,
    pub fontname: String,
    pub bold: bool,
    pub italic: bool,
    line: usize,
    fontname_field: Option<usize>,
}

#[derive(Debug, Clone)]
struct AssEvent {
    style: String,
    text: String,
    line: usize,
    /// Byte offset of the text field in the raw line.
    text_start: usize,
}

/// Font family, lowercased, plus style flags.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

/// Characters drawn per font key, across one or more documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontUsage {
    chars: BTreeMap<FontKey, BTreeSet<char>>,
    /// Lowercased family -> spelling first seen.
    spellings: BTreeMap<String, String>,
}

impl FontUsage {
    /// Record characters drawn with a family. `@` (vertical) is dropped.
    pub fn record(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
        chars: impl IntoIterator<Item = char>,
    ) {
        let family = family.trim().trim_start_matches('@').trim();
        if family.is_empty() {
            return;
        }
        let chars: Vec<char> = chars.into_iter().collect();
        if chars.is_empty() {
            return;
        }

        let key = family.to_lowercase();
        self.spellings
            .entry(key.clone())
            .or_insert_with(|| family.to_string());
        self.chars
            .entry(FontKey {
                family: key,
                bold,
                italic,
            })
            .or_default()
            .extend(chars);
    }

    /// Add another usage set into this one.
    pub fn merge(&mut self, other: &FontUsage) {
        for (key, spelling) in &other.spellings {
            self.spellings
                .entry(key.clone())
                .or_insert_with(|| spelling.clone());
        }
        for (key, chars) in &other.chars {
            self.chars
                .entry(key.clone())
                .or_default()
                .extend(chars.iter().copied());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FontKey, &BTreeSet<char>)> {
        self.chars.iter()
    }

    /// Display spelling for a lowercased family key.
    pub fn spelling<'a>(&'a self, family_key: &'a str) -> &'a str {
        self.spellings
            .get(family_key)
            .map(String::as_str)
            .unwrap_or(family_key)
    }

    /// Distinct lowercased families.
    pub fn families(&self) -> Vec<String> {
        self.spellings.keys().cloned().collect()
    }

    /// Characters drawn with a key, if any.
    pub fn chars_for(&self, key: &FontKey) -> Option<&BTreeSet<char>> {
        self.chars.get(key)
    }
}

/// A family rewritten to a subset identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontRename {
    pub family: String,
    pub id: String,
}

/// A parsed ASS file that can be written back with renamed fonts.
#[derive(Debug, Clone)]
pub struct AssDocument {
    path: PathBuf,
    lines: Vec<String>,
    line_ending: &'static str,
    bom: bool,
    trailing_newline: bool,
    script_info: Option<usize>,
    styles: Vec<AssStyle>,
    events: Vec<AssEvent>,
}

impl AssDocument {
    /// Read and parse a file.
    pub fn read(path: &Path) -> Result<Self, SubtitleError> {
        let bytes = fs::read(path).map_err(|e| SubtitleError::read(path, e))?;
        let content = String::from_utf8_lossy(&bytes);
        Self::parse(path, &content)
    }

    /// Parse ASS content. `path` is kept for naming the output.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self, SubtitleError> {
        let bom = content.starts_with('\u{feff}');
        let content = content.trim_start_matches('\u{feff}');

        let mut doc = Self {
            path: path.into(),
            lines: content.lines().map(str::to_string).collect(),
            line_ending: if content.contains("\r\n") { "\r\n" } else { "\n" },
            bom,
            trailing_newline: content.ends_with('\n'),
            script_info: None,
            styles: Vec::new(),
            events: Vec::new(),
        };

        let mut current_section = String::new();
        let mut style_format: Vec<String> = Vec::new();
        let mut event_format: Vec<String> = Vec::new();

        for (index, raw) in doc.lines.iter().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].to_lowercase();
                if current_section == "script info" && doc.script_info.is_none() {
                    doc.script_info = Some(index);
                }
                continue;
            }

            match current_section.as_str() {
                "v4+ styles" | "v4 styles" => {
                    if line.starts_with("Format:") {
                        style_format = parse_format_line(line);
                    } else if line.starts_with("Style:") {
                        doc.styles
                            .push(parse_style_line(raw, index, &style_format)?);
                    }
                }
                "events" => {
                    if line.starts_with("Format:") {
                        event_format = parse_format_line(line);
                    } else if line.starts_with("Dialogue:") {
                        doc.events
                            .push(parse_dialogue_line(raw, index, &event_format)?);
                    }
                }
                _ => {}
            }
        }

        Ok(doc)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn styles(&self) -> &[AssStyle] {
        &self.styles
    }

    /// Style an event resolves to: exact name, then case-insensitive,
    /// then `Default`, then the first style.
    fn style_for(&self, name: &str) -> Option<&AssStyle> {
        let name = name.trim().trim_start_matches('*');
        self.styles
            .iter()
            .find(|s| s.name == name)
            .or_else(|| {
                self.styles
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(name))
            })
            .or_else(|| self.styles.iter().find(|s| s.name == "Default"))
            .or_else(|| self.styles.first())
    }

    /// Characters drawn per font across every dialogue line.
    pub fn font_usage(&self) -> FontUsage {
        let mut usage = FontUsage::default();
        for event in &self.events {
            self.collect_event(event, &mut usage);
        }
        usage
    }

    fn collect_event(&self, event: &AssEvent, usage: &mut FontUsage) {
        let base = self.style_for(&event.style);
        let mut state = RenderState::from_style(base);
        let mut drawing = false;
        let mut rest = event.text.as_str();

        loop {
            let (plain, block, remainder) = split_override(rest);
            if !drawing {
                usage.record(&state.family, state.bold, state.italic, plain_chars(plain));
            }
            let Some(block) = block else {
                break;
            };

            for tag in block.split('\\').skip(1) {
                let tag = tag.trim();
                if let Some(name) = tag.strip_prefix("fn") {
                    let name = name.trim_end_matches(')').trim();
                    state.family = if name.is_empty() {
                        RenderState::from_style(base).family
                    } else {
                        name.to_string()
                    };
                } else if let Some(style) = tag.strip_prefix('r') {
                    let style = style.trim_end_matches(')').trim();
                    state = if style.is_empty() {
                        RenderState::from_style(base)
                    } else {
                        RenderState::from_style(self.style_for(style))
                    };
                } else if let Some(value) = numeric_arg(tag, 'b') {
                    state.bold = value == 1 || value >= 700;
                } else if let Some(value) = numeric_arg(tag, 'i') {
                    state.italic = value != 0;
                } else if let Some(value) = numeric_arg(tag, 'p') {
                    drawing = value != 0;
                }
            }
            rest = remainder;
        }
    }

    /// Render the document with renamed fonts and a `[Script Info]` comment
    /// per rename.
    pub fn rewrite_fonts(&self, renames: &[FontRename]) -> String {
        let map: HashMap<String, &str> = renames
            .iter()
            .map(|r| (r.family.to_lowercase(), r.id.as_str()))
            .collect();

        let mut lines = self.lines.clone();

        for style in &self.styles {
            let Some(field) = style.fontname_field else {
                continue;
            };
            if let Some(rewritten) = rewrite_style_line(&lines[style.line], field, &map) {
                lines[style.line] = rewritten;
            }
        }

        for event in &self.events {
            let raw = &lines[event.line];
            let (head, text) = raw.split_at(event.text_start);
            lines[event.line] = format!("{}{}", head, rewrite_fn_tags(text, &map));
        }

        if let Some(header) = self.script_info {
            for (offset, rename) in renames.iter().enumerate() {
                lines.insert(
                    header + 1 + offset,
                    format!("; Font Subset: {} - {}", rename.id, rename.family),
                );
            }
        }

        let mut out = String::new();
        if self.bom {
            out.push('\u{feff}');
        }
        out.push_str(&lines.join(self.line_ending));
        if self.trailing_newline {
            out.push_str(self.line_ending);
        }
        out
    }
}

#[derive(Debug, Clone)]
struct RenderState {
    family: String,
    bold: bool,
    italic: bool,
}

impl RenderState {
    fn from_style(style: Option<&AssStyle>) -> Self {
        match style {
            Some(s) => Self {
                family: s.fontname.clone(),
                bold: s.bold,
                italic: s.italic,
            },
            None => Self {
                family: String::new(),
                bold: false,
                italic: false,
            },
        }
    }
}

/// Split off the text before the next `{...}` block.
///
/// Returns `(plain, Some(block contents), rest)`, or `(all, None, "")` when
/// no complete block follows. An unclosed `{` is plain text.
fn split_override(text: &str) -> (&str, Option<&str>, &str) {
    let Some(open) = text.find('{') else {
        return (text, None, "");
    };
    match text[open..].find('}') {
        Some(close) => (
            &text[..open],
            Some(&text[open + 1..open + close]),
            &text[open + close + 1..],
        ),
        None => (text, None, ""),
    }
}

/// Visible characters of a plain text run.
///
/// `\N` and `\n` are line breaks and `\h` is a hard space.
fn plain_chars(text: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('N') | Some('n') => {
                    chars.next();
                    continue;
                }
                Some('h') => {
                    chars.next();
                    out.push('\u{a0}');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

/// `\b1`, `\i0`, `\p1`: the tag letter followed only by digits.
fn numeric_arg(tag: &str, letter: char) -> Option<u32> {
    let digits = tag.strip_prefix(letter)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn rename_family(name: &str, map: &HashMap<String, &str>) -> Option<String> {
    let trimmed = name.trim();
    let (vertical, bare) = match trimmed.strip_prefix('@') {
        Some(bare) => ("@", bare),
        None => ("", trimmed),
    };
    map.get(&bare.trim().to_lowercase())
        .map(|id| format!("{}{}", vertical, id))
}

fn rewrite_style_line(raw: &str, field: usize, map: &HashMap<String, &str>) -> Option<String> {
    let colon = raw.find(':')?;
    let (head, body) = raw.split_at(colon + 1);
    let mut fields: Vec<String> = body.split(',').map(str::to_string).collect();
    let current = fields.get(field)?;
    let renamed = rename_family(current, map)?;
    let lead = &current[..current.len() - current.trim_start().len()];
    fields[field] = format!("{}{}", lead, renamed);
    Some(format!("{}{}", head, fields.join(",")))
}

fn rewrite_fn_tags(text: &str, map: &HashMap<String, &str>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let (plain, block, remainder) = split_override(rest);
        out.push_str(plain);
        let Some(block) = block else {
            break;
        };
        let rewritten = regex!(r"\\fn([^\\}]*)").replace_all(block, |caps: &regex::Captures| {
            let raw = &caps[1];
            let name = raw.trim_end_matches(')');
            match rename_family(name, map) {
                Some(id) => format!("\\fn{}{}", id, &raw[name.len()..]),
                None => caps[0].to_string(),
            }
        });
        out.push('{');
        out.push_str(&rewritten);
        out.push('}');
        rest = remainder;
    }
    out
}

/// Parse a Format: line to get field names.
fn parse_format_line(line: &str) -> Vec<String> {
    line.trim_start_matches("Format:")
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .collect()
}

fn parse_style_line(
    raw: &str,
    line_index: usize,
    format: &[String],
) -> Result<AssStyle, SubtitleError> {
    let content = raw.trim().trim_start_matches("Style:");
    let fields: Vec<&str> = content.split(',').collect();

    let format = if format.is_empty() {
        default_style_format()
    } else {
        format.to_vec()
    };

    if fields.len() < format.len() {
        return Err(SubtitleError::invalid_style(
            line_index + 1,
            format!("Expected {} fields, got {}", format.len(), fields.len()),
        ));
    }

    let mut style = AssStyle {
        name: String::new(),
        fontname: String::new(),
        bold: false,
        italic: false,
        line: line_index,
        fontname_field: None,
    };

    for (i, field_name) in format.iter().enumerate() {
        let value = fields.get(i).map(|s| s.trim()).unwrap_or("");
        match field_name.as_str() {
            "name" => style.name = value.to_string(),
            "fontname" => {
                style.fontname = value.to_string();
                style.fontname_field = Some(i);
            }
            "bold" => {
                style.bold = value
                    .parse::<i32>()
                    .map_or(false, |v| v == -1 || v == 1 || v >= 700)
            }
            "italic" => style.italic = value == "-1" || value == "1",
            _ => {}
        }
    }

    Ok(style)
}

fn parse_dialogue_line(
    raw: &str,
    line_index: usize,
    format: &[String],
) -> Result<AssEvent, SubtitleError> {
    let format = if format.is_empty() {
        default_event_format()
    } else {
        format.to_vec()
    };
    let text_index = format.iter().position(|f| f == "text").unwrap_or(9);
    let style_index = format.iter().position(|f| f == "style");

    let colon = raw.find(':').unwrap_or(0);
    let content = &raw[colon + 1..];
    let parts: Vec<&str> = content.splitn(text_index + 1, ',').collect();

    if parts.len() < text_index {
        return Err(SubtitleError::invalid_event(
            line_index + 1,
            format!("Expected at least {} fields", text_index),
        ));
    }

    let text = parts.get(text_index).copied().unwrap_or("");
    let style = style_index
        .and_then(|i| parts.get(i))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    Ok(AssEvent {
        style,
        text: text.to_string(),
        line: line_index,
        text_start: raw.len() - text.len(),
    })
}

/// Default style format for V4+ Styles.
fn default_style_format() -> Vec<String> {
    [
        "name",
        "fontname",
        "fontsize",
        "primarycolour",
        "secondarycolour",
        "outlinecolour",
        "backcolour",
        "bold",
        "italic",
        "underline",
        "strikeout",
        "scalex",
        "scaley",
        "spacing",
        "angle",
        "borderstyle",
        "outline",
        "shadow",
        "alignment",
        "marginl",
        "marginr",
        "marginv",
        "encoding",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Default event format for Events section.
fn default_event_format() -> Vec<String> {
    [
        "layer", "start", "end", "style", "name", "marginl", "marginr", "marginv", "effect", "text",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
