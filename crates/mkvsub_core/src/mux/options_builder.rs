//! mkvmerge command options builder.
//!
//! Token layout:
//!
//! ```text
//! --output <path> [--no-subtitles --no-attachments] <original>
//!     [--attach-file <font>]...
//!     ([--language 0:<lang>] [--track-name 0:<name>] <track file>)...
//! ```
//!
//! Track language and name come from the track file name (see
//! [`crate::naming`]) and fall back to the plan's defaults. An option whose
//! resolved value is empty is left out.

use std::path::{Path, PathBuf};

use crate::naming;

/// Everything one remux needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemuxPlan {
    /// Container providing video, audio and (unless `clean`) the rest.
    pub original: PathBuf,
    /// Subtitle files added as new tracks, in order.
    pub tracks: Vec<PathBuf>,
    /// Files attached to the output (fonts).
    pub attachments: Vec<PathBuf>,
    pub output: PathBuf,
    pub default_language: String,
    pub default_title: String,
    /// Drop the original's subtitle tracks and attachments.
    pub clean: bool,
}

impl RemuxPlan {
    pub fn new(original: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            original: original.into(),
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn tracks(mut self, tracks: Vec<PathBuf>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn attachments(mut self, attachments: Vec<PathBuf>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn defaults(mut self, language: impl Into<String>, title: impl Into<String>) -> Self {
        self.default_language = language.into();
        self.default_title = title.into();
        self
    }

    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }
}

/// Builder for mkvmerge command-line options.
pub struct MkvmergeOptionsBuilder<'a> {
    plan: &'a RemuxPlan,
}

impl<'a> MkvmergeOptionsBuilder<'a> {
    pub fn new(plan: &'a RemuxPlan) -> Self {
        Self { plan }
    }

    /// Build the complete mkvmerge command tokens.
    pub fn build(&self) -> Vec<String> {
        let mut tokens = vec!["--output".to_string(), path_token(&self.plan.output)];

        if self.plan.clean {
            tokens.push("--no-subtitles".to_string());
            tokens.push("--no-attachments".to_string());
        }
        tokens.push(path_token(&self.plan.original));

        for attachment in &self.plan.attachments {
            tokens.push("--attach-file".to_string());
            tokens.push(path_token(attachment));
        }

        for track in &self.plan.tracks {
            self.add_track(&mut tokens, track);
        }

        tokens
    }

    fn add_track(&self, tokens: &mut Vec<String>, track: &Path) {
        let resolved = naming::decode(track)
            .resolve(&self.plan.default_language, &self.plan.default_title);

        if !resolved.language.is_empty() {
            tokens.push("--language".to_string());
            tokens.push(format!("0:{}", resolved.language));
        }
        if !resolved.title.is_empty() {
            tokens.push("--track-name".to_string());
            tokens.push(format!("0:{}", resolved.title));
        }
        tokens.push(path_token(track));
    }
}

fn path_token(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Options that take the following token as their value.
const VALUE_OPTIONS: [&str; 4] = ["--output", "--attach-file", "--language", "--track-name"];

/// Format tokens for pretty display (one option per line).
pub fn format_tokens_pretty(tokens: &[String]) -> String {
    let mut result = String::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        if VALUE_OPTIONS.contains(&token.as_str()) && i + 1 < tokens.len() {
            result.push_str(&format!("{} {} \\\n", token, tokens[i + 1]));
            i += 2;
        } else {
            result.push_str(&format!("{} \\\n", token));
            i += 1;
        }
    }

    result
}
