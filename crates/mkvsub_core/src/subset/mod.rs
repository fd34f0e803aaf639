//! ASS font subsetting.
//!
//! A run goes through five stages (see [`StagePipeline::standard`]):
//!
//! 1. `parse` - characters drawn per font key
//! 2. `matchFonts` - faces of the pool answering to each family
//! 3. `createFontsSubset` - reduced fonts under the output directory
//! 4. `changeFontsName` - identifier per family, signed file names
//! 5. `replaceFontNameInAss` - ASS files pointing at the identifiers
//!
//! The first failing stage ends the run.

mod ass;
mod error;
mod stage;
mod stages;

pub use ass::{AssDocument, AssStyle, FontKey, FontRename, FontUsage};
pub use error::{StageError, StageResult, SubtitleError};
pub use stage::{StagePipeline, SubsetStage};
pub use stages::{
    ChangeFontsName, CreateFontsSubset, FacePlan, FamilyPlan, MatchFonts, Parse,
    ReplaceFontNameInAss, SubsetContext, SubsetState,
};

use std::path::{Path, PathBuf};

use crate::errors::{ProcessError, ProcessResult};
use crate::fonts::signature::NameGenerator;
use crate::fonts::FontToolkit;
use crate::workspace::{FONTS_DIR, SUBSETTED_DIR};

/// What to subset and where.
#[derive(Debug, Clone, Default)]
pub struct SubsetRequest {
    pub ass_files: Vec<PathBuf>,
    /// Font pool. Defaults to `fonts/` next to the first ASS file.
    pub fonts_dir: Option<PathBuf>,
    /// Output directory. Defaults to the first ASS file's directory, with
    /// `dir_safe` forced on.
    pub output_dir: Option<PathBuf>,
    /// Write into `subsetted/` under the output directory.
    pub dir_safe: bool,
}

impl SubsetRequest {
    pub fn new(ass_files: Vec<PathBuf>) -> Self {
        Self {
            ass_files,
            ..Self::default()
        }
    }

    pub fn fonts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fonts_dir = Some(dir.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn dir_safe(mut self, dir_safe: bool) -> Self {
        self.dir_safe = dir_safe;
        self
    }

    /// `(fonts_dir, output_dir)` after defaults.
    fn resolve(&self, first: &Path) -> (PathBuf, PathBuf) {
        let base = first.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let fonts_dir = self
            .fonts_dir
            .clone()
            .unwrap_or_else(|| base.join(FONTS_DIR));
        let (output, dir_safe) = match &self.output_dir {
            Some(dir) => (dir.clone(), self.dir_safe),
            None => (base, true),
        };
        let output = if dir_safe {
            output.join(SUBSETTED_DIR)
        } else {
            output
        };
        (fonts_dir, output)
    }
}

/// Outcome of a run that got through every stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubsetReport {
    pub output_dir: PathBuf,
    /// Signed subset fonts.
    pub fonts: Vec<PathBuf>,
    /// Rewritten ASS files.
    pub ass_files: Vec<PathBuf>,
    /// Families left untouched because no font answered to them.
    pub unmatched: Vec<String>,
    /// `(family, characters)` the matched face cannot draw.
    pub missing_glyphs: Vec<(String, Vec<char>)>,
    /// `(family, identifier)` per renamed family.
    pub renamed: Vec<(String, String)>,
}

impl SubsetReport {
    /// Some families were not subsetted.
    pub fn is_degraded(&self) -> bool {
        !self.unmatched.is_empty()
    }

    fn from_state(output_dir: PathBuf, state: SubsetState) -> Self {
        let renamed = state
            .plans
            .iter()
            .filter_map(|p| p.id.clone().map(|id| (p.display.clone(), id)))
            .collect();
        Self {
            output_dir,
            fonts: state.fonts,
            ass_files: state.rewritten,
            unmatched: state.unmatched,
            missing_glyphs: state.missing_glyphs,
            renamed,
        }
    }
}

/// Runs the standard stage pipeline with one toolkit and name source.
#[derive(Clone, Copy)]
pub struct FontSubsetter<'a> {
    toolkit: &'a dyn FontToolkit,
    names: &'a dyn NameGenerator,
    strict: bool,
    keep_intermediates: bool,
}

impl<'a> FontSubsetter<'a> {
    pub fn new(toolkit: &'a dyn FontToolkit, names: &'a dyn NameGenerator) -> Self {
        Self {
            toolkit,
            names,
            strict: false,
            keep_intermediates: false,
        }
    }

    /// Fail on unmatched families instead of degrading.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn keep_intermediates(mut self, keep: bool) -> Self {
        self.keep_intermediates = keep;
        self
    }

    /// Subset the fonts used by `request.ass_files`.
    pub fn run(&self, request: &SubsetRequest) -> ProcessResult<SubsetReport> {
        let first = request
            .ass_files
            .first()
            .ok_or_else(|| ProcessError::no_input("no ASS files to subset"))?;
        let (fonts_dir, output_dir) = request.resolve(first);
        tracing::info!(
            "Subsetting {} ASS file(s), fonts from {}, output to {}",
            request.ass_files.len(),
            fonts_dir.display(),
            output_dir.display()
        );

        let ctx = SubsetContext {
            toolkit: self.toolkit,
            names: self.names,
            ass_files: request.ass_files.clone(),
            fonts_dir,
            output_dir: output_dir.clone(),
            strict: self.strict,
            keep_intermediates: self.keep_intermediates,
        };
        let mut state = SubsetState::default();

        StagePipeline::standard()
            .run(&ctx, &mut state)
            .map_err(|(stage, source)| ProcessError::subset(stage, source))?;

        Ok(SubsetReport::from_state(output_dir, state))
    }
}
