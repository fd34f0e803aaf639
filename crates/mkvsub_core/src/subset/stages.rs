//! The five subset stages and the state they share.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::fonts::signature::{
    is_subsetted_font_name, signed_file_name, subset_extension, NameGenerator,
};
use crate::fonts::{is_font_file, FontFace, FontIndex, FontToolkit};

use super::ass::{AssDocument, FontRename, FontUsage};
use super::error::{StageResult, SubtitleError};
use super::stage::{StagePipeline, SubsetStage};
use super::StageError;

/// Inputs and collaborators shared by every stage of one run.
pub struct SubsetContext<'a> {
    pub toolkit: &'a dyn FontToolkit,
    pub names: &'a dyn NameGenerator,
    pub ass_files: Vec<PathBuf>,
    pub fonts_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Unmatched families fail the run instead of degrading it.
    pub strict: bool,
    /// Keep the glyph text files next to the fonts.
    pub keep_intermediates: bool,
}

/// A matched face and the characters it has to keep.
#[derive(Debug, Clone)]
pub struct FacePlan {
    pub face: FontFace,
    pub chars: BTreeSet<char>,
    /// Set by createFontsSubset.
    pub subset_path: Option<PathBuf>,
    /// Set by changeFontsName.
    pub final_path: Option<PathBuf>,
}

/// Every face matched for one family. All of them share one identifier.
#[derive(Debug, Clone)]
pub struct FamilyPlan {
    /// Lowercased family.
    pub key: String,
    /// Family as first spelled in the ASS files.
    pub display: String,
    /// Set by changeFontsName.
    pub id: Option<String>,
    pub faces: Vec<FacePlan>,
}

/// What the stages have produced so far.
#[derive(Debug, Default)]
pub struct SubsetState {
    pub documents: Vec<AssDocument>,
    pub usage: FontUsage,
    pub plans: Vec<FamilyPlan>,
    /// Families no face answers to, as spelled in the ASS files.
    pub unmatched: Vec<String>,
    /// `(family, characters)` a matched face cannot draw.
    pub missing_glyphs: Vec<(String, Vec<char>)>,
    /// Signed subset fonts.
    pub fonts: Vec<PathBuf>,
    /// Rewritten ASS files.
    pub rewritten: Vec<PathBuf>,
}

impl StagePipeline {
    /// parse → matchFonts → createFontsSubset → changeFontsName →
    /// replaceFontNameInAss
    pub fn standard() -> Self {
        Self::new()
            .with_stage(Parse)
            .with_stage(MatchFonts)
            .with_stage(CreateFontsSubset)
            .with_stage(ChangeFontsName)
            .with_stage(ReplaceFontNameInAss)
    }
}

/// Read every ASS file and collect the characters drawn per font.
pub struct Parse;

impl SubsetStage for Parse {
    fn name(&self) -> &str {
        "parse"
    }

    fn validate_input(&self, ctx: &SubsetContext<'_>, _state: &SubsetState) -> StageResult<()> {
        if ctx.ass_files.is_empty() {
            return Err(StageError::invalid_input("No ASS files given"));
        }
        if let Some(missing) = ctx.ass_files.iter().find(|p| !p.is_file()) {
            return Err(StageError::invalid_input(format!(
                "ASS file not found: {}",
                missing.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &SubsetContext<'_>, state: &mut SubsetState) -> StageResult<()> {
        for path in &ctx.ass_files {
            let doc = AssDocument::read(path)?;
            state.usage.merge(&doc.font_usage());
            state.documents.push(doc);
        }
        tracing::info!(
            "Parsed {} ASS file(s) using {} famil(ies)",
            state.documents.len(),
            state.usage.families().len()
        );
        Ok(())
    }
}

/// Match each used family against the faces of the font pool.
pub struct MatchFonts;

impl MatchFonts {
    /// An absent pool indexes nothing, leaving every family unmatched.
    fn index_pool(ctx: &SubsetContext<'_>) -> StageResult<FontIndex> {
        let mut faces = Vec::new();
        if !ctx.fonts_dir.is_dir() {
            tracing::warn!("No font directory at {}", ctx.fonts_dir.display());
            return Ok(FontIndex::new(faces));
        }
        for entry in WalkDir::new(&ctx.fonts_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                StageError::other(format!(
                    "Failed to walk font directory {}: {}",
                    ctx.fonts_dir.display(),
                    e
                ))
            })?;
            if !entry.file_type().is_file() || !is_font_file(entry.path()) {
                continue;
            }
            match ctx.toolkit.faces(entry.path()) {
                Ok(found) => faces.extend(found),
                Err(e) => tracing::warn!("Skipping unreadable font: {}", e),
            }
        }
        tracing::debug!(
            "Indexed {} face(s) under {}",
            faces.len(),
            ctx.fonts_dir.display()
        );
        Ok(FontIndex::new(faces))
    }
}

impl SubsetStage for MatchFonts {
    fn name(&self) -> &str {
        "matchFonts"
    }

    fn execute(&self, ctx: &SubsetContext<'_>, state: &mut SubsetState) -> StageResult<()> {
        if state.usage.is_empty() {
            return Ok(());
        }
        let index = Self::index_pool(ctx)?;

        let mut unmatched = BTreeSet::new();
        for (key, chars) in state.usage.iter() {
            let display = state.usage.spelling(&key.family).to_string();
            let Some(face) = index.find(&key.family, key.bold, key.italic) else {
                unmatched.insert(display);
                continue;
            };

            let plan = match state.plans.iter().position(|p| p.key == key.family) {
                Some(i) => &mut state.plans[i],
                None => {
                    state.plans.push(FamilyPlan {
                        key: key.family.clone(),
                        display,
                        id: None,
                        faces: Vec::new(),
                    });
                    let last = state.plans.len() - 1;
                    &mut state.plans[last]
                }
            };
            match plan.faces.iter_mut().find(|f| f.face == *face) {
                Some(existing) => existing.chars.extend(chars.iter().copied()),
                None => plan.faces.push(FacePlan {
                    face: face.clone(),
                    chars: chars.clone(),
                    subset_path: None,
                    final_path: None,
                }),
            }
        }

        state.unmatched = unmatched.into_iter().collect();
        if !state.unmatched.is_empty() {
            if ctx.strict {
                return Err(StageError::Unmatched(state.unmatched.clone()));
            }
            tracing::warn!("No font found for: {}", state.unmatched.join(", "));
        }

        for plan in &state.plans {
            for face in &plan.faces {
                let missing = ctx.toolkit.missing_chars(&face.face, &face.chars)?;
                if !missing.is_empty() {
                    tracing::warn!(
                        "{} ({}) is missing {} glyph(s): {}",
                        plan.display,
                        face.face.path.display(),
                        missing.len(),
                        missing.iter().collect::<String>()
                    );
                    state.missing_glyphs.push((plan.display.clone(), missing));
                }
            }
        }

        tracing::info!(
            "Matched {} famil(ies), {} unmatched",
            state.plans.len(),
            state.unmatched.len()
        );
        Ok(())
    }
}

/// Reduce each matched face to the characters it draws.
pub struct CreateFontsSubset;

impl CreateFontsSubset {
    fn intermediate_base(face: &FontFace, plan_index: usize) -> String {
        let stem = face
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "font".to_string());
        if face.index > 0 {
            format!("{}-{}.{}.subset", stem, face.index, plan_index)
        } else {
            format!("{}.{}.subset", stem, plan_index)
        }
    }
}

impl SubsetStage for CreateFontsSubset {
    fn name(&self) -> &str {
        "createFontsSubset"
    }

    fn execute(&self, ctx: &SubsetContext<'_>, state: &mut SubsetState) -> StageResult<()> {
        fs::create_dir_all(&ctx.output_dir)
            .map_err(|e| StageError::io("create output directory", e))?;

        for (plan_index, plan) in state.plans.iter_mut().enumerate() {
            for face_plan in plan.faces.iter_mut() {
                let base = Self::intermediate_base(&face_plan.face, plan_index);
                let text_file = ctx.output_dir.join(format!("{}.txt", base));
                let output = ctx.output_dir.join(format!(
                    "{}.{}",
                    base,
                    subset_extension(&face_plan.face.path)
                ));

                let mut text: String = face_plan.chars.iter().collect();
                if !face_plan.chars.contains(&' ') {
                    text.push(' ');
                }
                fs::write(&text_file, text)
                    .map_err(|e| StageError::io("write subset text", e))?;

                ctx.toolkit.subset(&face_plan.face, &text_file, &output)?;

                if !ctx.keep_intermediates {
                    fs::remove_file(&text_file)
                        .map_err(|e| StageError::io("remove subset text", e))?;
                }
                tracing::debug!(
                    "Subset {} to {} character(s)",
                    face_plan.face.path.display(),
                    face_plan.chars.len()
                );
                face_plan.subset_path = Some(output);
            }
        }
        Ok(())
    }

    fn validate_output(&self, _ctx: &SubsetContext<'_>, state: &SubsetState) -> StageResult<()> {
        for face in state.plans.iter().flat_map(|p| &p.faces) {
            match &face.subset_path {
                Some(path) if path.is_file() => {}
                _ => {
                    return Err(StageError::invalid_output(format!(
                        "No subset produced for {}",
                        face.face.path.display()
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Give each family a fresh identifier and sign its subset files.
pub struct ChangeFontsName;

impl SubsetStage for ChangeFontsName {
    fn name(&self) -> &str {
        "changeFontsName"
    }

    fn execute(&self, ctx: &SubsetContext<'_>, state: &mut SubsetState) -> StageResult<()> {
        let mut used = HashSet::new();

        for plan in state.plans.iter_mut() {
            let mut id = ctx.names.next_name();
            while !used.insert(id.clone()) {
                id = ctx.names.next_name();
            }

            for face_plan in plan.faces.iter_mut() {
                let subset = face_plan.subset_path.as_deref().ok_or_else(|| {
                    StageError::invalid_input(format!(
                        "{} was not subsetted",
                        face_plan.face.path.display()
                    ))
                })?;
                ctx.toolkit.rename(subset, &id)?;

                let signed = ctx.output_dir.join(signed_file_name(
                    &face_plan.face.path,
                    face_plan.face.index,
                    &id,
                ));
                fs::rename(subset, &signed)
                    .map_err(|e| StageError::io("rename subset font", e))?;
                state.fonts.push(signed.clone());
                face_plan.final_path = Some(signed);
            }

            tracing::info!("{} -> {}", plan.display, id);
            plan.id = Some(id);
        }
        Ok(())
    }

    fn validate_output(&self, _ctx: &SubsetContext<'_>, state: &SubsetState) -> StageResult<()> {
        for font in &state.fonts {
            let signed = font
                .file_name()
                .map(|n| is_subsetted_font_name(&n.to_string_lossy()))
                .unwrap_or(false);
            if !signed || !font.is_file() {
                return Err(StageError::invalid_output(format!(
                    "Missing or unsigned subset font: {}",
                    font.display()
                )));
            }
        }
        Ok(())
    }
}

/// Point every reference to a renamed family at its identifier.
pub struct ReplaceFontNameInAss;

impl SubsetStage for ReplaceFontNameInAss {
    fn name(&self) -> &str {
        "replaceFontNameInAss"
    }

    fn execute(&self, ctx: &SubsetContext<'_>, state: &mut SubsetState) -> StageResult<()> {
        let renames: Vec<FontRename> = state
            .plans
            .iter()
            .filter_map(|plan| {
                plan.id.as_ref().map(|id| FontRename {
                    family: plan.display.clone(),
                    id: id.clone(),
                })
            })
            .collect();

        for doc in &state.documents {
            let output = rewritten_path(&ctx.output_dir, doc.path())?;
            fs::write(&output, doc.rewrite_fonts(&renames))
                .map_err(|e| SubtitleError::write(&output, e))?;
            state.rewritten.push(output);
        }
        tracing::info!(
            "Rewrote {} ASS file(s) into {}",
            state.rewritten.len(),
            ctx.output_dir.display()
        );
        Ok(())
    }
}

fn rewritten_path(output_dir: &Path, source: &Path) -> StageResult<PathBuf> {
    source
        .file_name()
        .map(|name| output_dir.join(name))
        .ok_or_else(|| StageError::invalid_input(format!("Not a file: {}", source.display())))
}
