//! The batch flows: Query, Dump, Create and Make.
//!
//! Every flow enumerates its files first, then processes them one at a
//! time. A failing file is logged and counted; the batch always runs to
//! the end and logs one `"<Flow> (i/N) done."` line per file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::check::SubsetCompletenessChecker;
use crate::errors::{ProcessError, ProcessResult};
use crate::extraction::Extractor;
use crate::logging::BatchLogger;
use crate::models::BatchFlow;
use crate::mux::{RemuxPlan, Remuxer};
use crate::naming::{ASS_EXTENSION, OTHER_SUBTITLE_EXTENSION};
use crate::subset::{FontSubsetter, SubsetReport, SubsetRequest};
use crate::tools::{CommandRunner, Toolchain};
use crate::workspace::{BatchWorkspace, WorkspaceFactory, WorkspaceLayout};

use super::discovery::{
    companions, find_fonts, find_media, find_mkvs, has_extension, list_with_extension,
    relative_dir, stem_of,
};

/// How one file ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FileStatus {
    Done,
    /// Finished, but some font families were left as they were.
    Degraded(String),
}

impl FileStatus {
    fn from_subset(report: Option<&SubsetReport>) -> Self {
        match report {
            Some(r) if r.is_degraded() => {
                Self::Degraded(format!("no font found for: {}", r.unmatched.join(", ")))
            }
            _ => Self::Done,
        }
    }
}

/// One failed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    /// [`ProcessError::kind`] of the failure.
    pub kind: &'static str,
    pub message: String,
}

/// Result of a Dump, Create or Make batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub flow: BatchFlow,
    pub total: usize,
    pub failures: Vec<FileFailure>,
    /// Files that finished with unmatched font families.
    pub degraded: Vec<PathBuf>,
}

impl BatchOutcome {
    fn new(flow: BatchFlow, total: usize) -> Self {
        Self {
            flow,
            total,
            failures: Vec::new(),
            degraded: Vec::new(),
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True iff no file failed.
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of a Query batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryReport {
    pub total: usize,
    /// Containers with ASS subtitles and no subset font.
    pub needs_subset: Vec<PathBuf>,
    /// Containers that could not be inspected.
    pub inspection_failed: Vec<PathBuf>,
}

impl QueryReport {
    pub fn success(&self) -> bool {
        self.inspection_failed.is_empty()
    }
}

/// Inputs of a Create batch.
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    /// Videos to wrap; every file with an extension counts.
    pub video_dir: PathBuf,
    /// Subtitles, matched to videos by file stem.
    pub subtitle_dir: PathBuf,
    /// Font pool for subsetting.
    pub fonts_dir: PathBuf,
    /// Output containers go to `<output_dir>/<stem>.mkv`.
    pub output_dir: PathBuf,
    pub language: String,
    pub title: String,
    /// Drop subtitles and attachments already in the videos.
    pub clean: bool,
}

/// Runs the batch flows with one set of collaborators.
pub struct BatchProcessor<'a> {
    runner: &'a dyn CommandRunner,
    toolchain: &'a Toolchain,
    subsetter: FontSubsetter<'a>,
    logger: &'a BatchLogger,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        toolchain: &'a Toolchain,
        subsetter: FontSubsetter<'a>,
        logger: &'a BatchLogger,
    ) -> Self {
        Self {
            runner,
            toolchain,
            subsetter,
            logger,
        }
    }

    fn scan(files: std::io::Result<Vec<PathBuf>>) -> ProcessResult<Vec<PathBuf>> {
        files.map_err(|e| ProcessError::io("scan input directory", e))
    }

    /// Run `op` on every file, logging failures and progress.
    fn for_each_file(
        &self,
        flow: BatchFlow,
        files: &[PathBuf],
        mut op: impl FnMut(&Path) -> ProcessResult<FileStatus>,
    ) -> BatchOutcome {
        let total = files.len();
        let mut outcome = BatchOutcome::new(flow, total);
        self.logger.phase(&format!("{}: {} file(s)", flow, total));

        for (i, file) in files.iter().enumerate() {
            self.logger.begin_file(file);
            match op(file) {
                Ok(FileStatus::Done) => {}
                Ok(FileStatus::Degraded(reason)) => {
                    self.logger.warn(&format!("{}: {}", file.display(), reason));
                    outcome.degraded.push(file.clone());
                }
                Err(e) => {
                    self.logger
                        .error(&format!("{} failed for \"{}\": {}", flow, file.display(), e));
                    self.logger.dump_tail();
                    outcome.failures.push(FileFailure {
                        path: file.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
            self.logger.progress(flow.name(), i + 1, total);
        }

        if outcome.success() {
            self.logger
                .success(&format!("{} finished: {} file(s)", flow, total));
        } else {
            self.logger.warn(&format!(
                "{} finished with {} failure(s) out of {} file(s)",
                flow,
                outcome.failed(),
                total
            ));
        }
        outcome
    }

    /// Report the containers under `dir` that still need subsetting.
    pub fn query(&self, dir: &Path) -> ProcessResult<QueryReport> {
        let files = Self::scan(find_mkvs(dir))?;
        let checker = SubsetCompletenessChecker::new(self.runner, self.toolchain);
        let mut report = QueryReport {
            total: files.len(),
            ..QueryReport::default()
        };
        self.logger
            .phase(&format!("{}: {} file(s)", BatchFlow::Query, files.len()));

        for (i, file) in files.iter().enumerate() {
            let verdict = checker.check(file);
            if verdict.inspection_failed {
                self.logger
                    .error(&format!("Failed to inspect \"{}\"", file.display()));
                report.inspection_failed.push(file.clone());
            } else if !verdict.complete {
                self.logger.detail(&format!("Needs subset: {}", file.display()));
                report.needs_subset.push(file.clone());
            }
            self.logger
                .progress(BatchFlow::Query.name(), i + 1, files.len());
        }
        Ok(report)
    }

    /// Extract every container under `dir` into
    /// `<output>/<relative dir>/<stem>`, subsetting when asked.
    pub fn dump(&self, dir: &Path, output: &Path, subset: bool) -> ProcessResult<BatchOutcome> {
        let files = Self::scan(find_mkvs(dir))?;
        let extractor = Extractor::new(self.runner, self.toolchain, self.subsetter);

        Ok(self.for_each_file(BatchFlow::Dump, &files, |file| {
            let out = output.join(relative_dir(dir, file)).join(stem_of(file));
            let report = extractor.extract(file, &out, subset)?;
            Ok(FileStatus::from_subset(report.subset.as_ref()))
        }))
    }

    /// Build `<output>/<stem>.mkv` for every video, with its subtitles
    /// subset against the font pool.
    ///
    /// Subset work happens in a fresh workspace that is removed when the
    /// batch ends.
    pub fn create(
        &self,
        request: &CreateRequest,
        workspaces: &WorkspaceFactory,
    ) -> ProcessResult<BatchOutcome> {
        let videos = Self::scan(find_media(&request.video_dir))?;
        let subtitles = Self::scan(find_media(&request.subtitle_dir))?;
        let remuxer = Remuxer::new(self.runner, self.toolchain);
        let workspace = workspaces.create();

        let outcome = self.for_each_file(BatchFlow::Create, &videos, |video| {
            self.create_one(request, &workspace, &subtitles, &remuxer, video)
        });

        if let Err(e) = workspace.close() {
            self.logger
                .warn(&format!("Failed to remove batch workspace: {}", e));
        }
        Ok(outcome)
    }

    fn create_one(
        &self,
        request: &CreateRequest,
        workspace: &BatchWorkspace,
        subtitles: &[PathBuf],
        remuxer: &Remuxer<'_>,
        video: &Path,
    ) -> ProcessResult<FileStatus> {
        let stem = stem_of(video);
        let (ass, others): (Vec<&PathBuf>, Vec<&PathBuf>) = companions(subtitles, &stem)
            .into_iter()
            .partition(|p| has_extension(p, ASS_EXTENSION));

        let mut status = FileStatus::Done;
        let mut tracks = Vec::new();
        let mut attachments = Vec::new();

        if !ass.is_empty() {
            let dir = workspace.file_dir(&stem);
            fs::create_dir_all(&dir).map_err(|e| ProcessError::io("create workspace", e))?;

            let mut copies = Vec::with_capacity(ass.len());
            for sub in ass {
                let Some(name) = sub.file_name() else {
                    continue;
                };
                let dest = dir.join(name);
                fs::copy(sub, &dest).map_err(|e| ProcessError::io("copy subtitle", e))?;
                copies.push(dest);
            }

            let report = self
                .subsetter
                .run(&SubsetRequest::new(copies).fonts_dir(&request.fonts_dir))?;
            status = FileStatus::from_subset(Some(&report));
            tracks = report.ass_files;
            attachments = report.fonts;
        }
        tracks.extend(others.into_iter().cloned());

        let plan = RemuxPlan::new(video, request.output_dir.join(format!("{}.mkv", stem)))
            .tracks(tracks)
            .attachments(attachments)
            .defaults(&request.language, &request.title)
            .clean(request.clean);
        remuxer.remux(&plan)?;
        Ok(status)
    }

    /// Rebuild every container under `dir` from a previous subsetting dump
    /// in `data`, writing `<output>/<relative dir>/<name>`.
    ///
    /// The original's subtitles and attachments are replaced.
    pub fn make(
        &self,
        dir: &Path,
        data: &Path,
        output: &Path,
        language: &str,
        title: &str,
    ) -> ProcessResult<BatchOutcome> {
        let files = Self::scan(find_mkvs(dir))?;
        let remuxer = Remuxer::new(self.runner, self.toolchain);

        Ok(self.for_each_file(BatchFlow::Make, &files, |file| {
            let rel = relative_dir(dir, file);
            let dumped = data.join(&rel).join(stem_of(file));
            let subsetted = WorkspaceLayout::new(&dumped).subsetted_dir();
            let listing = |e: std::io::Error| ProcessError::io("list dumped files", e);

            let mut tracks =
                list_with_extension(&dumped, OTHER_SUBTITLE_EXTENSION).map_err(listing)?;
            tracks.extend(list_with_extension(&subsetted, ASS_EXTENSION).map_err(listing)?);
            let attachments = find_fonts(&subsetted).map_err(listing)?;

            let name = file.file_name().unwrap_or_default();
            let plan = RemuxPlan::new(file, output.join(rel).join(name))
                .tracks(tracks)
                .attachments(attachments)
                .defaults(language, title)
                .clean(true);
            remuxer.remux(&plan)?;
            Ok(FileStatus::Done)
        }))
    }
}
