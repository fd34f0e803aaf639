//! Container inspection and extraction.
//!
//! - [`ContainerInspector`]: tracks and attachments via `mkvmerge -J`
//! - [`ExtractPlan`]: where each attachment and subtitle track goes
//! - [`Extractor`]: one batched mkvextract call, then optional subsetting

mod mkvextract;
mod probe;

pub use mkvextract::ExtractPlan;
pub use probe::{parse_identify_json, ContainerInspector};

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{ProcessError, ProcessResult};
use crate::subset::{FontSubsetter, SubsetReport, SubsetRequest};
use crate::tools::{CommandRunner, Toolchain};
use crate::workspace::WorkspaceLayout;

/// What one extraction produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub output_dir: PathBuf,
    /// Extracted attachments.
    pub attachments: Vec<PathBuf>,
    /// Extracted subtitle tracks.
    pub subtitles: Vec<PathBuf>,
    /// Set when subsetting was requested and there were ASS tracks.
    pub subset: Option<SubsetReport>,
}

/// Pulls fonts and subtitle tracks out of containers.
pub struct Extractor<'a> {
    inspector: ContainerInspector<'a>,
    runner: &'a dyn CommandRunner,
    mkvextract: String,
    subsetter: FontSubsetter<'a>,
}

impl<'a> Extractor<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        toolchain: &Toolchain,
        subsetter: FontSubsetter<'a>,
    ) -> Self {
        Self {
            inspector: ContainerInspector::new(runner, toolchain),
            runner,
            mkvextract: toolchain.mkvextract.clone(),
            subsetter,
        }
    }

    /// Extract every attachment and subtitle track of `container` into
    /// `output_dir`, then subset the ASS tracks when asked.
    ///
    /// A subset failure is returned as the error; the extracted files stay.
    pub fn extract(
        &self,
        container: &Path,
        output_dir: &Path,
        subset_requested: bool,
    ) -> ProcessResult<ExtractReport> {
        let metadata = self.inspector.inspect(container)?;
        let plan = ExtractPlan::for_container(&metadata, output_dir);

        let mut report = ExtractReport {
            output_dir: output_dir.to_path_buf(),
            attachments: plan.attachments.iter().map(|(_, p)| p.clone()).collect(),
            subtitles: plan.tracks.iter().map(|(_, p)| p.clone()).collect(),
            subset: None,
        };

        if plan.is_empty() {
            tracing::info!("Nothing to extract from {}", container.display());
            return Ok(report);
        }

        fs::create_dir_all(output_dir)
            .map_err(|e| ProcessError::io("create extraction directory", e))?;
        if !plan.attachments.is_empty() {
            WorkspaceLayout::new(output_dir)
                .ensure_fonts_dir()
                .map_err(|e| ProcessError::io("create fonts directory", e))?;
        }

        self.runner
            .run_checked(&self.mkvextract, &plan.args(container))?;
        tracing::info!(
            "Extracted {} attachment(s) and {} subtitle track(s) from {}",
            report.attachments.len(),
            report.subtitles.len(),
            container.display()
        );

        let ass_files = plan.ass_files();
        if subset_requested && !ass_files.is_empty() {
            let layout = WorkspaceLayout::new(output_dir);
            let request = SubsetRequest::new(ass_files)
                .fonts_dir(layout.fonts_dir())
                .output_dir(output_dir)
                .dir_safe(true);
            report.subset = Some(self.subsetter.run(&request)?);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::fake::{fake_font, FakeFontKit};
    use crate::fonts::signature::FixedNames;
    use crate::models::{Attachment, ContainerMetadata, Track, TrackType, ASS_CODEC};
    use crate::tools::fake::{FakeMkvToolnix, FakeRunner};
    use tempfile::tempdir;

    const ASS: &str = "[Script Info]\nScriptType: v4.00+\n\n[V4+ Styles]\nStyle: Default,Alpha,20,&H0,&H0,&H0,&H0,0,0,0,0,100,100,0,0,1,2,2,2,10,10,10,1\n\n[Events]\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,hello\n";

    fn container() -> ContainerMetadata {
        ContainerMetadata {
            attachments: vec![
                Attachment::new(1, "a.ttf", "font/ttf"),
                Attachment::new(2, "b.ttf", "font/ttf"),
            ],
            tracks: vec![
                Track::new(0, TrackType::Video, "AVC/H.264/MPEG-4p10"),
                Track::new(3, TrackType::Subtitles, ASS_CODEC)
                    .with_language("eng")
                    .with_name("Full"),
            ],
        }
    }

    #[test]
    fn extracts_in_one_call() {
        let dir = tempdir().unwrap();
        let mkv = dir.path().join("in").join("ep01.mkv");
        let out = dir.path().join("out");
        let fake = FakeMkvToolnix::new();
        let alpha = fake_font("Alpha", false, false);
        fake.add(
            &mkv,
            container(),
            &[(1, alpha.as_bytes()), (2, b"font b"), (3, ASS.as_bytes())],
        );
        let runner = FakeRunner::new();
        fake.install(&runner);
        let kit = FakeFontKit::new();
        let names = FixedNames::counting();

        let extractor = Extractor::new(&runner, &Toolchain::default(), FontSubsetter::new(&kit, &names));
        let report = extractor.extract(&mkv, &out, false).unwrap();

        let calls = runner.calls_to("mkvextract");
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec![
                mkv.display().to_string(),
                "attachments".to_string(),
                format!("1:{}", out.join("fonts").join("a.ttf").display()),
                format!("2:{}", out.join("fonts").join("b.ttf").display()),
                "tracks".to_string(),
                format!("3:{}", out.join("3_eng_Full.ass").display()),
            ]
        );
        assert_eq!(fs::read(out.join("fonts").join("b.ttf")).unwrap(), b"font b");
        assert_eq!(fs::read_to_string(out.join("3_eng_Full.ass")).unwrap(), ASS);
        assert_eq!(report.subtitles, vec![out.join("3_eng_Full.ass")]);
        assert!(report.subset.is_none());
    }

    #[test]
    fn subsets_extracted_ass_on_request() {
        let dir = tempdir().unwrap();
        let mkv = dir.path().join("ep01.mkv");
        let out = dir.path().join("out");
        let fake = FakeMkvToolnix::new();
        let alpha = fake_font("Alpha", false, false);
        fake.add(
            &mkv,
            container(),
            &[(1, alpha.as_bytes()), (2, b"junk"), (3, ASS.as_bytes())],
        );
        let runner = FakeRunner::new();
        fake.install(&runner);
        let kit = FakeFontKit::new();
        let names = FixedNames::new(["SUBSET01"]);

        let extractor = Extractor::new(&runner, &Toolchain::default(), FontSubsetter::new(&kit, &names));
        let report = extractor.extract(&mkv, &out, true).unwrap();

        let subset = report.subset.unwrap();
        let subsetted = out.join("subsetted");
        assert_eq!(subset.fonts, vec![subsetted.join("a.SUBSET01.ttf")]);
        assert_eq!(subset.ass_files, vec![subsetted.join("3_eng_Full.ass")]);
        assert!(!subset.is_degraded());
    }

    #[test]
    fn subset_without_attachments_is_degraded() {
        let dir = tempdir().unwrap();
        let mkv = dir.path().join("ep01.mkv");
        let out = dir.path().join("out");
        let fake = FakeMkvToolnix::new();
        let metadata = ContainerMetadata {
            attachments: Vec::new(),
            ..container()
        };
        fake.add(&mkv, metadata, &[(3, ASS.as_bytes())]);
        let runner = FakeRunner::new();
        fake.install(&runner);
        let kit = FakeFontKit::new();
        let names = FixedNames::counting();

        let extractor = Extractor::new(&runner, &Toolchain::default(), FontSubsetter::new(&kit, &names));
        let report = extractor.extract(&mkv, &out, true).unwrap();

        assert!(!out.join("fonts").exists());
        let subset = report.subset.unwrap();
        assert!(subset.fonts.is_empty());
        assert_eq!(subset.unmatched, vec!["Alpha"]);
        assert!(out.join("subsetted").join("3_eng_Full.ass").is_file());
    }

    #[test]
    fn subset_failure_keeps_extracted_files() {
        let dir = tempdir().unwrap();
        let mkv = dir.path().join("ep01.mkv");
        let out = dir.path().join("out");
        let fake = FakeMkvToolnix::new();
        let alpha = fake_font("Alpha", false, false);
        fake.add(
            &mkv,
            container(),
            &[(1, alpha.as_bytes()), (2, b"junk"), (3, ASS.as_bytes())],
        );
        let runner = FakeRunner::new();
        fake.install(&runner);
        let kit = FakeFontKit::new().failing_subset_of("Alpha");
        let names = FixedNames::counting();

        let extractor = Extractor::new(&runner, &Toolchain::default(), FontSubsetter::new(&kit, &names));
        let err = extractor.extract(&mkv, &out, true).unwrap_err();

        assert_eq!(err.kind(), "subset");
        assert!(out.join("3_eng_Full.ass").is_file());
        assert!(out.join("fonts").join("a.ttf").is_file());
    }

    #[test]
    fn uninspectable_container_fails_before_extraction() {
        let dir = tempdir().unwrap();
        let runner = FakeRunner::new();
        FakeMkvToolnix::new().install(&runner);
        let kit = FakeFontKit::new();
        let names = FixedNames::counting();

        let extractor = Extractor::new(&runner, &Toolchain::default(), FontSubsetter::new(&kit, &names));
        let err = extractor
            .extract(&dir.path().join("missing.mkv"), dir.path(), true)
            .unwrap_err();

        assert!(err.is_inspection());
        assert!(runner.calls_to("mkvextract").is_empty());
    }
}
