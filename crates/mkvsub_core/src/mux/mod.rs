//! Remuxing through mkvmerge.
//!
//! - **options_builder**: turns a [`RemuxPlan`] into mkvmerge tokens
//! - [`Remuxer`]: runs the single mkvmerge invocation

mod options_builder;

pub use options_builder::{format_tokens_pretty, MkvmergeOptionsBuilder, RemuxPlan};

use std::fs;

use crate::errors::{ProcessError, ProcessResult};
use crate::tools::{CommandRunner, Toolchain};

/// Builds containers with mkvmerge.
pub struct Remuxer<'a> {
    runner: &'a dyn CommandRunner,
    mkvmerge: String,
}

impl<'a> Remuxer<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: &Toolchain) -> Self {
        Self {
            runner,
            mkvmerge: toolchain.mkvmerge.clone(),
        }
    }

    /// Run mkvmerge for `plan`. Anything but exit code 0 is a failure.
    pub fn remux(&self, plan: &RemuxPlan) -> ProcessResult<()> {
        if let Some(parent) = plan.output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| ProcessError::io("create output directory", e))?;
            }
        }

        let tokens = MkvmergeOptionsBuilder::new(plan).build();
        tracing::debug!("mkvmerge options:\n{}", format_tokens_pretty(&tokens));

        self.runner.run_checked(&self.mkvmerge, &tokens)?;
        tracing::info!(
            "Muxed {} with {} track(s) and {} attachment(s)",
            plan.output.display(),
            plan.tracks.len(),
            plan.attachments.len()
        );
        Ok(())
    }
}
