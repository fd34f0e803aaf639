//! Subset stage trait and the runner that chains stages.

use super::error::StageResult;
use super::stages::{SubsetContext, SubsetState};
use super::StageError;

/// One step of the subset pipeline.
///
/// The runner calls, in order:
///
/// 1. `validate_input` - preconditions on the context and state so far
/// 2. `execute` - the stage's work, recorded in `state`
/// 3. `validate_output` - postconditions on what `execute` recorded
///
/// Any error stops the pipeline; later stages never run.
pub trait SubsetStage: Send + Sync {
    /// Stage name, used in logs and in `ProcessError::Subset`.
    fn name(&self) -> &str;

    fn validate_input(&self, _ctx: &SubsetContext<'_>, _state: &SubsetState) -> StageResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &SubsetContext<'_>, state: &mut SubsetState) -> StageResult<()>;

    fn validate_output(&self, _ctx: &SubsetContext<'_>, _state: &SubsetState) -> StageResult<()> {
        Ok(())
    }
}

/// Runs stages in sequence.
pub struct StagePipeline {
    stages: Vec<Box<dyn SubsetStage>>,
}

impl StagePipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Add a stage (builder pattern).
    pub fn with_stage<S: SubsetStage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Get step names in order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage, stopping at the first failure.
    ///
    /// The error names the failing stage.
    pub fn run(
        &self,
        ctx: &SubsetContext<'_>,
        state: &mut SubsetState,
    ) -> Result<(), (String, StageError)> {
        for stage in &self.stages {
            let name = stage.name();
            let fail = |e: StageError| {
                tracing::error!(stage = name, "Subset stage failed: {}", e);
                (name.to_string(), e)
            };

            tracing::debug!(stage = name, "Validating input");
            stage.validate_input(ctx, state).map_err(fail)?;

            tracing::debug!(stage = name, "Executing");
            stage.execute(ctx, state).map_err(fail)?;

            stage.validate_output(ctx, state).map_err(fail)?;
            tracing::debug!(stage = name, "Completed");
        }
        Ok(())
    }
}

impl Default for StagePipeline {
    fn default() -> Self {
        Self::new()
    }
}
