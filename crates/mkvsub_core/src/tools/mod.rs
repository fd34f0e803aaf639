//! External tool plumbing.
//!
//! Every subprocess (mkvmerge, mkvextract, pyftsubset, ttx) goes through a
//! [`CommandRunner`]. [`Toolchain`] names the executables to use.

mod runner;

#[cfg(test)]
pub(crate) mod fake;

pub use runner::{CommandRunner, SystemRunner, ToolError, ToolOutput, ToolResult};

use crate::config::ToolSettings;

/// Executable names (or paths) for the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub mkvmerge: String,
    pub mkvextract: String,
    pub pyftsubset: String,
    pub ttx: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::from_settings(&ToolSettings::default())
    }
}

impl Toolchain {
    /// Build from the `[tools]` config section.
    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self {
            mkvmerge: settings.mkvmerge.clone(),
            mkvextract: settings.mkvextract.clone(),
            pyftsubset: settings.pyftsubset.clone(),
            ttx: settings.ttx.clone(),
        }
    }
}
