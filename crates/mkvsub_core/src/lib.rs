//! mkvsub core - font subsetting pipeline for Matroska subtitles
//!
//! This crate contains all processing logic with zero CLI dependencies:
//! container inspection, extraction, ASS font subsetting, remuxing and the
//! batch flows that tie them together.

// Compile a constant regex once per process.
macro_rules! regex {
    ($re:expr $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).expect("constant regex"))
    }};
}

pub mod batch;
pub mod check;
pub mod config;
pub mod errors;
pub mod extraction;
pub mod fonts;
pub mod logging;
pub mod models;
pub mod mux;
pub mod naming;
pub mod subset;
pub mod tools;
pub mod workspace;

pub use errors::{ProcessError, ProcessResult};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
