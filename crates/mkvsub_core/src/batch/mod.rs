//! Batch flows over directories of containers.
//!
//! - **discovery**: which files a flow works on
//! - [`BatchProcessor`]: Query, Dump, Create and Make

pub mod discovery;
mod processor;

pub use processor::{BatchOutcome, BatchProcessor, CreateRequest, FileFailure, QueryReport};
