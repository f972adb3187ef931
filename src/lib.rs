//! nbpack: normalize assignment folders and drive a resumable completion pipeline.
//!
//! Ingestion turns a raw folder (notebook, data files, images, instructions)
//! into a self-describing package with a `manifest.json`. Processing runs the
//! ordered `parse → solve → build → execute → export → archive` steps against
//! a `state.json` checkpoint so interrupted runs resume where they stopped.

#![warn(missing_docs)]
// env_logger is used by src/main.rs (binary), not this library
#![expect(unused_crate_dependencies)]

pub mod archive;
pub mod benchmark;
pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod execute;
pub mod export;
pub mod fsutil;
pub mod ingest;
pub mod layout;
pub mod manifest;
pub mod models;
pub mod notebook;
pub mod parse;
pub mod pipeline;
pub mod reembed;
pub mod solver;

/// Re-export common error types for convenience.
pub use error::{NbpackError, Result};

/// Re-export the two pipeline entry points.
pub use ingest::Ingestor;
pub use pipeline::ProcessingPipeline;

/// nbpack version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
