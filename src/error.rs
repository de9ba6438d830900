//! Error types and handling for the document verification pipeline

use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Custom result type for verification operations
pub type Result<T> = StdResult<T, Error>;

/// Core error type for verification operations.
///
/// Only conditions that abort a run (or prevent it from starting) live
/// here. Per-stage analyzer failures are recorded on the corresponding
/// [`crate::types::StageResult`] instead and never surface as `Error`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Ingestion error: {0}")]
    IngestError(#[from] IngestError),

    #[error("Artifact store error: {0}")]
    ArtifactError(#[from] ArtifactError),

    #[error("Pipeline error: {0}")]
    PipelineError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

// -------------------- Sub-Error Categories --------------------

/// Failures while loading a document, before any stage runs.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IngestError {
    #[error("cannot read `{path}`: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("document is empty")]
    Empty,
}

/// Store-invariant violations. Any of these aborts the run: a duplicate
/// or ill-typed write means a producer misbehaved and every downstream
/// consumer would observe a corrupted snapshot.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ArtifactError {
    #[error("artifact `{0}` is already present")]
    Conflict(String),

    #[error("artifact `{key}` rejected: expected a {expected} payload")]
    SchemaMismatch { key: String, expected: &'static str },
}
