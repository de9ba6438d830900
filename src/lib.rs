//! Layered document-forensics verifier.
//!
//! Runs a fixed ladder of independent analysis layers over one document
//! and reduces their findings to a single policy-driven verdict:
//!
//! 1. Preprocess: digests, container detection, metadata, text layer.
//! 2. Signature: digital-signature presence and coverage.
//! 3. Structure: incremental updates, scripting, orphans, date anomalies.
//! 4. Visual (raster documents only): copy-move and sensor-noise checks.
//! 5. Text: language profile, stylometry, suspect-term lexicon.
//!
//! Layers communicate only through typed artifacts and findings; no
//! layer sees another layer's conclusions. A layer that fails or times
//! out degrades the run instead of aborting it, and the verdict policy
//! decides what the gap means.

// Configuration and core pipeline
pub mod config;
pub mod error;
pub mod hash_utils;
pub mod pipeline;
pub mod types;

// Run-scoped derived data
pub mod artifact;

// Stage implementations
pub mod analyzer;
pub mod preprocess;
pub mod router;

// Reduction and reporting
pub mod report;
pub mod verdict;

#[cfg(test)]
pub(crate) mod testkit;

// Re-exports for crate consumers
pub use analyzer::{
    Analyzer, AnalyzerError, AnalyzerOutput, SignatureAnalyzer, StructureAnalyzer, TextAnalyzer,
    VisualAnalyzer,
};
pub use artifact::{keys, ArtifactRecord, ArtifactStore, ArtifactValue, ArtifactView};
pub use config::VerifierConfig;
pub use error::{Error, Result};
pub use pipeline::{CancelFlag, Pipeline, PipelineRun};
pub use preprocess::{PageRenderer, PreprocessSummary, Preprocessor};
pub use report::{Report, ReportError, ReportFormat, ReportFormatter};
pub use router::{RouteDecision, Router, TextSource};
pub use types::{Document, DocumentKind, Finding, Layer, Severity, StageResult, StageStatus};
pub use verdict::{Verdict, VerdictOutcome};
