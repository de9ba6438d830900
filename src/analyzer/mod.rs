//! Forensic analyzer contract
//!
//! Each analysis layer is an [`Analyzer`]: it names the artifacts it
//! needs, reads them through a read-only view, and returns findings
//! plus any artifacts of its own for the orchestrator to store. An
//! analyzer never writes to the store and never sees another layer's
//! conclusions, so layers stay independently testable and a failure in
//! one cannot corrupt another.

use std::sync::Arc;

use async_trait::async_trait;

use crate::artifact::{ArtifactValue, ArtifactView};
use crate::types::{Document, Finding, Layer};

pub mod signature;
pub mod structure;
pub mod text;
pub mod visual;

pub use self::{
    signature::SignatureAnalyzer, structure::StructureAnalyzer, text::TextAnalyzer,
    visual::VisualAnalyzer,
};

/// Failure modes an analyzer may report. The orchestrator maps these
/// onto the stage record; they never abort the run.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Missing artifact: {key}")]
    MissingArtifact { key: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Processing error: {0}")]
    ProcessingError(String),
}

/// Result type alias for analyzer operations
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// What one analyzer run produced.
#[derive(Debug, Default)]
pub struct AnalyzerOutput {
    pub findings: Vec<Finding>,
    /// Artifacts for the orchestrator to write on the analyzer's
    /// behalf, e.g. recognized text from the OCR fallback.
    pub artifacts: Vec<(String, ArtifactValue)>,
}

impl AnalyzerOutput {
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            artifacts: Vec::new(),
        }
    }
}

/// Core trait every analysis layer implements.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// The layer this analyzer reports under.
    fn layer(&self) -> Layer;

    /// Artifact keys that must exist before this analyzer can run. The
    /// orchestrator checks these up front and records a missing one as
    /// a failed stage without invoking the analyzer.
    fn required_artifacts(&self) -> &'static [&'static str] {
        &[]
    }

    /// Analyzes the document against the artifacts gathered so far.
    async fn run(&self, doc: &Document, view: ArtifactView<'_>) -> Result<AnalyzerOutput>;
}

/// Fetches a required artifact, mapping absence to the error the
/// orchestrator records as a missing dependency.
pub(crate) fn require(view: &ArtifactView<'_>, key: &str) -> Result<Arc<ArtifactValue>> {
    view.get(key).ok_or_else(|| AnalyzerError::MissingArtifact {
        key: key.to_string(),
    })
}

/// Info finding recorded by PDF-only layers when the container is
/// something else. The layer completes; the verdict treats the document
/// as out of this layer's reach rather than suspect.
pub(crate) fn unsupported_container(
    layer: Layer,
    kind: crate::types::DocumentKind,
) -> Finding {
    Finding::new(layer, "unsupported-container", crate::types::Severity::Info)
        .with_detail("kind", kind.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{keys, ArtifactStore, PageStats};

    struct NullAnalyzer;

    #[async_trait]
    impl Analyzer for NullAnalyzer {
        fn layer(&self) -> Layer {
            Layer::Structure
        }

        async fn run(&self, _doc: &Document, _view: ArtifactView<'_>) -> Result<AnalyzerOutput> {
            Ok(AnalyzerOutput::default())
        }
    }

    #[tokio::test]
    async fn default_contract_requires_nothing() {
        let analyzer = NullAnalyzer;
        assert!(analyzer.required_artifacts().is_empty());

        let store = ArtifactStore::new();
        let doc = Document::from_bytes(b"%PDF-1.4 stub".to_vec()).unwrap();
        let output = analyzer.run(&doc, store.view()).await.unwrap();
        assert!(output.findings.is_empty());
        assert!(output.artifacts.is_empty());
    }

    #[test]
    fn require_reports_the_missing_key() {
        let store = ArtifactStore::new();
        let err = require(&store.view(), keys::RENDERED_PAGES).unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::MissingArtifact { key } if key == keys::RENDERED_PAGES
        ));
    }

    #[test]
    fn require_returns_present_artifacts() {
        let store = ArtifactStore::new();
        store
            .put(
                keys::PAGE_STATS,
                ArtifactValue::PageStats(PageStats::new(vec![10], false)),
            )
            .unwrap();
        let value = require(&store.view(), keys::PAGE_STATS).unwrap();
        assert!(value.as_page_stats().is_some());
    }
}
