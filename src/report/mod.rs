//! Verification report
//!
//! Builds the externally visible report from a sealed [`PipelineRun`].
//! The JSON shape is a contract: `document_hash`, `preprocess`,
//! `per_layer.{signature,structure,visual,text}`, `verdict` and
//! `artifacts` are always present, with skipped layers reporting their
//! status instead of disappearing. Consumers key automation off these
//! fields, so renames here are breaking changes.

pub mod formatter;

pub use formatter::ReportFormatter;

use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::artifact::ArtifactRecord;
use crate::pipeline::PipelineRun;
use crate::preprocess::PreprocessSummary;
use crate::router::RouteDecision;
use crate::types::{Finding, Layer, StageError, StageResult, StageStatus};
use crate::verdict::Verdict;

/// Report output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    PlainText,
    Markdown,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "text" | "plain" => Ok(ReportFormat::PlainText),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(format!("unknown report format `{other}`")),
        }
    }
}

/// Report generation errors
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// One analysis layer as the report presents it.
#[derive(Debug, Clone, Serialize)]
pub struct LayerReport {
    pub status: StageStatus,
    pub findings: Vec<Finding>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,
}

impl LayerReport {
    fn from_stage(stage: &StageResult) -> Self {
        Self {
            status: stage.status,
            findings: stage.findings.clone(),
            duration_ms: stage.duration_ms,
            error: stage.error.clone(),
        }
    }

    /// Stand-in for a layer the run never reached.
    fn absent() -> Self {
        Self {
            status: StageStatus::Skipped,
            findings: Vec::new(),
            duration_ms: 0,
            error: None,
        }
    }
}

/// The four layers under their fixed keys. Every key is present in every
/// report regardless of which layers actually ran.
#[derive(Debug, Clone, Serialize)]
pub struct PerLayer {
    pub signature: LayerReport,
    pub structure: LayerReport,
    pub visual: LayerReport,
    pub text: LayerReport,
}

/// Complete verification report for one document.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub tool_version: String,
    pub generated_at: String,
    pub run_id: String,
    pub document_hash: String,
    pub preprocess: PreprocessSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<RouteDecision>,
    pub per_layer: PerLayer,
    pub verdict: Verdict,
    pub artifacts: Vec<ArtifactRecord>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl Report {
    pub fn from_run(run: &PipelineRun) -> Self {
        let layer = |layer: Layer| {
            run.stage(layer)
                .map(LayerReport::from_stage)
                .unwrap_or_else(LayerReport::absent)
        };
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            run_id: run.run_id.clone(),
            document_hash: run.document_hash.clone(),
            preprocess: run.preprocess.clone(),
            routing: run.routing.clone(),
            per_layer: PerLayer {
                signature: layer(Layer::Signature),
                structure: layer(Layer::Structure),
                visual: layer(Layer::Visual),
                text: layer(Layer::Text),
            },
            verdict: run.verdict.clone(),
            artifacts: run.artifacts.clone(),
            cancelled: run.cancelled,
            duration_ms: run.duration_ms,
        }
    }

    /// Renders the report in the requested format.
    pub fn render(&self, format: ReportFormat) -> Result<String, ReportError> {
        ReportFormatter::format(self, format)
    }

    /// Renders and writes the report to disk.
    pub async fn save(
        &self,
        path: impl AsRef<Path>,
        format: ReportFormat,
    ) -> Result<(), ReportError> {
        let content = self.render(format)?;
        tokio::fs::write(path.as_ref(), content).await?;
        Ok(())
    }
}
