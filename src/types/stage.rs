//! Per-stage outcome records
//!
//! A [`StageResult`] is the sealed outcome of one analyzer invocation.
//! The constructors enforce the shape invariants: a skipped stage has no
//! findings and no error, a failed stage has no findings and exactly one
//! error, and a completed stage may legitimately have zero findings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::finding::{assign_finding_ids, Finding, Layer, Severity};

/// Terminal status of a stage within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Completed,
    Skipped,
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Completed => "completed",
            StageStatus::Skipped => "skipped",
            StageStatus::Failed => "failed",
        }
    }
}

/// Recorded cause of a failed stage. Failures are data, not control
/// flow: the run continues and the verdict policy decides what a missing
/// layer means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageError {
    #[error("required artifact `{key}` is not present")]
    MissingDependency { key: String },

    #[error("analyzer failed: {message}")]
    Analyzer { message: String },

    #[error("stage exceeded its {limit_ms} ms budget")]
    Timeout { limit_ms: u64 },
}

/// Outcome of one analyzer stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub layer: Layer,
    pub status: StageStatus,
    pub findings: Vec<Finding>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,
}

impl StageResult {
    /// Seals a completed stage, assigning deterministic finding ids.
    pub fn completed(layer: Layer, mut findings: Vec<Finding>, duration: Duration) -> Self {
        assign_finding_ids(&mut findings);
        Self {
            layer,
            status: StageStatus::Completed,
            findings,
            duration_ms: duration.as_millis() as u64,
            error: None,
        }
    }

    /// Records a stage that never ran. Carries no findings by construction.
    pub fn skipped(layer: Layer) -> Self {
        Self {
            layer,
            status: StageStatus::Skipped,
            findings: Vec::new(),
            duration_ms: 0,
            error: None,
        }
    }

    /// Records a stage that ran and failed. Partial findings from the
    /// failed attempt are discarded; only the error survives.
    pub fn failed(layer: Layer, error: StageError, duration: Duration) -> Self {
        Self {
            layer,
            status: StageStatus::Failed,
            findings: Vec::new(),
            duration_ms: duration.as_millis() as u64,
            error: Some(error),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StageStatus::Completed
    }

    /// True when any finding with the given code is present.
    pub fn has_code(&self, code: &str) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }

    /// Findings at or above the given severity.
    pub fn findings_at_least(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity >= severity)
    }

    /// Highest severity among findings, if any were recorded.
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_stage_carries_no_findings_and_no_error() {
        let result = StageResult::skipped(Layer::Visual);
        assert_eq!(result.status, StageStatus::Skipped);
        assert!(result.findings.is_empty());
        assert!(result.error.is_none());
    }

    #[test]
    fn failed_stage_carries_error_and_no_findings() {
        let result = StageResult::failed(
            Layer::Text,
            StageError::MissingDependency {
                key: "ocr_text".into(),
            },
            Duration::from_millis(3),
        );
        assert_eq!(result.status, StageStatus::Failed);
        assert!(result.findings.is_empty());
        assert!(matches!(
            result.error,
            Some(StageError::MissingDependency { .. })
        ));
    }

    #[test]
    fn completed_with_zero_findings_is_normal() {
        let result = StageResult::completed(Layer::Structure, Vec::new(), Duration::from_millis(1));
        assert!(result.is_completed());
        assert!(result.findings.is_empty());
        assert!(result.max_severity().is_none());
    }

    #[test]
    fn completed_assigns_ids_in_order() {
        let findings = vec![
            Finding::new(Layer::Structure, "orphan-objects", Severity::Info),
            Finding::new(Layer::Structure, "orphan-objects", Severity::Info),
        ];
        let result = StageResult::completed(Layer::Structure, findings, Duration::from_millis(1));
        assert_eq!(result.findings[0].id, "structure/orphan-objects/1");
        assert_eq!(result.findings[1].id, "structure/orphan-objects/2");
    }

    #[test]
    fn severity_filter_respects_threshold() {
        let findings = vec![
            Finding::new(Layer::Text, "language-profile", Severity::Info),
            Finding::new(Layer::Text, "suspect-term", Severity::Suspect),
        ];
        let result = StageResult::completed(Layer::Text, findings, Duration::from_millis(1));
        let hits: Vec<_> = result.findings_at_least(Severity::Suspect).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "suspect-term");
    }

    #[test]
    fn timeout_error_serializes_with_kind_tag() {
        let err = StageError::Timeout { limit_ms: 500 };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["limit_ms"], 500);
    }
}
