//! Evidence model
//!
//! Findings are the only thing analyzers communicate upward. Each one
//! names its layer, a short machine code, a severity, free-form detail
//! values, and the artifact keys that back it up. Findings are
//! append-only; nothing in the pipeline edits or removes one after its
//! stage completes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The four analysis layers, in stage order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Signature,
    Structure,
    Visual,
    Text,
}

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::Signature, Layer::Structure, Layer::Visual, Layer::Text];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Signature => "signature",
            Layer::Structure => "structure",
            Layer::Visual => "visual",
            Layer::Text => "text",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity carried by a finding. Ordered so policy thresholds can be
/// expressed as `severity >= threshold`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Suspect,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Suspect => "suspect",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single piece of forensic evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Deterministic identifier, `layer/code/ordinal`. Assigned when the
    /// stage result is sealed so re-running a layer over the same
    /// artifact snapshot reproduces identical ids.
    pub id: String,
    pub layer: Layer,
    pub code: String,
    pub severity: Severity,
    /// Structured context, keyed deterministically.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detail: BTreeMap<String, serde_json::Value>,
    /// Artifact keys this finding is backed by.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
}

impl Finding {
    pub fn new(layer: Layer, code: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: String::new(),
            layer,
            code: code.into(),
            severity,
            detail: BTreeMap::new(),
            evidence: Vec::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.detail.insert(key.into(), value.into());
        self
    }

    pub fn with_evidence(mut self, artifact_key: impl Into<String>) -> Self {
        self.evidence.push(artifact_key.into());
        self
    }
}

/// Assigns `layer/code/ordinal` ids in place, numbering each code from 1
/// in encounter order. Analyzers emit findings in a deterministic order,
/// so the ids are reproducible for identical inputs.
pub fn assign_finding_ids(findings: &mut [Finding]) {
    let mut ordinals: BTreeMap<(Layer, String), usize> = BTreeMap::new();
    for finding in findings.iter_mut() {
        let slot = ordinals
            .entry((finding.layer, finding.code.clone()))
            .or_insert(0);
        *slot += 1;
        finding.id = format!("{}/{}/{}", finding.layer, finding.code, slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_supports_thresholds() {
        assert!(Severity::Suspect > Severity::Warn);
        assert!(Severity::Warn > Severity::Info);
        assert!(Severity::Warn >= Severity::Warn);
    }

    #[test]
    fn ids_number_each_code_independently() {
        let mut findings = vec![
            Finding::new(Layer::Text, "suspect-term", Severity::Suspect),
            Finding::new(Layer::Text, "suspect-term", Severity::Suspect),
            Finding::new(Layer::Text, "stylometric-outlier", Severity::Warn),
        ];
        assign_finding_ids(&mut findings);
        assert_eq!(findings[0].id, "text/suspect-term/1");
        assert_eq!(findings[1].id, "text/suspect-term/2");
        assert_eq!(findings[2].id, "text/stylometric-outlier/1");
    }

    #[test]
    fn ids_are_reproducible() {
        let build = || {
            let mut fs = vec![
                Finding::new(Layer::Structure, "active-scripting", Severity::Warn),
                Finding::new(Layer::Structure, "incremental-updates", Severity::Warn),
            ];
            assign_finding_ids(&mut fs);
            fs
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn detail_round_trips_through_json() {
        let finding = Finding::new(Layer::Visual, "copy-move-region", Severity::Suspect)
            .with_detail("page", 3)
            .with_detail("matches", 17)
            .with_evidence("rendered_pages");
        let json = serde_json::to_string(&finding).unwrap();
        let back: Finding = serde_json::from_str(&json).unwrap();
        assert_eq!(back.detail["page"], 3);
        assert_eq!(back.evidence, vec!["rendered_pages".to_string()]);
    }
}
