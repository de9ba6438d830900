//! Verdict engine
//!
//! Reduces the four sealed stage results into one verdict under the
//! configured [`VerdictPolicy`]. The reduction itself never changes:
//! per-layer booleans, then an AND over the blocking layers. Every
//! false boolean is explained by finding ids in `reasons`, so a verdict
//! can always be traced back to evidence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzer::{signature, structure, text, visual};
use crate::config::VerdictPolicy;
use crate::types::{Layer, Severity, StageResult, StageStatus};

/// Findings with these codes can flip `visual_ok`; informational
/// bookkeeping like the OCR marker cannot.
const VISUAL_TAMPER_CODES: &[&str] = &[visual::COPY_MOVE_REGION, visual::SENSOR_PATTERN_MISMATCH];
const TEXT_TAMPER_CODES: &[&str] = &[
    text::SUSPECT_TERM,
    text::STYLOMETRIC_OUTLIER,
    text::MIXED_LANGUAGES,
];

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictOutcome {
    Ok,
    Suspect,
}

impl VerdictOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictOutcome::Ok => "OK",
            VerdictOutcome::Suspect => "SUSPECT",
        }
    }
}

impl std::fmt::Display for VerdictOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sealed verdict for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub overall: VerdictOutcome,
    pub per_layer_ok: BTreeMap<Layer, bool>,
    /// Finding ids that made layers false, in stage order. A layer that
    /// never produced findings contributes a `{layer}/unavailable`
    /// marker when the policy counts its absence against the document.
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn is_ok(&self) -> bool {
        self.overall == VerdictOutcome::Ok
    }
}

impl VerdictPolicy {
    /// Evaluates the sealed stage results into a verdict.
    pub fn evaluate(&self, stages: &[StageResult]) -> Verdict {
        let mut per_layer_ok = BTreeMap::new();
        let mut reasons = Vec::new();

        for layer in Layer::ALL {
            let stage = stages.iter().find(|s| s.layer == layer);
            let (ok, mut layer_reasons) = match layer {
                Layer::Signature => self.signature_ok(stage),
                Layer::Structure => self.structure_ok(stage),
                Layer::Visual => self.content_ok(
                    stage,
                    Layer::Visual,
                    self.unavailable_visual_is_ok,
                    self.visual_threshold,
                    VISUAL_TAMPER_CODES,
                ),
                Layer::Text => self.content_ok(
                    stage,
                    Layer::Text,
                    self.unavailable_text_is_ok,
                    self.text_threshold,
                    TEXT_TAMPER_CODES,
                ),
            };
            per_layer_ok.insert(layer, ok);
            reasons.append(&mut layer_reasons);
        }

        let overall_ok = self
            .blocking_layers
            .iter()
            .all(|layer| per_layer_ok.get(layer).copied().unwrap_or(true));
        let overall = if overall_ok {
            VerdictOutcome::Ok
        } else {
            VerdictOutcome::Suspect
        };
        debug!(?overall, reasons = reasons.len(), "verdict sealed");

        Verdict {
            overall,
            per_layer_ok,
            reasons,
        }
    }

    fn signature_ok(&self, stage: Option<&StageResult>) -> (bool, Vec<String>) {
        let stage = match stage {
            Some(stage) if stage.status == StageStatus::Completed => stage,
            _ => return unavailable(Layer::Signature, self.unavailable_signature_is_ok),
        };
        let mut reasons = Vec::new();
        for finding in &stage.findings {
            let counts_against = match finding.code.as_str() {
                signature::INVALID => true,
                signature::ABSENT => !self.treat_absent_signature_as_ok,
                signature::UNVERIFIED_HYBRID => !self.treat_unverified_hybrid_as_ok,
                _ => false,
            };
            if counts_against {
                reasons.push(finding.id.clone());
            }
        }
        (reasons.is_empty(), reasons)
    }

    /// Incremental updates or scripting alone are common in benign
    /// documents; only the combination counts against the structure.
    fn structure_ok(&self, stage: Option<&StageResult>) -> (bool, Vec<String>) {
        let stage = match stage {
            Some(stage) if stage.status == StageStatus::Completed => stage,
            _ => return unavailable(Layer::Structure, self.unavailable_structure_is_ok),
        };
        if !(stage.has_code(structure::INCREMENTAL_UPDATES) && stage.has_code(structure::ACTIVE_SCRIPTING)) {
            return (true, Vec::new());
        }
        let reasons = stage
            .findings
            .iter()
            .filter(|f| {
                f.code == structure::INCREMENTAL_UPDATES || f.code == structure::ACTIVE_SCRIPTING
            })
            .map(|f| f.id.clone())
            .collect();
        (false, reasons)
    }

    fn content_ok(
        &self,
        stage: Option<&StageResult>,
        layer: Layer,
        unavailable_is_ok: bool,
        threshold: Severity,
        tamper_codes: &[&str],
    ) -> (bool, Vec<String>) {
        let stage = match stage {
            Some(stage) if stage.status == StageStatus::Completed => stage,
            _ => return unavailable(layer, unavailable_is_ok),
        };
        let reasons: Vec<String> = stage
            .findings
            .iter()
            .filter(|f| tamper_codes.contains(&f.code.as_str()) && f.severity >= threshold)
            .map(|f| f.id.clone())
            .collect();
        (reasons.is_empty(), reasons)
    }
}

fn unavailable(layer: Layer, is_ok: bool) -> (bool, Vec<String>) {
    if is_ok {
        (true, Vec::new())
    } else {
        (false, vec![format!("{layer}/unavailable")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Finding, StageError};
    use std::time::Duration;

    fn completed(layer: Layer, findings: Vec<Finding>) -> StageResult {
        StageResult::completed(layer, findings, Duration::from_millis(5))
    }

    fn clean_stages() -> Vec<StageResult> {
        vec![
            completed(
                Layer::Signature,
                vec![Finding::new(Layer::Signature, signature::VALID, Severity::Info)],
            ),
            completed(Layer::Structure, Vec::new()),
            StageResult::skipped(Layer::Visual),
            completed(
                Layer::Text,
                vec![Finding::new(Layer::Text, text::LANGUAGE_PROFILE, Severity::Info)],
            ),
        ]
    }

    #[test]
    fn clean_run_is_ok_on_all_layers() {
        let verdict = VerdictPolicy::default().evaluate(&clean_stages());
        assert!(verdict.is_ok());
        assert!(verdict.per_layer_ok.values().all(|ok| *ok));
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn invalid_signature_turns_the_verdict() {
        let mut stages = clean_stages();
        stages[0] = completed(
            Layer::Signature,
            vec![Finding::new(Layer::Signature, signature::INVALID, Severity::Suspect)],
        );
        let verdict = VerdictPolicy::default().evaluate(&stages);
        assert_eq!(verdict.overall, VerdictOutcome::Suspect);
        assert_eq!(verdict.per_layer_ok[&Layer::Signature], false);
        assert_eq!(verdict.reasons, vec!["signature/invalid/1".to_string()]);
    }

    #[test]
    fn absent_signature_follows_policy() {
        let mut stages = clean_stages();
        stages[0] = completed(
            Layer::Signature,
            vec![Finding::new(Layer::Signature, signature::ABSENT, Severity::Info)],
        );
        assert!(VerdictPolicy::default().evaluate(&stages).is_ok());

        let strict = VerdictPolicy {
            treat_absent_signature_as_ok: false,
            ..Default::default()
        };
        let verdict = strict.evaluate(&stages);
        assert_eq!(verdict.overall, VerdictOutcome::Suspect);
        assert_eq!(verdict.reasons, vec!["signature/absent/1".to_string()]);
    }

    #[test]
    fn structure_needs_both_update_trail_and_scripting() {
        let updates = Finding::new(Layer::Structure, structure::INCREMENTAL_UPDATES, Severity::Warn);
        let scripting = Finding::new(Layer::Structure, structure::ACTIVE_SCRIPTING, Severity::Warn);

        let mut stages = clean_stages();
        stages[1] = completed(Layer::Structure, vec![updates.clone()]);
        assert!(VerdictPolicy::default().evaluate(&stages).is_ok());

        stages[1] = completed(Layer::Structure, vec![scripting.clone()]);
        assert!(VerdictPolicy::default().evaluate(&stages).is_ok());

        stages[1] = completed(Layer::Structure, vec![updates, scripting]);
        let verdict = VerdictPolicy::default().evaluate(&stages);
        assert_eq!(verdict.overall, VerdictOutcome::Suspect);
        assert_eq!(verdict.per_layer_ok[&Layer::Structure], false);
        assert_eq!(verdict.reasons.len(), 2);
    }

    #[test]
    fn skipped_visual_is_vacuously_ok_by_default() {
        let verdict = VerdictPolicy::default().evaluate(&clean_stages());
        assert_eq!(verdict.per_layer_ok[&Layer::Visual], true);

        let strict = VerdictPolicy {
            unavailable_visual_is_ok: false,
            ..Default::default()
        };
        let verdict = strict.evaluate(&clean_stages());
        assert_eq!(verdict.overall, VerdictOutcome::Suspect);
        assert!(verdict.reasons.contains(&"visual/unavailable".to_string()));
    }

    #[test]
    fn failed_signature_stage_follows_the_unavailable_knob() {
        let mut stages = clean_stages();
        stages[0] = StageResult::failed(
            Layer::Signature,
            StageError::Timeout { limit_ms: 100 },
            Duration::from_millis(100),
        );
        // Default policy does not vouch for a signature it never saw.
        let verdict = VerdictPolicy::default().evaluate(&stages);
        assert_eq!(verdict.overall, VerdictOutcome::Suspect);
        assert_eq!(verdict.reasons, vec!["signature/unavailable".to_string()]);

        let lenient = VerdictPolicy {
            unavailable_signature_is_ok: true,
            ..Default::default()
        };
        assert!(lenient.evaluate(&stages).is_ok());
    }

    #[test]
    fn severity_threshold_gates_text_findings() {
        let mut stages = clean_stages();
        stages[3] = completed(
            Layer::Text,
            vec![Finding::new(Layer::Text, text::MIXED_LANGUAGES, Severity::Warn)],
        );
        // Warn sits below the default Suspect threshold.
        assert!(VerdictPolicy::default().evaluate(&stages).is_ok());

        let strict = VerdictPolicy {
            text_threshold: Severity::Warn,
            ..Default::default()
        };
        let verdict = strict.evaluate(&stages);
        assert_eq!(verdict.overall, VerdictOutcome::Suspect);
        assert_eq!(verdict.reasons, vec!["text/mixed-languages/1".to_string()]);
    }

    #[test]
    fn ocr_marker_never_counts_against_visual() {
        let mut stages = clean_stages();
        stages[2] = completed(
            Layer::Visual,
            vec![Finding::new(Layer::Visual, visual::OCR_APPLIED, Severity::Info)],
        );
        let permissive = VerdictPolicy {
            visual_threshold: Severity::Info,
            ..Default::default()
        };
        assert!(permissive.evaluate(&stages).is_ok());
    }

    #[test]
    fn non_blocking_layers_explain_but_do_not_gate() {
        let mut stages = clean_stages();
        stages[2] = completed(
            Layer::Visual,
            vec![Finding::new(Layer::Visual, visual::COPY_MOVE_REGION, Severity::Suspect)],
        );
        let policy = VerdictPolicy {
            blocking_layers: vec![Layer::Signature, Layer::Structure],
            ..Default::default()
        };
        let verdict = policy.evaluate(&stages);
        assert!(verdict.is_ok());
        assert_eq!(verdict.per_layer_ok[&Layer::Visual], false);
        assert_eq!(verdict.reasons, vec!["visual/copy-move-region/1".to_string()]);
    }

    #[test]
    fn verbatim_serialization_of_the_outcome() {
        assert_eq!(serde_json::to_value(VerdictOutcome::Ok).unwrap(), "OK");
        assert_eq!(
            serde_json::to_value(VerdictOutcome::Suspect).unwrap(),
            "SUSPECT"
        );
    }
}
