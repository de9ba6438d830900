//! Conditional routing between the structural and content stages
//!
//! The router decides whether the visual stage runs and which text
//! source the text stage consumes. The decision depends only on the
//! rasterization state gathered during preprocessing (plus the explicit
//! configuration override); analyzer findings never influence it, so a
//! bad signature can never silence the content layers.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifact::{keys, PageStats};
use crate::types::StageResult;

/// Which artifact the text stage reads its input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSource {
    Extracted,
    Ocr,
}

impl TextSource {
    pub fn artifact_key(&self) -> &'static str {
        match self {
            TextSource::Extracted => keys::EXTRACTED_TEXT,
            TextSource::Ocr => keys::OCR_TEXT,
        }
    }
}

/// Routing decision, recorded in the artifact store so the text stage
/// and the report can consult it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub run_visual: bool,
    pub text_source: TextSource,
    pub reason: String,
}

/// Stateless router over the preprocessing statistics.
#[derive(Debug, Clone)]
pub struct Router {
    assume_raster: bool,
}

impl Router {
    pub fn new(assume_raster: bool) -> Self {
        Self { assume_raster }
    }

    /// Decides the route for the content stages. The structural result
    /// is logged for the audit trail but carries no weight.
    pub fn decide(&self, stats: &PageStats, structure: &StageResult) -> RouteDecision {
        debug!(
            structure_status = ?structure.status,
            raster_origin = stats.raster_origin,
            "routing content stages"
        );

        if self.assume_raster && !stats.raster_origin {
            return RouteDecision {
                run_visual: true,
                text_source: TextSource::Ocr,
                reason: "raster route forced by configuration".to_string(),
            };
        }

        if stats.raster_origin {
            RouteDecision {
                run_visual: true,
                text_source: TextSource::Ocr,
                reason: format!(
                    "raster origin: mean {:.1} text chars over {} pages",
                    stats.mean_chars_per_page, stats.page_count
                ),
            }
        } else {
            RouteDecision {
                run_visual: false,
                text_source: TextSource::Extracted,
                reason: format!(
                    "text layer present: mean {:.1} chars over {} pages",
                    stats.mean_chars_per_page, stats.page_count
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Finding, Layer, Severity, StageError, StageResult};
    use std::time::Duration;

    fn structure_ok() -> StageResult {
        StageResult::completed(Layer::Structure, Vec::new(), Duration::from_millis(1))
    }

    #[test]
    fn text_documents_skip_visual_and_use_extracted_text() {
        let stats = PageStats::new(vec![800, 900, 750], false);
        let route = Router::new(false).decide(&stats, &structure_ok());
        assert!(!route.run_visual);
        assert_eq!(route.text_source, TextSource::Extracted);
        assert_eq!(route.text_source.artifact_key(), keys::EXTRACTED_TEXT);
    }

    #[test]
    fn raster_documents_run_visual_and_use_ocr() {
        let stats = PageStats::new(vec![0, 12, 4], true);
        let route = Router::new(false).decide(&stats, &structure_ok());
        assert!(route.run_visual);
        assert_eq!(route.text_source, TextSource::Ocr);
        assert_eq!(route.text_source.artifact_key(), keys::OCR_TEXT);
    }

    #[test]
    fn override_forces_the_raster_route() {
        let stats = PageStats::new(vec![800, 900], false);
        let route = Router::new(true).decide(&stats, &structure_ok());
        assert!(route.run_visual);
        assert_eq!(route.text_source, TextSource::Ocr);
        assert!(route.reason.contains("configuration"));
    }

    #[test]
    fn structural_findings_never_change_the_route() {
        let stats = PageStats::new(vec![800, 900], false);
        let router = Router::new(false);

        let quiet = structure_ok();
        let noisy = StageResult::completed(
            Layer::Structure,
            vec![
                Finding::new(Layer::Structure, "incremental-updates", Severity::Warn),
                Finding::new(Layer::Structure, "active-scripting", Severity::Warn),
            ],
            Duration::from_millis(1),
        );
        let failed = StageResult::failed(
            Layer::Structure,
            StageError::Analyzer {
                message: "parse blew up".into(),
            },
            Duration::from_millis(1),
        );

        let baseline = router.decide(&stats, &quiet);
        assert_eq!(router.decide(&stats, &noisy), baseline);
        assert_eq!(router.decide(&stats, &failed), baseline);
    }
}
