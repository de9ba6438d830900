//! Visual layer
//!
//! Runs image forensics over the rendered pages: copy-move detection on
//! every page, optional sensor-noise correlation across pages, and OCR
//! when an engine is wired in so the text layer has something to read
//! on raster documents. The layer requires `rendered_pages`; on a
//! text-origin document the router skips it entirely.

pub mod copy_move;
pub mod prnu;

pub use copy_move::{BlockHashDetector, CopyMoveDetector, CopyMoveMatch};
pub use prnu::{MeanResidualPrnu, PrnuAnalyzer, PrnuCorrelation};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::artifact::{keys, ArtifactValue, ArtifactView, PageImage};
use crate::config::VisualConfig;
use crate::types::{Document, Finding, Layer, Severity};

use super::{require, Analyzer, AnalyzerError, AnalyzerOutput, Result};

pub const COPY_MOVE_REGION: &str = "copy-move-region";
pub const SENSOR_PATTERN_MISMATCH: &str = "sensor-pattern-mismatch";
pub const OCR_APPLIED: &str = "ocr-applied";

/// Recognizes text on rendered pages, keyed by page number.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, pages: &[PageImage]) -> Result<BTreeMap<usize, String>>;
}

/// Visual analysis layer.
pub struct VisualAnalyzer {
    copy_move: Arc<dyn CopyMoveDetector>,
    prnu: Arc<dyn PrnuAnalyzer>,
    ocr: Option<Arc<dyn OcrEngine>>,
    config: VisualConfig,
}

impl VisualAnalyzer {
    pub fn new(config: &VisualConfig) -> Self {
        Self {
            copy_move: Arc::new(BlockHashDetector::new(config.copy_move_match_distance)),
            prnu: Arc::new(MeanResidualPrnu),
            ocr: None,
            config: config.clone(),
        }
    }

    pub fn with_copy_move(mut self, detector: Arc<dyn CopyMoveDetector>) -> Self {
        self.copy_move = detector;
        self
    }

    pub fn with_prnu(mut self, prnu: Arc<dyn PrnuAnalyzer>) -> Self {
        self.prnu = prnu;
        self
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }
}

#[async_trait]
impl Analyzer for VisualAnalyzer {
    fn layer(&self) -> Layer {
        Layer::Visual
    }

    fn required_artifacts(&self) -> &'static [&'static str] {
        &[keys::RENDERED_PAGES]
    }

    #[instrument(skip_all)]
    async fn run(&self, _doc: &Document, view: ArtifactView<'_>) -> Result<AnalyzerOutput> {
        let rendered = require(&view, keys::RENDERED_PAGES)?;
        let pages = rendered.as_page_images().ok_or_else(|| {
            AnalyzerError::InvalidInput("rendered_pages artifact has the wrong shape".to_string())
        })?;

        let mut output = AnalyzerOutput::default();

        for page in pages {
            let matches = self.copy_move.detect(page).await?;
            if matches.len() < self.config.copy_move_min_cluster {
                continue;
            }
            let sample = serde_json::to_value(&matches[..matches.len().min(5)])
                .unwrap_or(serde_json::Value::Null);
            output.findings.push(
                Finding::new(Layer::Visual, COPY_MOVE_REGION, Severity::Suspect)
                    .with_detail("page", page.page)
                    .with_detail("matched_blocks", matches.len())
                    .with_detail("sample", sample)
                    .with_evidence(keys::RENDERED_PAGES),
            );
        }

        if self.config.enable_prnu {
            for correlation in self.prnu.correlate(pages).await? {
                if correlation.correlation >= self.config.prnu_correlation_threshold {
                    continue;
                }
                output.findings.push(
                    Finding::new(Layer::Visual, SENSOR_PATTERN_MISMATCH, Severity::Suspect)
                        .with_detail("page", correlation.page)
                        .with_detail("correlation", correlation.correlation)
                        .with_detail("threshold", self.config.prnu_correlation_threshold)
                        .with_evidence(keys::RENDERED_PAGES),
                );
            }
        }

        if let Some(ocr) = &self.ocr {
            let recognized = ocr.recognize(pages).await?;
            let words: usize = recognized.values().map(|t| t.split_whitespace().count()).sum();
            let ocr_ratio = words as f64 / recognized.len().max(1) as f64;
            debug!(pages = recognized.len(), words, "ocr pass finished");
            output.findings.push(
                Finding::new(Layer::Visual, OCR_APPLIED, Severity::Info)
                    .with_detail("pages", recognized.len())
                    .with_detail("words", words)
                    .with_detail("ocr_ratio", ocr_ratio)
                    .with_evidence(keys::OCR_TEXT),
            );
            output
                .artifacts
                .push((keys::OCR_TEXT.to_string(), ArtifactValue::PageText(recognized)));
        }

        Ok(output)
    }
}
