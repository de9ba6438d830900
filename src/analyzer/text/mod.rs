//! Text layer
//!
//! Consumes whichever text source the router chose and looks for
//! content-level tampering signals: language switching between pages,
//! stylometric drift, and hits against the suspicious-term lexicon.
//! The layer never extracts text itself; it reads what preprocessing
//! and the visual stage left in the store.

pub mod language;
pub mod lexicon;
pub mod stylometry;

pub use language::{LanguageDetector, StopwordDetector};
pub use lexicon::{LexiconHit, LexiconMatcher};
pub use stylometry::StylometryStats;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::artifact::{keys, ArtifactView};
use crate::config::{LexiconConfig, TextConfig};
use crate::types::{Document, Finding, Layer, Severity};

use super::{require, Analyzer, AnalyzerError, AnalyzerOutput, Result};

pub const LANGUAGE_PROFILE: &str = "language-profile";
pub const MIXED_LANGUAGES: &str = "mixed-languages";
pub const STYLOMETRIC_OUTLIER: &str = "stylometric-outlier";
pub const SUSPECT_TERM: &str = "suspect-term";

/// Text analysis layer.
pub struct TextAnalyzer {
    min_page_chars: usize,
    style_z_threshold: f64,
    matcher: LexiconMatcher,
    language: Arc<dyn LanguageDetector>,
}

impl TextAnalyzer {
    pub fn new(text: &TextConfig, lexicon: &LexiconConfig) -> Self {
        Self {
            min_page_chars: text.min_page_chars,
            style_z_threshold: text.style_z_threshold,
            matcher: LexiconMatcher::new(lexicon),
            language: Arc::new(StopwordDetector),
        }
    }

    pub fn with_language_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.language = detector;
        self
    }
}

#[async_trait]
impl Analyzer for TextAnalyzer {
    fn layer(&self) -> Layer {
        Layer::Text
    }

    fn required_artifacts(&self) -> &'static [&'static str] {
        &[keys::ROUTING]
    }

    #[instrument(skip_all)]
    async fn run(&self, _doc: &Document, view: ArtifactView<'_>) -> Result<AnalyzerOutput> {
        let routing = require(&view, keys::ROUTING)?;
        let route = routing.as_route().ok_or_else(|| {
            AnalyzerError::InvalidInput("routing artifact has the wrong shape".to_string())
        })?;
        let source_key = route.text_source.artifact_key();
        let source = require(&view, source_key)?;
        let pages = source.as_page_text().ok_or_else(|| {
            AnalyzerError::InvalidInput(format!("{source_key} artifact has the wrong shape"))
        })?;
        debug!(source = source_key, pages = pages.len(), "text analysis starting");

        let mut findings = Vec::new();

        let mut page_languages: BTreeMap<usize, String> = BTreeMap::new();
        for (page, text) in pages {
            if let Some(lang) = self.language.detect(text).await {
                page_languages.insert(*page, lang);
            }
        }
        let languages: BTreeSet<String> = page_languages.values().cloned().collect();
        let language_list: Vec<String> = languages.iter().cloned().collect();
        findings.push(
            Finding::new(Layer::Text, LANGUAGE_PROFILE, Severity::Info)
                .with_detail("languages", language_list.clone())
                .with_detail("pages_detected", page_languages.len())
                .with_evidence(source_key),
        );
        if languages.len() > 1 {
            let mut by_language: BTreeMap<String, Vec<usize>> = BTreeMap::new();
            for (page, lang) in &page_languages {
                by_language.entry(lang.clone()).or_default().push(*page);
            }
            findings.push(
                Finding::new(Layer::Text, MIXED_LANGUAGES, Severity::Warn)
                    .with_detail("languages", language_list)
                    .with_detail(
                        "pages",
                        serde_json::to_value(&by_language).unwrap_or(serde_json::Value::Null),
                    )
                    .with_evidence(source_key),
            );
        }

        let mut profiles: BTreeMap<usize, StylometryStats> = BTreeMap::new();
        for (page, text) in pages {
            if text.chars().count() < self.min_page_chars {
                continue;
            }
            if let Some(stats) = stylometry::page_stats(text) {
                profiles.insert(*page, stats);
            }
        }
        for (page, z) in stylometry::readability_outliers(&profiles, self.style_z_threshold) {
            let stats = serde_json::to_value(&profiles[&page]).unwrap_or(serde_json::Value::Null);
            findings.push(
                Finding::new(Layer::Text, STYLOMETRIC_OUTLIER, Severity::Warn)
                    .with_detail("page", page)
                    .with_detail("z_score", z)
                    .with_detail("stats", stats)
                    .with_evidence(source_key),
            );
        }

        for (page, text) in pages {
            for hit in self.matcher.scan(text) {
                findings.push(
                    Finding::new(Layer::Text, SUSPECT_TERM, Severity::Suspect)
                        .with_detail("page", *page)
                        .with_detail("term", hit.term)
                        .with_detail("matched", hit.matched)
                        .with_detail("distance", hit.distance)
                        .with_evidence(source_key),
                );
            }
        }

        Ok(AnalyzerOutput::from_findings(findings))
    }
}
