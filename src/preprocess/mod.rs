//! Document ingestion and preprocessing
//!
//! One pass over the raw document that every later stage builds on:
//! custody digests, container detection, metadata and page statistics,
//! the extracted text layer, and rendered page images when the document
//! looks raster-origin and a renderer is available. Preprocessing never
//! fails a run; whatever cannot be derived is simply absent from the
//! artifact set and the analyzers degrade per policy.

pub mod renderer;

pub use renderer::{PageRenderer, RenderError};

use std::collections::BTreeMap;
use std::sync::Arc;

use lopdf::Object;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::artifact::{keys, ArtifactValue, PageStats};
use crate::config::VerifierConfig;
use crate::hash_utils::DigestBundle;
use crate::types::{Document, DocumentKind};

/// Text-operator markers consulted when the PDF cannot be parsed. Fewer
/// than this many across the head of the file means there is no usable
/// text layer.
const MIN_TEXT_MARKERS: usize = 3;
const MARKER_SCAN_LIMIT: usize = 256 * 1024;

/// Summary block carried into the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessSummary {
    pub kind: DocumentKind,
    pub sha256: String,
    pub sha512: String,
    pub page_count: usize,
    pub raster_origin: bool,
    pub renderer_available: bool,
    /// Whether the container parsed cleanly. A false here means page
    /// statistics came from byte-level heuristics.
    pub parsed: bool,
}

/// Everything preprocessing produced: the report summary plus the
/// artifacts for the orchestrator to write.
#[derive(Debug)]
pub struct PreprocessOutput {
    pub summary: PreprocessSummary,
    pub artifacts: Vec<(String, ArtifactValue)>,
}

/// Ingestion pass over one document.
pub struct Preprocessor {
    renderer: Option<Arc<dyn PageRenderer>>,
    raster_chars_threshold: f64,
    assume_raster: bool,
}

impl Preprocessor {
    pub fn new(config: &VerifierConfig) -> Self {
        Self {
            renderer: None,
            raster_chars_threshold: config.raster_text_chars_threshold,
            assume_raster: config.assume_raster,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[instrument(skip(self, doc))]
    pub async fn run(&self, doc: &Document) -> PreprocessOutput {
        let digests = DigestBundle::of(doc.bytes());
        let mut artifacts: Vec<(String, ArtifactValue)> = Vec::new();
        artifacts.push((
            keys::CONTENT_HASH.to_string(),
            ArtifactValue::Digests(digests.clone()),
        ));

        let mut metadata = BTreeMap::new();
        let mut page_text: BTreeMap<usize, String> = BTreeMap::new();
        let mut parsed = false;

        if doc.kind() == DocumentKind::Pdf {
            match lopdf::Document::load_mem(doc.bytes()) {
                Ok(pdf) => {
                    parsed = true;
                    metadata = extract_info_metadata(&pdf);
                    page_text = extract_page_text(&pdf);
                }
                Err(e) => {
                    warn!(error = %e, "document did not parse; falling back to byte heuristics");
                }
            }
        }

        let chars_per_page: Vec<usize> =
            page_text.values().map(|t| t.chars().count()).collect();
        let raster_origin = if parsed && !chars_per_page.is_empty() {
            let mean = chars_per_page.iter().sum::<usize>() as f64 / chars_per_page.len() as f64;
            mean < self.raster_chars_threshold
        } else if doc.kind() == DocumentKind::Pdf {
            // No readable page text at all. Count raw text operators to
            // separate image-only documents from merely broken ones.
            count_text_markers(doc.bytes()) < MIN_TEXT_MARKERS
        } else {
            // The raster heuristic only speaks for PDF payloads.
            false
        };
        let stats = PageStats::new(chars_per_page, raster_origin);
        let page_count = stats.page_count;

        artifacts.push((
            keys::METADATA.to_string(),
            ArtifactValue::Metadata(metadata),
        ));
        artifacts.push((
            keys::EXTRACTED_TEXT.to_string(),
            ArtifactValue::PageText(page_text),
        ));
        artifacts.push((keys::PAGE_STATS.to_string(), ArtifactValue::PageStats(stats)));

        let wants_rendering = raster_origin || self.assume_raster;
        if wants_rendering {
            if let Some(renderer) = &self.renderer {
                match renderer.render(doc).await {
                    Ok(pages) if !pages.is_empty() => {
                        debug!(pages = pages.len(), "rendered pages for visual analysis");
                        artifacts.push((
                            keys::RENDERED_PAGES.to_string(),
                            ArtifactValue::PageImages(pages),
                        ));
                    }
                    Ok(_) => warn!("renderer produced no pages"),
                    Err(e) => warn!(error = %e, "rendering failed; visual stage will degrade"),
                }
            } else {
                debug!("no renderer configured; visual stage will degrade");
            }
        }

        PreprocessOutput {
            summary: PreprocessSummary {
                kind: doc.kind(),
                sha256: digests.sha256,
                sha512: digests.sha512,
                page_count,
                raster_origin,
                renderer_available: self.renderer.is_some(),
                parsed,
            },
            artifacts,
        }
    }
}

/// Resolves one level of indirection against the object table.
fn resolve<'a>(pdf: &'a lopdf::Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => pdf.get_object(*id).ok(),
        other => Some(other),
    }
}

fn extract_info_metadata(pdf: &lopdf::Document) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    let info = pdf
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve(pdf, obj))
        .and_then(|obj| obj.as_dict().ok());

    if let Some(info) = info {
        for (key, value) in info.iter() {
            let key = String::from_utf8_lossy(key).into_owned();
            if let Some(value) = object_to_string(value) {
                metadata.insert(key, value);
            }
        }
    }
    metadata
}

fn object_to_string(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::Integer(n) => Some(n.to_string()),
        Object::Real(n) => Some(n.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Decodes a PDF text string: UTF-16BE when the BOM announces it,
/// otherwise UTF-8 if valid, otherwise byte-per-character.
pub(crate) fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn extract_page_text(pdf: &lopdf::Document) -> BTreeMap<usize, String> {
    let mut page_text = BTreeMap::new();
    for (page_number, _) in pdf.get_pages() {
        match pdf.extract_text(&[page_number]) {
            Ok(text) => {
                page_text.insert(page_number as usize, text);
            }
            Err(e) => {
                debug!(page = page_number, error = %e, "text extraction failed for page");
                page_text.insert(page_number as usize, String::new());
            }
        }
    }
    page_text
}

fn count_text_markers(bytes: &[u8]) -> usize {
    let head = &bytes[..bytes.len().min(MARKER_SCAN_LIMIT)];
    const MARKERS: [&[u8]; 5] = [b"BT", b"ET", b"Tj", b"TJ", b"Tf"];
    MARKERS
        .iter()
        .map(|marker| count_occurrences(head, marker))
        .sum()
}

pub(crate) fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    if needle.is_empty() || haystack.len() < needle.len() {
        return 0;
    }
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}
