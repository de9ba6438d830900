//! Structure layer
//!
//! Reads the document skeleton for tampering footprints: incremental
//! update trails, embedded scripting, objects no reference path reaches,
//! and metadata dates that run backwards. Works from the parsed object
//! table when the document is well formed and degrades to byte-level
//! checks when it is not.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use lopdf::{Dictionary, Object, ObjectId};
use regex::Regex;
use tracing::{debug, instrument};

use crate::artifact::{keys, ArtifactView};
use crate::config::StructureConfig;
use crate::preprocess::count_occurrences;
use crate::types::{Document, DocumentKind, Finding, Layer, Severity};

use super::{require, unsupported_container, Analyzer, AnalyzerOutput, Result};

pub const INCREMENTAL_UPDATES: &str = "incremental-updates";
pub const ACTIVE_SCRIPTING: &str = "active-scripting";
pub const ORPHAN_OBJECTS: &str = "orphan-objects";
pub const DATE_ANOMALY: &str = "date-anomaly";
pub const MODIFIED_AFTER_CREATION: &str = "modified-after-creation";
pub const UNPARSEABLE: &str = "unparseable-document";

/// How many orphan object numbers a finding lists before truncating.
const ORPHAN_SAMPLE: usize = 10;

/// Structure analysis layer.
pub struct StructureAnalyzer {
    update_threshold: usize,
    date_pattern: Regex,
}

impl StructureAnalyzer {
    pub fn new(config: &StructureConfig) -> Self {
        Self {
            update_threshold: config.incremental_update_threshold,
            // `D:YYYYMMDDHHmmSS` with every field after the year optional,
            // closed by `Z` or a `+HH'mm'` offset.
            date_pattern: Regex::new(
                r"^(?:D:)?(\d{4})(\d{2})?(\d{2})?(\d{2})?(\d{2})?(\d{2})?(?:(Z)|([+-])(\d{2})(?:'(\d{2})'?)?)?",
            )
            .unwrap(),
        }
    }
}

#[async_trait]
impl Analyzer for StructureAnalyzer {
    fn layer(&self) -> Layer {
        Layer::Structure
    }

    fn required_artifacts(&self) -> &'static [&'static str] {
        &[keys::METADATA]
    }

    #[instrument(skip_all)]
    async fn run(&self, doc: &Document, view: ArtifactView<'_>) -> Result<AnalyzerOutput> {
        if doc.kind() != DocumentKind::Pdf {
            return Ok(AnalyzerOutput::from_findings(vec![unsupported_container(
                Layer::Structure,
                doc.kind(),
            )]));
        }

        let metadata = require(&view, keys::METADATA)?;
        let mut findings = Vec::new();

        let parsed = match lopdf::Document::load_mem(doc.bytes()) {
            Ok(pdf) => Some(pdf),
            Err(e) => {
                debug!(error = %e, "document did not parse; structure checks degrade to bytes");
                findings.push(
                    Finding::new(Layer::Structure, UNPARSEABLE, Severity::Warn)
                        .with_detail("error", e.to_string())
                        .with_evidence(keys::CONTENT_HASH),
                );
                None
            }
        };

        if let Some(finding) = self.incremental_updates(doc.bytes()) {
            findings.push(finding);
        }

        match &parsed {
            Some(pdf) => {
                let hits = scripting_hits(pdf);
                if !hits.is_empty() {
                    findings.push(
                        Finding::new(Layer::Structure, ACTIVE_SCRIPTING, Severity::Warn)
                            .with_detail("objects", hits)
                            .with_evidence(keys::CONTENT_HASH),
                    );
                }
                if let Some(finding) = orphan_objects(pdf) {
                    findings.push(finding);
                }
            }
            None => {
                // Raw markers are still meaningful in a broken file.
                let js_markers = count_occurrences(doc.bytes(), b"/JavaScript")
                    + count_occurrences(doc.bytes(), b"/JS");
                if js_markers > 0 {
                    findings.push(
                        Finding::new(Layer::Structure, ACTIVE_SCRIPTING, Severity::Warn)
                            .with_detail("raw_markers", js_markers)
                            .with_evidence(keys::CONTENT_HASH),
                    );
                }
            }
        }

        if let Some(metadata) = metadata.as_metadata() {
            let creation = metadata.get("CreationDate").and_then(|raw| self.parse_date(raw));
            let modified = metadata.get("ModDate").and_then(|raw| self.parse_date(raw));
            if let (Some(created), Some(modified)) = (creation, modified) {
                if modified < created {
                    findings.push(
                        Finding::new(Layer::Structure, DATE_ANOMALY, Severity::Warn)
                            .with_detail("creation_date", created.to_rfc3339())
                            .with_detail("mod_date", modified.to_rfc3339())
                            .with_evidence(keys::METADATA),
                    );
                } else if modified > created {
                    findings.push(
                        Finding::new(Layer::Structure, MODIFIED_AFTER_CREATION, Severity::Info)
                            .with_detail("creation_date", created.to_rfc3339())
                            .with_detail("mod_date", modified.to_rfc3339())
                            .with_evidence(keys::METADATA),
                    );
                }
            }
        }

        Ok(AnalyzerOutput::from_findings(findings))
    }
}

impl StructureAnalyzer {
    /// Every save of a PDF leaves an `%%EOF`; anything past the first
    /// marker is an incremental update.
    fn incremental_updates(&self, bytes: &[u8]) -> Option<Finding> {
        let markers = count_occurrences(bytes, b"%%EOF");
        let updates = markers.saturating_sub(1);
        if updates <= self.update_threshold {
            return None;
        }
        Some(
            Finding::new(Layer::Structure, INCREMENTAL_UPDATES, Severity::Warn)
                .with_detail("eof_markers", markers)
                .with_detail("updates", updates)
                .with_detail("threshold", self.update_threshold)
                .with_evidence(keys::CONTENT_HASH),
        )
    }

    /// Parses a PDF date string. Fields missing from the tail fall back
    /// to the start of their range; an absent or garbled zone reads as UTC.
    fn parse_date(&self, raw: &str) -> Option<DateTime<Utc>> {
        let caps = self.date_pattern.captures(raw)?;
        let num = |idx: usize, fallback: u32| -> u32 {
            caps.get(idx)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(fallback)
        };

        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let naive = NaiveDate::from_ymd_opt(year, num(2, 1), num(3, 1))?
            .and_hms_opt(num(4, 0), num(5, 0), num(6, 0))?;

        let offset_seconds = match (caps.get(7), caps.get(8)) {
            (Some(_), _) | (None, None) => 0,
            (None, Some(sign)) => {
                let magnitude = (num(9, 0) * 3600 + num(10, 0) * 60) as i32;
                if sign.as_str() == "-" {
                    -magnitude
                } else {
                    magnitude
                }
            }
        };
        let offset = FixedOffset::east_opt(offset_seconds)?;
        Some(offset.from_local_datetime(&naive).single()?.with_timezone(&Utc))
    }
}

/// Object ids whose dictionaries carry JavaScript, directly or nested.
fn scripting_hits(pdf: &lopdf::Document) -> Vec<String> {
    let mut hits = Vec::new();
    for (id, object) in &pdf.objects {
        if object_has_scripting(object) {
            hits.push(format!("{} {} obj", id.0, id.1));
        }
    }
    hits
}

fn object_has_scripting(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => dict_has_scripting(dict),
        Object::Stream(stream) => dict_has_scripting(&stream.dict),
        Object::Array(items) => items.iter().any(object_has_scripting),
        _ => false,
    }
}

fn dict_has_scripting(dict: &Dictionary) -> bool {
    if dict.has(b"JS") || dict.has(b"JavaScript") {
        return true;
    }
    if matches!(dict.get(b"S"), Ok(Object::Name(name)) if name == b"JavaScript") {
        return true;
    }
    dict.iter().any(|(_, value)| object_has_scripting(value))
}

/// Objects the trailer cannot reach. Leftovers of a deleted or replaced
/// revision usually end up here.
fn orphan_objects(pdf: &lopdf::Document) -> Option<Finding> {
    let reachable = reachable_objects(pdf);
    let orphans: Vec<ObjectId> = pdf
        .objects
        .keys()
        .filter(|id| !reachable.contains(id))
        .copied()
        .collect();
    if orphans.is_empty() {
        return None;
    }
    let sample: Vec<String> = orphans
        .iter()
        .take(ORPHAN_SAMPLE)
        .map(|id| format!("{} {} obj", id.0, id.1))
        .collect();
    Some(
        Finding::new(Layer::Structure, ORPHAN_OBJECTS, Severity::Info)
            .with_detail("count", orphans.len())
            .with_detail("objects", sample)
            .with_evidence(keys::CONTENT_HASH),
    )
}

fn reachable_objects(pdf: &lopdf::Document) -> HashSet<ObjectId> {
    let mut visited = HashSet::new();
    let mut stack: Vec<&Object> = pdf.trailer.iter().map(|(_, value)| value).collect();
    while let Some(object) = stack.pop() {
        match object {
            Object::Reference(id) => {
                if visited.insert(*id) {
                    if let Ok(target) = pdf.get_object(*id) {
                        stack.push(target);
                    }
                }
            }
            Object::Array(items) => stack.extend(items.iter()),
            Object::Dictionary(dict) => stack.extend(dict.iter().map(|(_, value)| value)),
            Object::Stream(stream) => stack.extend(stream.dict.iter().map(|(_, value)| value)),
            _ => {}
        }
    }
    visited
}
