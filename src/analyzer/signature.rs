//! Signature layer
//!
//! Locates embedded digital signatures and checks them structurally:
//! declared byte ranges are compared against the actual file extent,
//! and hybrid cross-reference documents are reported as unverifiable
//! rather than guessed at. Cryptographic verification plugs in through
//! [`SignatureValidator`]; the layer is indifferent to which backend
//! produced the checks.

use std::sync::Arc;

use async_trait::async_trait;
use lopdf::{Dictionary, Object};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::artifact::{keys, ArtifactView};
use crate::preprocess::{count_occurrences, decode_pdf_string};
use crate::types::{Document, DocumentKind, Finding, Layer, Severity};

use super::{unsupported_container, Analyzer, AnalyzerOutput, Result};

pub const VALID: &str = "valid";
pub const INVALID: &str = "invalid";
pub const UNVERIFIED_HYBRID: &str = "unverified-hybrid";
pub const ABSENT: &str = "absent";

/// Bytes tolerated past the declared coverage; writers commonly leave a
/// trailing newline after the end-of-file marker.
const COVERAGE_SLACK: u64 = 16;

/// Structural verdict for one embedded signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureStatus {
    Valid,
    Invalid,
    UnverifiedHybrid,
    Absent,
}

impl SignatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureStatus::Valid => "VALID",
            SignatureStatus::Invalid => "INVALID",
            SignatureStatus::UnverifiedHybrid => "UNVERIFIED_HYBRID",
            SignatureStatus::Absent => "ABSENT",
        }
    }

    fn as_code(&self) -> &'static str {
        match self {
            SignatureStatus::Valid => VALID,
            SignatureStatus::Invalid => INVALID,
            SignatureStatus::UnverifiedHybrid => UNVERIFIED_HYBRID,
            SignatureStatus::Absent => ABSENT,
        }
    }

    fn severity(&self) -> Severity {
        match self {
            SignatureStatus::Invalid => Severity::Suspect,
            SignatureStatus::UnverifiedHybrid => Severity::Warn,
            SignatureStatus::Valid | SignatureStatus::Absent => Severity::Info,
        }
    }
}

/// What a validator learned about one signature field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureCheck {
    pub status: SignatureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_filter: Option<String>,
    /// Why the status is not VALID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SignatureCheck {
    fn bare(status: SignatureStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            field_name: None,
            signer: None,
            signing_time: None,
            sub_filter: None,
            reason: Some(reason.into()),
        }
    }
}

/// Backend that locates and checks embedded signatures. An empty result
/// means the document carries none.
#[async_trait]
pub trait SignatureValidator: Send + Sync {
    async fn validate(&self, doc: &Document) -> Result<Vec<SignatureCheck>>;
}

/// Built-in validator. Purely structural: it reads signature
/// dictionaries and byte-range arithmetic, never certificate chains.
#[derive(Debug, Default)]
pub struct StructuralValidator;

#[async_trait]
impl SignatureValidator for StructuralValidator {
    async fn validate(&self, doc: &Document) -> Result<Vec<SignatureCheck>> {
        let pdf = match lopdf::Document::load_mem(doc.bytes()) {
            Ok(pdf) => pdf,
            Err(e) => {
                debug!(error = %e, "document did not parse; scanning raw bytes for signatures");
                return Ok(raw_byte_checks(doc.bytes()));
            }
        };

        let hybrid = pdf.trailer.get(b"XRefStm").is_ok();
        let mut checks = Vec::new();
        for (id, object) in &pdf.objects {
            let dict = match object.as_dict() {
                Ok(dict) => dict,
                Err(_) => continue,
            };
            if !is_signature_dict(dict) {
                continue;
            }
            checks.push(check_signature(&pdf, *id, dict, doc.len() as u64, hybrid));
        }
        Ok(checks)
    }
}

/// Signature analysis layer.
pub struct SignatureAnalyzer {
    validator: Arc<dyn SignatureValidator>,
}

impl SignatureAnalyzer {
    pub fn new() -> Self {
        Self {
            validator: Arc::new(StructuralValidator),
        }
    }

    pub fn with_validator(validator: Arc<dyn SignatureValidator>) -> Self {
        Self { validator }
    }
}

impl Default for SignatureAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Analyzer for SignatureAnalyzer {
    fn layer(&self) -> Layer {
        Layer::Signature
    }

    #[instrument(skip_all)]
    async fn run(&self, doc: &Document, _view: ArtifactView<'_>) -> Result<AnalyzerOutput> {
        if doc.kind() != DocumentKind::Pdf {
            return Ok(AnalyzerOutput::from_findings(vec![unsupported_container(
                Layer::Signature,
                doc.kind(),
            )]));
        }

        let checks = self.validator.validate(doc).await?;
        debug!(signatures = checks.len(), "signature validation finished");

        if checks.is_empty() {
            let finding = Finding::new(Layer::Signature, ABSENT, Severity::Info)
                .with_detail("status", SignatureStatus::Absent.as_str())
                .with_evidence(keys::CONTENT_HASH);
            return Ok(AnalyzerOutput::from_findings(vec![finding]));
        }

        let findings = checks.into_iter().map(finding_for_check).collect();
        Ok(AnalyzerOutput::from_findings(findings))
    }
}

fn finding_for_check(check: SignatureCheck) -> Finding {
    let mut finding = Finding::new(Layer::Signature, check.status.as_code(), check.status.severity())
        .with_detail("status", check.status.as_str())
        .with_evidence(keys::CONTENT_HASH);
    if let Some(field_name) = check.field_name {
        finding = finding.with_detail("field_name", field_name);
    }
    if let Some(signer) = check.signer {
        finding = finding.with_detail("signer", signer);
    }
    if let Some(signing_time) = check.signing_time {
        finding = finding.with_detail("signing_time", signing_time);
    }
    if let Some(sub_filter) = check.sub_filter {
        finding = finding.with_detail("sub_filter", sub_filter);
    }
    if let Some(reason) = check.reason {
        finding = finding.with_detail("reason", reason);
    }
    finding
}

/// Fallback when the document does not parse: a raw byte-range marker is
/// still strong evidence of a signature, it just cannot be verified.
fn raw_byte_checks(bytes: &[u8]) -> Vec<SignatureCheck> {
    if count_occurrences(bytes, b"/ByteRange") == 0 {
        return Vec::new();
    }
    vec![SignatureCheck::bare(
        SignatureStatus::UnverifiedHybrid,
        "signature dictionary present but the document does not parse",
    )]
}

fn is_signature_dict(dict: &Dictionary) -> bool {
    let typed = matches!(dict.get(b"Type"), Ok(Object::Name(name)) if name == b"Sig");
    typed || (dict.has(b"ByteRange") && dict.has(b"Contents"))
}

fn check_signature(
    pdf: &lopdf::Document,
    id: lopdf::ObjectId,
    dict: &Dictionary,
    file_len: u64,
    hybrid: bool,
) -> SignatureCheck {
    let mut check = SignatureCheck {
        status: SignatureStatus::Valid,
        field_name: find_field_name(pdf, id),
        signer: string_entry(dict, b"Name"),
        signing_time: string_entry(dict, b"M"),
        sub_filter: name_entry(dict, b"SubFilter"),
        reason: None,
    };

    if hybrid {
        check.status = SignatureStatus::UnverifiedHybrid;
        check.reason = Some("hybrid cross-reference document; coverage is ambiguous".to_string());
        return check;
    }

    if let Some(reason) = coverage_error(dict, file_len) {
        check.status = SignatureStatus::Invalid;
        check.reason = Some(reason);
    }
    check
}

/// Checks the declared `/ByteRange` against the file. `None` means the
/// coverage is structurally sound.
fn coverage_error(dict: &Dictionary, file_len: u64) -> Option<String> {
    let range = match dict.get(b"ByteRange").ok().and_then(|o| o.as_array().ok()) {
        Some(range) => range,
        None => return Some("missing or malformed /ByteRange".to_string()),
    };
    let parts: Vec<i64> = range.iter().filter_map(|o| o.as_i64().ok()).collect();
    if parts.len() != 4 {
        return Some(format!(
            "/ByteRange has {} usable entries, expected 4",
            parts.len()
        ));
    }
    if parts.iter().any(|&p| p < 0) {
        return Some("negative /ByteRange entry".to_string());
    }
    if parts[0] != 0 {
        return Some(format!("coverage starts at offset {}, not 0", parts[0]));
    }

    match dict.get(b"Contents") {
        Ok(Object::String(bytes, _)) if bytes.iter().any(|&b| b != 0) => {}
        _ => return Some("signature /Contents is empty".to_string()),
    }

    let end = (parts[2] as u64).saturating_add(parts[3] as u64);
    if end > file_len {
        return Some(format!(
            "declared coverage ends at {} beyond the {}-byte file",
            end, file_len
        ));
    }
    let uncovered = file_len - end;
    if uncovered > COVERAGE_SLACK {
        return Some(format!("{} bytes after the signed range", uncovered));
    }
    None
}

/// Resolves the form-field name pointing at a signature object, when an
/// AcroForm field references it.
fn find_field_name(pdf: &lopdf::Document, sig_id: lopdf::ObjectId) -> Option<String> {
    for object in pdf.objects.values() {
        let dict = match object.as_dict() {
            Ok(dict) => dict,
            Err(_) => continue,
        };
        let is_sig_field = matches!(dict.get(b"FT"), Ok(Object::Name(name)) if name == b"Sig");
        let points_here = matches!(dict.get(b"V"), Ok(Object::Reference(id)) if *id == sig_id);
        if is_sig_field && points_here {
            return string_entry(dict, b"T");
        }
    }
    None
}

fn string_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

fn name_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}
