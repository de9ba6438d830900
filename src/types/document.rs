//! Document identity
//!
//! A [`Document`] is the immutable unit of work for one pipeline run:
//! raw bytes, the content hash computed exactly once at ingestion, and
//! the container kind detected from magic bytes. Everything derived
//! from it lives in the artifact store, never on the document itself.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::hash_utils;

/// Container kind, detected from leading magic bytes.
///
/// File extensions are never consulted; a renamed file must not change
/// how it is analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Unknown,
}

impl DocumentKind {
    /// Sniffs the container kind from the first bytes of the payload.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF-") {
            return DocumentKind::Pdf;
        }
        // OOXML containers are ZIP archives; a Word document carries its
        // parts under `word/`.
        if bytes.starts_with(b"PK\x03\x04") && contains(bytes, b"word/") {
            return DocumentKind::Docx;
        }
        DocumentKind::Unknown
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The document under analysis. Read-only after construction.
#[derive(Debug, Clone)]
pub struct Document {
    path: Option<PathBuf>,
    bytes: Vec<u8>,
    sha256: String,
    kind: DocumentKind,
}

impl Document {
    /// Builds a document from in-memory bytes, hashing the content once.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(IngestError::Empty.into());
        }
        let sha256 = hash_utils::sha256_hex(&bytes);
        let kind = DocumentKind::sniff(&bytes);
        Ok(Self {
            path: None,
            bytes,
            sha256,
            kind,
        })
    }

    /// Reads and ingests a document from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| IngestError::Unreadable {
                path: path.display().to_string(),
                source,
            })?;
        let mut doc = Self::from_bytes(bytes)?;
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex-encoded SHA-256 of the raw content, computed at ingestion.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// File name for logs and reports, when the source was a file.
    pub fn file_name(&self) -> Option<String> {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_pdf_magic() {
        assert_eq!(DocumentKind::sniff(b"%PDF-1.7\n..."), DocumentKind::Pdf);
    }

    #[test]
    fn sniffs_docx_from_zip_with_word_parts() {
        let mut bytes = b"PK\x03\x04".to_vec();
        bytes.extend_from_slice(b"....word/document.xml....");
        assert_eq!(DocumentKind::sniff(&bytes), DocumentKind::Docx);
    }

    #[test]
    fn plain_zip_is_unknown() {
        let bytes = b"PK\x03\x04 nothing wordy here".to_vec();
        assert_eq!(DocumentKind::sniff(&bytes), DocumentKind::Unknown);
    }

    #[test]
    fn extension_is_ignored() {
        // Content decides, not the name the caller used.
        let doc = Document::from_bytes(b"%PDF-1.4\n%%EOF".to_vec()).unwrap();
        assert_eq!(doc.kind(), DocumentKind::Pdf);
        assert!(doc.path().is_none());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(Document::from_bytes(Vec::new()).is_err());
    }

    #[test]
    fn hash_is_stable() {
        let a = Document::from_bytes(b"%PDF-1.4 same".to_vec()).unwrap();
        let b = Document::from_bytes(b"%PDF-1.4 same".to_vec()).unwrap();
        assert_eq!(a.sha256(), b.sha256());
        assert_eq!(a.sha256().len(), 64);
    }
}
