//! Run-scoped artifact store
//!
//! Analyzers communicate through named, typed, append-only artifacts.
//! One store exists per pipeline run; nothing is shared across runs and
//! nothing is ever overwritten. Producers return new artifacts, the
//! orchestrator writes them, and consumers read an immutable snapshot.

pub mod store;
pub mod value;

pub use store::{ArtifactRecord, ArtifactStore, ArtifactView};
pub use value::{ArtifactValue, PageImage, PageStats};

/// Well-known artifact keys. Writes to these keys are schema-checked;
/// any other key is accepted with any payload.
pub mod keys {
    /// Custody digests of the raw document bytes (preprocessor).
    pub const CONTENT_HASH: &str = "content_hash";
    /// Document information dictionary as a string map (preprocessor).
    pub const METADATA: &str = "metadata";
    /// Page count, per-page text length and raster flag (preprocessor).
    pub const PAGE_STATS: &str = "page_stats";
    /// Text layer per page (preprocessor).
    pub const EXTRACTED_TEXT: &str = "extracted_text";
    /// Rendered page images (preprocessor, when a renderer is present).
    pub const RENDERED_PAGES: &str = "rendered_pages";
    /// Routing decision for the conditional stages (orchestrator).
    pub const ROUTING: &str = "routing";
    /// OCR transcript per page (visual stage, when an engine is present).
    pub const OCR_TEXT: &str = "ocr_text";
}
