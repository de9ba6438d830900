//! Page rendering collaborator
//!
//! Rasterizing PDF pages needs a real rendering backend, which stays
//! outside this crate. Deployments inject an implementation; without
//! one the pipeline still runs, with the visual stage degrading per the
//! verdict policy.

use async_trait::async_trait;
use thiserror::Error;

use crate::artifact::PageImage;
use crate::types::Document;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer unavailable: {0}")]
    Unavailable(String),

    #[error("rendering failed: {0}")]
    Failed(String),
}

/// Renders document pages to grayscale buffers.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, doc: &Document) -> Result<Vec<PageImage>, RenderError>;
}
