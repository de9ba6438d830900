//! Typed artifact payloads
//!
//! Every well-known key maps to exactly one payload shape, checked at
//! write time. A producer that writes the wrong shape is a bug worth
//! stopping the run for, not something to paper over downstream.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::keys;
use crate::hash_utils::DigestBundle;
use crate::router::RouteDecision;

/// Page statistics gathered during preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageStats {
    pub page_count: usize,
    /// Text-layer characters per page, in page order.
    pub chars_per_page: Vec<usize>,
    pub mean_chars_per_page: f64,
    /// True when the document looks raster-origin (scanned or image-only).
    pub raster_origin: bool,
}

impl PageStats {
    pub fn new(chars_per_page: Vec<usize>, raster_origin: bool) -> Self {
        let page_count = chars_per_page.len();
        let mean_chars_per_page = if page_count == 0 {
            0.0
        } else {
            chars_per_page.iter().sum::<usize>() as f64 / page_count as f64
        };
        Self {
            page_count,
            chars_per_page,
            mean_chars_per_page,
            raster_origin,
        }
    }
}

/// A rendered page as an 8-bit grayscale buffer, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-based page number.
    pub page: usize,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl PageImage {
    pub fn new(page: usize, width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            page,
            width,
            height,
            pixels,
        })
    }

    /// Uniform page, mostly useful as a base for synthetic fixtures.
    pub fn filled(page: usize, width: u32, height: u32, value: u8) -> Self {
        Self {
            page,
            width,
            height,
            pixels: vec![value; (width as usize) * (height as usize)],
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.pixels[(y as usize) * (self.width as usize) + (x as usize)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        self.pixels[(y as usize) * (self.width as usize) + (x as usize)] = value;
    }
}

/// Payload stored under an artifact key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ArtifactValue {
    Digests(DigestBundle),
    Metadata(BTreeMap<String, String>),
    PageStats(PageStats),
    /// Text keyed by 1-based page number.
    PageText(BTreeMap<usize, String>),
    PageImages(Vec<PageImage>),
    Route(RouteDecision),
}

impl ArtifactValue {
    /// Short name of this payload shape, used in schema errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ArtifactValue::Digests(_) => "digests",
            ArtifactValue::Metadata(_) => "metadata",
            ArtifactValue::PageStats(_) => "page_stats",
            ArtifactValue::PageText(_) => "page_text",
            ArtifactValue::PageImages(_) => "page_images",
            ArtifactValue::Route(_) => "route",
        }
    }

    /// Expected payload shape for a well-known key, if the key is one.
    pub fn expected_kind(key: &str) -> Option<&'static str> {
        match key {
            keys::CONTENT_HASH => Some("digests"),
            keys::METADATA => Some("metadata"),
            keys::PAGE_STATS => Some("page_stats"),
            keys::EXTRACTED_TEXT | keys::OCR_TEXT => Some("page_text"),
            keys::RENDERED_PAGES => Some("page_images"),
            keys::ROUTING => Some("route"),
            _ => None,
        }
    }

    /// True when this payload is acceptable under the given key.
    pub fn matches_key(&self, key: &str) -> bool {
        match Self::expected_kind(key) {
            Some(expected) => expected == self.kind_name(),
            None => true,
        }
    }

    pub fn as_digests(&self) -> Option<&DigestBundle> {
        match self {
            ArtifactValue::Digests(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_metadata(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ArtifactValue::Metadata(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_page_stats(&self) -> Option<&PageStats> {
        match self {
            ArtifactValue::PageStats(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_page_text(&self) -> Option<&BTreeMap<usize, String>> {
        match self {
            ArtifactValue::PageText(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_page_images(&self) -> Option<&[PageImage]> {
        match self {
            ArtifactValue::PageImages(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_route(&self) -> Option<&RouteDecision> {
        match self {
            ArtifactValue::Route(r) => Some(r),
            _ => None,
        }
    }
}
