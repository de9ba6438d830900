//! Shared fixtures and fake collaborators for the pipeline scenarios.
//!
//! Fixture PDFs are assembled with lopdf so the scenarios exercise real
//! container parsing; the collaborators stand in for rendering, OCR and
//! detection backends that live outside this crate.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};

use veridoc::analyzer::signature::{SignatureCheck, SignatureStatus, SignatureValidator};
use veridoc::analyzer::visual::{CopyMoveDetector, CopyMoveMatch, OcrEngine};
use veridoc::analyzer::Result as AnalyzerResult;
use veridoc::artifact::PageImage;
use veridoc::preprocess::{PageRenderer, RenderError};
use veridoc::types::Document;

/// Builds a parseable PDF with one text page per entry. An optional
/// document-open JavaScript action marks the file as actively scripted.
pub fn build_pdf(pages: &[&str], open_action_js: Option<&str>) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => Object::Reference(font_id) },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    };
    if let Some(script) = open_action_js {
        catalog.set(
            "OpenAction",
            Object::Dictionary(dictionary! {
                "Type" => "Action",
                "S" => "JavaScript",
                "JS" => Object::string_literal(script),
            }),
        );
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Born-digital contract with a healthy text layer on every page.
pub fn text_document() -> Document {
    let body = "Contrato de prestação de serviços firmado entre as partes. ".repeat(20);
    Document::from_bytes(build_pdf(&[&body, &body], None)).unwrap()
}

/// Scan-like document: parseable container, no usable text layer.
pub fn raster_document() -> Document {
    Document::from_bytes(build_pdf(&["", ""], None)).unwrap()
}

/// Appends bare end-of-file markers the way incremental updates leave
/// them behind.
pub fn append_eof_markers(bytes: &mut Vec<u8>, n: usize) {
    for _ in 0..n {
        bytes.extend_from_slice(b"\n%%EOF");
    }
}

/// Deterministic pseudo-noise page, stable across runs.
pub fn noise_page(page: usize, width: u32, height: u32, seed: u64) -> PageImage {
    let mut img = PageImage::filled(page, width, height, 0);
    for y in 0..height {
        for x in 0..width {
            let mut v = (x as u64) ^ ((y as u64) << 20) ^ seed.wrapping_mul(0x9E37_79B9);
            v = v.wrapping_mul(0x9E37_79B9_7F4A_7C15);
            v ^= v >> 29;
            v = v.wrapping_mul(0xBF58_476D_1CE4_E5B9);
            v ^= v >> 32;
            img.set(x, y, (v % 251) as u8);
        }
    }
    img
}

/// Noise page with a square region duplicated far from its source.
pub fn page_with_cloned_region(
    page: usize,
    width: u32,
    height: u32,
    seed: u64,
    src: (u32, u32),
    dst: (u32, u32),
    size: u32,
) -> PageImage {
    let mut img = noise_page(page, width, height, seed);
    for dy in 0..size {
        for dx in 0..size {
            let value = img.get(src.0 + dx, src.1 + dy);
            img.set(dst.0 + dx, dst.1 + dy, value);
        }
    }
    img
}

/// Renderer returning a fixed set of pages.
pub struct FakeRenderer {
    pages: Vec<PageImage>,
}

impl FakeRenderer {
    pub fn new(pages: Vec<PageImage>) -> Arc<Self> {
        Arc::new(Self { pages })
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, _doc: &Document) -> Result<Vec<PageImage>, RenderError> {
        Ok(self.pages.clone())
    }
}

/// OCR engine recognizing the same text on every page.
pub struct FakeOcr {
    text: String,
}

impl FakeOcr {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
        })
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn recognize(&self, pages: &[PageImage]) -> AnalyzerResult<BTreeMap<usize, String>> {
        Ok(pages.iter().map(|p| (p.page, self.text.clone())).collect())
    }
}

/// Validator reporting one fixed check per document.
pub struct FakeValidator {
    check: SignatureCheck,
}

impl FakeValidator {
    pub fn valid(signer: &str) -> Arc<Self> {
        Arc::new(Self {
            check: SignatureCheck {
                status: SignatureStatus::Valid,
                field_name: Some("Assinatura1".to_string()),
                signer: Some(signer.to_string()),
                signing_time: Some("D:20250612101500-03'00'".to_string()),
                sub_filter: Some("adbe.pkcs7.detached".to_string()),
                reason: None,
            },
        })
    }
}

#[async_trait]
impl SignatureValidator for FakeValidator {
    async fn validate(&self, _doc: &Document) -> AnalyzerResult<Vec<SignatureCheck>> {
        Ok(vec![self.check.clone()])
    }
}

/// Copy-move detector that stalls long enough to trip any stage budget.
pub struct StalledCopyMove {
    delay: Duration,
}

impl StalledCopyMove {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self { delay })
    }
}

#[async_trait]
impl CopyMoveDetector for StalledCopyMove {
    async fn detect(&self, _page: &PageImage) -> AnalyzerResult<Vec<CopyMoveMatch>> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}
