//! Shared fixtures for unit tests.
//!
//! Builds small but structurally honest PDFs with lopdf so analyzer
//! tests exercise real parsing instead of mocks, plus deterministic
//! synthetic page images for the visual detectors.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream, StringFormat};

use crate::artifact::PageImage;

/// Fluent builder for test PDFs.
pub(crate) struct PdfBuilder {
    pages: Vec<String>,
    info: Vec<(String, String)>,
    open_action_js: Option<String>,
    stray_objects: usize,
    hybrid_marker: bool,
    signature: bool,
}

impl PdfBuilder {
    pub(crate) fn new() -> Self {
        Self {
            pages: Vec::new(),
            info: Vec::new(),
            open_action_js: None,
            stray_objects: 0,
            hybrid_marker: false,
            signature: false,
        }
    }

    pub(crate) fn page(mut self, text: &str) -> Self {
        self.pages.push(text.to_string());
        self
    }

    pub(crate) fn info(mut self, key: &str, value: &str) -> Self {
        self.info.push((key.to_string(), value.to_string()));
        self
    }

    pub(crate) fn js_open_action(mut self, script: &str) -> Self {
        self.open_action_js = Some(script.to_string());
        self
    }

    pub(crate) fn stray_object(mut self) -> Self {
        self.stray_objects += 1;
        self
    }

    /// Marks the trailer the way hybrid-reference files do.
    pub(crate) fn hybrid_marker(mut self) -> Self {
        self.hybrid_marker = true;
        self
    }

    /// Embeds a signature dictionary with placeholder byte ranges that
    /// `build` patches after serialization.
    pub(crate) fn signature(mut self) -> Self {
        self.signature = true;
        self
    }

    /// Serializes the document. A signature, if present, is patched to
    /// cover the file to its end.
    pub(crate) fn build(self) -> Vec<u8> {
        self.build_with_uncovered_tail(0)
    }

    /// Serializes the document leaving `tail` bytes past the signature
    /// coverage, which is how post-signing modification looks.
    pub(crate) fn build_with_uncovered_tail(self, tail: i64) -> Vec<u8> {
        let has_signature = self.signature;
        let mut bytes = self.assemble();
        if has_signature {
            let total = bytes.len() as i64;
            patch_placeholder(&mut bytes, b"1111111111", 1000);
            patch_placeholder(&mut bytes, b"2222222222", 2000);
            patch_placeholder(&mut bytes, b"3333333333", total - 2000 - tail);
        }
        bytes
    }

    fn assemble(self) -> Vec<u8> {
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
        for text in &self.pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![50.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().unwrap(),
            ));
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
        if let Some(script) = &self.open_action_js {
            catalog.set(
                "OpenAction",
                Object::Dictionary(dictionary! {
                    "Type" => "Action",
                    "S" => "JavaScript",
                    "JS" => Object::string_literal(script.as_str()),
                }),
            );
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        if !self.info.is_empty() {
            let mut info = lopdf::Dictionary::new();
            for (key, value) in &self.info {
                info.set(
                    key.as_bytes().to_vec(),
                    Object::string_literal(value.as_str()),
                );
            }
            let info_id = doc.add_object(Object::Dictionary(info));
            doc.trailer.set("Info", Object::Reference(info_id));
        }

        if self.hybrid_marker {
            doc.trailer.set("XRefStm", Object::Integer(128));
        }

        for n in 0..self.stray_objects {
            doc.add_object(dictionary! { "Stray" => n as i64 });
        }

        if self.signature {
            doc.add_object(dictionary! {
                "Type" => "Sig",
                "Filter" => "Adobe.PPKLite",
                "SubFilter" => "adbe.pkcs7.detached",
                "Name" => Object::string_literal("Ana Souza"),
                "M" => Object::string_literal("D:20240105120000Z"),
                "ByteRange" => vec![
                    Object::Integer(0),
                    Object::Integer(1111111111),
                    Object::Integer(2222222222),
                    Object::Integer(3333333333),
                ],
                "Contents" => Object::String(vec![0xAB; 64], StringFormat::Hexadecimal),
            });
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}

/// Appends bare end-of-file markers, which is what the incremental
/// update counter keys on.
pub(crate) fn append_eof_markers(bytes: &mut Vec<u8>, n: usize) {
    for _ in 0..n {
        bytes.extend_from_slice(b"\n%%EOF");
    }
}

fn patch_placeholder(bytes: &mut Vec<u8>, placeholder: &[u8], value: i64) {
    let pos = bytes
        .windows(placeholder.len())
        .position(|w| w == placeholder)
        .unwrap();
    let formatted = format!("{:010}", value);
    bytes[pos..pos + placeholder.len()].copy_from_slice(formatted.as_bytes());
}

/// Deterministic pseudo-noise page, stable across runs. Mixed hard
/// enough that no two distinct positions repeat a block pattern.
pub(crate) fn noise_page(page: usize, width: u32, height: u32, seed: u64) -> PageImage {
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

/// Noise page with a square region duplicated far away from its source,
/// the footprint a copy-move detector is built to catch.
pub(crate) fn page_with_cloned_region(
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
