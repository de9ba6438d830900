//! Block-hash copy-move detection
//!
//! Slides a window over the page, reduces each block to a quantized
//! brightness signature, and pairs up far-apart blocks with identical
//! signatures. Duplicated regions inside one page are the classic
//! footprint of content pasted over something else.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::analyzer::Result;
use crate::artifact::PageImage;

const BLOCK: u32 = 16;
const STRIDE: u32 = 8;
/// Cells per axis the block is reduced to before quantization.
const CELLS: u32 = 4;
const QUANT_STEP: f64 = 16.0;
/// Hard cap so a pathological page cannot flood the run.
const MAX_MATCHES: usize = 512;

/// One pair of identical blocks far enough apart to matter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CopyMoveMatch {
    pub source: (u32, u32),
    pub target: (u32, u32),
    pub distance: f64,
}

/// Detects duplicated regions within a single page.
#[async_trait]
pub trait CopyMoveDetector: Send + Sync {
    async fn detect(&self, page: &PageImage) -> Result<Vec<CopyMoveMatch>>;
}

/// Built-in detector over quantized block signatures.
#[derive(Debug)]
pub struct BlockHashDetector {
    match_distance: u32,
}

impl BlockHashDetector {
    pub fn new(match_distance: u32) -> Self {
        Self { match_distance }
    }
}

#[async_trait]
impl CopyMoveDetector for BlockHashDetector {
    async fn detect(&self, page: &PageImage) -> Result<Vec<CopyMoveMatch>> {
        if page.width < BLOCK || page.height < BLOCK {
            return Ok(Vec::new());
        }

        // BTreeMap keeps grouping order deterministic, so identical
        // pages always report identical matches.
        let mut groups: BTreeMap<u64, Vec<(u32, u32)>> = BTreeMap::new();
        let mut y = 0;
        while y + BLOCK <= page.height {
            let mut x = 0;
            while x + BLOCK <= page.width {
                groups.entry(block_signature(page, x, y)).or_default().push((x, y));
                x += STRIDE;
            }
            y += STRIDE;
        }

        let min_distance = self.match_distance as f64;
        let mut matches = Vec::new();
        for positions in groups.values() {
            if positions.len() < 2 {
                continue;
            }
            for (i, &source) in positions.iter().enumerate() {
                for &target in &positions[i + 1..] {
                    let dx = source.0 as f64 - target.0 as f64;
                    let dy = source.1 as f64 - target.1 as f64;
                    let distance = (dx * dx + dy * dy).sqrt();
                    if distance < min_distance {
                        continue;
                    }
                    matches.push(CopyMoveMatch {
                        source,
                        target,
                        distance,
                    });
                    if matches.len() >= MAX_MATCHES {
                        return Ok(matches);
                    }
                }
            }
        }
        Ok(matches)
    }
}

/// Mean brightness of each cell, quantized to 16 levels and packed.
fn block_signature(page: &PageImage, bx: u32, by: u32) -> u64 {
    let cell = BLOCK / CELLS;
    let mut signature = 0u64;
    for cy in 0..CELLS {
        for cx in 0..CELLS {
            let mut sum = 0u32;
            for y in 0..cell {
                for x in 0..cell {
                    sum += page.get(bx + cx * cell + x, by + cy * cell + y) as u32;
                }
            }
            let mean = sum as f64 / (cell * cell) as f64;
            let level = ((mean / QUANT_STEP) as u64).min(15);
            signature = (signature << 4) | level;
        }
    }
    signature
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{noise_page, page_with_cloned_region};

    #[tokio::test]
    async fn cloned_region_forms_a_cluster() {
        let page = page_with_cloned_region(1, 256, 256, 7, (16, 16), (120, 144), 64);
        let matches = BlockHashDetector::new(30).detect(&page).await.unwrap();
        assert!(matches.len() >= 10, "only {} matches", matches.len());
        assert!(matches.iter().all(|m| m.distance >= 30.0));
    }

    #[tokio::test]
    async fn noise_stays_below_the_cluster_size() {
        let page = noise_page(1, 256, 256, 9);
        let matches = BlockHashDetector::new(30).detect(&page).await.unwrap();
        assert!(matches.len() < 10, "{} spurious matches", matches.len());
    }

    #[tokio::test]
    async fn nearby_duplicates_are_ignored() {
        // Clone displaced by less than the match distance.
        let page = page_with_cloned_region(1, 128, 128, 3, (16, 16), (32, 16), 32);
        let matches = BlockHashDetector::new(30).detect(&page).await.unwrap();
        assert!(matches.len() < 10, "{} matches under the distance floor", matches.len());
    }

    #[tokio::test]
    async fn tiny_pages_produce_nothing() {
        let page = noise_page(1, 8, 8, 1);
        let matches = BlockHashDetector::new(30).detect(&page).await.unwrap();
        assert!(matches.is_empty());
    }
}
