//! Sensor-noise correlation
//!
//! Pages scanned by one device share a faint fixed noise pattern. The
//! high-frequency residual of each page is correlated against the mean
//! residual of the leading pages; a page whose residual does not track
//! the reference was likely captured by a different device and spliced
//! in.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::analyzer::Result;
use crate::artifact::PageImage;

/// Pages averaged into the reference pattern.
const REFERENCE_PAGES: usize = 3;
/// Residual spread below this carries no sensor trace; blank pages sit
/// here and are skipped rather than misread as foreign.
const MIN_RESIDUAL_STD: f64 = 1e-6;

/// Correlation of one page's residual against the reference pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrnuCorrelation {
    pub page: usize,
    pub correlation: f64,
}

/// Correlates per-page sensor residuals across a document.
#[async_trait]
pub trait PrnuAnalyzer: Send + Sync {
    async fn correlate(&self, pages: &[PageImage]) -> Result<Vec<PrnuCorrelation>>;
}

/// Built-in analyzer: box-blur residual against the mean of the leading
/// pages.
#[derive(Debug, Default)]
pub struct MeanResidualPrnu;

#[async_trait]
impl PrnuAnalyzer for MeanResidualPrnu {
    async fn correlate(&self, pages: &[PageImage]) -> Result<Vec<PrnuCorrelation>> {
        if pages.len() < 2 {
            return Ok(Vec::new());
        }

        let width = pages[0].width;
        let height = pages[0].height;
        let mut eligible: Vec<(usize, Vec<f64>)> = Vec::new();
        for page in pages {
            if page.width != width || page.height != height {
                debug!(page = page.page, "dimensions differ from the first page; skipped");
                continue;
            }
            let residual = residual(page);
            if std_dev(&residual) < MIN_RESIDUAL_STD {
                debug!(page = page.page, "flat page carries no sensor trace; skipped");
                continue;
            }
            eligible.push((page.page, residual));
        }
        if eligible.is_empty() {
            return Ok(Vec::new());
        }

        let mut reference = vec![0.0; (width * height) as usize];
        let members = eligible.len().min(REFERENCE_PAGES);
        for (_, residual) in eligible.iter().take(members) {
            for (acc, value) in reference.iter_mut().zip(residual.iter()) {
                *acc += value;
            }
        }
        for acc in &mut reference {
            *acc /= members as f64;
        }

        Ok(eligible
            .iter()
            .map(|(page, residual)| PrnuCorrelation {
                page: *page,
                correlation: pearson(residual, &reference),
            })
            .collect())
    }
}

/// High-frequency residual: pixel minus its 3x3 neighborhood mean.
fn residual(page: &PageImage) -> Vec<f64> {
    let w = page.width as i64;
    let h = page.height as i64;
    let mut out = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let sx = (x + dx).clamp(0, w - 1) as u32;
                    let sy = (y + dy).clamp(0, h - 1) as u32;
                    sum += page.get(sx, sy) as f64;
                }
            }
            out.push(page.get(x as u32, y as u32) as f64 - sum / 9.0);
        }
    }
    out
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;
    let mut covariance = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        covariance += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        covariance / denom
    }
}
