//! Per-page stylometry
//!
//! Reduces each page to a handful of style statistics and scores pages
//! against the document's own distribution. A page whose readability
//! sits far from the rest was often written, or rewritten, by someone
//! else.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Style profile of one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StylometryStats {
    pub words: usize,
    pub avg_sentence_len: f64,
    pub avg_word_len: f64,
    /// Unique words over total words.
    pub lexical_diversity: f64,
    /// Flesch-style reading ease; only comparable within one document.
    pub readability: f64,
}

/// Computes the style profile of one page, or nothing for empty text.
pub fn page_stats(text: &str) -> Option<StylometryStats> {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return None;
    }

    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| s.chars().any(|c| c.is_alphanumeric()))
        .count()
        .max(1);
    let unique: BTreeSet<&String> = words.iter().collect();
    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
    let total_syllables: usize = words.iter().map(|w| syllable_estimate(w)).sum();

    let word_count = words.len() as f64;
    let avg_sentence_len = word_count / sentences as f64;
    let avg_word_len = total_chars as f64 / word_count;
    let readability =
        206.835 - 1.015 * avg_sentence_len - 84.6 * (total_syllables as f64 / word_count);

    Some(StylometryStats {
        words: words.len(),
        avg_sentence_len,
        avg_word_len,
        lexical_diversity: unique.len() as f64 / word_count,
        readability,
    })
}

/// Pages whose readability z-score exceeds the threshold, with the
/// score. Needs at least three profiled pages to say anything.
pub fn readability_outliers(
    stats: &BTreeMap<usize, StylometryStats>,
    z_threshold: f64,
) -> Vec<(usize, f64)> {
    if stats.len() < 3 {
        return Vec::new();
    }
    let values: Vec<f64> = stats.values().map(|s| s.readability).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    let std = variance.sqrt();
    if std < f64::EPSILON {
        return Vec::new();
    }
    stats
        .iter()
        .filter_map(|(page, s)| {
            let z = (s.readability - mean) / std;
            (z.abs() > z_threshold).then_some((*page, z))
        })
        .collect()
}

/// Counts maximal vowel runs; close enough to syllables for comparing
/// pages of the same document.
fn syllable_estimate(word: &str) -> usize {
    const VOWELS: &str = "aeiouyáàâãéêíóôõúü";
    let mut count = 0;
    let mut in_group = false;
    for c in word.chars() {
        let lower = c.to_lowercase().next().unwrap_or(c);
        if VOWELS.contains(lower) {
            if !in_group {
                count += 1;
                in_group = true;
            }
        } else {
            in_group = false;
        }
    }
    count.max(1)
}
