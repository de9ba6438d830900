//! Suspicious-term lexicon matching
//!
//! Case-insensitive substring matching over the configured term list,
//! with an optional fuzzy mode that tolerates small edit distances on
//! single-word terms so "fotomontagen" still hits "fotomontagem".

use serde::Serialize;

use crate::config::{LexiconConfig, MatchMode};

/// Tokens this much longer or shorter than a term are not worth the
/// edit-distance computation.
const FUZZY_LENGTH_SLACK: usize = 2;

/// One lexicon hit on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LexiconHit {
    pub term: String,
    /// The token or fragment that matched.
    pub matched: String,
    /// Edit distance; zero for exact matches.
    pub distance: usize,
}

/// Matcher prepared once per run from the configured lexicon.
#[derive(Debug, Clone)]
pub struct LexiconMatcher {
    terms: Vec<String>,
    mode: MatchMode,
    max_edit_distance: usize,
}

impl LexiconMatcher {
    pub fn new(config: &LexiconConfig) -> Self {
        Self {
            terms: config.terms.iter().map(|t| t.to_lowercase()).collect(),
            mode: config.matching,
            max_edit_distance: config.max_edit_distance,
        }
    }

    /// Hits for one page of text, in term order.
    pub fn scan(&self, text: &str) -> Vec<LexiconHit> {
        let haystack = text.to_lowercase();
        let tokens: Vec<&str> = haystack
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut hits = Vec::new();
        for term in &self.terms {
            if haystack.contains(term.as_str()) {
                hits.push(LexiconHit {
                    term: term.clone(),
                    matched: term.clone(),
                    distance: 0,
                });
                continue;
            }
            if self.mode != MatchMode::Fuzzy || term.contains(' ') {
                continue;
            }
            // Fuzzy pass over single-word terms only; phrases need the
            // exact substring above.
            if let Some(hit) = self.fuzzy_hit(term, &tokens) {
                hits.push(hit);
            }
        }
        hits
    }

    fn fuzzy_hit(&self, term: &str, tokens: &[&str]) -> Option<LexiconHit> {
        let term_len = term.chars().count();
        let mut best: Option<LexiconHit> = None;
        for token in tokens {
            let token_len = token.chars().count();
            if token_len + FUZZY_LENGTH_SLACK < term_len
                || token_len > term_len + FUZZY_LENGTH_SLACK
            {
                continue;
            }
            let distance = levenshtein(term, token);
            if distance == 0 || distance > self.max_edit_distance {
                continue;
            }
            let better = match &best {
                Some(hit) => distance < hit.distance,
                None => true,
            };
            if better {
                best = Some(LexiconHit {
                    term: term.to_string(),
                    matched: (*token).to_string(),
                    distance,
                });
            }
        }
        best
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
