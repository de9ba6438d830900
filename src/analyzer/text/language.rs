//! Stopword-based language detection
//!
//! Good enough to tell Portuguese from English page by page, which is
//! what the mixed-language check needs. Anything smarter plugs in
//! through [`LanguageDetector`].

use async_trait::async_trait;

/// Minimum stopword hits before a language is claimed.
const MIN_HITS: usize = 3;

const PORTUGUESE: &[&str] = &[
    "de", "que", "não", "uma", "para", "com", "os", "as", "dos", "das", "em", "por", "se",
    "mais", "como", "foi", "ser", "são",
];
const ENGLISH: &[&str] = &[
    "the", "of", "and", "to", "in", "is", "that", "for", "with", "as", "on", "by", "this",
    "from", "at", "was", "are", "be",
];

/// Names the language of a text fragment, or nothing when unsure.
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(&self, text: &str) -> Option<String>;
}

/// Built-in detector counting language-indicative stopwords.
#[derive(Debug, Default)]
pub struct StopwordDetector;

#[async_trait]
impl LanguageDetector for StopwordDetector {
    async fn detect(&self, text: &str) -> Option<String> {
        let mut pt = 0usize;
        let mut en = 0usize;
        for token in tokens(text) {
            if PORTUGUESE.contains(&token.as_str()) {
                pt += 1;
            }
            if ENGLISH.contains(&token.as_str()) {
                en += 1;
            }
        }
        if pt.max(en) < MIN_HITS || pt == en {
            return None;
        }
        Some(if pt > en { "pt" } else { "en" }.to_string())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn portuguese_prose_is_recognized() {
        let text = "Declaro para os devidos fins que o documento foi emitido \
                    de acordo com as normas em vigor e não apresenta rasuras.";
        assert_eq!(StopwordDetector.detect(text).await.as_deref(), Some("pt"));
    }

    #[tokio::test]
    async fn english_prose_is_recognized() {
        let text = "This report was issued by the registry office and is \
                    valid for all legal purposes in the country of origin.";
        assert_eq!(StopwordDetector.detect(text).await.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn short_or_ambiguous_text_stays_undetected() {
        assert_eq!(StopwordDetector.detect("R$ 1.200,00").await, None);
        assert_eq!(StopwordDetector.detect("").await, None);
    }
}
