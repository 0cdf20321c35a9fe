//! TF-IDF keyword extractor (spec §4.6).
//!
//! Corpus is all parents of the current document. Each parent's text is
//! lowercased, stripped of punctuation, and whitespace-normalized before
//! ingestion (spec §4.6; tokenizer fixed per §14, Open Question 1). On
//! any failure this returns an empty map per parent rather than erroring
//! — keyword extraction never fails the pipeline.

use std::collections::HashMap;

const MIN_TERM_LENGTH: usize = 3;

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|s| s.to_ascii_lowercase())
        .filter(|s| s.len() >= MIN_TERM_LENGTH)
}

/// Same splitting as `tokenize` but without the length floor. Used as a
/// fallback so a parent made up entirely of short real words (not pure
/// punctuation) still yields keywords (spec §8 property 7).
fn tokenize_any_length(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|s| s.to_ascii_lowercase())
        .filter(|s| !s.is_empty())
}

/// Computes document frequency across the corpus once, then serves
/// top-K TF-IDF keywords per document.
pub struct CorpusTfIdf {
    document_frequency: HashMap<String, usize>,
    corpus_size: usize,
}

impl CorpusTfIdf {
    /// Builds the IDF model from every parent's text in the document.
    pub fn build(documents: &[&str]) -> Self {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let mut seen_in_doc = std::collections::HashSet::new();
            for term in tokenize(doc) {
                seen_in_doc.insert(term);
            }
            for term in seen_in_doc {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        Self { document_frequency, corpus_size: documents.len() }
    }

    /// Returns the top `top_k` terms for one document's text by
    /// `term_frequency * log(corpus_size / document_frequency)`.
    pub fn top_keywords(&self, text: &str, top_k: usize) -> Vec<String> {
        if self.corpus_size == 0 {
            return Vec::new();
        }

        let mut term_frequency: HashMap<String, usize> = HashMap::new();
        for term in tokenize(text) {
            *term_frequency.entry(term).or_insert(0) += 1;
        }

        if term_frequency.is_empty() {
            for term in tokenize_any_length(text) {
                *term_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let mut scored: Vec<(String, f64)> = term_frequency
            .into_iter()
            .map(|(term, tf)| {
                let df = self.document_frequency.get(&term).copied().unwrap_or(1).max(1);
                let idf = ((self.corpus_size as f64 + 1.0) / (df as f64)).ln() + 1.0;
                (term, tf as f64 * idf)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
        scored.into_iter().take(top_k).map(|(term, _)| term).collect()
    }
}
