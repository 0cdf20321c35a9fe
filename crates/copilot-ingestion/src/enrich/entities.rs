//! Algorithmic entity extractor: regex-based URLs, emails, dates, money,
//! and capitalized multi-word proper-noun candidates, deduplicated per
//! parent (spec §4.6).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").unwrap());
static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap());
static LONG_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4}\b").unwrap()
});
static MONEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[$€£]\s?\d[\d,]*(?:\.\d+)?").unwrap());
static PROPER_NOUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)+)\b").unwrap());

/// Extracts and deduplicates entity strings from a parent's text.
/// Never errs: a regex miss simply yields no matches for that category.
pub fn extract(text: &str, max_entities: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut entities = Vec::new();

    for pattern in [&*URL, &*EMAIL, &*ISO_DATE, &*LONG_DATE, &*MONEY, &*PROPER_NOUN] {
        for m in pattern.find_iter(text) {
            let value = m.as_str().to_string();
            if seen.insert(value.clone()) {
                entities.push(value);
                if entities.len() >= max_entities {
                    return entities;
                }
            }
        }
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_url_and_email() {
        let entities = extract("Visit https://example.com or mail jane@example.com for info.", 25);
        assert!(entities.contains(&"https://example.com".to_string()));
        assert!(entities.contains(&"jane@example.com".to_string()));
    }

    #[test]
    fn extracts_iso_date_and_money() {
        let entities = extract("Invoice dated 2024-01-15 for $1,250.00 is due.", 25);
        assert!(entities.contains(&"2024-01-15".to_string()));
        assert!(entities.iter().any(|e| e.contains("1,250.00")));
    }

    #[test]
    fn extracts_proper_noun_candidate() {
        let entities = extract("A meeting with John Smith is scheduled.", 25);
        assert!(entities.contains(&"John Smith".to_string()));
    }

    #[test]
    fn respects_max_entities_cap() {
        let text = "Alice Jones met Bob Carter met Carol Danvers met David Evans.";
        let entities = extract(text, 2);
        assert_eq!(entities.len(), 2);
    }
}
