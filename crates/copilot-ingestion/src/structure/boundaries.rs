//! Boundary detectors that run over full text when a format supplies no
//! native heading information (spec §4.4).

use crate::types::{Boundary, BoundaryStrength, BoundaryType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static NUMBERED_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)*\s+\S").unwrap());

/// Abbreviations that must not be treated as sentence-ending periods.
const ABBREVIATIONS: &[&str] = &["Mr.", "Mrs.", "Dr.", "Ms.", "e.g.", "i.e.", "vs.", "etc."];

/// ALL-CAPS lines ≤80 chars and numbered-heading lines (spec §4.4, strong).
pub fn detect_headings(text: &str) -> Vec<Boundary> {
    let mut boundaries = Vec::new();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n');
        let looks_like_heading = is_all_caps_heading(trimmed) || NUMBERED_HEADING.is_match(trimmed);

        if looks_like_heading {
            boundaries.push(Boundary::new(BoundaryType::Heading, offset, BoundaryStrength::Strong));
        }
        offset += line.len();
    }

    boundaries
}

fn is_all_caps_heading(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 80 {
        return false;
    }
    let has_letter = trimmed.chars().any(|c| c.is_alphabetic());
    has_letter
        && trimmed
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(|c| c.is_uppercase())
}

/// Runs of one or more blank lines (spec §4.4, medium).
pub fn detect_paragraphs(text: &str) -> Vec<Boundary> {
    let mut boundaries = Vec::new();
    let mut offset = 0;
    let mut prev_blank = false;

    for line in text.split_inclusive('\n') {
        let is_blank = line.trim().is_empty();
        if is_blank && !prev_blank {
            boundaries.push(Boundary::new(BoundaryType::Paragraph, offset, BoundaryStrength::Medium));
        }
        prev_blank = is_blank;
        offset += line.len();
    }

    boundaries
}

/// Sentence-ending punctuation followed by whitespace and a capital
/// letter or digit, guarded by an abbreviation blacklist (spec §4.4, weak).
pub fn detect_sentences(text: &str) -> Vec<Boundary> {
    let mut boundaries = Vec::new();
    let chars: Vec<char> = text.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c != '.' && c != '!' && c != '?' {
            continue;
        }
        let Some(&next) = chars.get(i + 1) else { continue };
        if !next.is_whitespace() {
            continue;
        }
        let Some(&after) = chars.get(i + 2) else { continue };
        if !(after.is_uppercase() || after.is_ascii_digit()) {
            continue;
        }
        if ends_with_abbreviation(&chars[..=i]) {
            continue;
        }
        let byte_offset: usize = chars[..=i].iter().map(|c| c.len_utf8()).sum();
        boundaries.push(Boundary::new(BoundaryType::Sentence, byte_offset, BoundaryStrength::Weak));
    }

    boundaries
}

fn ends_with_abbreviation(prefix: &[char]) -> bool {
    let tail: String = prefix.iter().rev().take(6).rev().collect();
    ABBREVIATIONS.iter().any(|abbr| tail.ends_with(*abbr))
}

/// Merges boundaries from all detectors, sorts by offset, and deduplicates
/// `(type, offset)` pairs keeping the strongest strength (spec §3, §4.4).
pub fn merge(sources: Vec<Vec<Boundary>>) -> Vec<Boundary> {
    let mut strongest: HashMap<(BoundaryType, usize), BoundaryStrength> = HashMap::new();

    for boundary in sources.into_iter().flatten() {
        strongest
            .entry((boundary.boundary_type, boundary.offset))
            .and_modify(|s| *s = (*s).max(boundary.strength))
            .or_insert(boundary.strength);
    }

    let mut merged: Vec<Boundary> = strongest
        .into_iter()
        .map(|((boundary_type, offset), strength)| Boundary::new(boundary_type, offset, strength))
        .collect();
    merged.sort_by_key(|b| b.offset);
    merged
}
