//! Markdown extractor: ATX headings map to heading boundaries; blank
//! lines separate paragraphs; fenced code blocks are preserved verbatim
//! and treated as atomic (spec §4.3).

use crate::types::{Boundary, BoundaryStrength, BoundaryType};
use once_cell::sync::Lazy;
use regex::Regex;

static ATX_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*$").unwrap());

pub struct MarkdownHeading {
    pub offset: usize,
    pub level: usize,
    pub title: String,
}

pub struct MarkdownExtraction {
    pub full_text: String,
    pub headings: Vec<MarkdownHeading>,
    pub boundaries: Vec<Boundary>,
}

pub fn extract(text: &str) -> MarkdownExtraction {
    let mut headings = Vec::new();
    let mut boundaries = Vec::new();
    let mut offset = 0;
    let mut in_fence = false;
    let mut prev_blank = false;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n');
        let is_fence_delim = trimmed.trim_start().starts_with("```");

        if is_fence_delim {
            in_fence = !in_fence;
        } else if !in_fence {
            if let Some(caps) = ATX_HEADING.captures(trimmed) {
                let level = caps[1].len();
                let title = caps[2].trim().to_string();
                headings.push(MarkdownHeading { offset, level, title });
                boundaries.push(Boundary::new(BoundaryType::Heading, offset, BoundaryStrength::Strong));
            } else if trimmed.trim().is_empty() && !prev_blank {
                boundaries.push(Boundary::new(BoundaryType::Paragraph, offset, BoundaryStrength::Medium));
            }
        }

        prev_blank = trimmed.trim().is_empty() && !in_fence;
        offset += line.len();
    }

    MarkdownExtraction {
        full_text: text.to_string(),
        headings,
        boundaries,
    }
}
