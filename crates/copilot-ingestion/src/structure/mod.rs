//! Structure stage: boundary detection, hierarchy construction and
//! validation, section-path assignment, and flattening (spec §4.4).

pub mod boundaries;
pub mod flatten;
pub mod section_path;
pub mod tree;

use crate::error::{PipelineError, Result};
use crate::parse::ParsedDocument;
use crate::types::{Boundary, DocumentNode};
use flatten::{flatten, DetectionMethod, FlattenStats};
use tracing::{debug, instrument};
use tree::Heading;

pub struct StructuredDocument {
    pub root: DocumentNode,
    pub sections: Vec<crate::types::FlatSection>,
    pub stats: FlattenStats,
    pub detection_method: DetectionMethod,
    pub has_structure: bool,
    pub warnings: Vec<String>,
}

/// Runs the full Structure stage over a parsed document.
#[instrument(skip(parsed))]
pub fn structure(parsed: &ParsedDocument) -> Result<StructuredDocument> {
    if parsed.full_text.trim().is_empty() {
        return Err(PipelineError::EmptyDocument);
    }

    let (headings, detection_method) = resolve_headings(parsed);
    let boundaries = merged_boundaries(parsed);

    let mut root = tree::build(&parsed.full_text, &headings);
    let mut warnings = tree::validate_and_correct(&mut root);
    warnings.extend(tree::reparent_orphans(&mut root));
    section_path::assign(&mut root);

    let output = flatten(&root, &boundaries);

    // `hasStructure` reflects whether headings were actually detected, not
    // merely whether a section exists — a heading-less document still gets
    // one synthetic section so Chunk has something to work from, but it is
    // not "structured" (spec §4.4, §8 scenario S2).
    let has_structure = detection_method != DetectionMethod::None;

    debug!(
        sections = output.stats.total_sections,
        detection_method = detection_method.as_str(),
        "structure stage complete"
    );

    Ok(StructuredDocument {
        root,
        sections: output.sections,
        stats: output.stats,
        detection_method,
        has_structure,
        warnings,
    })
}

fn resolve_headings(parsed: &ParsedDocument) -> (Vec<Heading>, DetectionMethod) {
    if !parsed.extracted_headings.is_empty() {
        let headings = parsed
            .extracted_headings
            .iter()
            .map(|h| Heading {
                offset: h.offset,
                level: h.level,
                title: h.title.clone(),
            })
            .collect();
        return (headings, DetectionMethod::NativeHeadings);
    }

    let heuristic = boundaries::detect_headings(&parsed.full_text);
    if heuristic.is_empty() {
        return (Vec::new(), DetectionMethod::None);
    }

    let headings = heuristic
        .iter()
        .map(|b| Heading {
            offset: b.offset,
            level: 1,
            title: heading_title_at(&parsed.full_text, b.offset),
        })
        .collect();
    (headings, DetectionMethod::Heuristic)
}

fn heading_title_at(text: &str, offset: usize) -> String {
    text[offset..]
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches('#')
        .trim()
        .to_string()
}

fn merged_boundaries(parsed: &ParsedDocument) -> Vec<Boundary> {
    let mut sources = vec![parsed.boundaries.clone()];
    if parsed.extracted_headings.is_empty() {
        sources.push(boundaries::detect_headings(&parsed.full_text));
    }
    sources.push(boundaries::detect_paragraphs(&parsed.full_text));
    sources.push(boundaries::detect_sentences(&parsed.full_text));
    boundaries::merge(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ExtractedHeading;

    #[test]
    fn markdown_headings_yield_two_sections() {
        let parsed = ParsedDocument {
            full_text: "# A\n\npara1.\n\n## B\n\npara2.".to_string(),
            boundaries: Vec::new(),
            extracted_headings: vec![
                ExtractedHeading { offset: 0, level: 1, title: "A".to_string() },
                ExtractedHeading { offset: 12, level: 2, title: "B".to_string() },
            ],
        };
        let structured = structure(&parsed).unwrap();
        assert_eq!(structured.sections.len(), 2);
        assert_eq!(structured.sections[1].section_path, "A > B");
        assert!(structured.has_structure);
        assert_eq!(structured.detection_method, DetectionMethod::NativeHeadings);
    }

    #[test]
    fn plain_text_without_headings_gets_one_synthetic_section() {
        let parsed = ParsedDocument {
            full_text: "plain prose with no headings at all, just words.".to_string(),
            boundaries: Vec::new(),
            extracted_headings: Vec::new(),
        };
        let structured = structure(&parsed).unwrap();
        assert_eq!(structured.detection_method, DetectionMethod::None);
        assert!(!structured.has_structure);
        assert_eq!(structured.sections.len(), 1);
        assert_eq!(structured.sections[0].content, parsed.full_text);
    }

    #[test]
    fn plain_text_flows_through_to_chunk_output() {
        let full_text = "Sentence one is here. Sentence two follows along. Sentence three continues on. Sentence four wraps things up nicely."
            .repeat(20);
        let parsed = ParsedDocument {
            full_text,
            boundaries: Vec::new(),
            extracted_headings: Vec::new(),
        };
        let structured = structure(&parsed).unwrap();
        assert_eq!(structured.detection_method, DetectionMethod::None);
        assert!(!structured.sections.is_empty());

        let output = crate::chunk::chunk(
            &structured.sections,
            "file-1",
            "doc-1",
            &crate::config::ChunkConfig::default(),
        );
        assert!(!output.parents.is_empty());
        assert!(!output.children.is_empty());
        assert_eq!(output.lineage.len(), output.children.len());
    }

    #[test]
    fn empty_text_is_rejected() {
        let parsed = ParsedDocument {
            full_text: "   \n  ".to_string(),
            boundaries: Vec::new(),
            extracted_headings: Vec::new(),
        };
        assert!(matches!(structure(&parsed), Err(PipelineError::EmptyDocument)));
    }
}
