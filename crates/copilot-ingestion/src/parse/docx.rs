//! DOC/DOCX extractor. DOCX is read as a zip of OOXML parts; heading
//! styles (`Heading 1`..`Heading 9`) map to heading boundaries, paragraphs
//! map to `paragraph` boundaries with strength `medium` (spec §4.3).
//!
//! Legacy `.doc` is routed through this same path (spec §14, Open
//! Question 4): binary `.doc` has no OOXML body, so it degrades to a
//! best-effort plain-text scrape with a warning rather than failing.

use crate::error::{PipelineError, Result};
use crate::types::{Boundary, BoundaryStrength, BoundaryType};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use tracing::warn;

#[derive(Debug)]
pub struct DocxHeading {
    pub offset: usize,
    pub level: usize,
    pub title: String,
}

#[derive(Debug)]
pub struct DocxExtraction {
    pub full_text: String,
    pub headings: Vec<DocxHeading>,
    pub boundaries: Vec<Boundary>,
    pub degraded: bool,
}

/// Extracts text and structure from a `.docx` (OOXML zip) file.
pub fn extract_docx(bytes: &[u8]) -> Result<DocxExtraction> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PipelineError::ParseFailed(format!("invalid DOCX zip: {e}")))?;

    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| PipelineError::ParseFailed(format!("DOCX missing document.xml: {e}")))?
        .read_to_string(&mut document_xml)
        .map_err(|e| PipelineError::ParseFailed(format!("could not read document.xml: {e}")))?;

    parse_document_xml(&document_xml)
}

/// Best-effort extraction for legacy binary `.doc`: no structured parsing
/// is attempted, only a scrape of printable runs, flagged as degraded
/// fidelity.
pub fn extract_doc(bytes: &[u8]) -> Result<DocxExtraction> {
    warn!("legacy .doc format parsed with degraded fidelity (plain-text scrape only)");

    let text: String = bytes
        .iter()
        .filter(|b| b.is_ascii_graphic() || **b == b' ' || **b == b'\n')
        .map(|b| *b as char)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if text.trim().is_empty() {
        return Err(PipelineError::ParseFailed(
            "legacy .doc scrape produced no text".to_string(),
        ));
    }

    Ok(DocxExtraction {
        full_text: text,
        headings: Vec::new(),
        boundaries: Vec::new(),
        degraded: true,
    })
}

fn parse_document_xml(xml: &str) -> Result<DocxExtraction> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut full_text = String::new();
    let mut headings = Vec::new();
    let mut boundaries = Vec::new();

    let mut current_style: Option<String> = None;
    let mut current_paragraph = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"w:p" => {
                current_style = None;
                current_paragraph.clear();
            }
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"w:pStyle" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"w:val" {
                        current_style = Some(String::from_utf8_lossy(&attr.value).to_string());
                    }
                }
            }
            Ok(Event::Text(e)) => {
                current_paragraph.push_str(&e.unescape().unwrap_or_default());
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"w:p" => {
                let offset = full_text.len();
                if let Some(level) = heading_level(current_style.as_deref()) {
                    headings.push(DocxHeading {
                        offset,
                        level,
                        title: current_paragraph.clone(),
                    });
                    boundaries.push(Boundary::new(BoundaryType::Heading, offset, BoundaryStrength::Strong));
                } else if !current_paragraph.trim().is_empty() {
                    boundaries.push(Boundary::new(BoundaryType::Paragraph, offset, BoundaryStrength::Medium));
                }
                full_text.push_str(&current_paragraph);
                full_text.push('\n');
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(PipelineError::ParseFailed(format!("malformed DOCX XML: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    if full_text.trim().is_empty() {
        return Err(PipelineError::ParseFailed("DOCX body is empty".to_string()));
    }

    Ok(DocxExtraction {
        full_text,
        headings,
        boundaries,
        degraded: false,
    })
}

fn heading_level(style: Option<&str>) -> Option<usize> {
    let style = style?;
    let lower = style.to_lowercase();
    if let Some(rest) = lower.strip_prefix("heading") {
        rest.trim().parse::<usize>().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_zip_bytes() {
        let err = extract_docx(b"not a zip").unwrap_err();
        assert!(matches!(err, PipelineError::ParseFailed(_)));
    }

    #[test]
    fn doc_scrape_rejects_empty_input() {
        let err = extract_doc(&[0u8, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, PipelineError::ParseFailed(_)));
    }

    #[test]
    fn doc_scrape_extracts_printable_text() {
        let bytes = b"\x00\x01Hello world\x02\x03";
        let extraction = extract_doc(bytes).unwrap();
        assert!(extraction.degraded);
        assert!(extraction.full_text.contains("Hello world"));
    }
}
