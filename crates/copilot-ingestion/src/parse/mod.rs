//! Parse stage: dispatches on MIME type to a per-format extractor
//! (spec §4.3). The set of formats is closed and stable, so dispatch is a
//! tagged-variant match rather than an open trait-object registry
//! (spec §9 design notes).

pub mod docx;
pub mod markdown;
pub mod pdf;
pub mod plaintext;

use crate::error::{PipelineError, Result};
use crate::load::LoadedFile;
use crate::types::{Boundary, BoundaryStrength, BoundaryType};
use tracing::instrument;

/// A heading recovered directly from format metadata (PDF bookmarks are
/// not modeled; DOCX styles and Markdown ATX headings are).
#[derive(Debug, Clone)]
pub struct ExtractedHeading {
    pub offset: usize,
    pub level: usize,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub full_text: String,
    pub boundaries: Vec<Boundary>,
    pub extracted_headings: Vec<ExtractedHeading>,
}

/// Runs the Parse stage for one loaded file, dispatching on its sniffed
/// MIME type.
#[instrument(skip(file), fields(mime_type = %file.mime_type))]
pub fn parse(file: &LoadedFile) -> Result<ParsedDocument> {
    match file.mime_type.as_str() {
        "application/pdf" => parse_pdf(file),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => parse_docx(file),
        "application/msword" => parse_doc(file),
        "text/markdown" => parse_markdown(file),
        "text/plain" => parse_plaintext(file),
        other => Err(PipelineError::UnsupportedFormat(other.to_string())),
    }
}

fn parse_pdf(file: &LoadedFile) -> Result<ParsedDocument> {
    let extraction = pdf::extract(&file.bytes)?;
    reject_if_empty(&extraction.full_text)?;
    Ok(ParsedDocument {
        full_text: extraction.full_text,
        boundaries: extraction.boundaries,
        extracted_headings: Vec::new(),
    })
}

fn parse_docx(file: &LoadedFile) -> Result<ParsedDocument> {
    let extraction = docx::extract_docx(&file.bytes)?;
    reject_if_empty(&extraction.full_text)?;
    Ok(ParsedDocument {
        full_text: extraction.full_text,
        boundaries: extraction.boundaries,
        extracted_headings: extraction
            .headings
            .into_iter()
            .map(|h| ExtractedHeading { offset: h.offset, level: h.level, title: h.title })
            .collect(),
    })
}

fn parse_doc(file: &LoadedFile) -> Result<ParsedDocument> {
    let extraction = docx::extract_doc(&file.bytes)?;
    reject_if_empty(&extraction.full_text)?;
    Ok(ParsedDocument {
        full_text: extraction.full_text,
        boundaries: extraction.boundaries,
        extracted_headings: Vec::new(),
    })
}

fn parse_markdown(file: &LoadedFile) -> Result<ParsedDocument> {
    let text = plaintext::extract(&file.bytes)?;
    reject_if_empty(&text)?;
    let extraction = markdown::extract(&text);
    Ok(ParsedDocument {
        full_text: extraction.full_text,
        boundaries: extraction.boundaries,
        extracted_headings: extraction
            .headings
            .into_iter()
            .map(|h| ExtractedHeading { offset: h.offset, level: h.level, title: h.title })
            .collect(),
    })
}

fn parse_plaintext(file: &LoadedFile) -> Result<ParsedDocument> {
    let text = plaintext::extract(&file.bytes)?;
    reject_if_empty(&text)?;
    Ok(ParsedDocument {
        full_text: text,
        boundaries: paragraph_boundaries_at_blank_runs(&file.bytes),
        extracted_headings: Vec::new(),
    })
}

fn paragraph_boundaries_at_blank_runs(bytes: &[u8]) -> Vec<Boundary> {
    let text = String::from_utf8_lossy(bytes);
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

fn reject_if_empty(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        Err(PipelineError::ParseFailed("extractor produced no text".to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LoadMethod;

    fn loaded(mime_type: &str, bytes: Vec<u8>) -> LoadedFile {
        LoadedFile {
            file_id: "f1".to_string(),
            document_id: "d1".to_string(),
            filename: "doc".to_string(),
            bytes,
            mime_type: mime_type.to_string(),
            checksum: "x".to_string(),
            method: LoadMethod::Buffer,
        }
    }

    #[test]
    fn dispatches_markdown() {
        let file = loaded("text/markdown", b"# Title\n\nbody.".to_vec());
        let parsed = parse(&file).unwrap();
        assert_eq!(parsed.extracted_headings.len(), 1);
    }

    #[test]
    fn dispatches_plaintext() {
        let file = loaded("text/plain", b"hello\n\nworld".to_vec());
        let parsed = parse(&file).unwrap();
        assert!(!parsed.boundaries.is_empty());
    }

    #[test]
    fn unknown_mime_is_unsupported() {
        let file = loaded("image/png", vec![0u8; 4]);
        let err = parse(&file).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
    }
}
