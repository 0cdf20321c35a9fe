//! PDF extractor: page-oriented text extraction preserving reading order;
//! emits `pageBreak` boundaries with strength `strong` between pages
//! (spec §4.3).

use crate::error::{PipelineError, Result};
use crate::types::{Boundary, BoundaryStrength, BoundaryType};
use lopdf::Document;

#[derive(Debug)]
pub struct PdfExtraction {
    pub full_text: String,
    pub boundaries: Vec<Boundary>,
}

pub fn extract(bytes: &[u8]) -> Result<PdfExtraction> {
    let document =
        Document::load_mem(bytes).map_err(|e| PipelineError::ParseFailed(format!("invalid PDF: {e}")))?;

    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err(PipelineError::ParseFailed("PDF has no pages".to_string()));
    }

    let mut full_text = String::new();
    let mut boundaries = Vec::new();

    for (i, page_number) in page_numbers.iter().enumerate() {
        let page_text = document
            .extract_text(&[*page_number])
            .unwrap_or_default();

        if i > 0 {
            boundaries.push(Boundary::new(
                BoundaryType::PageBreak,
                full_text.len(),
                BoundaryStrength::Strong,
            ));
        }
        full_text.push_str(&page_text);
        if !page_text.ends_with('\n') {
            full_text.push('\n');
        }
    }

    Ok(PdfExtraction { full_text, boundaries })
}
