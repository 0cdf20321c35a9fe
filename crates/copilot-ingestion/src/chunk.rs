//! Chunk stage: parent/child chunking with lineage tracking (spec §4.5).
//!
//! Parents are packed greedily from sentences, respecting `strong`
//! boundaries and the token ceiling. Children are produced by sliding a
//! window of sentences over each parent with a minimum token overlap.
//! Token counting uses `tiktoken-rs`'s `cl100k_base` encoding, chosen as
//! the deterministic tokenizer the stage commits to (spec §14, Open
//! Question 1) — any fixed, reproducible tokenizer satisfies the budget
//! contract in spec §4.5.

use crate::config::ChunkConfig;
use crate::types::{
    Boundary, BoundaryStrength, ChildChunk, ChunkLineage, FlatSection, ParentChunk,
};
use tiktoken_rs::cl100k_base_singleton;
use tracing::instrument;
use uuid::Uuid;

/// Minimum token count for a trailing child; shorter tails are merged
/// back into the previous child (spec §4.5).
const MIN_LAST_CHILD_TOKENS: usize = 32;

fn token_count(text: &str) -> usize {
    cl100k_base_singleton().lock().encode_ordinary(text).len()
}

pub struct ChunkOutput {
    pub parents: Vec<ParentChunk>,
    pub children: Vec<ChildChunk>,
    pub lineage: Vec<ChunkLineage>,
}

/// Runs the Chunk stage over a document's flattened sections, in
/// pre-order. Parent and child ordinals are assigned as strict prefixes
/// of the natural numbers (spec §5, §8 property 3).
#[instrument(skip(sections, config), fields(file_id = %file_id, section_count = sections.len()))]
pub fn chunk(
    sections: &[FlatSection],
    file_id: &str,
    document_id: &str,
    config: &ChunkConfig,
) -> ChunkOutput {
    let mut parents = Vec::new();
    let mut children = Vec::new();
    let mut lineage = Vec::new();
    let mut parent_ordinal = 0usize;

    for section in sections {
        if section.content.trim().is_empty() {
            continue;
        }

        for parent_span in form_parents(section, config) {
            let parent_id = Uuid::new_v4();
            let parent_content = parent_span.text.clone();
            let token_count = token_count(&parent_content);

            parents.push(ParentChunk {
                id: parent_id,
                file_id: file_id.to_string(),
                document_id: document_id.to_string(),
                content: parent_content.clone(),
                section_path: section.section_path.clone(),
                token_count,
                char_start: section.metadata.char_start + parent_span.start,
                char_end: section.metadata.char_start + parent_span.end,
                ordinal: parent_ordinal,
            });
            parent_ordinal += 1;

            for (child_ordinal, child_span) in form_children(&parent_content, config).into_iter().enumerate() {
                let child_id = Uuid::new_v4();
                children.push(ChildChunk {
                    id: child_id,
                    parent_id,
                    content: child_span.text,
                    token_count: child_span.token_count,
                    ordinal: child_ordinal,
                    overlap_with_previous: child_span.overlap_with_previous,
                });
                lineage.push(ChunkLineage {
                    child_id,
                    parent_id,
                    document_id: document_id.to_string(),
                    file_id: file_id.to_string(),
                    section_path: section.section_path.clone(),
                });
            }
        }
    }

    ChunkOutput { parents, children, lineage }
}

struct Span {
    text: String,
    start: usize,
    end: usize,
}

/// A sentence, as a contiguous slice of its containing text. Sentences
/// tile the text with no gaps, so joining consecutive sentences
/// reconstructs the original substring exactly.
struct Sentence {
    start: usize,
    end: usize,
}

fn split_sentences(text: &str) -> Vec<Sentence> {
    let bytes_len = text.len();
    let mut sentences = Vec::new();
    let mut start = 0;
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    let mut i = 0;
    while i < chars.len() {
        let (byte_idx, c) = chars[i];
        let is_terminator = c == '.' || c == '!' || c == '?';
        if is_terminator {
            let next = chars.get(i + 1);
            let boundary = match next {
                Some((_, nc)) => nc.is_whitespace(),
                None => true,
            };
            if boundary {
                let end = byte_idx + c.len_utf8();
                sentences.push(Sentence { start, end });
                start = end;
            }
        }
        i += 1;
    }

    if start < bytes_len {
        sentences.push(Sentence { start, end: bytes_len });
    }

    sentences
}

fn is_atomic_code_block(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.matches("```").count() == 2
}

/// Greedily packs a section's sentences into parents, never crossing a
/// `strong` boundary and never exceeding `parent_max_tokens` (spec §4.5).
fn form_parents(section: &FlatSection, config: &ChunkConfig) -> Vec<Span> {
    if is_atomic_code_block(&section.content) {
        return vec![Span { text: section.content.clone(), start: 0, end: section.content.len() }];
    }

    let strong_cuts = relative_offsets(&section.boundaries, section.metadata.char_start, BoundaryStrength::Strong);
    let medium_cuts = relative_offsets(&section.boundaries, section.metadata.char_start, BoundaryStrength::Medium);

    let mut spans = Vec::new();
    let mut segment_start = 0;
    let mut cut_iter = strong_cuts.into_iter().peekable();

    loop {
        let segment_end = match cut_iter.peek() {
            Some(&cut) if cut > segment_start => cut,
            Some(_) => {
                cut_iter.next();
                continue;
            }
            None => section.content.len(),
        };
        if segment_end > segment_start {
            let segment = &section.content[segment_start..segment_end];
            spans.extend(pack_segment(segment, segment_start, &medium_cuts, config));
        }
        if segment_end == section.content.len() {
            break;
        }
        segment_start = segment_end;
        cut_iter.next();
    }

    spans
}

fn relative_offsets(boundaries: &[Boundary], base: usize, strength: BoundaryStrength) -> Vec<usize> {
    let mut offsets: Vec<usize> = boundaries
        .iter()
        .filter(|b| b.strength == strength)
        .map(|b| b.offset.saturating_sub(base))
        .collect();
    offsets.sort_unstable();
    offsets.dedup();
    offsets
}

fn pack_segment(segment: &str, base_offset: usize, medium_cuts: &[usize], config: &ChunkConfig) -> Vec<Span> {
    let sentences = split_sentences(segment);
    let mut spans = Vec::new();
    let mut current_start = 0usize;
    let mut current_end = 0usize;

    for sentence in &sentences {
        let tentative_end = sentence.end;
        let tentative_text = &segment[current_start..tentative_end];
        let tentative_tokens = token_count(tentative_text);

        if tentative_tokens > config.parent_max_tokens && current_end > current_start {
            spans.push(Span {
                text: segment[current_start..current_end].to_string(),
                start: base_offset + current_start,
                end: base_offset + current_end,
            });
            current_start = current_end;
            current_end = sentence.end;
            continue;
        }

        current_end = tentative_end;

        let at_or_past_target = token_count(&segment[current_start..current_end]) >= config.parent_target_tokens;
        let medium_boundary_here = medium_cuts.contains(&current_end);

        if at_or_past_target && medium_boundary_here {
            spans.push(Span {
                text: segment[current_start..current_end].to_string(),
                start: base_offset + current_start,
                end: base_offset + current_end,
            });
            current_start = current_end;
        }
    }

    if current_end > current_start {
        spans.push(Span {
            text: segment[current_start..current_end].to_string(),
            start: base_offset + current_start,
            end: base_offset + current_end,
        });
    }

    if spans.is_empty() && !segment.trim().is_empty() {
        spans.push(Span { text: segment.to_string(), start: base_offset, end: base_offset + segment.len() });
    }

    spans
}

struct ChildSpan {
    text: String,
    token_count: usize,
    overlap_with_previous: Option<(usize, usize)>,
}

/// Sub-chunks a parent's content with a sliding window of sentences,
/// targeting `child_target_tokens` with at least `child_overlap_ratio`
/// token overlap between consecutive children (spec §4.5).
fn form_children(parent_content: &str, config: &ChunkConfig) -> Vec<ChildSpan> {
    if parent_content.trim().is_empty() {
        return Vec::new();
    }

    let sentences = split_sentences(parent_content);
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut windows: Vec<(usize, usize)> = Vec::new(); // (start sentence idx, end sentence idx inclusive)
    let mut i = 0usize;

    while i < sentences.len() {
        let mut j = i;
        loop {
            let text = &parent_content[sentences[i].start..sentences[j].end];
            if token_count(text) >= config.child_target_tokens || j == sentences.len() - 1 {
                break;
            }
            j += 1;
        }
        windows.push((i, j));

        if j == sentences.len() - 1 {
            break;
        }

        // Step back from j for the overlap with the next window.
        let mut k = j;
        let target_overlap = (config.child_overlap_ratio * config.child_target_tokens as f32).ceil() as usize;
        while k > i {
            let text = &parent_content[sentences[k].start..sentences[j].end];
            if token_count(text) >= target_overlap.max(1) {
                break;
            }
            k -= 1;
        }
        i = if k > j { j + 1 } else { (k).max(i + 1).min(j) };
        if i <= windows.last().unwrap().0 {
            i = windows.last().unwrap().1 + 1;
        }
    }

    let mut spans: Vec<ChildSpan> = Vec::new();
    let mut prev_end_char: Option<usize> = None;

    for (idx, &(start_idx, end_idx)) in windows.iter().enumerate() {
        let char_start = sentences[start_idx].start;
        let char_end = sentences[end_idx].end;
        let text = parent_content[char_start..char_end].to_string();
        let tokens = token_count(&text);

        let overlap = if idx == 0 {
            None
        } else {
            prev_end_char.map(|prev_end| (char_start, prev_end.max(char_start)))
        };

        spans.push(ChildSpan { text, token_count: tokens, overlap_with_previous: overlap });
        prev_end_char = Some(char_end);
    }

    // Merge a too-short trailing child back into its predecessor, spanning
    // from the previous window's start through the end of the parent.
    if spans.len() > 1 && spans.last().unwrap().token_count < MIN_LAST_CHILD_TOKENS {
        spans.pop();
        let merged_start_idx = windows[windows.len() - 2].0;
        let merged_end_idx = windows[windows.len() - 1].1;
        let previous = spans.last_mut().unwrap();
        previous.text = parent_content[sentences[merged_start_idx].start..sentences[merged_end_idx].end].to_string();
        previous.token_count = token_count(&previous.text);
    }

    spans
}
