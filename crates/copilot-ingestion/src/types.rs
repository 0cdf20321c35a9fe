//! Core data model for the indexing pipeline (see spec §3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Maximum length of a generated `sectionPath` before truncation.
pub const MAX_SECTION_PATH_LEN: usize = 200;

/// Where the bytes of a loaded file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMethod {
    Buffer,
    Stream,
}

/// Identifies a file to be ingested or deleted. Created by the job
/// producer; read-only downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub file_id: String,
    pub document_id: String,
    pub filename: String,
    pub declared_mime_type: Option<String>,
    pub size: u64,
    pub location: FileLocation,
}

/// Either an in-memory buffer or a path to the bytes, set by the job
/// producer before Load runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileLocation {
    Buffer(Vec<u8>),
    Path(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryType {
    Paragraph,
    Sentence,
    Heading,
    PageBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryStrength {
    Weak,
    Medium,
    Strong,
}

/// A permissible split point in the document's linearized text.
///
/// Invariant: offsets are monotonically non-decreasing within a list;
/// duplicates at the same `(type, offset)` are merged, strongest wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    pub boundary_type: BoundaryType,
    pub offset: usize,
    pub strength: BoundaryStrength,
}

impl Boundary {
    pub fn new(boundary_type: BoundaryType, offset: usize, strength: BoundaryStrength) -> Self {
        Self {
            boundary_type,
            offset,
            strength,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Document,
    Section,
}

/// Per-node statistics carried alongside a `DocumentNode`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub word_count: usize,
    pub char_start: usize,
    pub char_end: usize,
    pub section_path: String,
}

/// A node in the document hierarchy tree. Children-only; no parent
/// pointer is persisted (see spec §9 design notes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: usize,
    pub title: String,
    pub level: usize,
    pub node_type: NodeType,
    pub content: String,
    pub children: Vec<DocumentNode>,
    pub metadata: NodeMetadata,
}

impl DocumentNode {
    pub fn root() -> Self {
        Self {
            id: 0,
            title: String::new(),
            level: 0,
            node_type: NodeType::Document,
            content: String::new(),
            children: Vec::new(),
            metadata: NodeMetadata::default(),
        }
    }
}

/// Flattened leaf view of the document tree, produced for Chunk.
/// Insertion order equals a depth-first pre-order walk of section nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatSection {
    pub id: usize,
    pub title: String,
    pub level: usize,
    pub content: String,
    pub section_path: String,
    pub boundaries: Vec<Boundary>,
    pub metadata: NodeMetadata,
}

/// A coarse retrieval unit. Target 512-1024 tokens; hard ceiling 2048.
/// Immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentChunk {
    pub id: Uuid,
    pub file_id: String,
    pub document_id: String,
    pub content: String,
    pub section_path: String,
    pub token_count: usize,
    pub char_start: usize,
    pub char_end: usize,
    pub ordinal: usize,
}

/// A fine embedding unit. Target 128-256 tokens; default 15% overlap with
/// the previous child in the same parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildChunk {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub content: String,
    pub token_count: usize,
    pub ordinal: usize,
    /// Character range (within the parent's content) shared with the
    /// previous child in the same parent. `None` for the first child.
    pub overlap_with_previous: Option<(usize, usize)>,
}

/// The retrieval-time bridge from a matched child embedding to its parent.
/// Exactly one record per child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkLineage {
    pub child_id: Uuid,
    pub parent_id: Uuid,
    pub document_id: String,
    pub file_id: String,
    pub section_path: String,
}

/// `ParentChunk` extended with algorithmic/LLM-derived enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedParentChunk {
    pub parent: ParentChunk,
    pub keywords: Vec<String>,
    pub entities: Vec<String>,
    pub hypothetical_questions: Vec<String>,
    pub char_count: usize,
    pub reading_time_seconds: u64,
    pub extra: HashMap<String, serde_json::Value>,
}
