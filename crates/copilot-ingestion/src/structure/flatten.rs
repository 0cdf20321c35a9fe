//! Tree flattener (spec §4.4).
//!
//! Depth-first pre-order emits one `FlatSection` per node of type
//! `section` (root excluded).

use crate::types::{Boundary, DocumentNode, FlatSection};

/// Aggregate statistics reported alongside the flattened sections.
#[derive(Debug, Clone, Default)]
pub struct FlattenStats {
    pub total_sections: usize,
    pub average_word_count: f64,
    pub largest_section_id: Option<usize>,
}

/// Detection method that produced the tree being flattened (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    NativeHeadings,
    Heuristic,
    None,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::NativeHeadings => "native-headings",
            DetectionMethod::Heuristic => "heuristic",
            DetectionMethod::None => "none",
        }
    }
}

pub struct FlattenOutput {
    pub sections: Vec<FlatSection>,
    pub stats: FlattenStats,
    pub has_structure: bool,
}

/// Flattens the tree, attaching the boundaries whose offsets fall inside
/// each section's character range.
pub fn flatten(root: &DocumentNode, boundaries: &[Boundary]) -> FlattenOutput {
    let mut sections = Vec::new();
    walk(root, "", boundaries, &mut sections);

    let total_sections = sections.len();
    let average_word_count = if total_sections == 0 {
        0.0
    } else {
        sections.iter().map(|s| s.metadata.word_count).sum::<usize>() as f64 / total_sections as f64
    };
    let largest_section_id = sections
        .iter()
        .max_by_key(|s| s.metadata.word_count)
        .map(|s| s.id);

    FlattenOutput {
        has_structure: total_sections > 0,
        sections,
        stats: FlattenStats {
            total_sections,
            average_word_count,
            largest_section_id,
        },
    }
}

fn walk(node: &DocumentNode, _parent_path: &str, boundaries: &[Boundary], out: &mut Vec<FlatSection>) {
    use crate::types::NodeType;

    if node.node_type == NodeType::Section {
        let in_range: Vec<Boundary> = boundaries
            .iter()
            .filter(|b| b.offset >= node.metadata.char_start && b.offset < node.metadata.char_end)
            .copied()
            .collect();

        out.push(FlatSection {
            id: node.id,
            title: node.title.clone(),
            level: node.level,
            content: node.content.clone(),
            section_path: node.metadata.section_path.clone(),
            boundaries: in_range,
            metadata: node.metadata.clone(),
        });
    }

    for child in &node.children {
        walk(child, &node.metadata.section_path, boundaries, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeMetadata, NodeType};

    fn section(id: usize, title: &str, word_count: usize) -> DocumentNode {
        DocumentNode {
            id,
            title: title.to_string(),
            level: 1,
            node_type: NodeType::Section,
            content: "x".repeat(word_count),
            children: Vec::new(),
            metadata: NodeMetadata {
                word_count,
                char_start: 0,
                char_end: 10,
                section_path: title.to_string(),
            },
        }
    }

    #[test]
    fn flattens_preorder_and_reports_stats() {
        let mut root = DocumentNode::root();
        root.children.push(section(1, "A", 10));
        root.children.push(section(2, "B", 30));

        let output = flatten(&root, &[]);
        assert_eq!(output.sections.len(), 2);
        assert!(output.has_structure);
        assert_eq!(output.stats.total_sections, 2);
        assert_eq!(output.stats.largest_section_id, Some(2));
        assert_eq!(output.stats.average_word_count, 20.0);
    }

    #[test]
    fn empty_tree_has_no_structure() {
        let root = DocumentNode::root();
        let output = flatten(&root, &[]);
        assert!(!output.has_structure);
        assert_eq!(output.stats.total_sections, 0);
    }
}
