//! Hierarchy tree builder and validator (spec §4.4).
//!
//! DocumentNodes point to children only; no parent pointer is persisted.
//! Validation and orphan re-parenting use an index-addressed arena instead
//! of recursive parent backlinks, which also makes in-place level rewrites
//! trivial (spec §9 design notes).

use crate::types::{DocumentNode, NodeMetadata, NodeType};
use tracing::warn;

/// One detected heading, in document order.
#[derive(Debug, Clone)]
pub struct Heading {
    pub offset: usize,
    pub level: usize,
    pub title: String,
}

/// Builds a tree under a synthetic root (level 0). Each heading attaches
/// as the deepest existing ancestor's child whose level is strictly less
/// than the heading's; text between headings becomes the preceding
/// section's content.
pub fn build(full_text: &str, headings: &[Heading]) -> DocumentNode {
    let mut root = DocumentNode::root();
    let mut next_id = 1usize;

    if headings.is_empty() {
        if !full_text.trim().is_empty() {
            root.children.push(DocumentNode {
                id: next_id,
                title: String::new(),
                level: 1,
                node_type: NodeType::Section,
                content: full_text.to_string(),
                children: Vec::new(),
                metadata: NodeMetadata {
                    word_count: 0,
                    char_start: 0,
                    char_end: full_text.len(),
                    section_path: String::new(),
                },
            });
        }
        return root;
    }

    // path[i] holds the index path (into nested `children` vecs) of the
    // deepest node at or above level i currently open.
    let mut path: Vec<usize> = Vec::new();

    for (i, heading) in headings.iter().enumerate() {
        let content_end = headings.get(i + 1).map(|h| h.offset).unwrap_or(full_text.len());
        let content_start = heading.offset;
        let content = full_text
            .get(content_start..content_end)
            .unwrap_or_default()
            .to_string();

        let node = DocumentNode {
            id: next_id,
            title: heading.title.clone(),
            level: heading.level,
            node_type: NodeType::Section,
            content,
            children: Vec::new(),
            metadata: NodeMetadata {
                word_count: 0,
                char_start: content_start,
                char_end: content_end,
                section_path: String::new(),
            },
        };
        next_id += 1;

        while path.len() >= heading.level {
            path.pop();
        }

        let parent = node_at_path(&mut root, &path);
        parent.children.push(node);
        path.push(parent.children.len() - 1);
    }

    root
}

fn node_at_path<'a>(root: &'a mut DocumentNode, path: &[usize]) -> &'a mut DocumentNode {
    let mut node = root;
    for &idx in path {
        node = &mut node.children[idx];
    }
    node
}

/// Depth-first traversal enforcing `child.level <= parent.level + 1`.
/// Violations are auto-corrected by clamping to `parent.level + 1`;
/// each correction is recorded as a warning (never fatal).
pub fn validate_and_correct(root: &mut DocumentNode) -> Vec<String> {
    let mut warnings = Vec::new();
    correct_children(root, root.level, &mut warnings);
    warnings
}

fn correct_children(node: &mut DocumentNode, parent_level: usize, warnings: &mut Vec<String>) {
    for child in &mut node.children {
        if child.level > parent_level + 1 {
            warnings.push(format!(
                "node '{}' had level {} under parent level {}; corrected to {}",
                child.title,
                child.level,
                parent_level,
                parent_level + 1
            ));
            warn!(title = %child.title, from = child.level, to = parent_level + 1, "corrected invalid hierarchy level");
            child.level = parent_level + 1;
        }
        correct_children(child, child.level, warnings);
    }
}

/// `true` if the tree already satisfies the hierarchy invariant, with no
/// mutation (spec §4.4 "isValid" check for test harnesses).
pub fn is_valid(root: &DocumentNode) -> bool {
    fn check(node: &DocumentNode, parent_level: usize) -> bool {
        node.children.iter().all(|child| {
            child.level <= parent_level + 1 && check(child, child.level)
        })
    }
    check(root, root.level)
}

/// Scans for nodes whose level is `<= parent.level` (illegal even after
/// clamping-based correction, since clamping only lowers excessive jumps)
/// and re-parents them to the nearest valid ancestor (spec §4.4, §14: the
/// orphan policy is "attach to nearest valid ancestor").
pub fn reparent_orphans(root: &mut DocumentNode) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut children = std::mem::take(&mut root.children);
    let mut i = 0;
    while i < children.len() {
        if children[i].level <= root.level {
            let orphan = children.remove(i);
            warnings.push(format!(
                "orphan node '{}' at level {} re-parented to nearest valid ancestor",
                orphan.title, orphan.level
            ));
            reattach(root, orphan);
        } else {
            i += 1;
        }
    }
    root.children = children;

    for child in &mut root.children {
        warnings.extend(reparent_orphans(child));
    }
    warnings
}

fn reattach(ancestor: &mut DocumentNode, mut orphan: DocumentNode) {
    orphan.level = ancestor.level + 1;
    ancestor.children.push(orphan);
}
