//! Section-path generator (spec §4.4, §3).
//!
//! Depth-first pre-order; for each node, `sectionPath = parentPath + " > " + title`
//! (or just `title` at the root's children). Breadcrumb only, no auto-numbering
//! (spec §14, Open Question 3).

use crate::types::{DocumentNode, MAX_SECTION_PATH_LEN};

const SEPARATOR: &str = " > ";

/// Assigns `metadata.section_path` on every node below the root, in place.
pub fn assign(root: &mut DocumentNode) {
    for child in &mut root.children {
        assign_recursive(child, "");
    }
}

fn assign_recursive(node: &mut DocumentNode, parent_path: &str) {
    let full = if parent_path.is_empty() {
        node.title.clone()
    } else {
        format!("{parent_path}{SEPARATOR}{}", node.title)
    };
    node.metadata.section_path = truncate(&full);

    let path_for_children = full.clone();
    for child in &mut node.children {
        assign_recursive(child, &path_for_children);
    }
}

/// Truncates a path to `MAX_SECTION_PATH_LEN` by replacing the middle
/// segments with "...", preserving the first and last segments; if still
/// too long, hard-truncates with a trailing "...".
fn truncate(path: &str) -> String {
    if path.chars().count() <= MAX_SECTION_PATH_LEN {
        return path.to_string();
    }

    let segments: Vec<&str> = path.split(SEPARATOR).collect();
    if segments.len() > 2 {
        let first = segments.first().unwrap();
        let last = segments.last().unwrap();
        let candidate = format!("{first}{SEPARATOR}...{SEPARATOR}{last}");
        if candidate.chars().count() <= MAX_SECTION_PATH_LEN {
            return candidate;
        }
    }

    let keep = MAX_SECTION_PATH_LEN.saturating_sub(3);
    let mut truncated: String = path.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}
