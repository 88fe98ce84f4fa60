//! Two-way annotation of a descendant tree against its origin.
//!
//! Annotation runs in three steps:
//!
//! 1. The leaf flows of both trees are aligned, giving every descendant leaf
//!    a modification (`align::align_leaves`).
//! 2. The descendant is copied into an annotated tree into which unmatched
//!    origin content is woven back as removed material (`weave`).
//! 3. A parallel walk over the origin, annotated and raw descendant levels
//!    classifies every tag from the modifications of its children (`walk`).
//!
//! The result is the annotated tree plus the list of its non-`None` nodes.

mod walk;
mod weave;

pub use weave::Presence;

use crate::align::{align_leaves, flow_of, AlignConfig};
use crate::node::{ModificationType, NodeRef};

use walk::LevelWalker;

/// A modified node of an annotated tree.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub node: NodeRef,
    pub modification: ModificationType,
}

impl DiffEntry {
    pub fn new(node: NodeRef, modification: ModificationType) -> Self {
        DiffEntry { node, modification }
    }
}

/// A descendant tree annotated against its origin.
#[derive(Debug, Clone)]
pub struct Annotation {
    /// The annotated tree: the descendant with removed origin content woven in.
    pub tree: NodeRef,
    /// Every node of `tree` whose modification is not `None`, in post-order.
    pub entries: Vec<DiffEntry>,
}

impl Annotation {
    /// Returns the number of entries with the given modification.
    pub fn count(&self, modification: ModificationType) -> usize {
        self.entries
            .iter()
            .filter(|e| e.modification == modification)
            .count()
    }
}

/// Annotates `descendant` against `origin`.
///
/// Neither input tree is modified.
pub fn annotate(origin: &NodeRef, descendant: &NodeRef, config: &AlignConfig) -> Annotation {
    let origin_flow = flow_of(origin);
    let descendant_flow = flow_of(descendant);
    let alignment = align_leaves(&origin_flow, &descendant_flow, config);

    let woven = weave::Weaver::new(&origin_flow, &descendant_flow, &alignment, config)
        .weave(origin, descendant);
    LevelWalker::new(&woven, config).run(&woven.tree, origin, descendant);

    let mut entries = Vec::new();
    collect_entries(&woven.tree, &mut entries);

    tracing::debug!(
        entries = entries.len(),
        added = entries
            .iter()
            .filter(|e| e.modification == ModificationType::Added)
            .count(),
        removed = entries
            .iter()
            .filter(|e| e.modification == ModificationType::Removed)
            .count(),
        "annotated descendant"
    );

    Annotation {
        tree: woven.tree,
        entries,
    }
}

/// Post-order scan for modified tags and leaves.
fn collect_entries(node: &NodeRef, entries: &mut Vec<DiffEntry>) {
    let children = node.borrow().children().to_vec();
    for child in &children {
        collect_entries(child, entries);
    }
    let n = node.borrow();
    let relevant = n.content().is_tag() || n.content().is_leaf();
    if relevant && n.modification().is_modified() {
        entries.push(DiffEntry::new(node.clone(), n.modification()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::{parse_str, print_to_string};

    fn run(origin: &str, descendant: &str) -> Annotation {
        let o = parse_str(origin).unwrap();
        let d = parse_str(descendant).unwrap();
        annotate(&o, &d, &AlignConfig::default())
    }

    fn describe(annotation: &Annotation) -> Vec<String> {
        annotation
            .entries
            .iter()
            .map(|e| format!("{} {}", e.node.borrow().content(), e.modification))
            .collect()
    }

    #[test]
    fn test_no_changes() {
        let a = run("<p>Some <b>text</b></p>", "<p>Some <b>text</b></p>");
        assert!(a.entries.is_empty());
    }

    #[test]
    fn test_inputs_untouched() {
        let o = parse_str("<p>A</p><p>B</p>").unwrap();
        let d = parse_str("<p>B</p>").unwrap();
        let a = annotate(&o, &d, &AlignConfig::default());
        assert_eq!(print_to_string(&a.tree), "<p>A</p><p>B</p>");
        assert_eq!(print_to_string(&o), "<p>A</p><p>B</p>");
        assert_eq!(print_to_string(&d), "<p>B</p>");
    }

    #[test]
    fn test_emptied_paragraph_keeps_tag() {
        let a = run("<p>Text</p>", "<p></p>");
        assert_eq!(describe(&a), vec!["\"Text\" removed"]);
    }

    #[test]
    fn test_filled_paragraph_keeps_tag() {
        let a = run("<p></p>", "<p>Text</p>");
        assert_eq!(describe(&a), vec!["\"Text\" added"]);
    }

    #[test]
    fn test_renamed_block() {
        let a = run("<div>Text</div>", "<p>Text</p>");
        assert_eq!(describe(&a), vec!["\"Text\" changed", "<p> changed"]);
    }

    #[test]
    fn test_attribute_change_on_empty_tag() {
        let a = run(r#"<p><img src="a.png"/></p>"#, r#"<p><img src="b.png"/></p>"#);
        assert_eq!(describe(&a), vec!["<img src=\"b.png\"> changed"]);
    }

    #[test]
    fn test_count() {
        let a = run("<p>A</p>", "<p>A</p><p>B C</p>");
        assert_eq!(a.count(ModificationType::Added), 4);
        assert_eq!(a.count(ModificationType::Removed), 0);
    }
}
