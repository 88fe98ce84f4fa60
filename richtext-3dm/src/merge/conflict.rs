//! Conflict detection between the left and right descendants.

use rustc_hash::FxHashSet;

use super::combine::ThreeWayEntry;
use super::conflict_log::{ConflictLog, ConflictType};
use super::table::tables_of;
use crate::annotate::DiffEntry;
use crate::config::DiffConfig;
use crate::matching::IdentityMatcher;
use crate::node::{ancestors, content_equal, ModificationType, NodeContent, NodeRef};

/// Runs every conflict check over a pair of annotations.
pub struct ConflictDetector<'a> {
    config: &'a DiffConfig,
    matcher: IdentityMatcher<'a>,
}

impl<'a> ConflictDetector<'a> {
    pub fn new(config: &'a DiffConfig) -> Self {
        ConflictDetector {
            config,
            matcher: IdentityMatcher::new(config),
        }
    }

    /// Records every conflict in `log` and returns true if there was any.
    pub fn detect(
        &self,
        combined: &[ThreeWayEntry],
        left: &[DiffEntry],
        right: &[DiffEntry],
        log: &mut ConflictLog,
    ) -> bool {
        self.direct_conflicts(combined, log);
        self.container_conflicts(left, right, log);
        self.insertion_conflicts(left, right, log);
        self.table_conflicts(left, right, log);

        tracing::debug!(conflicts = log.conflict_count(), "conflict detection finished");
        log.has_conflicts()
    }

    fn direct_conflicts(&self, combined: &[ThreeWayEntry], log: &mut ConflictLog) {
        for entry in combined.iter().filter(|e| e.is_conflicting()) {
            let left = entry.left.as_ref().map(|e| e.node.clone());
            let right = entry.right.as_ref().map(|e| e.node.clone());
            let text = format!(
                "{} on the left, {} on the right",
                entry.left_modification(),
                entry.right_modification()
            );
            log.add(ConflictType::Text, &text, left, right);
        }
    }

    /// Both sides edited text inside the same structural container and the
    /// container subtrees differ.
    fn container_conflicts(&self, left: &[DiffEntry], right: &[DiffEntry], log: &mut ConflictLog) {
        let left_containers = self.distinct_containers(left);
        let right_containers = self.distinct_containers(right);

        for lc in &left_containers {
            for rc in &right_containers {
                if !self.matcher.is_same_node(lc, rc) {
                    continue;
                }
                if content_equal(lc, rc) {
                    tracing::trace!(container = %lc.borrow().content(), "identical edits, pseudo-conflict");
                    continue;
                }
                let text = format!("{} edited differently on both sides", lc.borrow().content());
                log.add(ConflictType::Container, &text, Some(lc.clone()), Some(rc.clone()));
            }
        }
    }

    /// Both sides inserted at the same position under the same parent.
    fn insertion_conflicts(&self, left: &[DiffEntry], right: &[DiffEntry], log: &mut ConflictLog) {
        let left_inserts: Vec<&NodeRef> = insertion_roots(left).collect();
        let right_inserts: Vec<&NodeRef> = insertion_roots(right).collect();

        for l in &left_inserts {
            let Some(lp) = l.borrow().parent().upgrade() else {
                continue;
            };
            let l_pos = preceding_originals(l);
            for r in &right_inserts {
                let Some(rp) = r.borrow().parent().upgrade() else {
                    continue;
                };
                if l_pos != preceding_originals(r) || !self.matcher.is_same_node(&lp, &rp) {
                    continue;
                }
                if content_equal(l, r) {
                    tracing::trace!(node = %l.borrow().content(), "identical insertions, pseudo-conflict");
                    continue;
                }
                let text = format!("different insertions after {} original siblings", l_pos);
                log.add(ConflictType::Insertion, &text, Some((*l).clone()), Some((*r).clone()));
            }
        }
    }

    /// A column edit on one side crosses a row edit of the same table.
    fn table_conflicts(&self, left: &[DiffEntry], right: &[DiffEntry], log: &mut ConflictLog) {
        let left_tables = tables_of(left);
        let right_tables = tables_of(right);

        for lt in &left_tables {
            for rt in right_tables.iter().filter(|rt| lt.crosses(rt)) {
                if self.matcher.is_same_node(&lt.table, &rt.table) {
                    log.add(
                        ConflictType::Table,
                        "row and column edits to the same table",
                        Some(lt.table.clone()),
                        Some(rt.table.clone()),
                    );
                }
            }
        }
    }

    /// Collects the distinct non-body structural containers of the leaf
    /// entries. Tag entries are covered by the insertion check.
    fn distinct_containers(&self, entries: &[DiffEntry]) -> Vec<NodeRef> {
        let mut seen = FxHashSet::default();
        entries
            .iter()
            .filter(|e| e.node.borrow().content().is_leaf())
            .filter_map(|e| self.structural_container(&e.node))
            .filter(|c| seen.insert(c.borrow().id()))
            .collect()
    }

    /// Returns the nearest structural container above `node`, or `None`
    /// when that is the body.
    pub fn structural_container(&self, node: &NodeRef) -> Option<NodeRef> {
        for ancestor in ancestors(node) {
            let is_container = match ancestor.borrow().content() {
                NodeContent::Body => return None,
                NodeContent::Tag(t) => self.config.is_structure_tag(t.qname()),
                _ => false,
            };
            if is_container {
                return Some(ancestor);
            }
        }
        None
    }
}

/// Inserted nodes whose parent is not itself inserted.
fn insertion_roots(entries: &[DiffEntry]) -> impl Iterator<Item = &NodeRef> {
    entries
        .iter()
        .filter(|e| e.modification == ModificationType::Added)
        .map(|e| &e.node)
        .filter(|n| {
            n.borrow()
                .parent()
                .upgrade()
                .is_some_and(|p| p.borrow().modification() != ModificationType::Added)
        })
}

/// Counts the siblings before `node` that are neither inserted nor separators.
fn preceding_originals(node: &NodeRef) -> usize {
    let Some(parent) = node.borrow().parent().upgrade() else {
        return 0;
    };
    let pos = node.borrow().child_pos().max(0) as usize;
    let siblings = parent.borrow().children().to_vec();
    siblings[..pos.min(siblings.len())]
        .iter()
        .filter(|s| {
            let s = s.borrow();
            s.modification() != ModificationType::Added && !s.content().is_separator()
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::annotate;
    use crate::html::parse_str;
    use crate::merge::combine::combine;
    use crate::node::DfsTreeIterator;

    fn detect(origin: &str, left: &str, right: &str) -> ConflictLog {
        let config = DiffConfig::default();
        let o = parse_str(origin).unwrap();
        let l = annotate(&o, &parse_str(left).unwrap(), &config.align);
        let r = annotate(&o, &parse_str(right).unwrap(), &config.align);
        let detector = ConflictDetector::new(&config);
        let combined = combine(&l.entries, &r.entries, &IdentityMatcher::new(&config));
        let mut log = ConflictLog::new();
        detector.detect(&combined, &l.entries, &r.entries, &mut log);
        log
    }

    #[test]
    fn test_structural_container() {
        let config = DiffConfig::default();
        let detector = ConflictDetector::new(&config);
        let body = parse_str("<div><p>A <b>B</b></p><span>C</span></div>").unwrap();
        let find = |text: &str| {
            DfsTreeIterator::new(body.clone())
                .find(|n| n.borrow().content().leaf_text() == Some(text))
                .unwrap()
        };
        let container = detector.structural_container(&find("B")).unwrap();
        assert_eq!(container.borrow().qname(), Some("p"));
        assert!(detector.structural_container(&find("C")).is_none());
    }

    #[test]
    fn test_disjoint_edits() {
        let log = detect(
            "<p>One</p><p>Two</p>",
            "<p>One more</p><p>Two</p>",
            "<p>One</p><p>Two more</p>",
        );
        assert!(!log.has_conflicts());
    }

    #[test]
    fn test_same_paragraph_edited_differently() {
        let log = detect("<p>A</p>", "<p>B</p>", "<p>C</p>");
        assert!(log.has_conflicts());
        assert!(log.count_by_type(ConflictType::Container) >= 1);
    }

    #[test]
    fn test_same_edit_is_pseudo_conflict() {
        let log = detect("<p>One two</p>", "<p>One three</p>", "<p>One three</p>");
        assert!(!log.has_conflicts());
    }

    #[test]
    fn test_different_insertions_at_same_position() {
        let log = detect(
            "<p>A</p><p>B</p>",
            "<p>A</p><p>X</p><p>B</p>",
            "<p>A</p><p>Y</p><p>B</p>",
        );
        assert!(log.count_by_type(ConflictType::Insertion) >= 1);
    }

    #[test]
    fn test_identical_insertions() {
        let log = detect(
            "<p>A</p><p>B</p>",
            "<p>A</p><p>X</p><p>B</p>",
            "<p>A</p><p>X</p><p>B</p>",
        );
        assert!(!log.has_conflicts());
    }

    #[test]
    fn test_insertions_at_different_positions() {
        let log = detect(
            "<p>A</p><p>B</p>",
            "<p>X</p><p>A</p><p>B</p>",
            "<p>A</p><p>B</p><p>Y</p>",
        );
        assert!(!log.has_conflicts());
    }

    #[test]
    fn test_insertions_in_same_cell_at_different_positions() {
        let log = detect(
            "<table><tr><td><p>One two</p><p>Three four</p></td></tr></table>",
            "<table><tr><td><p>X</p><p>One two</p><p>Three four</p></td></tr></table>",
            "<table><tr><td><p>One two</p><p>Three four</p><p>Y</p></td></tr></table>",
        );
        assert_eq!(log.count_by_type(ConflictType::Container), 0);
        assert!(!log.has_conflicts());
    }

    #[test]
    fn test_text_added_in_paragraph_deleted_on_other_side() {
        let log = detect("<p>A</p><p>B</p>", "<p>A</p>", "<p>A</p><p>B more</p>");
        assert!(log.count_by_type(ConflictType::Container) >= 1);
    }
}
