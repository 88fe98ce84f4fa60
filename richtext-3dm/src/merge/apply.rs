//! Applies right-side edits onto a copy of the left annotated tree.
//!
//! Insertions go in as they are met. Removals are collected and carried out
//! at the end, together with every removed node the sweep finds, so that
//! sibling positions stay valid while insertion indices are computed.

use rustc_hash::FxHashSet;

use super::combine::ThreeWayEntry;
use super::edit_log::EditLog;
use crate::config::DiffConfig;
use crate::matching::IdentityMatcher;
use crate::node::{
    ancestors, clone_subtree, content_equal, index_of, DfsTreeIterator, ModificationType, NodeInner,
    NodeRef,
};

/// Merges right-side edits into the left tree.
pub struct MergeApplier<'a> {
    matcher: IdentityMatcher<'a>,
    merged: NodeRef,
    /// Right-side inserted nodes already carried over by an ancestor.
    materialized: FxHashSet<u64>,
    /// Merged-tree nodes created by this applier.
    inserted: FxHashSet<u64>,
    removals: Vec<NodeRef>,
    log: EditLog,
}

impl<'a> MergeApplier<'a> {
    /// Starts from a copy of the left annotated tree; `left_tree` itself is
    /// left untouched.
    pub fn new(left_tree: &NodeRef, config: &'a DiffConfig) -> Self {
        MergeApplier {
            matcher: IdentityMatcher::new(config),
            merged: clone_subtree(left_tree),
            materialized: FxHashSet::default(),
            inserted: FxHashSet::default(),
            removals: Vec::new(),
            log: EditLog::new(),
        }
    }

    /// Applies the right side of `entries` and returns the merged tree with
    /// the log of what was done.
    pub fn apply(mut self, entries: &[ThreeWayEntry]) -> (NodeRef, EditLog) {
        // Shallow entries first, so an inserted subtree is carried over whole
        // before its descendants come up. The sort is stable, which keeps
        // siblings in document order.
        let mut ordered: Vec<(&ThreeWayEntry, usize)> = entries
            .iter()
            .filter_map(|e| e.right.as_ref().map(|r| (e, ancestors(&r.node).len())))
            .collect();
        ordered.sort_by_key(|&(_, depth)| depth);

        for (entry, _) in ordered {
            let Some(right) = entry.right.as_ref() else {
                continue;
            };
            match right.modification {
                ModificationType::Added => {
                    if self.materialized.contains(&right.node.borrow().id()) {
                        continue;
                    }
                    if entry.left_modification() == ModificationType::Added {
                        tracing::trace!(node = %right.node.borrow().content(), "already inserted on the left");
                        self.mark_materialized(&right.node);
                        continue;
                    }
                    self.insert(&right.node);
                }
                ModificationType::Removed => self.defer_removal(&right.node),
                ModificationType::Changed => {
                    tracing::debug!(node = %right.node.borrow().content(), "changed node left unresolved");
                    self.log.unresolved(&right.node);
                }
                ModificationType::None | ModificationType::Conflict => {}
            }
        }

        self.remove_all();
        tracing::debug!(
            edits = self.log.edit_count(),
            skipped = self.log.count_by_type(super::EditType::Skipped),
            "merge applied"
        );
        (self.merged, self.log)
    }

    fn insert(&mut self, node: &NodeRef) {
        let Some(right_parent) = node.borrow().parent().upgrade() else {
            self.skip(node, "inserted node has no parent");
            return;
        };
        let Some(parent) = self.matcher.find_counterpart(&right_parent, &self.merged) else {
            self.skip(node, "no counterpart for the parent of an inserted node");
            return;
        };

        let siblings = right_parent.borrow().children().to_vec();
        let Some(pos) = index_of(node, &siblings) else {
            self.skip(node, "inserted node not found among its siblings");
            return;
        };

        let mut added_between = 0;
        let mut preceding = None;
        for sibling in siblings[..pos].iter().rev() {
            let s = sibling.borrow();
            if s.content().is_separator() {
                continue;
            }
            if s.modification() == ModificationType::Added {
                added_between += 1;
                continue;
            }
            preceding = Some(sibling.clone());
            break;
        }

        let start = match preceding {
            Some(preceding) => {
                let counterpart = self.matcher.find_counterpart(&preceding, &self.merged);
                let children = parent.borrow().children().to_vec();
                match counterpart.and_then(|c| index_of(&c, &children)) {
                    Some(idx) => idx + 1,
                    None => {
                        self.skip(node, "no counterpart for the sibling before an inserted node");
                        return;
                    }
                }
            }
            None => 0,
        };

        if self.preempted(&parent, start, node) {
            tracing::trace!(node = %node.borrow().content(), "same insertion already on the left");
            self.mark_materialized(node);
            return;
        }

        let copy = clone_subtree(node);
        for n in DfsTreeIterator::new(copy.clone()) {
            self.inserted.insert(n.borrow().id());
        }
        self.mark_materialized(node);

        tracing::trace!(node = %node.borrow().content(), index = start + added_between, "inserting");
        NodeInner::add_child_at_to_ref(&parent, start + added_between, copy);
        self.log.insert(node);
    }

    /// Returns true if the left side inserted a node equal to `node` at the
    /// run of inserted siblings starting at `start`.
    fn preempted(&self, parent: &NodeRef, start: usize, node: &NodeRef) -> bool {
        let children = parent.borrow().children().to_vec();
        for child in children.iter().skip(start) {
            let (modification, is_separator, id) = {
                let c = child.borrow();
                (c.modification(), c.content().is_separator(), c.id())
            };
            if is_separator {
                continue;
            }
            if modification != ModificationType::Added {
                break;
            }
            if !self.inserted.contains(&id) && content_equal(child, node) {
                return true;
            }
        }
        false
    }

    fn mark_materialized(&mut self, node: &NodeRef) {
        for n in DfsTreeIterator::new(node.clone()) {
            let n = n.borrow();
            if n.modification() == ModificationType::Added {
                self.materialized.insert(n.id());
            }
        }
    }

    fn defer_removal(&mut self, node: &NodeRef) {
        match self.matcher.find_counterpart(node, &self.merged) {
            Some(counterpart) => self.removals.push(counterpart),
            None => self.skip(node, "no counterpart for a removed node"),
        }
    }

    /// Detaches the deferred removals and every node still marked removed.
    fn remove_all(&mut self) {
        let swept = DfsTreeIterator::new(self.merged.clone())
            .filter(|n| n.borrow().modification() == ModificationType::Removed);
        let mut targets: Vec<NodeRef> = self.removals.drain(..).collect();
        let deferred = targets.len();
        targets.extend(swept);

        let mut done = FxHashSet::default();
        for (i, node) in targets.iter().enumerate() {
            if !done.insert(node.borrow().id()) {
                continue;
            }
            if i < deferred {
                self.log.delete(node);
            }
            NodeInner::detach_ref(node);
        }
    }

    fn skip(&mut self, node: &NodeRef, reason: &str) {
        tracing::warn!(node = %node.borrow().content(), "{}, edit skipped", reason);
        self.log.skipped(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::annotate;
    use crate::html::{parse_str, print_to_string};
    use crate::merge::combine::combine;
    use crate::merge::EditType;

    fn merge(origin: &str, left: &str, right: &str) -> (String, EditLog) {
        let config = DiffConfig::default();
        let o = parse_str(origin).unwrap();
        let l = annotate(&o, &parse_str(left).unwrap(), &config.align);
        let r = annotate(&o, &parse_str(right).unwrap(), &config.align);
        let combined = combine(&l.entries, &r.entries, &IdentityMatcher::new(&config));
        let (merged, log) = MergeApplier::new(&l.tree, &config).apply(&combined);
        (print_to_string(&merged), log)
    }

    #[test]
    fn test_right_insertion() {
        let (merged, log) = merge(
            "<p>A</p><p>B</p>",
            "<p>A</p><p>B</p>",
            "<p>A</p><p>X</p><p>B</p>",
        );
        assert_eq!(merged, "<p>A</p><p>X</p><p>B</p>");
        assert_eq!(log.count_by_type(EditType::Insert), 1);
    }

    #[test]
    fn test_insertion_at_start() {
        let (merged, _) = merge("<p>A</p>", "<p>A</p>", "<p>X</p><p>Y</p><p>A</p>");
        assert_eq!(merged, "<p>X</p><p>Y</p><p>A</p>");
    }

    #[test]
    fn test_right_removal() {
        let (merged, log) = merge("<p>A</p><p>B</p>", "<p>A</p><p>B</p>", "<p>A</p>");
        assert_eq!(merged, "<p>A</p>");
        assert!(log.count_by_type(EditType::Delete) >= 1);
    }

    #[test]
    fn test_left_removal_is_kept() {
        let (merged, log) = merge("<p>A</p><p>B</p>", "<p>B</p>", "<p>A</p><p>B</p>");
        assert_eq!(merged, "<p>B</p>");
        assert_eq!(log.edit_count(), 0);
    }

    #[test]
    fn test_words_merged_into_both_paragraphs() {
        let (merged, _) = merge(
            "<p>One</p><p>Two</p>",
            "<p>One more</p><p>Two</p>",
            "<p>One</p><p>Two more</p>",
        );
        assert_eq!(merged, "<p>One more</p><p>Two more</p>");
    }

    #[test]
    fn test_identical_insertion_not_duplicated() {
        let (merged, _) = merge(
            "<p>A</p><p>B</p>",
            "<p>A</p><p>X</p><p>B</p>",
            "<p>A</p><p>X</p><p>B</p>",
        );
        assert_eq!(merged, "<p>A</p><p>X</p><p>B</p>");
    }

    #[test]
    fn test_same_word_inserted_on_both_sides() {
        let (merged, _) = merge("<p>A B</p>", "<p>A X B</p>", "<p>A X B</p>");
        assert_eq!(merged, "<p>A X B</p>");
    }
}
