//! Identity of nodes across annotated trees.
//!
//! Two annotated trees derived from the same origin share no node handles,
//! so the combiner and the merge applier need a way to decide that a node of
//! one tree "is" a node of the other. Tags are compared by name and by how
//! much of their text survived; leaves by their text and their position under
//! an identical parent.

use crate::align::text_match_ratio;
use crate::config::DiffConfig;
use crate::node::{children_excluding_insertions, index_of, DfsTreeIterator, NodeContent, NodeRef};

/// Decides node identity across two annotated trees.
#[derive(Debug, Clone, Copy)]
pub struct IdentityMatcher<'a> {
    config: &'a DiffConfig,
}

impl<'a> IdentityMatcher<'a> {
    pub fn new(config: &'a DiffConfig) -> Self {
        IdentityMatcher { config }
    }

    /// Returns true if `a` and `b` denote the same logical node.
    ///
    /// The relation is symmetric. Separators never match anything but
    /// themselves.
    pub fn is_same_node(&self, a: &NodeRef, b: &NodeRef) -> bool {
        if std::rc::Rc::ptr_eq(a, b) {
            return true;
        }

        let (a_content, b_content) = (a.borrow().content().clone(), b.borrow().content().clone());
        match (&a_content, &b_content) {
            (NodeContent::Body, NodeContent::Body) => true,
            (NodeContent::Tag(ta), NodeContent::Tag(tb)) => {
                if ta.qname() != tb.qname() {
                    return false;
                }
                match text_match_ratio(a, b, &self.config.align) {
                    Some(ratio) if ratio > self.config.max_match_ratio => false,
                    Some(ratio) if ratio == 0.0 => true,
                    _ => self.same_position(a, b),
                }
            }
            (NodeContent::Text(_), NodeContent::Text(_))
            | (NodeContent::Whitespace(_), NodeContent::Whitespace(_)) => {
                if !a_content.same_label(&b_content) {
                    return false;
                }
                let (Some(pa), Some(pb)) = (parent_of(a), parent_of(b)) else {
                    return false;
                };
                if !self.is_same_node(&pa, &pb) {
                    return false;
                }
                let ia = index_of(a, &children_excluding_insertions(&pa));
                let ib = index_of(b, &children_excluding_insertions(&pb));
                ia.is_some() && ia == ib
            }
            _ => false,
        }
    }

    /// Finds the first node of `root`, in pre-order, that is the same node as
    /// `node`.
    pub fn find_counterpart(&self, node: &NodeRef, root: &NodeRef) -> Option<NodeRef> {
        DfsTreeIterator::new(root.clone()).find(|candidate| self.is_same_node(node, candidate))
    }

    /// Positional identity: equal index among non-inserted siblings, and
    /// sibling lists of equal length whose members pairwise share a label.
    fn same_position(&self, a: &NodeRef, b: &NodeRef) -> bool {
        let (Some(pa), Some(pb)) = (parent_of(a), parent_of(b)) else {
            return false;
        };
        let siblings_a = children_excluding_insertions(&pa);
        let siblings_b = children_excluding_insertions(&pb);
        let (Some(ia), Some(ib)) = (index_of(a, &siblings_a), index_of(b, &siblings_b)) else {
            return false;
        };
        ia == ib
            && siblings_a.len() == siblings_b.len()
            && siblings_a
                .iter()
                .zip(&siblings_b)
                .all(|(x, y)| x.borrow().content().same_label(y.borrow().content()))
    }
}

fn parent_of(node: &NodeRef) -> Option<NodeRef> {
    node.borrow().parent().upgrade()
}

/// Returns true if `a` and `b` denote the same logical node.
pub fn is_same_node(a: &NodeRef, b: &NodeRef, config: &DiffConfig) -> bool {
    IdentityMatcher::new(config).is_same_node(a, b)
}

/// Finds the counterpart of `node` in the tree rooted at `root`.
pub fn find_counterpart(node: &NodeRef, root: &NodeRef, config: &DiffConfig) -> Option<NodeRef> {
    IdentityMatcher::new(config).find_counterpart(node, root)
}
