//! Whole-tree operations: cloning, traversal and positional queries.

use std::rc::Rc;

use super::{new_node, ModificationType, NodeInner, NodeRef};

/// Deep-copies a subtree.
///
/// The copy gets fresh node IDs and correctly rebound parent links.
/// Content (including whitespace flags) and modifications are preserved.
pub fn clone_subtree(node: &NodeRef) -> NodeRef {
    let (copy, children) = {
        let borrowed = node.borrow();
        let copy = new_node(borrowed.content().clone());
        copy.borrow_mut().modification = borrowed.modification();
        (copy, borrowed.children().to_vec())
    };
    for child in &children {
        NodeInner::add_child_to_ref(&copy, clone_subtree(child));
    }
    copy
}

/// Returns the children of a body or tag node without inserted nodes.
///
/// Children whose modification is `Added` are filtered out, as are
/// separators. A node that is itself `Added` yields an empty list: once a
/// subtree is wholly inserted, none of its descendants take part in
/// positional matching. The result is memoized per node and invalidated
/// whenever the child list or a child's modification changes.
pub fn children_excluding_insertions(node: &NodeRef) -> Vec<NodeRef> {
    if let Some(memo) = node.borrow().excluded_memo() {
        return memo.clone();
    }
    let list: Vec<NodeRef> = {
        let borrowed = node.borrow();
        if borrowed.modification() == ModificationType::Added {
            Vec::new()
        } else {
            borrowed
                .children()
                .iter()
                .filter(|child| {
                    let c = child.borrow();
                    c.modification() != ModificationType::Added && !c.content().is_separator()
                })
                .cloned()
                .collect()
        }
    };
    node.borrow_mut().set_excluded_memo(list.clone());
    list
}

/// Returns the position of `node` in `among`, compared by identity.
pub fn index_of(node: &NodeRef, among: &[NodeRef]) -> Option<usize> {
    among.iter().position(|candidate| Rc::ptr_eq(candidate, node))
}

/// Collects the text and whitespace leaves below `node` in document order.
pub fn leaves(node: &NodeRef) -> Vec<NodeRef> {
    DfsTreeIterator::new(node.clone())
        .filter(|n| n.borrow().content().is_leaf())
        .collect()
}

/// Returns the ancestors of `node`, nearest first, up to and including the root.
pub fn ancestors(node: &NodeRef) -> Vec<NodeRef> {
    let mut result = Vec::new();
    let mut current = node.borrow().parent().upgrade();
    while let Some(parent) = current {
        current = parent.borrow().parent().upgrade();
        result.push(parent);
    }
    result
}

/// Recursively compares two subtrees by kind, tag name or text, and
/// modification. Child order matters; separators are ignored.
pub fn content_equal(a: &NodeRef, b: &NodeRef) -> bool {
    if Rc::ptr_eq(a, b) {
        return true;
    }
    let a_node = a.borrow();
    let b_node = b.borrow();
    if !a_node.content().same_label(b_node.content())
        || a_node.modification() != b_node.modification()
    {
        return false;
    }
    let a_children: Vec<&NodeRef> = a_node
        .children()
        .iter()
        .filter(|c| !c.borrow().content().is_separator())
        .collect();
    let b_children: Vec<&NodeRef> = b_node
        .children()
        .iter()
        .filter(|c| !c.borrow().content().is_separator())
        .collect();
    a_children.len() == b_children.len()
        && a_children
            .iter()
            .zip(b_children.iter())
            .all(|(x, y)| content_equal(x, y))
}

/// Depth-first pre-order iterator over a tree.
pub struct DfsTreeIterator {
    /// Stack of (node, next_child_index) pairs for iterating.
    stack: Vec<(NodeRef, usize)>,
}

impl DfsTreeIterator {
    /// Creates a new DFS iterator starting at the given root.
    pub fn new(root: NodeRef) -> Self {
        DfsTreeIterator {
            stack: vec![(root, 0)],
        }
    }
}

impl Iterator for DfsTreeIterator {
    type Item = NodeRef;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, child_idx)) = self.stack.pop() {
            let next_child = node.borrow().child(child_idx).cloned();
            if let Some(child) = next_child {
                self.stack.push((node.clone(), child_idx + 1));
                self.stack.push((child, 0));
            }
            if child_idx == 0 {
                return Some(node);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeContent;
    use std::collections::BTreeMap;

    fn tag(name: &str) -> NodeRef {
        new_node(NodeContent::tag(name, BTreeMap::new()))
    }

    fn word(text: &str) -> NodeRef {
        new_node(NodeContent::text(text, false))
    }

    /// body > [p > ["a", " ", "b"], p > ["c"]]
    fn sample() -> NodeRef {
        let body = new_node(NodeContent::Body);
        let p1 = tag("p");
        NodeInner::add_child_to_ref(&p1, word("a"));
        NodeInner::add_child_to_ref(&p1, new_node(NodeContent::whitespace(" ")));
        NodeInner::add_child_to_ref(&p1, word("b"));
        NodeInner::add_child_to_ref(&p1, new_node(NodeContent::Separator));
        let p2 = tag("p");
        NodeInner::add_child_to_ref(&p2, word("c"));
        NodeInner::add_child_to_ref(&body, p1);
        NodeInner::add_child_to_ref(&body, p2);
        body
    }

    #[test]
    fn test_dfs_order() {
        let body = sample();
        let labels: Vec<String> = DfsTreeIterator::new(body.clone())
            .map(|n| n.borrow().content().to_string())
            .collect();
        assert_eq!(
            labels,
            vec!["body", "<p>", "\"a\"", "' '", "\"b\"", "|", "<p>", "\"c\""]
        );
    }

    #[test]
    fn test_clone_subtree_rebinds_parents() {
        let body = sample();
        let p1 = body.borrow().child(0).cloned().unwrap();
        NodeInner::set_modification_of_ref(&p1, ModificationType::Changed);

        let copy = clone_subtree(&body);
        assert_ne!(copy.borrow().id(), body.borrow().id());
        assert!(content_equal(&copy, &body));

        let copied_p1 = copy.borrow().child(0).cloned().unwrap();
        assert_eq!(copied_p1.borrow().modification(), ModificationType::Changed);
        let first = copied_p1.borrow().child(0).cloned().unwrap();
        let parent = first.borrow().parent().upgrade().unwrap();
        assert!(Rc::ptr_eq(&parent, &copied_p1));
    }

    #[test]
    fn test_leaves_and_ancestors() {
        let body = sample();
        let texts: Vec<String> = leaves(&body)
            .iter()
            .map(|n| n.borrow().content().leaf_text().unwrap_or("").to_string())
            .collect();
        assert_eq!(texts, vec!["a", " ", "b", "c"]);

        let c = leaves(&body)[3].clone();
        let chain = ancestors(&c);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].borrow().qname(), Some("p"));
        assert!(chain[1].borrow().content().is_body());
    }

    #[test]
    fn test_children_excluding_insertions() {
        let body = sample();
        let p1 = body.borrow().child(0).cloned().unwrap();
        // Separators never count.
        assert_eq!(children_excluding_insertions(&p1).len(), 3);

        let b = p1.borrow().child(2).cloned().unwrap();
        NodeInner::set_modification_of_ref(&b, ModificationType::Added);
        let list = children_excluding_insertions(&p1);
        assert_eq!(list.len(), 2);
        assert_eq!(index_of(&b, &list), None);

        let added = tag("b");
        NodeInner::add_child_to_ref(&p1, added.clone());
        assert_eq!(children_excluding_insertions(&p1).len(), 3);

        NodeInner::set_modification_of_ref(&p1, ModificationType::Added);
        assert!(children_excluding_insertions(&p1).is_empty());
    }

    #[test]
    fn test_content_equal_checks_modification() {
        let a = sample();
        let b = sample();
        assert!(content_equal(&a, &b));

        let leaf = leaves(&b)[0].clone();
        NodeInner::set_modification_of_ref(&leaf, ModificationType::Removed);
        assert!(!content_equal(&a, &b));
    }
}
