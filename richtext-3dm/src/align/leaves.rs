//! Per-leaf annotation of a descendant against its origin.

use crate::node::{ancestors, DfsTreeIterator, ModificationType, NodeRef, TagContent};

use super::{align_sequence, common_pairs, AlignConfig};

/// Result of aligning the leaf flow of an origin tree with a descendant's.
#[derive(Debug, Clone, Default)]
pub struct LeafAlignment {
    /// Modification of each origin flow item: `None` or `Removed`.
    pub origin: Vec<ModificationType>,
    /// Modification of each descendant flow item.
    pub other: Vec<ModificationType>,
    /// Matched `(origin index, descendant index)` pairs, in order.
    pub pairs: Vec<(usize, usize)>,
}

impl LeafAlignment {
    /// Returns the number of non-`None` annotations on both sides.
    pub fn change_count(&self) -> usize {
        self.origin
            .iter()
            .chain(self.other.iter())
            .filter(|m| m.is_modified())
            .count()
    }
}

/// Collects the leaves and separators below `root` in document order.
pub fn flow_of(root: &NodeRef) -> Vec<NodeRef> {
    DfsTreeIterator::new(root.clone())
        .filter(|n| {
            let node = n.borrow();
            node.content().is_leaf() || node.content().is_separator()
        })
        .collect()
}

/// Annotates two leaf flows against each other.
///
/// Leaves are compared by kind and text. An unmatched descendant leaf is
/// `Added` and an unmatched origin leaf `Removed`. A matched pair whose
/// ancestor tags differ in name or attributes is `Changed`. Separators take
/// part in the alignment but are never annotated.
pub fn align_leaves(
    origin_leaves: &[NodeRef],
    other_leaves: &[NodeRef],
    config: &AlignConfig,
) -> LeafAlignment {
    let differences = align_sequence(
        origin_leaves,
        other_leaves,
        |a, b| a.borrow().content().same_label(b.borrow().content()),
        config,
    );

    let mut origin = vec![ModificationType::Removed; origin_leaves.len()];
    let mut other = vec![ModificationType::Added; other_leaves.len()];
    let pairs = common_pairs(&differences, origin_leaves.len(), other_leaves.len());

    for &(i, j) in &pairs {
        origin[i] = ModificationType::None;
        other[j] = if ancestor_chain(&origin_leaves[i]) == ancestor_chain(&other_leaves[j]) {
            ModificationType::None
        } else {
            ModificationType::Changed
        };
    }
    for (mods, leaves) in [(&mut origin, origin_leaves), (&mut other, other_leaves)] {
        for (m, leaf) in mods.iter_mut().zip(leaves) {
            if leaf.borrow().content().is_separator() {
                *m = ModificationType::None;
            }
        }
    }

    let alignment = LeafAlignment {
        origin,
        other,
        pairs,
    };
    tracing::trace!(
        origin = origin_leaves.len(),
        other = other_leaves.len(),
        changes = alignment.change_count(),
        "aligned leaves"
    );
    alignment
}

/// Returns the tag ancestors of a node, nearest first, without the body.
fn ancestor_chain(node: &NodeRef) -> Vec<TagContent> {
    ancestors(node)
        .iter()
        .filter_map(|a| a.borrow().content().as_tag().cloned())
        .collect()
}
