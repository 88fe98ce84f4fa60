//! Pairing of left and right diff entries.

use crate::annotate::DiffEntry;
use crate::matching::IdentityMatcher;
use crate::node::ModificationType;

/// The left and/or right edit to one logical origin node.
#[derive(Debug, Clone)]
pub struct ThreeWayEntry {
    pub left: Option<DiffEntry>,
    pub right: Option<DiffEntry>,
}

impl ThreeWayEntry {
    pub fn new(left: Option<DiffEntry>, right: Option<DiffEntry>) -> Self {
        ThreeWayEntry { left, right }
    }

    /// Returns the modification on the left side, `None` if absent.
    pub fn left_modification(&self) -> ModificationType {
        self.left
            .as_ref()
            .map_or(ModificationType::None, |e| e.modification)
    }

    /// Returns the modification on the right side, `None` if absent.
    pub fn right_modification(&self) -> ModificationType {
        self.right
            .as_ref()
            .map_or(ModificationType::None, |e| e.modification)
    }

    /// Returns true if both sides edited the node in ways that cannot both
    /// be applied.
    pub fn is_conflicting(&self) -> bool {
        use ModificationType::*;

        if self.left.is_none() || self.right.is_none() {
            return false;
        }
        matches!(
            (self.left_modification(), self.right_modification()),
            (Conflict, _) | (_, Conflict) | (Changed, Changed) | (Changed, Removed) | (Removed, Changed)
        )
    }
}

/// Pairs every right entry with the first left entry denoting the same node.
///
/// A left entry pairs at most once. Left entries left over become left-only
/// entries, appended after the right-driven ones.
pub fn combine(left: &[DiffEntry], right: &[DiffEntry], matcher: &IdentityMatcher) -> Vec<ThreeWayEntry> {
    let mut unpaired: Vec<DiffEntry> = left.to_vec();
    let mut combined = Vec::with_capacity(left.len() + right.len());

    for entry in right {
        let opposite = unpaired
            .iter()
            .position(|candidate| matcher.is_same_node(&candidate.node, &entry.node))
            .map(|idx| unpaired.remove(idx));
        combined.push(ThreeWayEntry::new(opposite, Some(entry.clone())));
    }
    combined.extend(unpaired.into_iter().map(|e| ThreeWayEntry::new(Some(e), None)));

    tracing::debug!(
        left = left.len(),
        right = right.len(),
        combined = combined.len(),
        "combined diff entries"
    );
    combined
}
