//! Tag classification by a parallel walk over origin, annotated and raw
//! descendant levels.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::align::{align_sequence, common_pairs, AlignConfig};
use crate::node::{ancestors, leaves, ModificationType, NodeContent, NodeInner, NodeRef};

use super::weave::{Presence, Woven};

/// The shared modification type of a level's children.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Aggregate {
    /// No classified children.
    Empty,
    /// Every child has this type.
    Uniform(ModificationType),
    /// Children disagree.
    Mixed,
}

impl Aggregate {
    fn fold(self, m: ModificationType) -> Aggregate {
        match self {
            Aggregate::Empty => Aggregate::Uniform(m),
            Aggregate::Uniform(current) if current == m => self,
            _ => Aggregate::Mixed,
        }
    }
}

/// What a level walk reports to its parent.
struct LevelOutcome {
    aggregate: Aggregate,
    /// A `Changed` leaf below the level, for ancestor chain alignment.
    changed_leaf: Option<NodeRef>,
}

/// Classifies the tags of an annotated tree.
pub struct LevelWalker<'a> {
    config: &'a AlignConfig,
    presence: FxHashMap<u64, Presence>,
    origin_of: FxHashMap<u64, NodeRef>,
    displaced: FxHashSet<u64>,
}

impl<'a> LevelWalker<'a> {
    pub fn new(woven: &Woven, config: &'a AlignConfig) -> Self {
        LevelWalker {
            config,
            presence: woven.presence.clone(),
            origin_of: woven.origin_of.clone(),
            displaced: woven.displaced.clone(),
        }
    }

    /// Walks the whole annotated tree.
    pub fn run(mut self, annotated: &NodeRef, origin: &NodeRef, descendant: &NodeRef) {
        self.walk_level(annotated, Some(origin), Some(descendant));
    }

    fn presence_of(&self, node: &NodeRef) -> Presence {
        self.presence
            .get(&node.borrow().id())
            .copied()
            .unwrap_or(Presence::DESCENDANT)
    }

    fn walk_level(
        &mut self,
        annotated: &NodeRef,
        origin: Option<&NodeRef>,
        raw: Option<&NodeRef>,
    ) -> LevelOutcome {
        let a_children: Vec<NodeRef> = annotated.borrow().children().to_vec();
        let o_children: Vec<NodeRef> = origin
            .map(|o| {
                o.borrow()
                    .children()
                    .iter()
                    .filter(|c| {
                        let c = c.borrow();
                        !c.content().is_separator() && !self.displaced.contains(&c.id())
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let d_children: Vec<NodeRef> = raw
            .map(|d| {
                d.borrow()
                    .children()
                    .iter()
                    .filter(|c| !c.borrow().content().is_separator())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let mut aggregate = Aggregate::Empty;
        let mut changed_leaf = None;
        let (mut oi, mut di) = (0, 0);

        for a_child in &a_children {
            if a_child.borrow().content().is_separator() {
                continue;
            }
            let presence = self.presence_of(a_child);
            let o_node = if presence.contains(Presence::ORIGIN) {
                o_children.get(oi).cloned()
            } else {
                None
            };
            let d_node = if presence.contains(Presence::DESCENDANT) {
                d_children.get(di).cloned()
            } else {
                None
            };

            let is_tag = a_child.borrow().content().is_tag();
            if is_tag {
                let outcome = self.walk_level(a_child, o_node.as_ref(), d_node.as_ref());
                let m = self.classify(o_node.as_ref(), d_node.as_ref(), &outcome);
                let current = a_child.borrow().modification();
                if current != ModificationType::Changed {
                    NodeInner::set_modification_of_ref(a_child, m);
                }
                let folded = match a_child.borrow().modification() {
                    ModificationType::Changed => ModificationType::None,
                    other => other,
                };
                tracing::trace!(tag = %a_child.borrow().content(), modification = %folded, "classified tag");
                aggregate = aggregate.fold(folded);
            } else {
                let m = a_child.borrow().modification();
                if m == ModificationType::Changed && changed_leaf.is_none() {
                    changed_leaf = Some(a_child.clone());
                }
                aggregate = aggregate.fold(m);
            }

            if presence.contains(Presence::ORIGIN) {
                oi += 1;
            }
            if presence.contains(Presence::DESCENDANT) {
                di += 1;
            }
        }

        // The weaver places every origin and descendant child exactly once.
        debug_assert_eq!(oi, o_children.len(), "origin children left over");
        debug_assert_eq!(di, d_children.len(), "descendant children left over");

        LevelOutcome {
            aggregate,
            changed_leaf,
        }
    }

    /// Classifies a tag from its children's aggregate.
    fn classify(
        &mut self,
        origin: Option<&NodeRef>,
        raw: Option<&NodeRef>,
        outcome: &LevelOutcome,
    ) -> ModificationType {
        match outcome.aggregate {
            Aggregate::Empty => match (origin, raw) {
                (Some(o), Some(d)) => {
                    if o.borrow().content().content_equals(d.borrow().content()) {
                        ModificationType::None
                    } else {
                        ModificationType::Changed
                    }
                }
                (None, Some(_)) => ModificationType::Added,
                (Some(_), None) => ModificationType::Removed,
                (None, None) => ModificationType::None,
            },
            Aggregate::Uniform(ModificationType::Added) => match origin {
                // Stayed the same, only its content grew.
                Some(o) if !has_content_children(o) => ModificationType::None,
                _ => ModificationType::Added,
            },
            Aggregate::Uniform(ModificationType::Removed) => match raw {
                Some(d) if leaves(d).is_empty() => ModificationType::None,
                _ => ModificationType::Removed,
            },
            Aggregate::Uniform(ModificationType::Changed) => {
                if let Some(leaf) = &outcome.changed_leaf {
                    self.mark_changed_chain(leaf);
                }
                ModificationType::None
            }
            _ => ModificationType::None,
        }
    }

    /// Marks as `Changed` every annotated ancestor of `leaf` that has no
    /// counterpart in the ancestor chain of its origin leaf.
    fn mark_changed_chain(&mut self, leaf: &NodeRef) {
        let Some(origin_leaf) = self.origin_of.get(&leaf.borrow().id()).cloned() else {
            return;
        };
        let mut a_chain = ancestors(leaf);
        let mut o_chain = ancestors(&origin_leaf);
        a_chain.reverse();
        o_chain.reverse();

        let diffs = align_sequence(
            &a_chain,
            &o_chain,
            |a, o| a.borrow().content().content_equals(o.borrow().content()),
            self.config,
        );
        let aligned: FxHashSet<usize> = common_pairs(&diffs, a_chain.len(), o_chain.len())
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        for (idx, tag) in a_chain.iter().enumerate() {
            if !aligned.contains(&idx) && tag.borrow().content().is_tag() {
                tracing::trace!(tag = %tag.borrow().content(), "marking changed ancestor");
                NodeInner::set_modification_of_ref(tag, ModificationType::Changed);
            }
        }
    }
}

/// Returns true if the node has children other than separators.
fn has_content_children(node: &NodeRef) -> bool {
    node.borrow()
        .children()
        .iter()
        .any(|c| !matches!(c.borrow().content(), NodeContent::Separator))
}
