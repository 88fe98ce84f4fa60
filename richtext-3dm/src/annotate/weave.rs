//! Builds the annotated tree: a copy of the descendant with origin content
//! woven back in as removed material.

use bitflags::bitflags;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::align::{align_sequence, common_pairs, AlignConfig, LeafAlignment};
use crate::node::{leaves, new_node, ModificationType, NodeContent, NodeInner, NodeRef};

bitflags! {
    /// Which input trees an annotated node stems from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Presence: u8 {
        /// The node has an origin counterpart.
        const ORIGIN = 1;
        /// The node has a descendant counterpart.
        const DESCENDANT = 2;
        /// Both.
        const BOTH = Self::ORIGIN.bits() | Self::DESCENDANT.bits();
    }
}

/// The annotated tree with the side tables the level walk needs.
pub struct Woven {
    /// Root of the annotated tree.
    pub tree: NodeRef,
    /// Presence of every annotated node, by node ID.
    pub presence: FxHashMap<u64, Presence>,
    /// Origin leaf matched by each annotated leaf, by annotated node ID.
    pub origin_of: FxHashMap<u64, NodeRef>,
    /// Origin nodes that have no place in the annotated tree because all
    /// of their leaves were matched elsewhere.
    pub displaced: FxHashSet<u64>,
}

/// Weaves origin and descendant trees together.
pub struct Weaver<'a> {
    config: &'a AlignConfig,
    /// Descendant leaf ID to matched origin leaf.
    leaf_match: FxHashMap<u64, NodeRef>,
    /// Origin leaves matched to some descendant leaf.
    origin_matched: FxHashSet<u64>,
    /// Annotation of each descendant leaf.
    leaf_mods: FxHashMap<u64, ModificationType>,
    presence: FxHashMap<u64, Presence>,
    origin_of: FxHashMap<u64, NodeRef>,
    displaced: FxHashSet<u64>,
}

impl<'a> Weaver<'a> {
    /// Creates a weaver from the leaf alignment of the two trees' flows.
    pub fn new(
        origin_flow: &[NodeRef],
        descendant_flow: &[NodeRef],
        alignment: &LeafAlignment,
        config: &'a AlignConfig,
    ) -> Self {
        let mut leaf_match = FxHashMap::default();
        let mut origin_matched = FxHashSet::default();
        for &(i, j) in &alignment.pairs {
            let o = &origin_flow[i];
            if o.borrow().content().is_separator() {
                continue;
            }
            leaf_match.insert(descendant_flow[j].borrow().id(), o.clone());
            origin_matched.insert(o.borrow().id());
        }
        let leaf_mods = descendant_flow
            .iter()
            .zip(&alignment.other)
            .map(|(leaf, m)| (leaf.borrow().id(), *m))
            .collect();

        Weaver {
            config,
            leaf_match,
            origin_matched,
            leaf_mods,
            presence: FxHashMap::default(),
            origin_of: FxHashMap::default(),
            displaced: FxHashSet::default(),
        }
    }

    /// Weaves the two trees, rooted at their bodies.
    pub fn weave(mut self, origin: &NodeRef, descendant: &NodeRef) -> Woven {
        let root = new_node(NodeContent::Body);
        self.presence.insert(root.borrow().id(), Presence::BOTH);
        self.weave_level(origin, descendant, &root);
        Woven {
            tree: root,
            presence: self.presence,
            origin_of: self.origin_of,
            displaced: self.displaced,
        }
    }

    /// Fills `target` with the woven children of a paired origin and
    /// descendant node.
    fn weave_level(&mut self, origin: &NodeRef, descendant: &NodeRef, target: &NodeRef) {
        let o_children: Vec<NodeRef> = origin
            .borrow()
            .children()
            .iter()
            .filter(|c| !c.borrow().content().is_separator())
            .cloned()
            .collect();
        let d_children: Vec<NodeRef> = descendant.borrow().children().to_vec();

        let pairs = self.pair_children(&o_children, &d_children);
        let pair_of: FxHashMap<usize, usize> = pairs.iter().map(|&(d, o)| (d, o)).collect();

        let mut next_o = 0;
        for (d_idx, d_child) in d_children.iter().enumerate() {
            if d_child.borrow().content().is_separator() {
                let sep = new_node(NodeContent::Separator);
                self.presence.insert(sep.borrow().id(), Presence::DESCENDANT);
                NodeInner::add_child_to_ref(target, sep);
                continue;
            }
            match pair_of.get(&d_idx) {
                Some(&o_idx) => {
                    self.flush_removed(&o_children[next_o..o_idx], target);
                    next_o = o_idx + 1;
                    let node = self.paired_node(&o_children[o_idx], d_child);
                    NodeInner::add_child_to_ref(target, node);
                }
                None => {
                    // Removed material of this gap goes before the insertions.
                    let gap_end = pairs
                        .iter()
                        .find(|&&(d, _)| d > d_idx)
                        .map_or(o_children.len(), |&(_, o)| o);
                    if gap_end > next_o {
                        self.flush_removed(&o_children[next_o..gap_end], target);
                        next_o = gap_end;
                    }
                    let node = self.clone_descendant(d_child);
                    NodeInner::add_child_to_ref(target, node);
                }
            }
        }
        self.flush_removed(&o_children[next_o.min(o_children.len())..], target);
    }

    /// Pairs descendant children with origin children.
    ///
    /// Returns `(descendant index, origin index)` pairs, increasing in both.
    fn pair_children(&self, o_children: &[NodeRef], d_children: &[NodeRef]) -> Vec<(usize, usize)> {
        // Origin leaf ID to the index of the origin child containing it.
        let mut owner: FxHashMap<u64, usize> = FxHashMap::default();
        for (idx, child) in o_children.iter().enumerate() {
            for leaf in leaves(child) {
                owner.insert(leaf.borrow().id(), idx);
            }
        }

        let mut candidates = Vec::new();
        for (d_idx, d_child) in d_children.iter().enumerate() {
            let d_is_leaf = {
                let d = d_child.borrow();
                if d.content().is_separator() {
                    continue;
                }
                d.content().is_leaf()
            };
            let mut votes: FxHashMap<usize, usize> = FxHashMap::default();
            for leaf in leaves(d_child) {
                let matched = self
                    .leaf_match
                    .get(&leaf.borrow().id())
                    .and_then(|o| owner.get(&o.borrow().id()));
                if let Some(&o_idx) = matched {
                    *votes.entry(o_idx).or_insert(0) += 1;
                }
            }
            let best = votes
                .into_iter()
                .max_by(|(ia, va), (ib, vb)| va.cmp(vb).then(ib.cmp(ia)));
            if let Some((o_idx, _)) = best {
                if o_children[o_idx].borrow().content().is_leaf() == d_is_leaf {
                    candidates.push((d_idx, o_idx));
                }
            }
        }

        let mut pairs = longest_increasing(&candidates);
        self.pair_gaps(o_children, d_children, &mut pairs);
        pairs
    }

    /// Pairs the unpaired tags between consecutive pairs by tag name.
    fn pair_gaps(
        &self,
        o_children: &[NodeRef],
        d_children: &[NodeRef],
        pairs: &mut Vec<(usize, usize)>,
    ) {
        let mut bounds: Vec<(usize, usize)> = Vec::with_capacity(pairs.len() + 1);
        bounds.extend(pairs.iter().copied());
        bounds.push((d_children.len(), o_children.len()));

        let mut extra = Vec::new();
        let (mut d_start, mut o_start) = (0, 0);
        for (d_end, o_end) in bounds {
            let o_tags: Vec<usize> = (o_start..o_end)
                .filter(|&i| o_children[i].borrow().content().is_tag())
                .collect();
            let d_tags: Vec<usize> = (d_start..d_end)
                .filter(|&i| d_children[i].borrow().content().is_tag())
                .collect();
            if !o_tags.is_empty() && !d_tags.is_empty() {
                let names = |idx: &[usize], nodes: &[NodeRef]| -> Vec<String> {
                    idx.iter()
                        .map(|&i| nodes[i].borrow().qname().unwrap_or("").to_string())
                        .collect()
                };
                let o_names = names(&o_tags, o_children);
                let d_names = names(&d_tags, d_children);
                let diffs = align_sequence(&o_names, &d_names, |a, b| a == b, self.config);
                for (oi, di) in common_pairs(&diffs, o_names.len(), d_names.len()) {
                    extra.push((d_tags[di], o_tags[oi]));
                }
            }
            d_start = d_end + 1;
            o_start = o_end + 1;
        }

        pairs.extend(extra);
        pairs.sort_unstable();
    }

    /// Creates the annotated node for a paired origin and descendant child.
    fn paired_node(&mut self, o_child: &NodeRef, d_child: &NodeRef) -> NodeRef {
        let (content, d_id) = {
            let d = d_child.borrow();
            (d.content().clone(), d.id())
        };
        let is_leaf = content.is_leaf();
        let node = new_node(content);
        let id = node.borrow().id();
        self.presence.insert(id, Presence::BOTH);
        if is_leaf {
            let m = self.leaf_mods.get(&d_id).copied().unwrap_or_default();
            NodeInner::set_modification_of_ref(&node, m);
            self.origin_of.insert(id, o_child.clone());
        } else {
            self.weave_level(o_child, d_child, &node);
        }
        node
    }

    /// Copies a descendant subtree that has no origin counterpart.
    fn clone_descendant(&mut self, d_node: &NodeRef) -> NodeRef {
        let (content, d_id, children) = {
            let d = d_node.borrow();
            (d.content().clone(), d.id(), d.children().to_vec())
        };
        let is_leaf = content.is_leaf();
        let node = new_node(content);
        let id = node.borrow().id();
        self.presence.insert(id, Presence::DESCENDANT);
        if is_leaf {
            let m = self
                .leaf_mods
                .get(&d_id)
                .copied()
                .unwrap_or(ModificationType::Added);
            NodeInner::set_modification_of_ref(&node, m);
            if let Some(o) = self.leaf_match.get(&d_id) {
                self.origin_of.insert(id, o.clone());
            }
        }
        for child in &children {
            let copy = self.clone_descendant(child);
            NodeInner::add_child_to_ref(&node, copy);
        }
        node
    }

    /// Appends removed copies of unpaired origin children.
    fn flush_removed(&mut self, o_children: &[NodeRef], target: &NodeRef) {
        for o_child in o_children {
            if let Some(copy) = self.clone_removed(o_child) {
                NodeInner::add_child_to_ref(target, copy);
            }
        }
    }

    /// Copies an origin subtree as removed material.
    ///
    /// Leaves matched elsewhere in the descendant are left out and recorded
    /// as displaced; so is a tag whose leaves were all left out.
    fn clone_removed(&mut self, o_node: &NodeRef) -> Option<NodeRef> {
        let (content, o_id, children) = {
            let o = o_node.borrow();
            (o.content().clone(), o.id(), o.children().to_vec())
        };
        if content.is_separator() {
            return None;
        }
        if content.is_leaf() {
            if self.origin_matched.contains(&o_id) {
                self.displaced.insert(o_id);
                return None;
            }
            let node = new_node(content);
            NodeInner::set_modification_of_ref(&node, ModificationType::Removed);
            self.presence.insert(node.borrow().id(), Presence::ORIGIN);
            return Some(node);
        }

        let node = new_node(content);
        self.presence.insert(node.borrow().id(), Presence::ORIGIN);
        for child in &children {
            if let Some(copy) = self.clone_removed(child) {
                NodeInner::add_child_to_ref(&node, copy);
            }
        }
        if !leaves(o_node).is_empty() && leaves(&node).is_empty() {
            self.presence.remove(&node.borrow().id());
            self.displaced.insert(o_id);
            return None;
        }
        Some(node)
    }
}

/// Picks the longest subsequence of `(d, o)` candidates, given in
/// increasing `d` order, whose `o` values strictly increase.
fn longest_increasing(candidates: &[(usize, usize)]) -> Vec<(usize, usize)> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let n = candidates.len();
    let mut length = vec![1usize; n];
    let mut prev: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        for j in 0..i {
            if candidates[j].1 < candidates[i].1 && length[j] + 1 > length[i] {
                length[i] = length[j] + 1;
                prev[i] = Some(j);
            }
        }
    }
    let mut best = 0;
    for i in 1..n {
        if length[i] > length[best] {
            best = i;
        }
    }
    let mut result = Vec::with_capacity(length[best]);
    let mut current = Some(best);
    while let Some(i) = current {
        result.push(candidates[i]);
        current = prev[i];
    }
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{align_leaves, flow_of};
    use crate::html::{parse_str, print_to_string};

    fn woven(origin: &str, descendant: &str) -> Woven {
        let o = parse_str(origin).unwrap();
        let d = parse_str(descendant).unwrap();
        let config = AlignConfig::default();
        let (o_flow, d_flow) = (flow_of(&o), flow_of(&d));
        let alignment = align_leaves(&o_flow, &d_flow, &config);
        Weaver::new(&o_flow, &d_flow, &alignment, &config).weave(&o, &d)
    }

    fn presence_of(w: &Woven, node: &NodeRef) -> Presence {
        w.presence[&node.borrow().id()]
    }

    #[test]
    fn test_longest_increasing() {
        assert_eq!(
            longest_increasing(&[(0, 3), (1, 0), (2, 1), (3, 2)]),
            vec![(1, 0), (2, 1), (3, 2)]
        );
        assert!(longest_increasing(&[]).is_empty());
    }

    #[test]
    fn test_unchanged_tree_is_fully_paired() {
        let w = woven("<p>A <b>B</b></p>", "<p>A <b>B</b></p>");
        assert_eq!(print_to_string(&w.tree), "<p>A <b>B</b></p>");
        for node in crate::node::DfsTreeIterator::new(w.tree.clone()) {
            if !node.borrow().content().is_separator() {
                assert_eq!(presence_of(&w, &node), Presence::BOTH);
            }
        }
    }

    #[test]
    fn test_removed_paragraph_is_woven_back() {
        let w = woven("<p>A</p><p>B</p><p>C</p>", "<p>A</p><p>C</p>");
        assert_eq!(print_to_string(&w.tree), "<p>A</p><p>B</p><p>C</p>");
        let middle = w.tree.borrow().child(1).cloned().unwrap();
        assert_eq!(presence_of(&w, &middle), Presence::ORIGIN);
        let b = middle.borrow().child(0).cloned().unwrap();
        assert_eq!(b.borrow().modification(), ModificationType::Removed);
    }

    #[test]
    fn test_removed_before_inserted_in_gap() {
        let w = woven("<p>A</p><p>B</p>", "<p>A</p><div>X</div>");
        assert_eq!(print_to_string(&w.tree), "<p>A</p><p>B</p><div>X</div>");
    }

    #[test]
    fn test_emptied_container_pairs_by_name() {
        let w = woven("<p>Text</p>", "<p></p>");
        let p = w.tree.borrow().child(0).cloned().unwrap();
        assert_eq!(presence_of(&w, &p), Presence::BOTH);
        let text = p.borrow().child(0).cloned().unwrap();
        assert_eq!(text.borrow().modification(), ModificationType::Removed);
    }

    #[test]
    fn test_moved_leaf_is_displaced() {
        let w = woven("<div><b>x</b></div>", "<div>x</div>");
        assert_eq!(print_to_string(&w.tree), "<div>x</div>");
        assert_eq!(w.displaced.len(), 2);
        let x = w.tree.borrow().child(0).unwrap().borrow().child(0).cloned().unwrap();
        assert!(w.origin_of.contains_key(&x.borrow().id()));
    }
}
