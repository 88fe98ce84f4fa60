//! Text-only dissimilarity between two subtrees.

use crate::node::{leaves, NodeRef};

use super::{align_sequence, AlignConfig};

/// Returns how much the leaf text of two subtrees differs, from 0.0
/// (identical) to 1.0 (nothing in common).
///
/// The ratio is the mean of the unmatched share of each side's leaves.
/// Returns `None` when either subtree has no leaves.
pub fn text_match_ratio(a: &NodeRef, b: &NodeRef, config: &AlignConfig) -> Option<f64> {
    let a_leaves = leaves(a);
    let b_leaves = leaves(b);
    if a_leaves.is_empty() || b_leaves.is_empty() {
        return None;
    }
    let differences = align_sequence(
        &a_leaves,
        &b_leaves,
        |x, y| x.borrow().content().same_label(y.borrow().content()),
        config,
    );
    let left: usize = differences.iter().map(|d| d.left_len).sum();
    let right: usize = differences.iter().map(|d| d.right_len).sum();
    Some((left as f64 / a_leaves.len() as f64 + right as f64 / b_leaves.len() as f64) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_str;

    fn ratio(a: &str, b: &str) -> Option<f64> {
        let a = parse_str(a).unwrap();
        let b = parse_str(b).unwrap();
        text_match_ratio(&a, &b, &AlignConfig::default())
    }

    #[test]
    fn test_identical_text() {
        assert_eq!(ratio("<p>a b</p>", "<div>a b</div>"), Some(0.0));
    }

    #[test]
    fn test_disjoint_text() {
        assert_eq!(ratio("<p>a</p>", "<p>b</p>"), Some(1.0));
    }

    #[test]
    fn test_partial_overlap() {
        // "a b" vs "a c": one of three leaves differs on each side.
        let r = ratio("a b", "a c").unwrap();
        assert!((r - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_side() {
        assert_eq!(ratio("<p></p>", "<p>a</p>"), None);
    }
}
