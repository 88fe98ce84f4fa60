//! Sequence alignment.
//!
//! This module provides the two-way primitive the rest of the engine builds
//! on: a longest-common-subsequence alignment over arbitrary sequences
//! (`align_sequence`), its per-leaf form over document leaves
//! (`align_leaves`), and the text-only dissimilarity ratio between two
//! subtrees (`text_match_ratio`).
//!
//! The alignment itself is Myers' algorithm from the `similar` crate. Work
//! on long inputs is bounded by an explicit `AlignConfig`; when the bound is
//! hit, the unaligned middle of the inputs is reported as one change.

mod leaves;
mod ratio;

pub use leaves::{align_leaves, flow_of, LeafAlignment};
pub use ratio::text_match_ratio;

use std::ops::Range;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use similar::algorithms::{myers, Capture};
use similar::DiffTag;

use crate::constants::{ALIGN_DEADLINE_MS, POW_LIMIT, TOO_LONG};

/// Bounds for sequence alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Exponent of the edit bound applied to long inputs.
    pub pow_limit: f64,
    /// Product of input lengths above which the edit bound applies.
    pub too_long: f64,
    /// Time budget for aligning long inputs, in milliseconds.
    pub deadline_ms: u64,
}

impl Default for AlignConfig {
    fn default() -> Self {
        AlignConfig {
            pow_limit: POW_LIMIT,
            too_long: TOO_LONG,
            deadline_ms: ALIGN_DEADLINE_MS,
        }
    }
}

impl AlignConfig {
    /// Returns the maximum number of edits accepted for inputs of the given
    /// lengths, or `None` if the alignment is unbounded.
    pub fn edit_limit(&self, len_a: usize, len_b: usize) -> Option<usize> {
        if (len_a as f64) * (len_b as f64) <= self.too_long {
            return None;
        }
        let half = (len_a + len_b).div_ceil(2) as f64;
        Some((half.powf(self.pow_limit - 1.0).ceil() as usize).max(1))
    }

    fn deadline(&self) -> Option<Instant> {
        Instant::now().checked_add(Duration::from_millis(self.deadline_ms))
    }
}

/// A differing region between two sequences.
///
/// `left_*` indexes the first sequence and `right_*` the second. Either
/// length may be zero (pure insertion or deletion), but not both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeDifference {
    pub left_start: usize,
    pub left_len: usize,
    pub right_start: usize,
    pub right_len: usize,
}

impl RangeDifference {
    pub fn left_end(&self) -> usize {
        self.left_start + self.left_len
    }

    pub fn right_end(&self) -> usize {
        self.right_start + self.right_len
    }

    fn edits(&self) -> usize {
        self.left_len + self.right_len
    }
}

/// An element compared through a caller-supplied equality.
struct Keyed<'a, T, F> {
    item: &'a T,
    eq: &'a F,
}

impl<T, F> PartialEq for Keyed<'_, T, F>
where
    F: Fn(&T, &T) -> bool,
{
    fn eq(&self, other: &Self) -> bool {
        (self.eq)(self.item, other.item)
    }
}

fn keyed<'a, T, F>(items: &'a [T], eq: &'a F) -> Vec<Keyed<'a, T, F>> {
    items.iter().map(|item| Keyed { item, eq }).collect()
}

/// Aligns two sequences and returns their differing regions in order.
///
/// `eq` decides element equality. Inputs with `len(a) * len(b)` within
/// `config.too_long` are aligned exactly. Longer inputs get
/// `config.deadline_ms` to align and at most `config.edit_limit` edits;
/// past that, everything between the common prefix and suffix is one
/// change.
pub fn align_sequence<T, F>(a: &[T], b: &[T], eq: F, config: &AlignConfig) -> Vec<RangeDifference>
where
    F: Fn(&T, &T) -> bool,
{
    let (n, m) = (a.len(), b.len());
    let limit = config.edit_limit(n, m);
    let deadline = limit.and_then(|_| config.deadline());

    let (old, new) = (keyed(a, &eq), keyed(b, &eq));

    let mut capture = Capture::new();
    if let Err(never) = myers::diff_deadline(&mut capture, &old, 0..n, &new, 0..m, deadline) {
        match never {}
    }

    let differences = merge_adjacent(capture.into_ops().iter().map(|op| op.as_tag_tuple()));
    match limit {
        Some(limit) if differences.iter().map(RangeDifference::edits).sum::<usize>() > limit => {
            tracing::debug!(
                len_a = n,
                len_b = m,
                limit,
                "alignment edit bound exceeded, reporting middle as one change"
            );
            middle_as_one_change(&differences)
        }
        _ => differences,
    }
}

/// Folds consecutive delete and insert operations into differing regions.
fn merge_adjacent(
    ops: impl Iterator<Item = (DiffTag, Range<usize>, Range<usize>)>,
) -> Vec<RangeDifference> {
    let mut result: Vec<RangeDifference> = Vec::new();
    for (tag, old, new) in ops {
        if tag == DiffTag::Equal {
            continue;
        }
        match result.last_mut() {
            Some(last) if last.left_end() == old.start && last.right_end() == new.start => {
                last.left_len += old.len();
                last.right_len += new.len();
            }
            _ => result.push(RangeDifference {
                left_start: old.start,
                left_len: old.len(),
                right_start: new.start,
                right_len: new.len(),
            }),
        }
    }
    result
}

/// Spans every difference with a single region.
fn middle_as_one_change(differences: &[RangeDifference]) -> Vec<RangeDifference> {
    let (Some(first), Some(last)) = (differences.first(), differences.last()) else {
        return Vec::new();
    };
    vec![RangeDifference {
        left_start: first.left_start,
        left_len: last.left_end() - first.left_start,
        right_start: first.right_start,
        right_len: last.right_end() - first.right_start,
    }]
}

/// Enumerates the matched index pairs left between the given differences.
pub fn common_pairs(
    differences: &[RangeDifference],
    len_a: usize,
    len_b: usize,
) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    for diff in differences {
        while i < diff.left_start && j < diff.right_start {
            pairs.push((i, j));
            i += 1;
            j += 1;
        }
        i = diff.left_end();
        j = diff.right_end();
    }
    while i < len_a && j < len_b {
        pairs.push((i, j));
        i += 1;
        j += 1;
    }
    pairs
}
