//! Three-way diff and merge.
//!
//! Both descendants are annotated against the common origin. The two entry
//! lists are paired node by node ([`combine`]), checked for edits that
//! cannot both hold ([`ConflictDetector`]), and the right side's edits are
//! applied onto a copy of the left annotated tree ([`MergeApplier`]).
//!
//! [`ThreeWayDiff`] ties these steps into a session whose conflict verdict
//! and merge result are each computed once.

mod apply;
mod combine;
mod conflict;
mod conflict_log;
mod edit_log;
mod table;

pub use apply::MergeApplier;
pub use combine::{combine, ThreeWayEntry};
pub use conflict::ConflictDetector;
pub use conflict_log::{ConflictEntry, ConflictLog, ConflictType};
pub use edit_log::{EditEntry, EditLog, EditType};
pub use table::{owning_table, tables_of, TableEdits};

use std::cell::{Cell, OnceCell, Ref, RefCell};

use crate::annotate::{annotate, Annotation, DiffEntry};
use crate::config::DiffConfig;
use crate::error::Result;
use crate::html::{parse_str, print_to_string};
use crate::matching::IdentityMatcher;
use crate::node::NodeRef;

/// Whether a session's conflict check has run, and its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictState {
    Unknown,
    Conflicting,
    NotConflicting,
}

/// A three-way diff of two descendants against their common origin.
///
/// The input trees are never modified. The merged tree is a separate copy
/// owned by the session.
#[derive(Debug)]
pub struct ThreeWayDiff {
    config: DiffConfig,
    left: Annotation,
    right: Annotation,
    entries: Vec<ThreeWayEntry>,
    conflict_state: Cell<ConflictState>,
    conflict_log: RefCell<ConflictLog>,
    merged: OnceCell<(NodeRef, EditLog)>,
}

impl ThreeWayDiff {
    /// Creates a session with the default configuration.
    pub fn new(origin: &NodeRef, left: &NodeRef, right: &NodeRef) -> Self {
        Self::with_config(origin, left, right, DiffConfig::default())
    }

    /// Creates a session with an explicit configuration.
    pub fn with_config(origin: &NodeRef, left: &NodeRef, right: &NodeRef, config: DiffConfig) -> Self {
        let left = annotate(origin, left, &config.align);
        let right = annotate(origin, right, &config.align);
        let entries = combine(&left.entries, &right.entries, &IdentityMatcher::new(&config));

        ThreeWayDiff {
            config,
            left,
            right,
            entries,
            conflict_state: Cell::new(ConflictState::Unknown),
            conflict_log: RefCell::new(ConflictLog::new()),
            merged: OnceCell::new(),
        }
    }

    /// Parses the three versions and creates a session.
    pub fn from_markup(origin: &str, left: &str, right: &str) -> Result<Self> {
        Self::from_markup_with_config(origin, left, right, DiffConfig::default())
    }

    pub fn from_markup_with_config(
        origin: &str,
        left: &str,
        right: &str,
        config: DiffConfig,
    ) -> Result<Self> {
        let origin = parse_str(origin)?;
        let left = parse_str(left)?;
        let right = parse_str(right)?;
        Ok(Self::with_config(&origin, &left, &right, config))
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Returns the state of the conflict check without running it.
    pub fn conflict_state(&self) -> ConflictState {
        self.conflict_state.get()
    }

    /// Returns true if the two descendants conflict.
    pub fn is_conflicting(&self) -> bool {
        if self.conflict_state.get() == ConflictState::Unknown {
            let mut log = self.conflict_log.borrow_mut();
            log.clear();
            let detector = ConflictDetector::new(&self.config);
            let conflicting =
                detector.detect(&self.entries, &self.left.entries, &self.right.entries, &mut log);
            self.conflict_state.set(if conflicting {
                ConflictState::Conflicting
            } else {
                ConflictState::NotConflicting
            });
        }
        self.conflict_state.get() == ConflictState::Conflicting
    }

    /// Returns the conflicts found, running the check if needed.
    pub fn conflict_log(&self) -> Ref<'_, ConflictLog> {
        self.is_conflicting();
        self.conflict_log.borrow()
    }

    /// Returns the merged tree: the left descendant with the right
    /// descendant's edits applied.
    ///
    /// The merge is computed on first access. It is available even when the
    /// descendants conflict; deciding whether to use it is up to the caller.
    pub fn merged(&self) -> &NodeRef {
        &self.merge_result().0
    }

    /// Serializes the merged tree.
    pub fn merged_markup(&self) -> String {
        print_to_string(self.merged())
    }

    /// Returns the log of edits the merge applied or skipped.
    pub fn edit_log(&self) -> &EditLog {
        &self.merge_result().1
    }

    fn merge_result(&self) -> &(NodeRef, EditLog) {
        self.merged
            .get_or_init(|| MergeApplier::new(&self.left.tree, &self.config).apply(&self.entries))
    }

    /// Entries of the left descendant against the origin.
    pub fn left_entries(&self) -> &[DiffEntry] {
        &self.left.entries
    }

    /// Entries of the right descendant against the origin.
    pub fn right_entries(&self) -> &[DiffEntry] {
        &self.right.entries
    }

    /// The paired left and right entries.
    pub fn entries(&self) -> &[ThreeWayEntry] {
        &self.entries
    }

    /// The left descendant annotated against the origin.
    pub fn left_tree(&self) -> &NodeRef {
        &self.left.tree
    }

    /// The right descendant annotated against the origin.
    pub fn right_tree(&self) -> &NodeRef {
        &self.right.tree
    }
}
