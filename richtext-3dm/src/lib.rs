//! Three-way diff and merge for rich-text documents.
//!
//! This library compares two edited versions of an HTML-like document
//! against their common origin, reports whether the two sets of edits
//! conflict, and merges them into one document.
//!
//! # Overview
//!
//! Documents are parsed into trees of tags and word-level text leaves
//! (`html`). Each edited version is annotated against the origin: every
//! leaf and tag is marked added, removed, changed or unchanged
//! (`annotate`). The two annotations are then paired node by node using a
//! notion of node identity that works across separately built trees
//! (`matching`), checked for conflicts, and merged (`merge`).
//!
//! ```no_run
//! use richtext_3dm::ThreeWayDiff;
//!
//! let diff = ThreeWayDiff::from_markup(
//!     "<p>A</p><p>B</p>",
//!     "<p>A</p><p>B</p>",
//!     "<p>A</p><p>X</p><p>B</p>",
//! )?;
//! assert!(!diff.is_conflicting());
//! assert_eq!(diff.merged_markup(), "<p>A</p><p>X</p><p>B</p>");
//! # Ok::<(), richtext_3dm::Error>(())
//! ```

pub mod align;
pub mod annotate;
pub mod config;
pub mod constants;
pub mod error;
pub mod html;
pub mod matching;
pub mod merge;
pub mod node;

// Re-export commonly used types
pub use align::{align_leaves, align_sequence, text_match_ratio, AlignConfig, RangeDifference};
pub use annotate::{annotate, Annotation, DiffEntry};
pub use config::DiffConfig;
pub use error::{Error, Result};
pub use html::{normalize_markup, parse_file, parse_str, print_to_string, HtmlParser, HtmlPrinter};
pub use matching::{find_counterpart, is_same_node, IdentityMatcher};
pub use node::{
    clone_subtree, children_excluding_insertions, index_of, new_node, ModificationType, NodeContent,
    NodeInner, NodeRef,
};

// Re-export merge types
pub use merge::{
    ConflictLog, ConflictState, ConflictType, EditLog, EditType, ThreeWayDiff, ThreeWayEntry,
};
