//! Edit operation logging for the merge applier.
//!
//! Every right-side entry the applier looks at ends up here, either as an
//! applied edit or as one it could not carry out.

use std::io::Write;

use super::conflict_log::{escape_xml, node_path};
use crate::node::NodeRef;

/// Types of edit operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditType {
    /// A right-side subtree was inserted into the merged tree.
    Insert,
    /// A node was removed from the merged tree.
    Delete,
    /// A changed tag whose content was left as on the left side.
    Unresolved,
    /// No insertion point or counterpart could be determined.
    Skipped,
}

impl EditType {
    /// Returns the XML tag name for this edit type.
    pub fn tag_name(&self) -> &'static str {
        match self {
            EditType::Insert => "insert",
            EditType::Delete => "delete",
            EditType::Unresolved => "unresolved",
            EditType::Skipped => "skipped",
        }
    }
}

/// A single edit operation entry.
#[derive(Debug, Clone)]
pub struct EditEntry {
    pub edit_type: EditType,
    /// The right-side node for inserts, unresolved and skipped edits; the
    /// merged-tree node for deletes.
    pub node: NodeRef,
    /// Path of `node` at the time the edit was logged.
    pub path: String,
}

/// Log of edit operations performed during merge.
#[derive(Debug, Default)]
pub struct EditLog {
    edits: Vec<EditEntry>,
}

impl EditLog {
    pub fn new() -> Self {
        EditLog { edits: Vec::new() }
    }

    /// Records an insert operation.
    pub fn insert(&mut self, node: &NodeRef) {
        self.push(EditType::Insert, node);
    }

    /// Records a delete operation.
    pub fn delete(&mut self, node: &NodeRef) {
        self.push(EditType::Delete, node);
    }

    /// Records a changed node that was not merged.
    pub fn unresolved(&mut self, node: &NodeRef) {
        self.push(EditType::Unresolved, node);
    }

    /// Records an edit that could not be applied.
    pub fn skipped(&mut self, node: &NodeRef) {
        self.push(EditType::Skipped, node);
    }

    fn push(&mut self, edit_type: EditType, node: &NodeRef) {
        self.edits.push(EditEntry {
            edit_type,
            node: node.clone(),
            path: node_path(node),
        });
    }

    /// Returns the number of edit operations.
    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }

    pub fn edits(&self) -> &[EditEntry] {
        &self.edits
    }

    /// Counts operations by type.
    pub fn count_by_type(&self, edit_type: EditType) -> usize {
        self.edits
            .iter()
            .filter(|e| e.edit_type == edit_type)
            .count()
    }

    /// Writes the edit log as XML.
    pub fn write_xml<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(writer, "<edits>")?;
        for entry in &self.edits {
            writeln!(
                writer,
                "  <{} path=\"{}\" />",
                entry.edit_type.tag_name(),
                escape_xml(&entry.path)
            )?;
        }
        writeln!(writer, "</edits>")?;
        Ok(())
    }
}
