//! Row-wise and column-wise edits of tables.
//!
//! A column counts as changed when every row carries a modified cell at the
//! same column index; a row counts as changed when all of its cells are
//! modified. A column edit on one side and a row edit of the same table on
//! the other side cannot be merged.

use rustc_hash::FxHashSet;

use crate::annotate::DiffEntry;
use crate::constants::{CELL_TAGS, ROW_TAG, TABLE_TAG};
use crate::node::{ModificationType, NodeContent, NodeRef};

/// A table touched by diff entries and the shape of its edits.
#[derive(Debug, Clone)]
pub struct TableEdits {
    pub table: NodeRef,
    pub column_changed: bool,
    pub row_changed: bool,
}

impl TableEdits {
    pub fn of(table: &NodeRef) -> Self {
        let rows = rows_of(table);
        TableEdits {
            table: table.clone(),
            column_changed: has_changed_column(&rows),
            row_changed: has_changed_row(&rows),
        }
    }

    /// Returns true if these edits and `other` cross: a column on one side
    /// against a row on the other.
    pub fn crosses(&self, other: &TableEdits) -> bool {
        (self.column_changed && other.row_changed) || (self.row_changed && other.column_changed)
    }
}

/// Collects the distinct tables owning the nodes of `entries`.
pub fn tables_of(entries: &[DiffEntry]) -> Vec<TableEdits> {
    let mut seen = FxHashSet::default();
    let mut tables = Vec::new();
    for entry in entries {
        if let Some(table) = owning_table(&entry.node) {
            if seen.insert(table.borrow().id()) {
                tables.push(TableEdits::of(&table));
            }
        }
    }
    tables
}

/// Finds the nearest table at or above `node`.
///
/// Rows and cells without a table ancestor are malformed input; they are
/// reported and treated as outside any table.
pub fn owning_table(node: &NodeRef) -> Option<NodeRef> {
    let mut in_table_part = false;
    let mut current = Some(node.clone());
    while let Some(n) = current {
        let name = n.borrow().qname().map(str::to_string);
        match name.as_deref() {
            Some(TABLE_TAG) => return Some(n),
            Some(name) if name == ROW_TAG || CELL_TAGS.contains(&name) => in_table_part = true,
            _ => {}
        }
        current = n.borrow().parent().upgrade();
    }
    if in_table_part {
        tracing::warn!(
            node = %node.borrow().content(),
            "table row or cell without a table ancestor, skipping table check"
        );
    }
    None
}

/// Lists the rows of a table in document order, without descending into
/// nested tables.
fn rows_of(table: &NodeRef) -> Vec<NodeRef> {
    let mut rows = Vec::new();
    collect_rows(table, &mut rows);
    rows
}

fn collect_rows(node: &NodeRef, rows: &mut Vec<NodeRef>) {
    for child in node.borrow().children() {
        match child.borrow().qname() {
            Some(ROW_TAG) => rows.push(child.clone()),
            Some(TABLE_TAG) => {}
            Some(_) => collect_rows(child, rows),
            None => {}
        }
    }
}

fn cells_of(row: &NodeRef) -> Vec<NodeRef> {
    row.borrow()
        .children()
        .iter()
        .filter(|c| {
            let c = c.borrow();
            matches!(c.content(), NodeContent::Tag(t) if CELL_TAGS.contains(&t.qname()))
        })
        .cloned()
        .collect()
}

fn is_modified(node: &NodeRef) -> bool {
    node.borrow().modification() != ModificationType::None
}

fn has_changed_column(rows: &[NodeRef]) -> bool {
    if rows.is_empty() {
        return false;
    }
    let cells: Vec<Vec<NodeRef>> = rows.iter().map(cells_of).collect();
    let width = cells.iter().map(Vec::len).max().unwrap_or(0);
    (0..width).any(|column| {
        cells
            .iter()
            .all(|row| row.get(column).is_some_and(is_modified))
    })
}

fn has_changed_row(rows: &[NodeRef]) -> bool {
    rows.iter().any(|row| {
        let cells = cells_of(row);
        !cells.is_empty() && cells.iter().all(is_modified)
    })
}
