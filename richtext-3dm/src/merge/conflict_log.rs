//! Conflict logging for the three-way diff.
//!
//! Every conflict found by the detector is recorded with the left and right
//! nodes involved, so callers can report where the two descendants collide.

use std::io::Write;

use crate::node::{NodeContent, NodeRef};

/// Kinds of conflicts the detector reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictType {
    /// Both sides edited the same node incompatibly.
    Text,
    /// Both sides edited the same structural container differently.
    Container,
    /// Both sides inserted different content at the same position.
    Insertion,
    /// A column-wise and a row-wise edit to the same table.
    Table,
}

impl ConflictType {
    /// Returns the XML tag name for this conflict type.
    pub fn tag_name(&self) -> &'static str {
        match self {
            ConflictType::Text => "text",
            ConflictType::Container => "container",
            ConflictType::Insertion => "insertion",
            ConflictType::Table => "table",
        }
    }
}

/// A single conflict entry.
#[derive(Debug, Clone)]
pub struct ConflictEntry {
    pub conflict_type: ConflictType,
    /// Description of the conflict.
    pub text: String,
    /// The node in the left annotated tree, if any.
    pub left: Option<NodeRef>,
    /// The node in the right annotated tree, if any.
    pub right: Option<NodeRef>,
    pub left_path: Option<String>,
    pub right_path: Option<String>,
}

/// Log of conflicts between the left and right descendants.
#[derive(Debug, Default)]
pub struct ConflictLog {
    conflicts: Vec<ConflictEntry>,
}

impl ConflictLog {
    pub fn new() -> Self {
        ConflictLog {
            conflicts: Vec::new(),
        }
    }

    /// Records a conflict.
    pub fn add(
        &mut self,
        conflict_type: ConflictType,
        text: &str,
        left: Option<NodeRef>,
        right: Option<NodeRef>,
    ) {
        tracing::trace!(kind = conflict_type.tag_name(), "{}", text);
        self.conflicts.push(ConflictEntry {
            conflict_type,
            text: text.to_string(),
            left_path: left.as_ref().map(node_path),
            right_path: right.as_ref().map(node_path),
            left,
            right,
        });
    }

    /// Returns true if there are any conflicts.
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    pub fn conflicts(&self) -> &[ConflictEntry] {
        &self.conflicts
    }

    /// Counts conflicts of one type.
    pub fn count_by_type(&self, conflict_type: ConflictType) -> usize {
        self.conflicts
            .iter()
            .filter(|e| e.conflict_type == conflict_type)
            .count()
    }

    pub fn clear(&mut self) {
        self.conflicts.clear();
    }

    /// Writes the conflict log as XML.
    pub fn write_xml<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(writer, "<conflictlist>")?;
        for entry in &self.conflicts {
            self.write_entry(writer, entry, "  ")?;
        }
        writeln!(writer, "</conflictlist>")?;
        Ok(())
    }

    fn write_entry<W: Write>(
        &self,
        writer: &mut W,
        entry: &ConflictEntry,
        indent: &str,
    ) -> std::io::Result<()> {
        let tag = entry.conflict_type.tag_name();

        writeln!(writer, "{}<{}>", indent, tag)?;
        writeln!(writer, "{}  {}", indent, escape_xml(&entry.text))?;
        if let Some(path) = &entry.left_path {
            writeln!(
                writer,
                "{}  <node tree=\"left\" path=\"{}\" />",
                indent,
                escape_xml(path)
            )?;
        }
        if let Some(path) = &entry.right_path {
            writeln!(
                writer,
                "{}  <node tree=\"right\" path=\"{}\" />",
                indent,
                escape_xml(path)
            )?;
        }
        writeln!(writer, "{}</{}>", indent, tag)?;
        Ok(())
    }
}

/// Escapes special characters in XML content.
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Builds a path like `/body/div[0]/p[1]/#text[2]` for a node.
pub(crate) fn node_path(node: &NodeRef) -> String {
    let mut parts = Vec::new();
    let mut current = Some(node.clone());

    while let Some(n) = current {
        let borrowed = n.borrow();
        let name = match borrowed.content() {
            NodeContent::Body => "body".to_string(),
            NodeContent::Tag(t) => t.qname().to_string(),
            NodeContent::Text(_) => "#text".to_string(),
            NodeContent::Whitespace(_) => "#white".to_string(),
            NodeContent::Separator => "#separator".to_string(),
        };

        let pos = borrowed.child_pos();
        if pos >= 0 {
            parts.push(format!("{}[{}]", name, pos));
        } else {
            parts.push(name);
        }

        current = borrowed.parent().upgrade();
    }

    parts.reverse();
    format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_str;
    use crate::node::DfsTreeIterator;

    #[test]
    fn test_counts_by_type() {
        let mut log = ConflictLog::default();
        assert!(!log.has_conflicts());

        log.add(ConflictType::Insertion, "different insertions after 1 original siblings", None, None);
        log.add(ConflictType::Table, "row and column edits to the same table", None, None);
        assert_eq!(log.conflict_count(), 2);
        assert_eq!(log.count_by_type(ConflictType::Insertion), 1);
        assert_eq!(log.count_by_type(ConflictType::Text), 0);

        let first = &log.conflicts()[0];
        assert_eq!(first.conflict_type.tag_name(), "insertion");
        assert!(first.left_path.is_none() && first.right.is_none());

        log.clear();
        assert!(!log.has_conflicts());
    }

    #[test]
    fn test_node_path() {
        let body = parse_str("<div><p>A</p><p>B <b>C</b></p></div>").unwrap();
        let c = DfsTreeIterator::new(body.clone())
            .find(|n| n.borrow().content().leaf_text() == Some("C"))
            .unwrap();
        assert_eq!(node_path(&c), "/body/div[0]/p[1]/b[2]/#text[0]");
    }

    #[test]
    fn test_write_xml() {
        let body = parse_str("<p>A &amp; B</p>").unwrap();
        let p = body.borrow().child(0).cloned().unwrap();
        let mut log = ConflictLog::new();
        log.add(ConflictType::Container, "<p> edited on both sides", Some(p.clone()), Some(p));

        let mut out = Vec::new();
        log.write_xml(&mut out).unwrap();
        let xml = String::from_utf8(out).unwrap();
        assert!(xml.contains("<container>"));
        assert!(xml.contains("&lt;p&gt; edited on both sides"));
        assert!(xml.contains("<node tree=\"left\" path=\"/body/p[0]\" />"));
        assert!(xml.contains("<node tree=\"right\" path=\"/body/p[0]\" />"));
    }
}
