//! Content types for document tree nodes.
//!
//! This module provides `NodeContent`, the tagged union over the five node
//! kinds of a rich-text document: the body root, tags, text words, whitespace
//! runs and flow separators.

use std::collections::BTreeMap;
use std::fmt;

use crate::constants::is_block_level;

/// Represents the content of a document node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    /// The document root. Every tree has exactly one.
    Body,
    /// A markup tag with a name and attributes.
    Tag(TagContent),
    /// A word or a single punctuation character.
    Text(TextContent),
    /// A run of whitespace between two pieces of inline content.
    Whitespace(String),
    /// A break between two flow regions. Carries no content.
    Separator,
}

impl NodeContent {
    /// Creates tag content, deriving the block-level flag from the name.
    pub fn tag(qname: &str, attributes: BTreeMap<String, String>) -> Self {
        NodeContent::Tag(TagContent::new(qname, attributes))
    }

    /// Creates text content.
    pub fn text(text: &str, white_before: bool) -> Self {
        NodeContent::Text(TextContent::new(text, white_before))
    }

    /// Creates whitespace content.
    pub fn whitespace(text: &str) -> Self {
        NodeContent::Whitespace(text.to_string())
    }

    /// Returns true for the body root.
    pub fn is_body(&self) -> bool {
        matches!(self, NodeContent::Body)
    }

    /// Returns true for tag nodes.
    pub fn is_tag(&self) -> bool {
        matches!(self, NodeContent::Tag(_))
    }

    /// Returns true for nodes that own children (body and tags).
    pub fn is_container(&self) -> bool {
        matches!(self, NodeContent::Body | NodeContent::Tag(_))
    }

    /// Returns true for text and whitespace leaves.
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeContent::Text(_) | NodeContent::Whitespace(_))
    }

    /// Returns true for flow separators.
    pub fn is_separator(&self) -> bool {
        matches!(self, NodeContent::Separator)
    }

    /// Returns the tag content, if this is a tag.
    pub fn as_tag(&self) -> Option<&TagContent> {
        match self {
            NodeContent::Tag(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the text content, if this is a text leaf.
    pub fn as_text(&self) -> Option<&TextContent> {
        match self {
            NodeContent::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the tag name for tags, `None` otherwise.
    pub fn qname(&self) -> Option<&str> {
        self.as_tag().map(|t| t.qname())
    }

    /// Returns the literal text of a text or whitespace leaf.
    pub fn leaf_text(&self) -> Option<&str> {
        match self {
            NodeContent::Text(t) => Some(t.text()),
            NodeContent::Whitespace(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if both contents are of the same kind with the same
    /// tag name or the same text.
    ///
    /// Attributes and whitespace flags are ignored; this is the label used
    /// for positional comparisons.
    pub fn same_label(&self, other: &NodeContent) -> bool {
        match (self, other) {
            (NodeContent::Body, NodeContent::Body) => true,
            (NodeContent::Tag(a), NodeContent::Tag(b)) => a.qname == b.qname,
            (NodeContent::Text(a), NodeContent::Text(b)) => a.text == b.text,
            (NodeContent::Whitespace(a), NodeContent::Whitespace(b)) => a == b,
            (NodeContent::Separator, NodeContent::Separator) => true,
            _ => false,
        }
    }

    /// Tests content equality: same kind, same name and attributes for tags,
    /// same text for leaves.
    pub fn content_equals(&self, other: &NodeContent) -> bool {
        match (self, other) {
            (NodeContent::Tag(a), NodeContent::Tag(b)) => a.content_equals(b),
            _ => self.same_label(other),
        }
    }
}

impl fmt::Display for NodeContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeContent::Body => write!(f, "body"),
            NodeContent::Tag(t) => write!(f, "{}", t),
            NodeContent::Text(t) => write!(f, "\"{}\"", t.text),
            NodeContent::Whitespace(_) => write!(f, "' '"),
            NodeContent::Separator => write!(f, "|"),
        }
    }
}

/// A tag with a qualified name and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct TagContent {
    /// The qualified name, lowercased.
    qname: String,
    /// Attributes, kept sorted by name.
    attributes: BTreeMap<String, String>,
    /// Whether the tag starts a new flow region.
    block_level: bool,
}

impl TagContent {
    /// Creates a new tag. The name is lowercased.
    pub fn new(qname: &str, attributes: BTreeMap<String, String>) -> Self {
        let qname = qname.to_ascii_lowercase();
        let block_level = is_block_level(&qname);
        TagContent {
            qname,
            attributes,
            block_level,
        }
    }

    /// Returns the qualified name of the tag.
    pub fn qname(&self) -> &str {
        &self.qname
    }

    /// Returns the attributes.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Returns true if the tag starts a new flow region.
    pub fn is_block_level(&self) -> bool {
        self.block_level
    }

    /// Tests name and attribute equality.
    pub fn content_equals(&self, other: &TagContent) -> bool {
        self.qname == other.qname && self.attributes == other.attributes
    }
}

impl fmt::Display for TagContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.qname)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"{}\"", name, value)?;
        }
        write!(f, ">")
    }
}

/// A word or punctuation leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    text: String,
    /// Whether whitespace preceded this word in the source.
    white_before: bool,
}

impl TextContent {
    pub fn new(text: &str, white_before: bool) -> Self {
        TextContent {
            text: text.to_string(),
            white_before,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn white_before(&self) -> bool {
        self.white_before
    }

    pub fn set_white_before(&mut self, white_before: bool) {
        self.white_before = white_before;
    }
}
