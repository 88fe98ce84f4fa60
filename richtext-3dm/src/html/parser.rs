//! Markup parser that builds document trees.
//!
//! This parser uses quick-xml's streaming API. Character data is split into
//! word leaves, whitespace between inline content becomes whitespace leaves,
//! and block-level tags mark flow boundaries with separator nodes.

use std::collections::BTreeMap;
use std::path::Path;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::constants::{is_delimiter, BODY_TAG, PRE_TAG};
use crate::error::{Error, Result};
use crate::node::{new_node, NodeContent, NodeInner, NodeRef, TagContent};

/// Markup parser that builds document trees.
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        HtmlParser
    }

    /// Parses markup from a string.
    ///
    /// If the markup contains a `<body>` element only its content is used;
    /// otherwise the whole input is treated as body content.
    pub fn parse_str(&self, markup: &str) -> Result<NodeRef> {
        let mut reader = Reader::from_str(markup);
        // Don't trim text - whitespace is significant between inline content
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        let has_body = markup.to_ascii_lowercase().contains("<body");
        let mut builder = TreeBuilder::new(has_body);

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let tag = self.parse_tag(e, &reader)?;
                    builder.start_element(tag);
                }
                Ok(Event::End(ref e)) => {
                    let name = reader
                        .decoder()
                        .decode(e.name().as_ref())
                        .map_err(|e| Error::Parse(e.to_string()))?
                        .to_ascii_lowercase();
                    builder.end_element(&name);
                }
                Ok(Event::Empty(ref e)) => {
                    // Self-closing tag - handle like Start + End
                    let tag = self.parse_tag(e, &reader)?;
                    let name = tag.qname().to_string();
                    builder.start_element(tag);
                    builder.end_element(&name);
                }
                Ok(Event::Text(ref e)) => {
                    let text =
                        std::str::from_utf8(e.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
                    builder.characters(text);
                }
                Ok(Event::CData(ref e)) => {
                    let text =
                        std::str::from_utf8(e.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
                    builder.characters(text);
                }
                Ok(Event::GeneralRef(ref e)) => {
                    let name =
                        std::str::from_utf8(e.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
                    let resolved = resolve_entity(name)
                        .ok_or_else(|| Error::Parse(format!("unknown entity &{};", name)))?;
                    builder.characters(&resolved);
                }
                Ok(Event::Eof) => break,
                Ok(Event::Comment(_))
                | Ok(Event::Decl(_))
                | Ok(Event::PI(_))
                | Ok(Event::DocType(_)) => {}
                Err(e) => {
                    return Err(Error::Parse(format!(
                        "{} at position {}",
                        e,
                        reader.error_position()
                    )))
                }
            }
        }

        Ok(builder.finish())
    }

    /// Parses markup from a file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<NodeRef> {
        let markup = std::fs::read_to_string(path)?;
        self.parse_str(&markup)
    }

    /// Parses a tag's name and attributes.
    fn parse_tag(&self, e: &BytesStart, reader: &Reader<&[u8]>) -> Result<TagContent> {
        let name = reader
            .decoder()
            .decode(e.name().as_ref())
            .map_err(|e| Error::Parse(e.to_string()))?
            .to_string();

        let mut attributes = BTreeMap::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|e| Error::Parse(format!("attribute error: {}", e)))?;
            let key = reader
                .decoder()
                .decode(attr.key.as_ref())
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_ascii_lowercase();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            attributes.insert(key, value);
        }

        Ok(TagContent::new(&name, attributes))
    }
}

/// Resolves a general entity or character reference.
fn resolve_entity(name: &str) -> Option<String> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number
            .strip_prefix('x')
            .or_else(|| number.strip_prefix('X'))
        {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    if name == "nbsp" {
        return Some("\u{a0}".to_string());
    }
    resolve_predefined_entity(name).map(String::from)
}

/// Where the reader is relative to the `<body>` element.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Region {
    BeforeBody,
    InBody,
    AfterBody,
}

/// State of the current text flow, for separator placement.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Flow {
    /// Nothing emitted yet.
    Empty,
    /// The last flow item is a leaf.
    Content,
    /// The last flow item is a separator.
    Separated,
}

/// Event handler assembling the tree.
struct TreeBuilder {
    body: NodeRef,
    stack: Vec<NodeRef>,
    word: String,
    pending_white: bool,
    /// Whether the flow so far ends in inline content.
    inline_before: bool,
    flow: Flow,
    pre_depth: usize,
    region: Region,
}

impl TreeBuilder {
    fn new(has_body: bool) -> Self {
        let body = new_node(NodeContent::Body);
        TreeBuilder {
            stack: vec![body.clone()],
            body,
            word: String::new(),
            pending_white: false,
            inline_before: false,
            flow: Flow::Empty,
            pre_depth: 0,
            region: if has_body {
                Region::BeforeBody
            } else {
                Region::InBody
            },
        }
    }

    fn current(&self) -> &NodeRef {
        self.stack.last().unwrap_or(&self.body)
    }

    fn start_element(&mut self, tag: TagContent) {
        match self.region {
            Region::BeforeBody => {
                if tag.qname() == BODY_TAG {
                    self.region = Region::InBody;
                }
                return;
            }
            Region::AfterBody => return,
            Region::InBody => {}
        }

        self.end_word();
        let block = tag.is_block_level();
        if block {
            self.pending_white = false;
            self.inline_before = false;
        } else {
            self.emit_pending_white();
        }
        let is_pre = tag.qname() == PRE_TAG;

        let node = new_node(NodeContent::Tag(tag));
        NodeInner::add_child_to_ref(self.current(), node.clone());
        self.stack.push(node);

        if is_pre {
            self.pre_depth += 1;
        }
        if block {
            self.add_separator();
        }
    }

    fn end_element(&mut self, name: &str) {
        match self.region {
            Region::InBody => {}
            _ => return,
        }
        if name == BODY_TAG && self.stack.len() == 1 {
            self.region = Region::AfterBody;
            return;
        }

        self.end_word();
        let (block, is_pre) = {
            let current = self.current().borrow();
            let block = current
                .content()
                .as_tag()
                .is_some_and(|t| t.is_block_level());
            (block, current.qname() == Some(PRE_TAG))
        };
        if block {
            self.pending_white = false;
            self.add_separator();
            self.inline_before = false;
        } else {
            self.inline_before = true;
        }
        if is_pre {
            self.pre_depth = self.pre_depth.saturating_sub(1);
        }
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn characters(&mut self, text: &str) {
        if self.region != Region::InBody {
            return;
        }
        for c in text.chars() {
            if is_delimiter(c) {
                self.end_word();
                if c.is_whitespace() && self.pre_depth == 0 {
                    self.pending_white = true;
                } else {
                    self.emit_text(c.to_string());
                }
            } else {
                self.word.push(c);
            }
        }
    }

    fn end_word(&mut self) {
        if !self.word.is_empty() {
            let word = std::mem::take(&mut self.word);
            self.emit_text(word);
        }
    }

    fn emit_text(&mut self, text: String) {
        let white_before = self.pending_white;
        self.emit_pending_white();
        let leaf = new_node(NodeContent::text(&text, white_before));
        NodeInner::add_child_to_ref(self.current(), leaf);
        self.flow = Flow::Content;
        self.inline_before = true;
    }

    /// Emits a whitespace leaf if whitespace is pending after inline content.
    fn emit_pending_white(&mut self) {
        if self.pending_white && self.inline_before {
            let white = new_node(NodeContent::whitespace(" "));
            NodeInner::add_child_to_ref(self.current(), white);
            self.flow = Flow::Content;
        }
        self.pending_white = false;
    }

    /// Appends a separator to the current node unless the flow is empty or
    /// already ends in one.
    fn add_separator(&mut self) {
        if self.flow == Flow::Content {
            NodeInner::add_child_to_ref(self.current(), new_node(NodeContent::Separator));
            self.flow = Flow::Separated;
        }
    }

    fn finish(mut self) -> NodeRef {
        self.end_word();
        tracing::trace!(nodes = self.body.borrow().child_count(), "parsed document body");
        self.body
    }
}

/// Parses markup from a file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<NodeRef> {
    HtmlParser::new().parse_file(path)
}

/// Parses markup from a string.
pub fn parse_str(markup: &str) -> Result<NodeRef> {
    HtmlParser::new().parse_str(markup)
}
