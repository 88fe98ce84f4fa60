//! Markup printer that renders document trees.
//!
//! The body wrapper and separators are not printed. Whitespace leaves print
//! as a single space and text leaves are entity-escaped, so a parsed tree
//! prints back as its whitespace-normalized markup.

use std::io::Write;

use crate::constants::is_block_level;
use crate::node::{NodeContent, NodeRef, TagContent};

/// Options for markup printing.
#[derive(Debug, Clone, Default)]
pub struct HtmlPrinterOptions {
    /// Whether to put block-level tags on indented lines of their own.
    pub pretty_print: bool,
}

/// Markup printer that renders document trees.
pub struct HtmlPrinter<W: Write> {
    writer: W,
    options: HtmlPrinterOptions,
    indent: usize,
    /// Whether something has been written on the current line.
    line_open: bool,
}

impl<W: Write> HtmlPrinter<W> {
    /// Creates a new printer.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, HtmlPrinterOptions::default())
    }

    /// Creates a new printer with the given options.
    pub fn with_options(writer: W, options: HtmlPrinterOptions) -> Self {
        HtmlPrinter {
            writer,
            options,
            indent: 0,
            line_open: false,
        }
    }

    /// Prints a node tree to the output.
    pub fn print(&mut self, root: &NodeRef) -> std::io::Result<()> {
        self.print_node(root)?;
        if self.options.pretty_print && self.line_open {
            writeln!(self.writer)?;
            self.line_open = false;
        }
        self.writer.flush()
    }

    fn print_node(&mut self, node: &NodeRef) -> std::io::Result<()> {
        let borrowed = node.borrow();
        match borrowed.content() {
            NodeContent::Body => {
                for child in borrowed.children() {
                    self.print_node(child)?;
                }
            }
            NodeContent::Separator => {}
            NodeContent::Whitespace(_) => self.inline(" ")?,
            NodeContent::Text(text) => self.inline(&to_entities(text.text()))?,
            NodeContent::Tag(tag) => {
                let has_content = borrowed
                    .children()
                    .iter()
                    .any(|c| !c.borrow().content().is_separator());
                let block = self.options.pretty_print && tag.is_block_level();
                if block {
                    self.break_line()?;
                }
                let open = start_tag(tag);
                if !has_content {
                    self.inline(&format!("{} />", open))?;
                } else {
                    self.inline(&format!("{}>", open))?;
                    if block {
                        self.indent += 1;
                        self.break_line()?;
                    }
                    for child in borrowed.children() {
                        self.print_node(child)?;
                    }
                    if block {
                        self.indent -= 1;
                        self.break_line()?;
                    }
                    self.inline(&format!("</{}>", tag.qname()))?;
                }
                if block {
                    self.break_line()?;
                }
            }
        }
        Ok(())
    }

    /// Writes inline output, indenting first if a new line was started.
    fn inline(&mut self, s: &str) -> std::io::Result<()> {
        if self.options.pretty_print && !self.line_open {
            write!(self.writer, "{}", Self::indent_str(self.indent))?;
        }
        self.line_open = true;
        write!(self.writer, "{}", s)
    }

    fn break_line(&mut self) -> std::io::Result<()> {
        if self.line_open {
            writeln!(self.writer)?;
            self.line_open = false;
        }
        Ok(())
    }

    fn indent_str(level: usize) -> String {
        "  ".repeat(level)
    }
}

/// Builds `<name attr="value"...` without the closing bracket.
fn start_tag(tag: &TagContent) -> String {
    let mut s = String::new();
    s.push('<');
    s.push_str(tag.qname());
    // BTreeMap iteration is sorted by name
    for (name, value) in tag.attributes() {
        s.push(' ');
        s.push_str(name);
        s.push_str("=\"");
        s.push_str(&to_entities(value));
        s.push('"');
    }
    s
}

/// Converts special characters to XML entities.
fn to_entities(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\u{a0}' => result.push_str("&#160;"),
            _ => result.push(c),
        }
    }
    result
}

/// Prints a node tree to a string.
pub fn print_to_string(root: &NodeRef) -> String {
    render(root, HtmlPrinterOptions::default())
}

/// Prints a node tree to a string with block-level indentation.
pub fn print_to_string_pretty(root: &NodeRef) -> String {
    render(root, HtmlPrinterOptions { pretty_print: true })
}

fn render(root: &NodeRef, options: HtmlPrinterOptions) -> String {
    let mut output = Vec::new();
    if let Err(e) = HtmlPrinter::with_options(&mut output, options).print(root) {
        tracing::warn!(error = %e, "printing to memory failed");
    }
    String::from_utf8_lossy(&output).into_owned()
}

/// Collapses formatting whitespace in markup.
///
/// Whitespace next to a block-level tag is removed; any other whitespace
/// run becomes a single space, so spacing around inline tags still counts.
/// Inside tags, runs collapse to one space and the space before `/>` goes.
/// `"<p>A</p>\n  <p>B <b>c</b></p>"` normalizes to `"<p>A</p><p>B <b>c</b></p>"`.
pub fn normalize_markup(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut pending_white = false;
    // Nothing before the first token counts as content.
    let mut after_block = true;
    let mut rest = markup;

    while let Some(c) = rest.chars().next() {
        if c == '<' {
            let end = rest.find('>').map_or(rest.len(), |i| i + 1);
            let tag = normalize_tag(&rest[..end]);
            let block = is_block_level(tag_name(&tag));
            if pending_white && !block && !after_block {
                out.push(' ');
            }
            out.push_str(&tag);
            after_block = block;
            pending_white = false;
            rest = &rest[end..];
            continue;
        }

        if c.is_whitespace() {
            pending_white = true;
        } else {
            if pending_white && !after_block {
                out.push(' ');
            }
            out.push(c);
            after_block = false;
            pending_white = false;
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn normalize_tag(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace(" />", "/>").replace(" >", ">")
}

/// Name of a start or end tag such as `<p class="x">` or `</p>`.
fn tag_name(tag: &str) -> &str {
    let inner = tag.trim_start_matches('<').trim_start_matches('/');
    let end = inner
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(inner.len());
    &inner[..end]
}
