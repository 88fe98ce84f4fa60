//! Markup parsing and output.
//!
//! The parser turns XHTML-style markup into a document tree of word-level
//! leaves; the printer renders a tree back into markup.

mod parser;
mod printer;

pub use parser::{parse_file, parse_str, HtmlParser};
pub use printer::{normalize_markup, print_to_string, print_to_string_pretty, HtmlPrinter, HtmlPrinterOptions};
