//! Constants used throughout the diff engine.

/// Tags acting as conflict scopes: the body, paragraphs and table cells.
pub const STRUCTURE_TAGS: [&str; 3] = ["body", "p", "td"];

/// Tags that start a new text flow and emit separators.
pub const BLOCK_LEVEL_TAGS: [&str; 27] = [
    "html",
    "body",
    "p",
    "blockquote",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "pre",
    "div",
    "ul",
    "ol",
    "li",
    "dl",
    "dt",
    "dd",
    "table",
    "thead",
    "tbody",
    "tfoot",
    "tr",
    "td",
    "th",
    "hr",
    "br",
];

/// Tag name of a table.
pub const TABLE_TAG: &str = "table";

/// Tag name of a table row.
pub const ROW_TAG: &str = "tr";

/// Tag names of table cells.
pub const CELL_TAGS: [&str; 2] = ["td", "th"];

/// Tag name of preformatted blocks.
pub const PRE_TAG: &str = "pre";

/// Tag name of the document body.
pub const BODY_TAG: &str = "body";

/// Two tags whose text-only match ratio exceeds this are never the same node.
pub const MAX_MATCH_RATIO: f64 = 0.5;

/// Exponent bounding alignment work on long sequences.
pub const POW_LIMIT: f64 = 1.5;

/// Product of sequence lengths above which alignment work is bounded.
pub const TOO_LONG: f64 = 150.0 * 150.0;

/// Milliseconds allowed for aligning sequences past `TOO_LONG`.
pub const ALIGN_DEADLINE_MS: u64 = 1000;

/// Returns true if the given tag name starts a new text flow.
pub fn is_block_level(name: &str) -> bool {
    BLOCK_LEVEL_TAGS
        .iter()
        .any(|tag| tag.eq_ignore_ascii_case(name))
}

/// Returns true if the character ends a word.
///
/// Whitespace and a fixed set of punctuation split character data into
/// separate leaves; punctuation delimiters become leaves of their own.
pub fn is_delimiter(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '/' | '.'
                | '!'
                | ','
                | ';'
                | '?'
                | '='
                | '\''
                | '"'
                | '['
                | ']'
                | '{'
                | '}'
                | '('
                | ')'
                | '&'
                | '|'
                | '\\'
                | '-'
                | '_'
                | '+'
                | '*'
                | ':'
        )
}
