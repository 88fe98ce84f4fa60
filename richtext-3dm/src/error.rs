//! Error types for rich-text diffing.

use thiserror::Error;

/// Result type alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading documents or configuration.
///
/// The diff, conflict and merge algorithms themselves never fail; only the
/// markup front end, file access and configuration loading do.
#[derive(Error, Debug)]
pub enum Error {
    /// Markup could not be turned into a document tree.
    #[error("markup parse error: {0}")]
    Parse(String),

    /// Configuration file was unreadable or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
