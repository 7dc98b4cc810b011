//! Classified line records.

use owo_colors::AnsiColors;

/// The structured outcome of classifying one raw line.
///
/// Classification is total and 1:1: every raw line maps to exactly one
/// variant, and nothing is ever merged, split, or dropped. Text that
/// looks diagnostic-shaped but fails to parse degrades to `ParseError`
/// with the raw line intact rather than raising an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// Sentinel: all accumulated downstream display state should be
    /// discarded. A signal only; the core holds no state of its own.
    Reset,
    /// Sentinel: a visual separator should be inserted.
    Mark,
    /// Ordinary stdout text.
    Message(String),
    /// Ordinary stderr text.
    Error(String),
    /// A diagnostic-shaped line whose position fields did not parse; the
    /// raw text is carried forward so nothing is silently lost.
    ParseError(String),
    /// Build-phase banner.
    Light {
        /// Display name extracted from the banner label.
        name: String,
        /// Display color from the static label table.
        color: AnsiColors,
    },
    /// Compiler diagnostic with a source position.
    FileIssue {
        path: String,
        /// One-based line number.
        line: u32,
        /// One-based column number; `None` when the diagnostic omits it.
        column: Option<u32>,
        message: String,
    },
}
