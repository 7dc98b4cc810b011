//! Line classification.
//!
//! `OutputParser` turns each raw line into exactly one [`ParsedLine`].
//! Classification keeps no mutable state and is deterministic, so a
//! single parser may serve every reader task concurrently.

use regex::Regex;

use crate::run::StreamOrigin;

use super::{color_for_label, ParsedLine};

/// Sentinel line signalling that downstream display state should be
/// discarded.
pub const RESET_SENTINEL: &str = "=== RESET ===";

/// Sentinel line signalling a visual separator.
pub const MARK_SENTINEL: &str = "=== MARK ===";

/// Classifier for raw output lines.
///
/// Match order, first match wins: reset sentinel, mark sentinel,
/// diagnostic grammar (`path:line[:col]: message`), banner, then the
/// origin-dependent fallback (`Message` for stdout, `Error` for stderr).
#[derive(Debug)]
pub struct OutputParser {
    diagnostic: Regex,
    banner: Regex,
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputParser {
    /// Create a parser with the fixed grammars compiled.
    #[must_use]
    pub fn new() -> Self {
        // Fixed literals; compilation cannot fail. The position fields
        // accept any colon-free, space-free token so that a path-like
        // prefix with a malformed position still matches and can degrade
        // to ParseError instead of falling through to the fallback.
        Self {
            diagnostic: Regex::new(r"^([^:]+):([^:\s]+)(?::([^:\s]+))?:\s?(.*)$")
                .expect("diagnostic pattern is a fixed literal"),
            banner: Regex::new(r"^={3,}\s+(.+?)\s+={3,}$")
                .expect("banner pattern is a fixed literal"),
        }
    }

    /// Classify one line.
    #[must_use]
    pub fn parse_line(&self, text: &str, origin: StreamOrigin) -> ParsedLine {
        if text == RESET_SENTINEL {
            return ParsedLine::Reset;
        }
        if text == MARK_SENTINEL {
            return ParsedLine::Mark;
        }

        if let Some(parsed) = self.parse_diagnostic(text) {
            return parsed;
        }
        if let Some(parsed) = self.parse_banner(text) {
            return parsed;
        }

        match origin {
            StreamOrigin::Stdout => ParsedLine::Message(text.to_string()),
            StreamOrigin::Stderr => ParsedLine::Error(text.to_string()),
        }
    }

    /// Match `path:line[:col]: message` where the leading segment is
    /// path-like. Position fields that are present but malformed
    /// (non-numeric, zero, or too large for `u32`) degrade to
    /// `ParseError`.
    fn parse_diagnostic(&self, text: &str) -> Option<ParsedLine> {
        let captures = self.diagnostic.captures(text)?;
        let path = &captures[1];
        if !looks_like_path(path) {
            return None;
        }

        let line = captures[2].parse::<u32>();
        let column = captures.get(3).map(|m| m.as_str().parse::<u32>());
        let (line, column) = match (line, column) {
            (Ok(line), None) if line >= 1 => (line, None),
            (Ok(line), Some(Ok(column))) if line >= 1 && column >= 1 => (line, Some(column)),
            _ => return Some(ParsedLine::ParseError(text.to_string())),
        };

        Some(ParsedLine::FileIssue {
            path: path.to_string(),
            line,
            column,
            message: captures[4].trim_start().to_string(),
        })
    }

    fn parse_banner(&self, text: &str) -> Option<ParsedLine> {
        let captures = self.banner.captures(text)?;
        let (key, name) = split_label(&captures[1]);
        Some(ParsedLine::Light {
            color: color_for_label(&key),
            name,
        })
    }
}

/// Split a banner label into its color-table key (the leading run of
/// ALL-CAPS words) and the display name (the remainder, or the key
/// itself when every word is caps).
fn split_label(label: &str) -> (String, String) {
    let words: Vec<&str> = label.split_whitespace().collect();
    let caps = words.iter().take_while(|word| is_caps_word(word)).count();

    let key = words[..caps].join(" ");
    let name = if caps == words.len() {
        key.clone()
    } else {
        words[caps..].join(" ")
    };
    (key, name)
}

fn is_caps_word(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_uppercase())
        && word
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// A diagnostic's leading segment must contain a path separator or end
/// in a file extension; bare words like `note` never start a diagnostic.
fn looks_like_path(segment: &str) -> bool {
    if segment.contains('/') {
        return true;
    }
    segment
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| {
            !stem.is_empty() && !ext.is_empty() && ext.chars().all(char::is_alphanumeric)
        })
}
