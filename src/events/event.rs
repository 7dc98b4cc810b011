//! Consumer-facing events.

use owo_colors::AnsiColors;
use serde::Serialize;

use crate::run::StreamOrigin;

/// Stream a line-derived event came from. Lifecycle events (`Init`,
/// `Start`, `Stop`) report `OutputStream`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Location {
    #[default]
    OutputStream,
    ErrorStream,
}

impl From<StreamOrigin> for Location {
    fn from(origin: StreamOrigin) -> Self {
        match origin {
            StreamOrigin::Stdout => Self::OutputStream,
            StreamOrigin::Stderr => Self::ErrorStream,
        }
    }
}

/// The fixed event vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Init,
    Start,
    Stop,
    Reset,
    Mark,
    Message,
    Info,
    Internal,
    Issue,
}

/// Source position carried by [`EventKind::Issue`] events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueFields {
    pub path: String,
    /// One-based.
    #[serde(rename = "lineNumber")]
    pub line_number: u32,
    /// One-based; `None` when the diagnostic omitted it.
    #[serde(rename = "columnNumber", skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
    #[serde(rename = "issueString")]
    pub issue_string: String,
}

/// One event handed to the observer. Immutable once built; the core
/// keeps no reference after emission.
///
/// The serialized representation carries `type` and `string`, plus the
/// issue fields for `Issue` events. `location` and `color` are
/// presentation details for in-process observers and stay off the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(rename = "string")]
    pub text: String,
    #[serde(skip)]
    pub location: Location,
    /// Display color for `Info` events.
    #[serde(skip)]
    pub color: Option<AnsiColors>,
    #[serde(flatten)]
    pub issue: Option<IssueFields>,
}

impl Event {
    #[must_use]
    pub fn new(kind: EventKind, text: impl Into<String>, location: Location) -> Self {
        Self {
            kind,
            text: text.into(),
            location,
            color: None,
            issue: None,
        }
    }

    /// Build an `Info` event for a build-phase banner.
    #[must_use]
    pub fn info(name: impl Into<String>, color: AnsiColors, location: Location) -> Self {
        Self {
            kind: EventKind::Info,
            text: name.into(),
            location,
            color: Some(color),
            issue: None,
        }
    }

    /// Build an `Issue` event. The text is the diagnostic in canonical
    /// `path:line[:col]: message` form.
    #[must_use]
    pub fn issue(fields: IssueFields, location: Location) -> Self {
        let text = match fields.column_number {
            Some(column) => format!(
                "{}:{}:{}: {}",
                fields.path, fields.line_number, column, fields.issue_string
            ),
            None => format!(
                "{}:{}: {}",
                fields.path, fields.line_number, fields.issue_string
            ),
        };
        Self {
            kind: EventKind::Issue,
            text,
            location,
            color: None,
            issue: Some(fields),
        }
    }

    /// Returns true for the final event of a run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.kind == EventKind::Stop
    }
}
