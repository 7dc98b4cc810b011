//! Colors for build-phase banner labels.

use owo_colors::AnsiColors;

/// Color used for banner labels not in the table.
pub const DEFAULT_LIGHT_COLOR: AnsiColors = AnsiColors::Default;

/// Look up the display color for a banner label token.
///
/// The table is fixed and read-only, so it may be consulted from any
/// number of tasks concurrently. Unrecognized labels get
/// [`DEFAULT_LIGHT_COLOR`].
#[must_use]
pub fn color_for_label(label: &str) -> AnsiColors {
    match label {
        "BUILD" | "BUILD TARGET" => AnsiColors::Blue,
        "COMPILE" | "COMPILING" => AnsiColors::Cyan,
        "LINK" | "LINKING" => AnsiColors::Magenta,
        "CLEAN" | "CLEANING" => AnsiColors::Yellow,
        "TEST" | "TESTING" => AnsiColors::Green,
        "ANALYZE" | "ANALYZING" => AnsiColors::BrightBlue,
        "WARNING" => AnsiColors::BrightYellow,
        "ERROR" | "FAILED" => AnsiColors::Red,
        "OK" | "DONE" | "SUCCEEDED" => AnsiColors::BrightGreen,
        _ => DEFAULT_LIGHT_COLOR,
    }
}
