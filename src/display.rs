//! Colored terminal rendering for run events.
//!
//! This is the bundled observer used by the CLI binary; library
//! consumers are expected to bring their own.

use std::io::{self, Write};

use chrono::Local;
use owo_colors::{AnsiColors, OwoColorize};

use crate::events::{Event, EventKind, Location};

/// Get current timestamp for the line prefix.
fn timestamp() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

/// Print one event to stdout.
pub fn print_event(event: &Event) {
    let ts = timestamp();
    match event.kind {
        // Session preamble, nothing to show.
        EventKind::Init => return,
        EventKind::Start => {
            println!("{} {}", ts.dimmed(), "[START]".green().bold());
        }
        EventKind::Stop => {
            println!("{} {}", ts.dimmed(), "[STOP]".green().bold());
        }
        EventKind::Reset => {
            println!("{} {}", ts.dimmed(), "[RESET]".yellow().bold());
        }
        EventKind::Mark => {
            println!("{} {}", ts.dimmed(), "----------------".dimmed());
        }
        EventKind::Message => {
            if event.location == Location::ErrorStream {
                println!("{} {}", ts.dimmed(), event.text.red());
            } else {
                println!("{} {}", ts.dimmed(), event.text);
            }
        }
        EventKind::Info => {
            let color = event.color.unwrap_or(AnsiColors::Default);
            println!("{} {}", ts.dimmed(), event.text.color(color).bold());
        }
        EventKind::Internal => {
            println!(
                "{} {} {}",
                ts.dimmed(),
                "[INTERNAL]".dimmed(),
                event.text.dimmed()
            );
        }
        EventKind::Issue => {
            if let Some(issue) = &event.issue {
                let position = match issue.column_number {
                    Some(column) => format!("{}:{}:{}", issue.path, issue.line_number, column),
                    None => format!("{}:{}", issue.path, issue.line_number),
                };
                println!(
                    "{} {} {} {}",
                    ts.dimmed(),
                    "[ISSUE]".red().bold(),
                    position.cyan(),
                    issue.issue_string
                );
            }
        }
    }
    let _ = io::stdout().flush();
}
