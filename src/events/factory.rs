//! Mapping from run notifications and classified lines to events.

use futures_util::StreamExt;
use tokio::sync::mpsc::{self, Receiver};

use crate::parser::{OutputParser, ParsedLine};
use crate::run::{StreamOrigin, TaskNotification};

use super::{Event, EventKind, IssueFields, Location};

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Builds consumer-facing [`Event`]s out of raw lines.
///
/// Each raw line produces exactly one event, in the order the line was
/// produced on its stream.
#[derive(Debug, Default)]
pub struct EventFactory {
    parser: OutputParser,
}

impl EventFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one raw line and build its event.
    ///
    /// `location` always mirrors the origin stream, whatever the
    /// classification outcome.
    #[must_use]
    pub fn event_for_line(&self, text: &str, origin: StreamOrigin) -> Event {
        let location = Location::from(origin);
        match self.parser.parse_line(text, origin) {
            ParsedLine::Reset => Event::new(EventKind::Reset, "", location),
            ParsedLine::Mark => Event::new(EventKind::Mark, "", location),
            ParsedLine::Message(text) | ParsedLine::Error(text) => {
                Event::new(EventKind::Message, text, location)
            }
            ParsedLine::ParseError(raw) => Event::new(EventKind::Internal, raw, location),
            ParsedLine::Light { name, color } => Event::info(name, color, location),
            ParsedLine::FileIssue {
                path,
                line,
                column,
                message,
            } => Event::issue(
                IssueFields {
                    path,
                    line_number: line,
                    column_number: column,
                    issue_string: message,
                },
                location,
            ),
        }
    }

    /// Map one run notification to its event.
    #[must_use]
    pub fn event_for_notification(&self, notification: TaskNotification) -> Event {
        match notification {
            TaskNotification::Started => {
                Event::new(EventKind::Start, "", Location::OutputStream)
            }
            TaskNotification::Stopped => Event::new(EventKind::Stop, "", Location::OutputStream),
            TaskNotification::Line { text, origin } => self.event_for_line(&text, origin),
        }
    }

    /// Pump a notification channel into a bounded event channel.
    ///
    /// The bounded send is the backpressure seam: when the consumer lags,
    /// the pump blocks, the notification channel fills, and the pipe
    /// readers stall. No event is ever dropped.
    #[must_use]
    pub fn into_channel(
        self,
        mut notifications: Receiver<TaskNotification>,
        capacity: usize,
    ) -> Receiver<Event> {
        let (tx, rx) = mpsc::channel(capacity);
        tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                let event = self.event_for_notification(notification);
                if tx.send(event).await.is_err() {
                    tracing::debug!("event receiver dropped, stopping pump");
                    break;
                }
            }
        });
        rx
    }

    /// Consume a notification channel as an ordered stream of events.
    ///
    /// One `Init` event precedes the first notification, as the session
    /// preamble.
    pub fn event_stream(
        self,
        notifications: Receiver<TaskNotification>,
    ) -> impl futures_core::Stream<Item = Event> {
        let init = futures_util::stream::once(async {
            Event::new(EventKind::Init, "", Location::OutputStream)
        });
        let rest = futures_util::stream::unfold(
            (self, notifications),
            |(factory, mut notifications)| async move {
                let notification = notifications.recv().await?;
                let event = factory.event_for_notification(notification);
                Some((event, (factory, notifications)))
            },
        );
        init.chain(rest)
    }
}
