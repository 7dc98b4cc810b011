//! Events module tests.


/// Verify all public event types are exported from the library.
#[test]
fn all_event_types_exported() {
    use spork::events::{Event, EventFactory, EventKind, IssueFields, Location, DEFAULT_EVENT_BUFFER};

    let _ = EventFactory::new();
    let event = Event::new(EventKind::Init, "", Location::OutputStream);
    assert!(!event.is_terminal());

    let _ = IssueFields {
        path: String::new(),
        line_number: 1,
        column_number: None,
        issue_string: String::new(),
    };
    assert!(DEFAULT_EVENT_BUFFER > 0);
}
