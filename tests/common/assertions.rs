//! Progress stream assertions for integration tests

use pod_tracker::{CompletionSummary, Event, ProgressEvent, ProgressObserver, Severity};
use std::path::Path;

/// Status events of a drained stream
pub fn status_events(events: &[Event]) -> Vec<&ProgressEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Status(status) => Some(status),
            Event::Complete(_) => None,
        })
        .collect()
}

/// Messages of status events with the given severity
pub fn messages_with(events: &[Event], severity: Severity) -> Vec<String> {
    status_events(events)
        .into_iter()
        .filter(|s| s.severity == severity)
        .map(|s| s.message.clone())
        .collect()
}

/// Whether any status message starts with `prefix`
pub fn has_message(events: &[Event], prefix: &str) -> bool {
    status_events(events)
        .iter()
        .any(|s| s.message.starts_with(prefix))
}

/// Assert the stream ends with exactly one terminal event and return its summary
pub fn assert_single_terminal(events: &[Event]) -> &CompletionSummary {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "expected exactly one terminal event");
    match events.last() {
        Some(Event::Complete(summary)) => summary,
        other => panic!("terminal event is not last: {:?}", other),
    }
}

/// Assert reported percentages never decrease
pub fn assert_progress_monotonic(events: &[Event]) {
    let percents: Vec<u8> = status_events(events)
        .iter()
        .filter_map(|s| s.progress)
        .collect();
    assert!(
        percents.windows(2).all(|w| w[0] <= w[1]),
        "progress went backwards: {:?}",
        percents
    );
}

/// Wait until the observer is closed and collect everything it received
pub async fn collect_all(mut observer: ProgressObserver) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = observer.recv().await {
        events.push(event);
    }
    events
}

/// Assert a directory exists and holds no entries
pub fn assert_dir_empty(dir: &Path) {
    let entries: Vec<_> = std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    assert!(entries.is_empty(), "leftover files: {:?}", entries);
}
