//! Progress reporting to a single run observer
//!
//! The pipeline pushes [`Event`]s into an unbounded channel owned by exactly
//! one [`ProgressObserver`]. The reporter never blocks and never fails: if the
//! observer has been dropped, events are discarded and the run carries on,
//! which is how a caller abandons a run it no longer cares about.
//!
//! ```no_run
//! use pod_tracker::progress;
//! use pod_tracker::types::Severity;
//!
//! # async fn example() {
//! let (reporter, mut observer) = progress::channel();
//! reporter.emit("Starting", Severity::Info, Some(0));
//! while let Some(event) = observer.recv().await {
//!     print!("{}", event.to_sse_frame());
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! # }
//! ```

use crate::types::{CompletionSummary, Event, ProgressEvent, Severity};
use chrono::Utc;
use std::ops::Range;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Create a connected reporter / observer pair
pub fn channel() -> (ProgressReporter, ProgressObserver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressReporter { tx }, ProgressObserver { rx })
}

/// Sending half: pushes timestamped events to the observer
#[derive(Clone, Debug)]
pub struct ProgressReporter {
    tx: mpsc::UnboundedSender<Event>,
}

impl ProgressReporter {
    /// Reporter whose events go nowhere
    pub fn detached() -> Self {
        channel().0
    }

    /// Emit a progress notification
    ///
    /// The message is mirrored to `tracing` at the level matching `severity`.
    pub fn emit(&self, message: impl Into<String>, severity: Severity, progress: Option<u8>) {
        let message = message.into();
        match severity {
            Severity::Info | Severity::Success => tracing::info!(progress, "{}", message),
            Severity::Warning => tracing::warn!(progress, "{}", message),
            Severity::Error => tracing::error!(progress, "{}", message),
        }

        let event = ProgressEvent {
            message,
            severity,
            timestamp: Utc::now(),
            progress: progress.map(|p| p.min(100)),
        };
        // Observer gone means the caller abandoned the run
        self.tx.send(Event::Status(event)).ok();
    }

    /// Informational step
    pub fn info(&self, message: impl Into<String>) {
        self.emit(message, Severity::Info, None);
    }

    /// Completed step
    pub fn success(&self, message: impl Into<String>) {
        self.emit(message, Severity::Success, None);
    }

    /// Recoverable problem
    pub fn warning(&self, message: impl Into<String>) {
        self.emit(message, Severity::Warning, None);
    }

    /// Failure
    pub fn error(&self, message: impl Into<String>) {
        self.emit(message, Severity::Error, None);
    }

    /// Send the terminal event
    ///
    /// Consumes the reporter so nothing can be emitted after it.
    pub fn finish(self, summary: CompletionSummary) {
        tracing::info!(
            success = summary.success,
            documents = summary.merged_document_count,
            merged = summary.has_merged_output,
            "run finished"
        );
        self.tx.send(Event::Complete(summary)).ok();
    }
}

/// Receiving half: the single consumer of a run's events
#[derive(Debug)]
pub struct ProgressObserver {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl ProgressObserver {
    /// Wait for the next event; `None` once every reporter is gone
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Take every event already delivered without waiting
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Consume events as a `Stream` (for SSE and similar transports)
    pub fn into_stream(self) -> UnboundedReceiverStream<Event> {
        UnboundedReceiverStream::new(self.rx)
    }
}

/// Percent for the identifier loop after `processed` of `total` identifiers
///
/// Maps progress linearly into `band`, so the loop never reports less than
/// `band.start` or more than `band.end`, and never goes backwards.
pub fn loop_percent(processed: usize, total: usize, band: &Range<u8>) -> u8 {
    if total == 0 {
        return band.end;
    }
    let processed = processed.min(total) as f64;
    let width = f64::from(band.end.saturating_sub(band.start));
    let percent = f64::from(band.start) + processed / total as f64 * width;
    percent as u8
}
