//! Core types for pod-tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Carrier tracking number driving one pipeline iteration
///
/// Identifiers are opaque; the pipeline never mutates them.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Create a new Identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Identifier {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which carrier credential set a token is requested for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialPurpose {
    /// Tracking and tracking-document APIs
    #[default]
    Tracking,
    /// Address validation API
    AddressValidation,
}

impl std::fmt::Display for CredentialPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialPurpose::Tracking => f.write_str("tracking"),
            CredentialPurpose::AddressValidation => f.write_str("address validation"),
        }
    }
}

/// Bearer credential returned by the carrier auth endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token for the Authorization header
    pub fn secret(&self) -> &str {
        &self.0
    }
}

// Keep tokens out of logs
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Carrier status code for one identifier
///
/// `Delivered` is the only code that triggers proof-of-delivery retrieval.
/// `NotFound` and `Error` are synthesized by the tracking client; every other
/// carrier code is carried through verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrackingStatus {
    /// Final delivery (`DL`)
    Delivered,
    /// The carrier has no result for the identifier
    NotFound,
    /// Status lookup failed after all retries
    Error,
    /// Any other carrier-derived code (in transit, exception, ...)
    Carrier(String),
}

impl TrackingStatus {
    /// Carrier code for final delivery
    pub const DELIVERED_CODE: &'static str = "DL";

    /// Parse a carrier-derived code
    pub fn from_code(code: &str) -> Self {
        match code {
            Self::DELIVERED_CODE => TrackingStatus::Delivered,
            "NOT_FOUND" => TrackingStatus::NotFound,
            "ERROR" => TrackingStatus::Error,
            other => TrackingStatus::Carrier(other.to_string()),
        }
    }

    /// Code as reported to callers
    pub fn code(&self) -> &str {
        match self {
            TrackingStatus::Delivered => Self::DELIVERED_CODE,
            TrackingStatus::NotFound => "NOT_FOUND",
            TrackingStatus::Error => "ERROR",
            TrackingStatus::Carrier(code) => code,
        }
    }

    /// Whether the shipment reached final delivery
    pub fn is_delivered(&self) -> bool {
        matches!(self, TrackingStatus::Delivered)
    }
}

impl From<String> for TrackingStatus {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl From<TrackingStatus> for String {
    fn from(status: TrackingStatus) -> Self {
        status.code().to_string()
    }
}

impl std::fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of a status lookup, produced once per identifier
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    /// The identifier that was looked up
    pub identifier: Identifier,
    /// Terminal status code
    pub status: TrackingStatus,
    /// Human-readable reason (empty for delivered shipments)
    pub reason: String,
}

impl StatusResult {
    /// Create a new status result
    pub fn new(identifier: Identifier, status: TrackingStatus, reason: impl Into<String>) -> Self {
        Self {
            identifier,
            status,
            reason: reason.into(),
        }
    }
}

/// A proof-of-delivery document persisted for a delivered identifier
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Identifier the document belongs to
    pub identifier: Identifier,
    /// Where the document was written
    pub path: PathBuf,
    /// Size of the written document
    pub size_bytes: u64,
}

/// Severity of a progress notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational step
    Info,
    /// A step completed
    Success,
    /// Recoverable problem
    Warning,
    /// Failure
    Error,
}

/// One timestamped progress notification
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Message shown to the user
    pub message: String,
    /// Severity used for styling
    #[serde(rename = "type")]
    pub severity: Severity,
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
    /// Overall completion, 0 to 100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

/// Terminal summary of a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSummary {
    /// False only when the run aborted on authentication
    pub success: bool,
    /// Number of retrieved POD documents
    pub merged_document_count: usize,
    /// Whether a merged output document was produced
    pub has_merged_output: bool,
    /// Failure message for an aborted run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Event delivered to the run observer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    /// Progress notification
    Status(ProgressEvent),
    /// Exactly one per run, always last
    Complete(CompletionSummary),
}

impl Event {
    /// Server-sent-events name of this event
    pub fn name(&self) -> &'static str {
        match self {
            Event::Status(_) => "status",
            Event::Complete(_) => "complete",
        }
    }

    /// Render as a server-sent-events frame (`event:` and `data:` lines)
    pub fn to_sse_frame(&self) -> String {
        let data = match self {
            Event::Status(status) => serde_json::to_string(status),
            Event::Complete(summary) => serde_json::to_string(summary),
        }
        .unwrap_or_else(|_| "{}".to_string());
        format!("event: {}\ndata: {}\n\n", self.name(), data)
    }

    /// Whether this is the terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Complete(_))
    }
}
