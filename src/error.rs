//! Error types for pod-tracker
//!
//! This module provides the error taxonomy for a tracking run:
//! - [`AuthError`] is the only failure that aborts a run
//! - [`MergeError`] classifies per-document failures inside the merge engine
//! - [`Error`] is the crate-wide error used by the carrier client and helpers
//!
//! Per-identifier and per-document failures never surface as `Err` from
//! [`Pipeline::run`](crate::pipeline::Pipeline::run); they are absorbed into
//! progress events and fields of the result structure.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pod-tracker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pod-tracker
///
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "merge.primary_batch_size")
        key: Option<String>,
    },

    /// Failed to obtain a carrier access token
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Carrier API answered with a non-success HTTP status
    #[error("carrier API returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Response payload could not be parsed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document payload was not valid base64
    #[error("invalid document encoding: {0}")]
    Decode(#[from] base64::DecodeError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document merge error
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    /// External tool execution failed (gs)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Authentication failures (fatal for a run)
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token request could not be sent or its response not read
    #[error("token request failed: {0}")]
    RequestFailed(String),

    /// The auth endpoint rejected the credentials
    #[error("token request rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The auth endpoint answered without an access token
    #[error("failed to get carrier access token")]
    MissingToken,

    /// No client credentials are configured for the requested purpose
    #[error("no credentials configured for {0}")]
    MissingCredentials(String),
}

/// Merge failures for a single source document or artifact
#[derive(Debug, Error)]
pub enum MergeError {
    /// The document could not be parsed
    #[error("failed to load {path}: {reason}")]
    Load {
        /// Source document
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// The document uses a compression scheme the page importer cannot read
    #[error("unsupported compression in {path}: {reason}")]
    Compression {
        /// Source document
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// The document parsed but has no pages
    #[error("{path} contains no pages")]
    EmptyDocument {
        /// Source document
        path: PathBuf,
    },

    /// The assembled output could not be written
    #[error("failed to write {path}: {reason}")]
    Write {
        /// Output document
        path: PathBuf,
        /// Writer message
        reason: String,
    },

    /// A blocking import task panicked or was cancelled
    #[error("import task failed: {0}")]
    Task(String),
}

impl MergeError {
    /// Classify a parser failure, separating compression problems from the rest
    pub(crate) fn from_load(path: PathBuf, reason: String) -> Self {
        if reason.to_ascii_lowercase().contains("compress") {
            MergeError::Compression { path, reason }
        } else {
            MergeError::Load { path, reason }
        }
    }

    /// Whether this failure was caused by an unsupported compression scheme
    pub fn is_compression(&self) -> bool {
        matches!(self, MergeError::Compression { .. })
    }
}
