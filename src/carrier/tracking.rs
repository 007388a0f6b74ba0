//! Tracking status lookup and reason derivation

use super::models::{ShipDateWindow, TrackingResponse};
use super::traits::TrackingApi;
use crate::config::RetryConfig;
use crate::progress::ProgressReporter;
use crate::retry::with_linear_backoff;
use crate::types::{AccessToken, Identifier, StatusResult, TrackingStatus};
use chrono::NaiveDate;
use std::sync::Arc;

/// Reason reported when the carrier has no result for an identifier
pub const NOT_FOUND_REASON: &str = "Tracking number not found";

/// Scan exception that only says a return label exists
const IGNORED_EXCEPTION: &str = "return tracking number";

/// Separator between exception descriptions in a reason
const REASON_SEPARATOR: &str = " -> ";

/// Looks up one identifier's status with retries
///
/// Never fails: every outcome, including exhausted retries, is folded into
/// the returned [`StatusResult`].
#[derive(Clone)]
pub struct TrackingStatusClient {
    api: Arc<dyn TrackingApi>,
    retry: RetryConfig,
}

impl TrackingStatusClient {
    /// Create a status client
    pub fn new(api: Arc<dyn TrackingApi>, retry: RetryConfig) -> Self {
        Self { api, retry }
    }

    /// Resolve the status of one identifier
    ///
    /// With a `reference_date` the query is restricted to shipments with that
    /// ship date. Each failed attempt emits a warning; after the last attempt
    /// the result is `ERROR` with an `API error: ...` reason.
    pub async fn get_status(
        &self,
        identifier: &Identifier,
        token: &AccessToken,
        reference_date: Option<NaiveDate>,
        reporter: &ProgressReporter,
    ) -> StatusResult {
        let window = reference_date.map(ShipDateWindow::single_day);
        let max_attempts = self.retry.max_attempts;

        let result = with_linear_backoff(
            &self.retry,
            || self.api.query(identifier, token, window),
            |attempt, error| {
                reporter.warning(format!(
                    "Tracking API failed for {} (Attempt {}/{}): {}",
                    identifier, attempt, max_attempts, error
                ));
            },
        )
        .await;

        match result {
            Ok(response) => interpret(identifier, response),
            Err(e) => StatusResult::new(
                identifier.clone(),
                TrackingStatus::Error,
                format!("API error: {}", e),
            ),
        }
    }
}

/// Turn a tracking response into a status result
pub(crate) fn interpret(identifier: &Identifier, response: TrackingResponse) -> StatusResult {
    let Some(complete) = response.output.complete_track_results.into_iter().next() else {
        return StatusResult::new(identifier.clone(), TrackingStatus::NotFound, NOT_FOUND_REASON);
    };

    let track = complete.track_results.into_iter().next().unwrap_or_default();
    let code = track
        .latest_status_detail
        .and_then(|detail| detail.derived_code)
        .unwrap_or_default();
    let status = TrackingStatus::from_code(&code);

    let reason = if status.is_delivered() {
        String::new()
    } else {
        derive_reason(
            track
                .scan_events
                .iter()
                .filter_map(|event| event.exception_description.as_deref()),
        )
    };

    StatusResult::new(identifier.clone(), status, reason)
}

/// Build a reason from scan exception descriptions
///
/// Descriptions are trimmed and blanks dropped, as is anything mentioning a
/// return tracking number (any case). Duplicates keep their first occurrence.
/// The survivors are listed newest first (the reverse of the carrier's
/// order), joined with `" -> "`, and the first character is upper-cased.
///
/// # Examples
///
/// ```
/// use pod_tracker::carrier::derive_reason;
///
/// let reason = derive_reason(["customer not available", "", "incorrect address"]);
/// assert_eq!(reason, "Incorrect address -> customer not available");
/// ```
pub fn derive_reason<'a>(descriptions: impl IntoIterator<Item = &'a str>) -> String {
    let mut unique: Vec<&str> = Vec::new();
    for description in descriptions {
        let description = description.trim();
        if description.is_empty()
            || description.to_lowercase().contains(IGNORED_EXCEPTION)
            || unique.contains(&description)
        {
            continue;
        }
        unique.push(description);
    }
    unique.reverse();

    capitalize_first(&unique.join(REASON_SEPARATOR))
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
