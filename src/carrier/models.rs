//! Carrier wire format
//!
//! Request bodies are built by [`TrackingRequest`] and [`DocumentRequest`];
//! responses are parsed leniently (missing or null fields fall back to their
//! defaults) because the carrier omits whole sections for unknown shipments.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::Identifier;

/// Inclusive shipment-date filter sent with carrier queries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShipDateWindow {
    /// First ship date
    pub begin: NaiveDate,
    /// Last ship date
    pub end: NaiveDate,
}

impl ShipDateWindow {
    /// Window covering exactly one day
    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            begin: date,
            end: date,
        }
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Document type requested from the tracking document API
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// Signed proof of delivery
    SignatureProofOfDelivery,
}

/// A request for one identifier's document
#[derive(Clone, Debug)]
pub struct DocumentQuery {
    /// Tracking number
    pub identifier: Identifier,
    /// Shipper account the shipment belongs to
    pub account_number: String,
    /// Which document to fetch
    pub document_type: DocumentType,
    /// Optional shipment-date filter
    pub window: Option<ShipDateWindow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackingNumberInfo {
    tracking_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackingInfo {
    tracking_number_info: TrackingNumberInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    ship_date_begin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ship_date_end: Option<String>,
}

/// Body of a tracking query
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRequest {
    tracking_info: Vec<TrackingInfo>,
    include_detailed_scans: bool,
}

impl TrackingRequest {
    /// Query for one identifier with detailed scan history
    pub fn new(identifier: &Identifier, window: Option<ShipDateWindow>) -> Self {
        Self {
            tracking_info: vec![TrackingInfo {
                tracking_number_info: TrackingNumberInfo {
                    tracking_number: identifier.to_string(),
                },
                ship_date_begin: window.map(|w| format_date(w.begin)),
                ship_date_end: window.map(|w| format_date(w.end)),
            }],
            // Scan events carry the exception descriptions used for reasons
            include_detailed_scans: true,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackDocumentDetail {
    document_type: DocumentType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackDocumentSpecification {
    tracking_number_info: TrackingNumberInfo,
    account_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ship_date_begin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ship_date_end: Option<String>,
}

/// Body of a tracking document query
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    track_document_detail: TrackDocumentDetail,
    track_document_specification: Vec<TrackDocumentSpecification>,
}

impl From<&DocumentQuery> for DocumentRequest {
    fn from(query: &DocumentQuery) -> Self {
        Self {
            track_document_detail: TrackDocumentDetail {
                document_type: query.document_type,
            },
            track_document_specification: vec![TrackDocumentSpecification {
                tracking_number_info: TrackingNumberInfo {
                    tracking_number: query.identifier.to_string(),
                },
                account_number: query.account_number.clone(),
                ship_date_begin: query.window.map(|w| format_date(w.begin)),
                ship_date_end: query.window.map(|w| format_date(w.end)),
            }],
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tracking query response
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingResponse {
    /// Response payload
    #[serde(default, deserialize_with = "null_as_default")]
    pub output: TrackingOutput,
}

/// Payload of a tracking response
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingOutput {
    /// One entry per queried tracking number
    #[serde(default, deserialize_with = "null_as_default")]
    pub complete_track_results: Vec<CompleteTrackResult>,
}

/// All results for one tracking number
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTrackResult {
    /// Tracking number echoed by the carrier
    #[serde(default)]
    pub tracking_number: Option<String>,
    /// Shipments matching the tracking number (newest first)
    #[serde(default, deserialize_with = "null_as_default")]
    pub track_results: Vec<TrackResult>,
}

/// One shipment's tracking detail
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResult {
    /// Current status
    #[serde(default)]
    pub latest_status_detail: Option<StatusDetail>,
    /// Scan history in the carrier's stored order
    #[serde(default, deserialize_with = "null_as_default")]
    pub scan_events: Vec<ScanEvent>,
}

/// Current status of a shipment
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDetail {
    /// Normalized status code (`DL` for delivered)
    #[serde(default)]
    pub derived_code: Option<String>,
    /// Raw status code
    #[serde(default)]
    pub code: Option<String>,
    /// Carrier description of the status
    #[serde(default)]
    pub description: Option<String>,
}

/// One scan in a shipment's history
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    /// Scan timestamp as sent by the carrier
    #[serde(default)]
    pub date: Option<String>,
    /// Scan description
    #[serde(default)]
    pub event_description: Option<String>,
    /// Exception text, empty for ordinary scans
    #[serde(default)]
    pub exception_description: Option<String>,
}

/// Tracking document response
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    /// Response payload
    #[serde(default, deserialize_with = "null_as_default")]
    pub output: DocumentOutput,
}

/// Payload of a tracking document response
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutput {
    /// Base64-encoded documents
    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<String>,
}

/// OAuth token response
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenResponse {
    /// Bearer token
    #[serde(default)]
    pub access_token: Option<String>,
    /// Token type (normally "bearer")
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}
