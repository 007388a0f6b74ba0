//! Run output and report rows

use crate::types::{Identifier, RetrievedDocument, StatusResult, TrackingStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a completed run produced
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// One result per processed identifier, in processing order
    pub statuses: Vec<StatusResult>,
    /// Retrieved PODs, in processing order
    pub documents: Vec<RetrievedDocument>,
    /// Merged output, when at least one POD was retrieved and merging succeeded
    pub merged_output: Option<PathBuf>,
}

impl PipelineResult {
    /// Status of one identifier
    pub fn status_of(&self, identifier: &Identifier) -> Option<&StatusResult> {
        self.statuses.iter().find(|s| &s.identifier == identifier)
    }

    /// Retrieved document of one identifier
    pub fn document_of(&self, identifier: &Identifier) -> Option<&RetrievedDocument> {
        self.documents.iter().find(|d| &d.identifier == identifier)
    }

    /// Number of identifiers that reached final delivery
    pub fn delivered_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.status.is_delivered()).count()
    }

    /// One display row per identifier, in processing order
    pub fn report_rows(&self) -> Vec<ReportRow> {
        self.statuses
            .iter()
            .map(|status| ReportRow {
                identifier: status.identifier.clone(),
                status: status.status.code().to_string(),
                reason: status.reason.clone(),
                pod_file: self
                    .document_of(&status.identifier)
                    .and_then(|d| d.path.file_name())
                    .map(|name| name.to_string_lossy().into_owned()),
                highlight: Highlight::for_status(&status.status),
            })
            .collect()
    }
}

/// Row styling for report renderers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Highlight {
    /// Delivered
    Delivered,
    /// Anything else needs a look
    Attention,
}

impl Highlight {
    fn for_status(status: &TrackingStatus) -> Self {
        if status.is_delivered() {
            Highlight::Delivered
        } else {
            Highlight::Attention
        }
    }
}

/// Flattened status line for tables and spreadsheets
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Tracking number
    pub identifier: Identifier,
    /// Status code
    pub status: String,
    /// Exception reason, empty when delivered
    pub reason: String,
    /// File name of the retrieved POD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_file: Option<String>,
    /// Row styling
    pub highlight: Highlight,
}
