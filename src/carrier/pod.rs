//! Proof-of-delivery retrieval

use super::models::{DocumentQuery, DocumentType, ShipDateWindow};
use super::traits::DocumentApi;
use crate::config::RetryConfig;
use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::retry::with_linear_backoff;
use crate::types::{AccessToken, Identifier, RetrievedDocument};
use crate::utils::{display_name, encode_file_name, megabytes};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Downloads signed proof-of-delivery documents and writes them to disk
///
/// Each document lands at `<pod_dir>/<encoded identifier>.pdf`, replacing
/// any earlier copy of the same identifier. Distinct identifiers never share
/// a file.
#[derive(Clone)]
pub struct PodRetriever {
    api: Arc<dyn DocumentApi>,
    retry: RetryConfig,
    account_number: String,
    pod_dir: PathBuf,
}

impl PodRetriever {
    /// Create a retriever writing into `pod_dir`
    pub fn new(
        api: Arc<dyn DocumentApi>,
        retry: RetryConfig,
        account_number: impl Into<String>,
        pod_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            api,
            retry,
            account_number: account_number.into(),
            pod_dir: pod_dir.into(),
        }
    }

    /// Where the document for an identifier is written
    pub fn document_path(&self, identifier: &Identifier) -> PathBuf {
        self.pod_dir
            .join(format!("{}.pdf", encode_file_name(identifier.as_str())))
    }

    /// Fetch and persist the POD for a delivered identifier
    ///
    /// Returns `None` when the carrier has no document (a warning is emitted)
    /// or when every attempt failed (an error is emitted). Neither case stops
    /// the run.
    pub async fn fetch_pod(
        &self,
        identifier: &Identifier,
        token: &AccessToken,
        reference_date: Option<NaiveDate>,
        reporter: &ProgressReporter,
    ) -> Option<RetrievedDocument> {
        let query = DocumentQuery {
            identifier: identifier.clone(),
            account_number: self.account_number.clone(),
            document_type: DocumentType::SignatureProofOfDelivery,
            window: reference_date.map(ShipDateWindow::single_day),
        };
        let query = &query;
        let max_attempts = self.retry.max_attempts;

        let result = with_linear_backoff(
            &self.retry,
            || async move {
                reporter.info(format!("Downloading POD for {}...", identifier));
                match self.api.query(query, token).await? {
                    Some(payload) => self.persist(identifier, &payload).await,
                    None => Ok(None),
                }
            },
            |attempt, error| {
                reporter.warning(format!(
                    "POD download failed for {} (Attempt {}/{}): {}",
                    identifier, attempt, max_attempts, error
                ));
            },
        )
        .await;

        match result {
            Ok(Some(document)) => {
                reporter.success(format!(
                    "Downloaded POD: {} ({:.2} MB)",
                    display_name(&document.path),
                    megabytes(document.size_bytes)
                ));
                Some(document)
            }
            Ok(None) => {
                reporter.warning(format!("No POD document available for {}", identifier));
                None
            }
            Err(e) => {
                reporter.error(format!("Failed to download POD for {}: {}", identifier, e));
                None
            }
        }
    }

    /// Decode and write a payload; an empty document counts as no document
    async fn persist(
        &self,
        identifier: &Identifier,
        payload: &str,
    ) -> Result<Option<RetrievedDocument>> {
        let bytes = decode_payload(payload)?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let path = self.document_path(identifier);
        write_document(&path, &bytes).await?;

        Ok(Some(RetrievedDocument {
            identifier: identifier.clone(),
            path,
            size_bytes: bytes.len() as u64,
        }))
    }
}

/// Decode a base64 document, ignoring embedded line breaks
fn decode_payload(payload: &str) -> Result<Vec<u8>> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}

async fn write_document(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
