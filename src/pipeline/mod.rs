//! Tracking run orchestration
//!
//! A run moves through a fixed sequence of states:
//!
//! ```text
//! Init -> Authenticating -> Processing(0) -> ... -> Processing(N-1) -> Merging -> Done
//!                      \-> Failed
//! ```
//!
//! Only a failed token request ends in [`RunState::Failed`]. Every other
//! problem (lookup errors, missing PODs, a failed merge) is reported through
//! progress events and the [`PipelineResult`], and the run still reaches
//! [`RunState::Done`]. `Merging` is skipped when no POD was retrieved.

mod request;
mod result;

pub use request::RunRequest;
pub use result::{Highlight, PipelineResult, ReportRow};

use crate::carrier::{CarrierServices, PodRetriever, TokenProvider, TrackingStatusClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::merge::{BatchMergeEngine, MergeTool, discover_tool};
use crate::progress::{ProgressReporter, loop_percent};
use crate::types::{CompletionSummary, CredentialPurpose, Severity};
use crate::utils::merged_file_name;
use request::normalize_identifiers;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Percent reported when a run starts
const PERCENT_START: u8 = 0;
/// Percent reported while requesting a token
const PERCENT_AUTHENTICATING: u8 = 5;
/// Percent reported once a token is held
const PERCENT_AUTHENTICATED: u8 = 10;
/// Percent reported when merging starts
const PERCENT_MERGING: u8 = 95;
/// Percent reported with the merge result
const PERCENT_MERGED: u8 = 98;
/// Percent reported when a run completes
const PERCENT_DONE: u8 = 100;

/// Where a run currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Nothing done yet
    Init,
    /// Requesting an access token
    Authenticating,
    /// Handling the identifier at this (0-based) position
    Processing(usize),
    /// Merging retrieved PODs
    Merging,
    /// Finished; the result is available
    Done,
    /// Aborted on an authentication failure
    Failed,
}

impl RunState {
    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_advance_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Init, Authenticating) => true,
            (Authenticating, Failed) => true,
            (Authenticating, Processing(0) | Merging | Done) => true,
            (Processing(i), Processing(j)) => j == i + 1,
            (Processing(_), Merging | Done) => true,
            (Merging, Done) => true,
            _ => false,
        }
    }

    /// Whether the run is over
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Init => write!(f, "init"),
            RunState::Authenticating => write!(f, "authenticating"),
            RunState::Processing(i) => write!(f, "processing({})", i),
            RunState::Merging => write!(f, "merging"),
            RunState::Done => write!(f, "done"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// Tracks the state of one run and logs each transition
#[derive(Debug)]
struct StateMachine {
    state: RunState,
}

impl StateMachine {
    fn new() -> Self {
        Self {
            state: RunState::Init,
        }
    }

    fn advance(&mut self, next: RunState) {
        if !self.state.can_advance_to(next) {
            warn!(from = %self.state, to = %next, "unexpected run state transition");
        }
        debug!(from = %self.state, to = %next, "run state");
        self.state = next;
    }
}

/// Drives one tracking run from token to merged output
///
/// # Example
///
/// ```no_run
/// use pod_tracker::{Config, Pipeline, RunRequest, progress};
///
/// # async fn example() -> pod_tracker::Result<()> {
/// let pipeline = Pipeline::new(Config::default()).await?;
/// let (reporter, mut observer) = progress::channel();
///
/// tokio::spawn(async move {
///     while let Some(event) = observer.recv().await {
///         print!("{}", event.to_sse_frame());
///     }
/// });
///
/// let request = RunRequest::new("PRJ-1042", ["794612345678", "794612345679"]);
/// let result = pipeline.run(request, reporter).await?;
/// println!("{} PODs, merged: {:?}", result.documents.len(), result.merged_output);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    config: Arc<Config>,
    tokens: TokenProvider,
    tracking: TrackingStatusClient,
    pods: PodRetriever,
    merger: BatchMergeEngine,
}

impl Pipeline {
    /// Build a pipeline against the real carrier endpoints
    ///
    /// Ghostscript is located per [`MergeConfig`](crate::config::MergeConfig);
    /// without it, merging uses page import only.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the HTTP client
    /// cannot be built, or the output directories cannot be created.
    pub async fn new(config: Config) -> Result<Self> {
        let services = CarrierServices::http(&config.carrier)?;
        let tool = discover_tool(&config.merge);
        Self::with_parts(config, services, tool).await
    }

    /// Build a pipeline from explicit collaborators
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the output
    /// directories cannot be created.
    pub async fn with_parts(
        config: Config,
        services: CarrierServices,
        merge_tool: Arc<dyn MergeTool>,
    ) -> Result<Self> {
        config.validate()?;

        for (key, dir) in [
            ("pipeline.pod_dir", &config.pipeline.pod_dir),
            ("pipeline.results_dir", &config.pipeline.results_dir),
        ] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::config(
                    format!("cannot create directory {}: {}", dir.display(), e),
                    key,
                )
            })?;
        }

        let tokens = TokenProvider::new(services.auth);
        let tracking = TrackingStatusClient::new(services.tracking, config.retry.clone());
        let pods = PodRetriever::new(
            services.documents,
            config.retry.clone(),
            config.carrier.account_number.clone(),
            config.pipeline.pod_dir.clone(),
        );
        let merger = BatchMergeEngine::new(merge_tool, config.merge.clone());

        Ok(Self {
            config: Arc::new(config),
            tokens,
            tracking,
            pods,
            merger,
        })
    }

    /// Configuration the pipeline was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path the merged output of `request` is written to
    pub fn merged_output_path(&self, request: &RunRequest) -> PathBuf {
        self.config
            .pipeline
            .results_dir
            .join(merged_file_name(request.project_label()))
    }

    /// Execute one run
    ///
    /// Identifiers are processed sequentially, in order, with
    /// `rate_limit_pause` between consecutive identifiers. Exactly one
    /// terminal event is sent to `reporter`'s observer before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if no access token could be obtained; nothing
    /// else is an error.
    pub async fn run(
        &self,
        request: RunRequest,
        reporter: ProgressReporter,
    ) -> Result<PipelineResult> {
        let mut machine = StateMachine::new();
        info!(
            project = request.project_label(),
            identifiers = request.identifiers.len(),
            "run started"
        );
        reporter.emit(
            "Starting tracking process...",
            Severity::Info,
            Some(PERCENT_START),
        );

        machine.advance(RunState::Authenticating);
        reporter.emit(
            "Authenticating with carrier API...",
            Severity::Info,
            Some(PERCENT_AUTHENTICATING),
        );
        let token = match self.tokens.fetch_token(CredentialPurpose::Tracking).await {
            Ok(token) => token,
            Err(e) => {
                machine.advance(RunState::Failed);
                let message = format!("Authentication failed: {}", e);
                reporter.error(message.clone());
                reporter.finish(CompletionSummary {
                    success: false,
                    merged_document_count: 0,
                    has_merged_output: false,
                    error: Some(message),
                });
                return Err(Error::Auth(e));
            }
        };
        reporter.emit(
            "Authentication successful",
            Severity::Success,
            Some(PERCENT_AUTHENTICATED),
        );

        reporter.info(format!("Project: {}", request.project_label()));
        reporter.info(format!("Shipment date: {}", request.date_label()));

        let (identifiers, duplicates) = normalize_identifiers(&request.identifiers);
        for duplicate in &duplicates {
            reporter.warning(format!("Duplicate tracking number {} ignored", duplicate));
        }

        let band = &self.config.pipeline.progress_band;
        let total = identifiers.len();
        reporter.emit(
            format!("Found {} tracking numbers to process", total),
            Severity::Info,
            Some(band.start),
        );

        let mut result = PipelineResult::default();
        for (index, identifier) in identifiers.iter().enumerate() {
            machine.advance(RunState::Processing(index));
            reporter.emit(
                format!("Processing ({}/{}): {}", index + 1, total, identifier),
                Severity::Info,
                Some(loop_percent(index + 1, total, band)),
            );

            let status = self
                .tracking
                .get_status(identifier, &token, request.reference_date, &reporter)
                .await;
            if status.reason.is_empty() {
                reporter.success(format!("Status for {}: {}", identifier, status.status));
            } else {
                reporter.success(format!(
                    "Status for {}: {} ({})",
                    identifier, status.status, status.reason
                ));
            }

            if status.status.is_delivered()
                && let Some(document) = self
                    .pods
                    .fetch_pod(identifier, &token, request.reference_date, &reporter)
                    .await
            {
                result.documents.push(document);
            }
            result.statuses.push(status);

            if index + 1 < total {
                tokio::time::sleep(self.config.pipeline.rate_limit_pause).await;
            }
        }

        if result.documents.is_empty() {
            reporter.emit(
                "No PODs retrieved, nothing to merge",
                Severity::Info,
                Some(PERCENT_MERGED),
            );
        } else {
            machine.advance(RunState::Merging);
            result.merged_output = self.merge_documents(&request, &result, &reporter).await;
        }

        machine.advance(RunState::Done);
        reporter.emit("Processing complete!", Severity::Success, Some(PERCENT_DONE));
        info!(
            processed = result.statuses.len(),
            delivered = result.delivered_count(),
            documents = result.documents.len(),
            merged = result.merged_output.is_some(),
            "run complete"
        );

        reporter.finish(CompletionSummary {
            success: true,
            merged_document_count: result.documents.len(),
            has_merged_output: result.merged_output.is_some(),
            error: None,
        });
        Ok(result)
    }

    async fn merge_documents(
        &self,
        request: &RunRequest,
        result: &PipelineResult,
        reporter: &ProgressReporter,
    ) -> Option<PathBuf> {
        let count = result.documents.len();
        reporter.emit(
            format!("Merging {} POD documents...", count),
            Severity::Info,
            Some(PERCENT_MERGING),
        );

        let output = self.merged_output_path(request);
        let paths: Vec<PathBuf> = result.documents.iter().map(|d| d.path.clone()).collect();

        if self.merger.merge(&paths, &output, reporter).await {
            reporter.emit(
                format!(
                    "Successfully merged {} PODs into {}",
                    count,
                    output.display()
                ),
                Severity::Success,
                Some(PERCENT_MERGED),
            );
            Some(output)
        } else {
            reporter.emit(
                "Failed to merge PDFs, individual PODs are still available",
                Severity::Warning,
                Some(PERCENT_MERGED),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests;
