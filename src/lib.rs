//! # pod-tracker
//!
//! Shipment tracking, proof-of-delivery retrieval and batched PDF merging.
//!
//! A run takes a list of carrier tracking numbers and, for each one in order,
//! resolves the current delivery status, downloads the signed proof of
//! delivery (POD) when the shipment is delivered, and finally concatenates
//! every retrieved POD into one `<project>-POD.pdf`.
//!
//! ## Design Philosophy
//!
//! - **Keeps going** - a failed lookup or download is reported and the run
//!   moves on; only authentication failures abort
//! - **Sensible defaults** - production endpoints, 4 attempts, 600 ms between
//!   identifiers, Ghostscript if it can be found
//! - **Library-first** - no CLI or UI; consumers observe a progress stream
//!
//! ## Quick Start
//!
//! ```no_run
//! use pod_tracker::{Config, RunRequest, progress, run_pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.carrier.account_number = "123456789".to_string();
//!
//!     let (reporter, mut observer) = progress::channel();
//!     tokio::spawn(async move {
//!         while let Some(event) = observer.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let request = RunRequest::new("PRJ-1042", ["794612345678", "794612345679"]);
//!     let result = run_pipeline(config, request, reporter).await?;
//!     for row in result.report_rows() {
//!         println!("{} {} {}", row.identifier, row.status, row.reason);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Carrier API clients
pub mod carrier;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Batched PDF merging
pub mod merge;
/// Run orchestration
pub mod pipeline;
/// Progress event channel
pub mod progress;
/// Retry logic with linear backoff
pub mod retry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use carrier::CarrierServices;
pub use config::{CarrierConfig, Config, MergeConfig, PipelineConfig, RetryConfig};
pub use error::{AuthError, Error, MergeError, Result};
pub use merge::{BatchMergeEngine, GhostscriptTool, MergeTool};
pub use pipeline::{Pipeline, PipelineResult, ReportRow, RunRequest, RunState};
pub use progress::{ProgressObserver, ProgressReporter};
pub use types::{
    CompletionSummary, Event, Identifier, ProgressEvent, RetrievedDocument, Severity,
    StatusResult, TrackingStatus,
};

/// Build a [`Pipeline`] from `config` and execute one run
///
/// The observer always receives exactly one terminal event, including when
/// the pipeline cannot be built (invalid configuration, unwritable output
/// directories).
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built or authentication fails.
pub async fn run_pipeline(
    config: Config,
    request: RunRequest,
    reporter: ProgressReporter,
) -> Result<PipelineResult> {
    let pipeline = match Pipeline::new(config).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!(error = %e, "failed to set up tracking run");
            let message = format!("Setup failed: {}", e);
            reporter.error(message.clone());
            reporter.finish(CompletionSummary {
                success: false,
                merged_document_count: 0,
                has_merged_output: false,
                error: Some(message),
            });
            return Err(e);
        }
    };
    pipeline.run(request, reporter).await
}
