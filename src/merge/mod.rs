//! Batched PDF merging
//!
//! [`BatchMergeEngine`] concatenates many proof-of-delivery documents into one
//! output, trying strategies in order until one produces a non-empty file:
//!
//! 1. **Primary**: an external [`MergeTool`] (normally [`GhostscriptTool`]).
//!    Inputs above `primary_batch_size` are merged in two passes.
//! 2. **Fallback**: in-process page import. Inputs above
//!    `fallback_batch_size` are assembled in batches. Documents that cannot be
//!    imported are skipped and reported, not fatal.
//!
//! Intermediate batch files live in `temp_dir` and are removed before the
//! merge returns, whatever the outcome.
//!
//! ```no_run
//! use pod_tracker::config::MergeConfig;
//! use pod_tracker::merge::BatchMergeEngine;
//! use pod_tracker::progress::ProgressReporter;
//! use std::path::{Path, PathBuf};
//!
//! # async fn example() {
//! let engine = BatchMergeEngine::from_config(MergeConfig::default());
//! let documents = vec![PathBuf::from("pods/111.pdf"), PathBuf::from("pods/222.pdf")];
//! let merged = engine
//!     .merge(&documents, Path::new("results/PRJ-POD.pdf"), &ProgressReporter::detached())
//!     .await;
//! println!("merged: {}", merged);
//! # }
//! ```

mod artifact;
pub(crate) mod assembler;
mod fallback;
mod ghostscript;
mod primary;
mod tool;

pub use ghostscript::GhostscriptTool;
pub use tool::{MergeTool, UnavailableTool};

use crate::config::MergeConfig;
use crate::progress::ProgressReporter;
use crate::utils::is_readable_file;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Which strategy produced the merged output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeStrategyKind {
    /// External merge tool
    Primary,
    /// In-process page import
    Fallback,
}

/// Detailed result of a merge request
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Strategy that produced the output, `None` if no output was produced
    pub strategy: Option<MergeStrategyKind>,
    /// Number of source documents included in the output
    pub merged: usize,
    /// Source documents left out (unreadable, unimportable or in a failed batch)
    pub skipped: Vec<PathBuf>,
}

impl MergeOutcome {
    fn failed(skipped: Vec<PathBuf>) -> Self {
        Self {
            strategy: None,
            merged: 0,
            skipped,
        }
    }

    /// Whether a non-empty output document was written
    pub fn is_success(&self) -> bool {
        self.strategy.is_some()
    }
}

/// What a single strategy achieved
#[derive(Debug, Default)]
pub(crate) struct StrategyReport {
    merged: usize,
    skipped: Vec<PathBuf>,
}

impl StrategyReport {
    fn merged(count: usize) -> Self {
        Self {
            merged: count,
            skipped: Vec::new(),
        }
    }
}

/// The external merge tool named or found by `config`
pub fn discover_tool(config: &MergeConfig) -> Arc<dyn MergeTool> {
    match GhostscriptTool::from_config(config) {
        Some(gs) => {
            debug!(path = %gs.binary_path().display(), "using ghostscript for merging");
            Arc::new(gs)
        }
        None => {
            debug!("no ghostscript binary configured or found");
            Arc::new(UnavailableTool)
        }
    }
}

/// Merges a list of documents into one, degrading from tool to page import
#[derive(Clone)]
pub struct BatchMergeEngine {
    tool: Arc<dyn MergeTool>,
    config: MergeConfig,
}

impl BatchMergeEngine {
    /// Create an engine around an explicit tool
    pub fn new(tool: Arc<dyn MergeTool>, config: MergeConfig) -> Self {
        Self { tool, config }
    }

    /// Discover Ghostscript from the config, falling back to [`UnavailableTool`]
    pub fn from_config(config: MergeConfig) -> Self {
        Self::new(discover_tool(&config), config)
    }

    /// Merge `documents`, in order, into `output`
    ///
    /// Returns `true` iff a non-empty `output` was written. An empty list, or
    /// a list with no readable files, yields `false`.
    pub async fn merge(
        &self,
        documents: &[PathBuf],
        output: &Path,
        reporter: &ProgressReporter,
    ) -> bool {
        self.merge_with_outcome(documents, output, reporter)
            .await
            .is_success()
    }

    /// Like [`merge`](Self::merge), with strategy and skip details
    pub async fn merge_with_outcome(
        &self,
        documents: &[PathBuf],
        output: &Path,
        reporter: &ProgressReporter,
    ) -> MergeOutcome {
        let mut readable = Vec::with_capacity(documents.len());
        let mut unreadable = Vec::new();
        for document in documents {
            if is_readable_file(document).await {
                readable.push(document.clone());
            } else {
                unreadable.push(document.clone());
            }
        }

        if readable.is_empty() {
            reporter.error("No valid PDF files to merge");
            return MergeOutcome::failed(unreadable);
        }
        if !unreadable.is_empty() {
            reporter.warning(format!(
                "{} of {} PDF files are missing or unreadable",
                unreadable.len(),
                documents.len()
            ));
        }

        if let Some(parent) = output.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            reporter.error(format!("Cannot create output directory: {}", e));
            return MergeOutcome::failed(documents.to_vec());
        }

        reporter.info(format!("Starting merge of {} PDF files...", readable.len()));
        let tool_available = self.tool.is_available().await;

        if tool_available {
            match primary::merge(self.tool.as_ref(), &readable, output, &self.config, reporter)
                .await
            {
                Ok(report) => {
                    return self.finish(MergeStrategyKind::Primary, report, unreadable);
                }
                Err(e) => {
                    debug!(error = %e, "primary merge failed");
                    reporter.info(format!(
                        "{} merge failed, falling back to page import...",
                        self.tool.name()
                    ));
                }
            }
        } else {
            reporter.info("External merge tool not available, using page import...");
        }

        let normalizer = tool_available.then_some(self.tool.as_ref());
        match fallback::merge(&readable, output, normalizer, &self.config, reporter).await {
            Ok(report) => self.finish(MergeStrategyKind::Fallback, report, unreadable),
            Err(e) => {
                reporter.error(format!("PDF merge failed: {}", e));
                reporter.info("Individual PODs are still available");
                MergeOutcome::failed(documents.to_vec())
            }
        }
    }

    fn finish(
        &self,
        strategy: MergeStrategyKind,
        report: StrategyReport,
        mut unreadable: Vec<PathBuf>,
    ) -> MergeOutcome {
        unreadable.extend(report.skipped);
        info!(
            ?strategy,
            merged = report.merged,
            skipped = unreadable.len(),
            "merge finished"
        );
        MergeOutcome {
            strategy: Some(strategy),
            merged: report.merged,
            skipped: unreadable,
        }
    }
}
