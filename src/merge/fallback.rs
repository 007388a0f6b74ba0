//! Fallback strategy: in-process page import
//!
//! Used when the external tool is missing or failed. Documents are imported
//! page by page; a document the importer cannot read is skipped rather than
//! failing the merge. When the tool exists each document is first rewritten
//! through it, which repairs most inputs the importer would reject.

use super::StrategyReport;
use super::artifact::{ScratchArtifact, release_all};
use super::assembler::{PageAssembler, load_source, write_output};
use super::tool::MergeTool;
use crate::config::MergeConfig;
use crate::error::{Error, MergeError, Result};
use crate::progress::ProgressReporter;
use crate::utils::{display_name, megabytes};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Progress message cadence while importing
const PROGRESS_EVERY: usize = 5;

/// Merge `documents` into `output` by page import
///
/// Up to `fallback_batch_size` documents are assembled directly; larger
/// inputs are assembled in batches whose outputs are then imported into the
/// final document.
///
/// # Errors
///
/// Fails when not a single document could be imported or the output cannot
/// be written.
pub(crate) async fn merge(
    documents: &[PathBuf],
    output: &Path,
    normalizer: Option<&dyn MergeTool>,
    config: &MergeConfig,
    reporter: &ProgressReporter,
) -> Result<StrategyReport> {
    let total = documents.len();
    let batch_size = config.fallback_batch_size.max(1);

    if total <= batch_size {
        reporter.info(format!("Importing pages from {} PDF files...", total));
        let batch = assemble(documents, normalizer, config, reporter).await;
        if batch.assembler.page_count() == 0 {
            reporter.warning("No files could be merged");
            return Err(nothing_merged());
        }
        let size = write_output(batch.assembler, output.to_path_buf()).await?;
        reporter.success(format!(
            "Merged {} PDFs ({:.2} MB)",
            batch.merged,
            megabytes(size)
        ));
        return Ok(StrategyReport {
            merged: batch.merged,
            skipped: batch.skipped,
        });
    }

    let batches: Vec<&[PathBuf]> = documents.chunks(batch_size).collect();
    reporter.info(format!(
        "Importing pages from {} files in {} batches...",
        total,
        batches.len()
    ));

    let mut artifacts = Vec::with_capacity(batches.len());
    let mut contents: Vec<Vec<PathBuf>> = Vec::with_capacity(batches.len());
    let mut skipped = Vec::new();

    for (index, documents) in batches.iter().enumerate() {
        let number = index + 1;
        reporter.info(format!(
            "Processing batch {}/{} ({} files)...",
            number,
            batches.len(),
            documents.len()
        ));

        let batch = assemble(documents, normalizer, config, reporter).await;
        let imported: Vec<PathBuf> = documents
            .iter()
            .filter(|document| !batch.skipped.contains(*document))
            .cloned()
            .collect();
        skipped.extend(batch.skipped);
        if batch.assembler.page_count() == 0 {
            reporter.warning(format!("Batch {} had no processable files", number));
            continue;
        }

        match save_batch(batch.assembler, config).await {
            Ok(artifact) => {
                artifacts.push(artifact);
                contents.push(imported);
                reporter.success(format!(
                    "Batch {}/{} complete ({} files)",
                    number,
                    batches.len(),
                    batch.merged
                ));
            }
            Err(e) => {
                reporter.warning(format!("Batch {} could not be written: {}", number, e));
                skipped.extend(imported);
            }
        }
    }

    if artifacts.is_empty() {
        reporter.error("All batches failed to merge");
        return Err(nothing_merged());
    }

    reporter.info(format!(
        "Merging {} batch files into final PDF...",
        artifacts.len()
    ));
    let result = combine(&artifacts, output, reporter).await;
    release_all(artifacts);
    let combined = result?;

    for index in combined.failed {
        if let Some(lost) = contents.get_mut(index) {
            skipped.append(lost);
        }
    }
    let merged: usize = contents.iter().map(Vec::len).sum();

    reporter.success(format!(
        "Batch merge complete ({:.2} MB)",
        megabytes(combined.size)
    ));
    Ok(StrategyReport { merged, skipped })
}

struct AssembledBatch {
    assembler: PageAssembler,
    merged: usize,
    skipped: Vec<PathBuf>,
}

/// Import every readable document of one batch, in order
async fn assemble(
    documents: &[PathBuf],
    normalizer: Option<&dyn MergeTool>,
    config: &MergeConfig,
    reporter: &ProgressReporter,
) -> AssembledBatch {
    let mut batch = AssembledBatch {
        assembler: PageAssembler::new(),
        merged: 0,
        skipped: Vec::new(),
    };

    for (index, document) in documents.iter().enumerate() {
        let normalized = match normalizer {
            Some(tool) => normalized_copy(tool, document, config).await,
            None => None,
        };
        let source = normalized
            .as_ref()
            .map_or_else(|| document.clone(), |copy| copy.path().to_path_buf());

        let loaded = load_source(source, batch.assembler.next_id()).await;
        drop(normalized);

        match loaded {
            Ok(prepared) => {
                debug!(document = %document.display(), pages = prepared.page_count(), "imported");
                batch.assembler.absorb(prepared);
                batch.merged += 1;
            }
            Err(e) => {
                report_skip(document, &e, reporter);
                batch.skipped.push(document.clone());
            }
        }

        let processed = index + 1;
        if processed % PROGRESS_EVERY == 0 && processed < documents.len() {
            reporter.info(format!(
                "Processed {}/{} files...",
                processed,
                documents.len()
            ));
        }
    }

    batch
}

fn report_skip(document: &Path, error: &MergeError, reporter: &ProgressReporter) {
    let name = display_name(document);
    debug!(document = %document.display(), error = %error, "page import failed");
    if error.is_compression() {
        reporter.warning(format!("Skipped {} (unsupported compression)", name));
    } else {
        reporter.warning(format!("Could not merge {}", name));
    }
}

/// Rewrite a document through the tool; `None` means use the original
async fn normalized_copy(
    tool: &dyn MergeTool,
    document: &Path,
    config: &MergeConfig,
) -> Option<ScratchArtifact> {
    let copy = match ScratchArtifact::create(&config.temp_dir, "pdf_") {
        Ok(copy) => copy,
        Err(e) => {
            debug!(error = %e, "could not reserve normalized copy");
            return None;
        }
    };
    if tool.normalize(document, copy.path()).await {
        Some(copy)
    } else {
        None
    }
}

async fn save_batch(assembler: PageAssembler, config: &MergeConfig) -> Result<ScratchArtifact> {
    let artifact = ScratchArtifact::create(&config.temp_dir, "fallback_batch_")?;
    write_output(assembler, artifact.path().to_path_buf()).await?;
    Ok(artifact)
}

struct Combined {
    size: u64,
    /// Positions of batch files that could not be imported
    failed: Vec<usize>,
}

/// Import batch outputs, in order, into the final document
async fn combine(
    artifacts: &[ScratchArtifact],
    output: &Path,
    reporter: &ProgressReporter,
) -> Result<Combined> {
    let mut assembler = PageAssembler::new();
    let mut failed = Vec::new();
    for (index, artifact) in artifacts.iter().enumerate() {
        match load_source(artifact.path().to_path_buf(), assembler.next_id()).await {
            Ok(prepared) => {
                assembler.absorb(prepared);
            }
            Err(e) => {
                reporter.warning(format!("Could not merge batch file: {}", e));
                failed.push(index);
            }
        }
    }
    if assembler.page_count() == 0 {
        return Err(nothing_merged());
    }
    let size = write_output(assembler, output.to_path_buf()).await?;
    Ok(Combined { size, failed })
}

fn nothing_merged() -> Error {
    Error::Other("no documents could be merged".to_string())
}
