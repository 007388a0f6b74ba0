//! Primary strategy: external tool, two-pass batching

use super::StrategyReport;
use super::artifact::{ScratchArtifact, release_all};
use super::tool::MergeTool;
use crate::config::MergeConfig;
use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::utils::{megabytes, populated_size};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Merge `documents` into `output` with the external tool
///
/// Up to `primary_batch_size` documents go through a single invocation.
/// Larger inputs are merged batch by batch into scratch files, and the batch
/// outputs are merged into `output` in a final invocation. A batch that fails
/// or produces an empty file is skipped with a warning.
///
/// # Errors
///
/// Fails when no output could be produced: the single invocation failed, every
/// batch failed, or the final pass failed.
pub(crate) async fn merge(
    tool: &dyn MergeTool,
    documents: &[PathBuf],
    output: &Path,
    config: &MergeConfig,
    reporter: &ProgressReporter,
) -> Result<StrategyReport> {
    let total = documents.len();
    let batch_size = config.primary_batch_size.max(1);

    if total <= batch_size {
        reporter.info(format!("Merging {} PDF files with {}...", total, tool.name()));
        tool.invoke(documents, output).await?;
        let size = populated_size(output).await.ok_or_else(|| {
            Error::ExternalTool(format!("{} produced no output", tool.name()))
        })?;
        reporter.success(format!(
            "Successfully merged {} PDFs ({:.2} MB)",
            total,
            megabytes(size)
        ));
        return Ok(StrategyReport::merged(total));
    }

    let batches: Vec<&[PathBuf]> = documents.chunks(batch_size).collect();
    reporter.info(format!(
        "Large file count detected ({} files). Merging in {} batches of up to {}...",
        total,
        batches.len(),
        batch_size
    ));

    let mut artifacts = Vec::with_capacity(batches.len());
    let mut merged = 0;
    let mut skipped = Vec::new();

    for (index, batch) in batches.iter().enumerate() {
        let number = index + 1;
        reporter.info(format!(
            "Merging batch {}/{} ({} files)...",
            number,
            batches.len(),
            batch.len()
        ));

        match merge_batch(tool, batch, config).await {
            Ok(artifact) => {
                merged += batch.len();
                artifacts.push(artifact);
            }
            Err(e) => {
                debug!(batch = number, error = %e, "batch merge failed");
                reporter.warning(format!("Batch {} failed, skipping", number));
                skipped.extend(batch.iter().cloned());
            }
        }
    }

    if artifacts.is_empty() {
        reporter.error("All batches failed to merge");
        return Err(Error::ExternalTool("every batch failed".to_string()));
    }

    reporter.info(format!(
        "Merging {} batches into final PDF...",
        artifacts.len()
    ));
    let inputs: Vec<PathBuf> = artifacts.iter().map(|a| a.path().to_path_buf()).collect();
    let result = tool.invoke(&inputs, output).await;
    release_all(artifacts);
    result?;

    let size = populated_size(output)
        .await
        .ok_or_else(|| Error::ExternalTool("final merge produced no output".to_string()))?;
    if !skipped.is_empty() {
        warn!(skipped = skipped.len(), "merged output is missing failed batches");
    }
    reporter.success(format!(
        "Successfully merged {} PDFs in batches ({:.2} MB)",
        merged,
        megabytes(size)
    ));

    Ok(StrategyReport { merged, skipped })
}

async fn merge_batch(
    tool: &dyn MergeTool,
    batch: &[PathBuf],
    config: &MergeConfig,
) -> Result<ScratchArtifact> {
    let artifact = ScratchArtifact::create(&config.temp_dir, "batch_")?;
    tool.invoke(batch, artifact.path()).await?;
    if artifact.populated_size().await.is_none() {
        return Err(Error::ExternalTool("batch produced no output".to_string()));
    }
    Ok(artifact)
}
