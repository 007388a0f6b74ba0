//! External merge tool abstraction

use crate::utils::populated_size;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An external program that concatenates PDF documents
///
/// The primary merge strategy drives this trait directly; the page-import
/// fallback uses [`normalize`](MergeTool::normalize) to rewrite documents the
/// importer might not parse.
#[async_trait]
pub trait MergeTool: Send + Sync {
    /// Whether the tool can be run at all
    ///
    /// Checked once per merge request.
    async fn is_available(&self) -> bool;

    /// Merge `inputs` (in order) into `output`
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be started or exits unsuccessfully.
    /// A successful exit does not guarantee `output` is non-empty; callers
    /// check that themselves.
    async fn invoke(&self, inputs: &[PathBuf], output: &Path) -> crate::Result<()>;

    /// Rewrite a single document into a normalized copy at `output`
    ///
    /// Returns `true` only if a non-empty copy was produced.
    async fn normalize(&self, input: &Path, output: &Path) -> bool {
        match self.invoke(&[input.to_path_buf()], output).await {
            Ok(()) => populated_size(output).await.is_some(),
            Err(e) => {
                debug!(input = %input.display(), error = %e, "normalization failed");
                false
            }
        }
    }

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Stand-in used when no merge tool is installed
///
/// Reports itself unavailable and refuses every invocation, so the engine
/// goes straight to page import.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableTool;

#[async_trait]
impl MergeTool for UnavailableTool {
    async fn is_available(&self) -> bool {
        false
    }

    async fn invoke(&self, _inputs: &[PathBuf], _output: &Path) -> crate::Result<()> {
        Err(crate::Error::NotSupported(
            "PDF merging requires the external gs binary. \
             Configure ghostscript_path in config or ensure gs is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
