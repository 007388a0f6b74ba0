//! Scratch files for intermediate merge results

use crate::error::Result;
use crate::utils::populated_size;
use std::path::Path;
use tempfile::TempPath;
use tracing::warn;

/// An intermediate PDF that is deleted when dropped
///
/// Batch outputs and normalized copies live only for the duration of one
/// merge request; dropping the artifact (including on early return or panic)
/// removes the file.
#[derive(Debug)]
pub(crate) struct ScratchArtifact {
    path: TempPath,
}

impl ScratchArtifact {
    /// Reserve a new empty file in `dir` named `<prefix>XXXXXX.pdf`
    pub(crate) fn create(dir: &Path, prefix: &str) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".pdf")
            .tempfile_in(dir)?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the artifact if something was written to it
    pub(crate) async fn populated_size(&self) -> Option<u64> {
        populated_size(&self.path).await
    }

    /// Delete now, logging instead of failing
    pub(crate) fn release(self) {
        let shown = self.path.display().to_string();
        if let Err(e) = self.path.close() {
            warn!(path = %shown, error = %e, "failed to remove intermediate file");
        }
    }
}

/// Delete a set of artifacts
pub(crate) fn release_all(artifacts: Vec<ScratchArtifact>) {
    for artifact in artifacts {
        artifact.release();
    }
}
