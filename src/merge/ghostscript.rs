//! Ghostscript-backed merge tool

use super::tool::MergeTool;
use crate::config::MergeConfig;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Runs `gs` with the `pdfwrite` device
///
/// ```text
/// gs -sDEVICE=pdfwrite -dCompatibilityLevel=1.4 -dNOPAUSE -dQUIET -dBATCH \
///    -sOutputFile=<output> <inputs...>
/// ```
///
/// # Examples
///
/// ```no_run
/// use pod_tracker::merge::{GhostscriptTool, MergeTool};
/// use std::path::{Path, PathBuf};
///
/// # async fn example() -> pod_tracker::Result<()> {
/// let tool = GhostscriptTool::from_path().expect("gs not found in PATH");
/// tool.invoke(&[PathBuf::from("a.pdf"), PathBuf::from("b.pdf")], Path::new("ab.pdf"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct GhostscriptTool {
    binary_path: PathBuf,
    compatibility_level: String,
}

impl GhostscriptTool {
    /// Create a tool with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            compatibility_level: "1.4".to_string(),
        }
    }

    /// Attempt to find gs in PATH
    pub fn from_path() -> Option<Self> {
        which::which("gs").ok().map(Self::new)
    }

    /// Build from merge settings
    ///
    /// An explicit `ghostscript_path` wins; otherwise PATH is searched when
    /// `search_path` is set. Returns `None` when neither yields a binary.
    pub fn from_config(config: &MergeConfig) -> Option<Self> {
        let tool = match &config.ghostscript_path {
            Some(path) => Some(Self::new(path.clone())),
            None if config.search_path => Self::from_path(),
            None => None,
        };
        tool.map(|tool| tool.with_compatibility_level(&config.compatibility_level))
    }

    /// Override the PDF compatibility level of the output
    pub fn with_compatibility_level(mut self, level: &str) -> Self {
        self.compatibility_level = level.to_string();
        self
    }

    /// Path of the gs binary
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn arguments(&self, inputs: &[PathBuf], output: &Path) -> Vec<OsString> {
        let mut output_arg = OsString::from("-sOutputFile=");
        output_arg.push(output);

        let mut args: Vec<OsString> = vec![
            "-sDEVICE=pdfwrite".into(),
            format!("-dCompatibilityLevel={}", self.compatibility_level).into(),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            "-dBATCH".into(),
            output_arg,
        ];
        args.extend(inputs.iter().map(|input| input.as_os_str().to_owned()));
        args
    }
}

#[async_trait]
impl MergeTool for GhostscriptTool {
    async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.binary_path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn invoke(&self, inputs: &[PathBuf], output: &Path) -> crate::Result<()> {
        let result = Command::new(&self.binary_path)
            .args(self.arguments(inputs, output))
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute gs: {}", e)))?;

        if !result.status.success() {
            return Err(crate::Error::ExternalTool(format!(
                "gs exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ghostscript"
    }
}
