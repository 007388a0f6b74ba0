//! Utility functions for file naming and document inspection

use std::path::Path;

/// Suffix of the merged output document
const MERGED_SUFFIX: &str = "-POD.pdf";

/// Turn an identifier or project label into a safe file name component
///
/// Keeps ASCII alphanumerics, `-`, `_` and `.`; every other character becomes
/// `_`. Names that would resolve to a directory (`""`, `.`, `..`) become `_`.
///
/// # Examples
///
/// ```
/// use pod_tracker::utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("7712 3456/01"), "7712_3456_01");
/// assert_eq!(sanitize_file_name(".."), "_");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    sanitized
}

/// Encode an identifier as a file name component, one-to-one
///
/// Unlike [`sanitize_file_name`], distinct inputs never share a name: every
/// character outside `A-Z a-z 0-9 - _ . ~` is percent-encoded, `%` included.
/// Dot-only names have their dots encoded so they cannot refer to a directory,
/// and the empty name becomes a lone `%`, which no other input produces.
///
/// # Examples
///
/// ```
/// use pod_tracker::utils::encode_file_name;
///
/// assert_eq!(encode_file_name("794612345678"), "794612345678");
/// assert_eq!(encode_file_name("123/45"), "123%2F45");
/// assert_ne!(encode_file_name("123/45"), encode_file_name("123_45"));
/// assert_eq!(encode_file_name(".."), "%2E%2E");
/// ```
pub fn encode_file_name(name: &str) -> String {
    if name.is_empty() {
        return "%".to_string();
    }
    if name.chars().all(|c| c == '.') {
        return "%2E".repeat(name.len());
    }
    urlencoding::encode(name).into_owned()
}

/// File name of the merged document for a project label
pub fn merged_file_name(project: &str) -> String {
    format!("{}{}", sanitize_file_name(project), MERGED_SUFFIX)
}

/// Size of a file if it exists and is non-empty
///
/// Used to decide whether an external tool actually produced output: a zero
/// byte file counts as no output at all.
pub async fn populated_size(path: &Path) -> Option<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(meta.len()),
        _ => None,
    }
}

/// Whether a path is a regular file the current process can open
pub async fn is_readable_file(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => tokio::fs::File::open(path).await.is_ok(),
        _ => false,
    }
}

/// Bytes to megabytes for progress messages
pub fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Last path component for messages, falling back to the full path
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
