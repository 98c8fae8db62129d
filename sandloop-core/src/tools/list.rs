//! Directory listing

use super::ToolResult;
use crate::error::{Error, Result};
use crate::sandbox::SandboxRoot;
use std::fmt::Write;
use std::fs::Metadata;
use std::path::Path;

/// List the immediate children of `directory` with size and kind.
///
/// One line per entry, in directory iteration order:
/// `- name: file_size=123 bytes, is_dir=False`
pub async fn list_directory(root: &SandboxRoot, directory: &str) -> ToolResult {
    list_inner(root, directory)
        .await
        .map_err(|e| e.with_operation("tools::list_directory"))
        .into()
}

async fn list_inner(root: &SandboxRoot, directory: &str) -> Result<String> {
    let target = root.resolve(directory)?;
    if !target.is_dir() {
        return Err(Error::not_a_directory(directory));
    }

    let mut entries = tokio::fs::read_dir(&target).await?;
    let mut listing = String::new();
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry_metadata(root, &entry.path()).await?;
        let _ = writeln!(
            listing,
            "- {}: file_size={} bytes, is_dir={}",
            entry.file_name().to_string_lossy(),
            metadata.len(),
            if metadata.is_dir() { "True" } else { "False" },
        );
    }

    Ok(listing)
}

/// Size and kind of one entry. Symlinks are followed only when their target
/// stays inside the sandbox; otherwise the link itself is described.
async fn entry_metadata(root: &SandboxRoot, path: &Path) -> Result<Metadata> {
    let link = tokio::fs::symlink_metadata(path).await?;
    if !link.file_type().is_symlink() {
        return Ok(link);
    }

    match tokio::fs::canonicalize(path).await {
        Ok(target) if target.starts_with(root.path()) => Ok(tokio::fs::metadata(&target).await?),
        _ => Ok(link),
    }
}
