//! Bounded file reads

use super::{ToolResult, MAX_CHARS};
use crate::error::{Error, ErrorKind, Result};
use crate::sandbox::SandboxRoot;
use tokio::io::AsyncReadExt;

/// Read up to [`MAX_CHARS`] characters of `file_path`.
///
/// When the file holds more, a `[...File "path" truncated at 10000 characters]`
/// notice is appended right after the returned content.
pub async fn read_file(root: &SandboxRoot, file_path: &str) -> ToolResult {
    read_inner(root, file_path, MAX_CHARS)
        .await
        .map_err(|e| e.with_operation("tools::read_file"))
        .into()
}

async fn read_inner(root: &SandboxRoot, file_path: &str, max_chars: usize) -> Result<String> {
    let target = root.resolve(file_path)?;
    if !target.exists() {
        return Err(Error::file_not_found(file_path));
    }
    if !target.is_file() {
        return Err(Error::not_a_file(file_path));
    }

    // A UTF-8 char is at most 4 bytes, so this window always holds
    // max_chars + 1 characters when the file has that many.
    let limit = 4 * max_chars + 4;
    let file = tokio::fs::File::open(&target).await?;
    let mut buf = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64).read_to_end(&mut buf).await?;

    let text = decode_prefix(&buf, max_chars, buf.len() == limit).map_err(|e| {
        e.with_context("path", file_path)
    })?;

    let (content, truncated) = super::truncate_chars(text, max_chars);
    let mut out = content.to_string();
    if truncated {
        out.push_str(&format!(
            "[...File \"{}\" truncated at {} characters]",
            file_path, max_chars
        ));
    }
    Ok(out)
}

/// Decode as much of `buf` as the reader needs.
///
/// Invalid bytes past the first `max_chars + 1` characters are never looked
/// at, and a multi-byte sequence cut by the read window is dropped.
fn decode_prefix(buf: &[u8], max_chars: usize, window_full: bool) -> Result<&str> {
    match std::str::from_utf8(buf) {
        Ok(text) => Ok(text),
        Err(e) => {
            let valid = &buf[..e.valid_up_to()];
            // valid_up_to always ends on a char boundary
            let text = std::str::from_utf8(valid).unwrap_or_default();
            let enough = text.chars().nth(max_chars).is_some();
            let cut_by_window = e.error_len().is_none() && window_full;
            if enough || cut_by_window {
                Ok(text)
            } else {
                Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("file is not valid UTF-8 text: {}", e),
                ))
            }
        }
    }
}
