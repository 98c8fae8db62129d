//! # Sandbox Root
//!
//! The single trust boundary for every tool operation. A [`SandboxRoot`] is
//! canonicalized once at startup and never changes afterwards; every path the
//! model supplies goes through [`SandboxRoot::resolve`] before any I/O.

use crate::error::{Error, ErrorKind, Result};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Canonical absolute directory that bounds all tool I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRoot {
    path: Arc<Path>,
}

impl SandboxRoot {
    /// Establish the sandbox at `dir`, which must be an existing directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let path = dir.canonicalize().map_err(|e| {
            Error::from(e)
                .with_operation("sandbox::new")
                .with_context("root", dir.display().to_string())
        })?;

        if !path.is_dir() {
            return Err(Error::not_a_directory(dir.display().to_string())
                .with_operation("sandbox::new"));
        }

        Ok(Self { path: path.into() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a model-supplied path to an absolute path inside the sandbox.
    ///
    /// The path is joined onto the root, normalized lexically and then
    /// symlink-resolved: fully when it exists, through its nearest existing
    /// ancestor otherwise. The result must be the root itself or a
    /// descendant of it, compared component by component.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let joined = normalize_lexical(&self.path.join(relative));
        let resolved = resolve_symlinks(&joined).map_err(|e| {
            e.with_operation("sandbox::resolve")
                .with_context("path", relative)
        })?;

        if !resolved.starts_with(&self.path) {
            return Err(Error::outside_sandbox(relative).with_operation("sandbox::resolve"));
        }

        Ok(resolved)
    }
}

/// Collapse `.` and `..` without touching the filesystem.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out
}

/// Symlink hops followed before giving up, matching the kernel's ELOOP limit
const MAX_LINK_HOPS: usize = 40;

/// Canonicalize `path`, or its nearest existing ancestor with the missing
/// tail re-appended, so symlinks above a not-yet-created file are followed.
///
/// "Existing" means present without following links: a dangling symlink is
/// replaced by its target and resolution starts over, so the returned path
/// never names a link that I/O would follow.
fn resolve_symlinks(path: &Path) -> Result<PathBuf> {
    let mut current = path.to_path_buf();

    for _ in 0..MAX_LINK_HOPS {
        let (ancestor, tail) = split_existing(&current)?;
        match ancestor.canonicalize() {
            Ok(mut resolved) => {
                resolved.extend(tail.iter().rev());
                return Ok(resolved);
            }
            Err(_) if is_symlink(&ancestor) => {
                let target = std::fs::read_link(&ancestor)?;
                let base = match ancestor.parent() {
                    Some(parent) => parent.canonicalize()?,
                    None => PathBuf::from("/"),
                };
                current = normalize_lexical(&base.join(target));
                current.extend(tail.iter().rev());
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::new(
        ErrorKind::InvalidArgument,
        format!("too many levels of symbolic links in {}", path.display()),
    ))
}

/// Split `path` into its deepest component present on disk (links not
/// followed) and the missing names below it, innermost first.
fn split_existing(path: &Path) -> Result<(PathBuf, Vec<OsString>)> {
    let mut ancestor = path.to_path_buf();
    let mut tail = Vec::new();
    while std::fs::symlink_metadata(&ancestor).is_err() {
        match ancestor.file_name() {
            Some(name) => tail.push(name.to_os_string()),
            None => {
                return Err(Error::new(
                    ErrorKind::FileNotFound,
                    format!("no existing ancestor for {}", path.display()),
                ))
            }
        }
        if !ancestor.pop() {
            break;
        }
    }
    Ok((ancestor, tail))
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}
