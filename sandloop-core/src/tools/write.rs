//! File writes

use super::ToolResult;
use crate::error::{Error, Result};
use crate::sandbox::SandboxRoot;

/// Write `content` to `file_path`, creating parent directories and
/// replacing any existing file.
pub async fn write_file(root: &SandboxRoot, file_path: &str, content: &str) -> ToolResult {
    write_inner(root, file_path, content)
        .await
        .map_err(|e| e.with_operation("tools::write_file"))
        .into()
}

async fn write_inner(root: &SandboxRoot, file_path: &str, content: &str) -> Result<String> {
    let target = root.resolve(file_path)?;
    if target.is_dir() {
        return Err(Error::is_a_directory(file_path));
    }

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, content).await?;

    let written = content.chars().count();
    tracing::debug!(path = %target.display(), chars = written, "file written");

    Ok(format!(
        "Successfully wrote to \"{}\" ({} characters written)",
        file_path, written
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{list_directory, read_file};
    use std::fs;

    fn sandbox() -> (tempfile::TempDir, SandboxRoot) {
        let tmp = tempfile::tempdir().unwrap();
        let root = SandboxRoot::new(tmp.path()).unwrap();
        (tmp, root)
    }

    #[tokio::test]
    async fn test_write_read_list_scenario() {
        let (_tmp, root) = sandbox();

        let result = write_file(&root, "notes/a.txt", "hello").await;
        assert_eq!(
            result,
            ToolResult::Success(
                "Successfully wrote to \"notes/a.txt\" (5 characters written)".into()
            )
        );

        assert_eq!(read_file(&root, "notes/a.txt").await, ToolResult::Success("hello".into()));
        assert_eq!(
            list_directory(&root, "notes").await,
            ToolResult::Success("- a.txt: file_size=5 bytes, is_dir=False\n".into())
        );

        let result = read_file(&root, "../../etc/passwd").await;
        assert!(result.text().contains("outside the permitted working directory"));
    }

    #[tokio::test]
    async fn test_overwrites_in_full() {
        let (tmp, root) = sandbox();
        fs::write(tmp.path().join("a.txt"), "a much longer original body").unwrap();

        assert!(write_file(&root, "a.txt", "short").await.is_success());
        assert_eq!(fs::read_to_string(tmp.path().join("a.txt")).unwrap(), "short");
    }

    #[tokio::test]
    async fn test_counts_characters() {
        let (_tmp, root) = sandbox();
        let result = write_file(&root, "café.txt", "café").await;
        assert!(result.text().contains("(4 characters written)"));
    }

    #[tokio::test]
    async fn test_existing_parent_directories_are_fine() {
        let (tmp, root) = sandbox();
        fs::create_dir_all(tmp.path().join("pkg/sub")).unwrap();
        assert!(write_file(&root, "pkg/sub/mod.py", "").await.is_success());
        assert!(tmp.path().join("pkg/sub/mod.py").is_file());
    }

    #[tokio::test]
    async fn test_refuses_directory_target() {
        let (tmp, root) = sandbox();
        fs::create_dir(tmp.path().join("pkg")).unwrap();

        let result = write_file(&root, "pkg", "x").await;
        assert_eq!(
            result,
            ToolResult::Failure("Error: \"pkg\" is a directory".into())
        );
        assert!(tmp.path().join("pkg").is_dir());
    }

    #[tokio::test]
    async fn test_escape_does_not_touch_filesystem() {
        let outer = tempfile::tempdir().unwrap();
        fs::create_dir(outer.path().join("root")).unwrap();
        let root = SandboxRoot::new(outer.path().join("root")).unwrap();

        let result = write_file(&root, "../escaped/file.txt", "pwned").await;
        assert!(result.text().contains("outside the permitted working directory"));
        assert!(!outer.path().join("escaped").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_cannot_redirect_write() {
        let outer = tempfile::tempdir().unwrap();
        fs::create_dir(outer.path().join("root")).unwrap();
        let root = SandboxRoot::new(outer.path().join("root")).unwrap();
        std::os::unix::fs::symlink(outer.path().join("escaped.txt"), root.path().join("evil"))
            .unwrap();

        let result = write_file(&root, "evil", "pwned").await;
        assert!(result.text().contains("outside the permitted working directory"));
        assert!(!outer.path().join("escaped.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_inside_root_writes_target() {
        let (tmp, root) = sandbox();
        std::os::unix::fs::symlink("real.txt", tmp.path().join("alias.txt")).unwrap();

        assert!(write_file(&root, "alias.txt", "data").await.is_success());
        assert_eq!(fs::read_to_string(tmp.path().join("real.txt")).unwrap(), "data");
    }
}
