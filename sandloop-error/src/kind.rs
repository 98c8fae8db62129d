//! Error kinds for sandloop operations

use std::fmt;

/// The kind of error that occurred.
///
/// This enum categorizes errors to help users write clear error handling logic.
/// Users can match on ErrorKind to decide how to handle specific error cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration or parameters
    ConfigInvalid,

    /// Invalid argument passed to a tool
    InvalidArgument,

    // =========================================================================
    // Sandbox errors
    // =========================================================================
    /// The resolved path escapes the sandbox root
    OutsideSandbox,

    /// Target exists but is not a regular file
    NotAFile,

    /// Target exists but is not a directory
    NotADirectory,

    /// Target is a directory where a file was expected
    IsADirectory,

    // =========================================================================
    // Tool errors
    // =========================================================================
    /// Tool name is not in the registry
    UnknownTool,

    /// File is not a script the runner accepts
    UnsupportedScript,

    /// Script exceeded its wall-clock budget
    ScriptTimeout,

    /// The interpreter process could not be started
    SpawnFailed,

    // =========================================================================
    // Provider errors
    // =========================================================================
    /// The model provider returned an error
    ProviderFailed,

    /// Rate limit exceeded
    RateLimited,

    /// The model produced a tool call the provider rejected
    ToolUseFailed,

    /// Response body could not be decoded
    ParseFailed,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Network error
    NetworkFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",

            // Sandbox
            ErrorKind::OutsideSandbox => "OutsideSandbox",
            ErrorKind::NotAFile => "NotAFile",
            ErrorKind::NotADirectory => "NotADirectory",
            ErrorKind::IsADirectory => "IsADirectory",

            // Tool
            ErrorKind::UnknownTool => "UnknownTool",
            ErrorKind::UnsupportedScript => "UnsupportedScript",
            ErrorKind::ScriptTimeout => "ScriptTimeout",
            ErrorKind::SpawnFailed => "SpawnFailed",

            // Provider
            ErrorKind::ProviderFailed => "ProviderFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::ToolUseFailed => "ToolUseFailed",
            ErrorKind::ParseFailed => "ParseFailed",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkFailed | ErrorKind::RateLimited | ErrorKind::ToolUseFailed
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::OutsideSandbox.to_string(), "OutsideSandbox");
        assert_eq!(ErrorKind::ScriptTimeout.to_string(), "ScriptTimeout");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::NetworkFailed.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(ErrorKind::ToolUseFailed.is_retryable());
        assert!(!ErrorKind::OutsideSandbox.is_retryable());
        assert!(!ErrorKind::UnknownTool.is_retryable());
    }
}
