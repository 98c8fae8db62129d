//! # Sandboxed Tools
//!
//! The four operations the model may invoke. Each takes the [`SandboxRoot`]
//! explicitly and returns a [`ToolResult`]: failures are values, never
//! errors that escape to the caller.
//!
//! [`SandboxRoot`]: crate::sandbox::SandboxRoot

mod list;
mod read;
mod script;
mod write;

pub use list::list_directory;
pub use read::read_file;
pub use script::{ExecutionOutcome, ScriptRunner, DEFAULT_SCRIPT_TIMEOUT};
pub use write::write_file;

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Maximum number of characters a single read (or captured stream) returns.
pub const MAX_CHARS: usize = 10_000;

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolResult {
    #[serde(rename = "result")]
    Success(String),
    #[serde(rename = "error")]
    Failure(String),
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success(_))
    }

    /// The payload or failure message
    pub fn text(&self) -> &str {
        match self {
            ToolResult::Success(text) | ToolResult::Failure(text) => text,
        }
    }

    /// Serialize to the single-line envelope sent back to the model:
    /// `{"result": ...}` or `{"error": ...}`.
    pub fn to_envelope(&self) -> String {
        let value = match self {
            ToolResult::Success(text) => serde_json::json!({ "result": text }),
            ToolResult::Failure(text) => serde_json::json!({ "error": text }),
        };
        value.to_string()
    }
}

impl From<crate::error::Result<String>> for ToolResult {
    fn from(result: crate::error::Result<String>) -> Self {
        match result {
            Ok(text) => ToolResult::Success(text),
            Err(err) => ToolResult::from(err),
        }
    }
}

impl From<Error> for ToolResult {
    fn from(err: Error) -> Self {
        tracing::debug!(error = %err, "tool failed");
        ToolResult::Failure(format!("Error: {}", err.message()))
    }
}

/// Keep at most `max` characters of `text`, reporting whether anything was cut.
pub(crate) fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}
