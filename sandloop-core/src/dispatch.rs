//! # Tool Dispatch
//!
//! Turns a model [`ToolCall`] into a [`ToolResponse`]. The dispatcher owns
//! the [`SandboxRoot`] and injects it into every tool; nothing the model
//! sends can replace it. Dispatch never fails: unknown names, undecodable
//! arguments, tool errors and even panics all come back as
//! [`ToolResult::Failure`].

use crate::error::{Error, Result};
use crate::provider::{ChatMessage, ToolCall};
use crate::sandbox::SandboxRoot;
use crate::schema::ToolKind;
use crate::tools::{self, ScriptRunner, ToolResult};
use futures_util::FutureExt;
use serde::Deserialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// A decoded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    GetFilesInfo { directory: String },
    GetFileContent { file_path: String },
    WriteFile { file_path: String, content: String },
    RunPythonFile { file_path: String, args: Vec<String> },
}

#[derive(Deserialize)]
struct GetFilesInfoArgs {
    #[serde(default = "current_dir")]
    directory: String,
}

fn current_dir() -> String {
    ".".to_string()
}

#[derive(Deserialize)]
struct FilePathArgs {
    file_path: String,
}

#[derive(Deserialize)]
struct WriteFileArgs {
    file_path: String,
    content: String,
}

#[derive(Deserialize)]
struct RunPythonFileArgs {
    file_path: String,
    #[serde(default)]
    args: Vec<String>,
}

impl Tool {
    /// Decode a tool call into a typed invocation.
    ///
    /// Keys the schema does not declare are ignored, so a model that sends
    /// `working_directory` cannot steer the sandbox.
    pub fn from_call(call: &ToolCall) -> Result<Self> {
        let kind = ToolKind::from_name(&call.name).ok_or_else(|| Error::unknown_tool(&call.name))?;
        let args = serde_json::Value::Object(call.parse_arguments()?);

        let tool = match kind {
            ToolKind::GetFilesInfo => {
                let a: GetFilesInfoArgs = decode(kind, args)?;
                Tool::GetFilesInfo {
                    directory: a.directory,
                }
            }
            ToolKind::GetFileContent => {
                let a: FilePathArgs = decode(kind, args)?;
                Tool::GetFileContent {
                    file_path: a.file_path,
                }
            }
            ToolKind::WriteFile => {
                let a: WriteFileArgs = decode(kind, args)?;
                Tool::WriteFile {
                    file_path: a.file_path,
                    content: a.content,
                }
            }
            ToolKind::RunPythonFile => {
                let a: RunPythonFileArgs = decode(kind, args)?;
                Tool::RunPythonFile {
                    file_path: a.file_path,
                    args: a.args,
                }
            }
        };
        Ok(tool)
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Tool::GetFilesInfo { .. } => ToolKind::GetFilesInfo,
            Tool::GetFileContent { .. } => ToolKind::GetFileContent,
            Tool::WriteFile { .. } => ToolKind::WriteFile,
            Tool::RunPythonFile { .. } => ToolKind::RunPythonFile,
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(kind: ToolKind, args: serde_json::Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| {
        Error::invalid_argument(format!("invalid arguments for {}: {}", kind.name(), e))
            .with_context("tool", kind.name())
            .set_source(e)
    })
}

/// Result of one dispatched call, tied to the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    pub tool_call_id: String,
    pub name: String,
    pub result: ToolResult,
}

impl ToolResponse {
    /// Serialized envelope sent back as the tool turn's content
    pub fn content(&self) -> String {
        self.result.to_envelope()
    }

    pub fn into_message(self) -> ChatMessage {
        let content = self.content();
        ChatMessage::tool_result(self.tool_call_id, self.name, content)
    }
}

/// Routes tool calls to the sandboxed tools.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    root: SandboxRoot,
    runner: ScriptRunner,
}

impl ToolDispatcher {
    pub fn new(root: SandboxRoot) -> Self {
        Self {
            root,
            runner: ScriptRunner::default(),
        }
    }

    pub fn with_runner(mut self, runner: ScriptRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn root(&self) -> &SandboxRoot {
        &self.root
    }

    /// Execute one tool call. Never fails and never panics.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResponse {
        tracing::info!(tool = %call.name, id = %call.id, "calling function");
        tracing::debug!(
            tool = %call.name,
            arguments = %call.arguments_text(),
            "function arguments"
        );

        let result = match Tool::from_call(call) {
            Ok(tool) => self.invoke(tool).await,
            Err(err) => ToolResult::from(err.with_operation("dispatch::decode")),
        };

        tracing::debug!(
            tool = %call.name,
            success = result.is_success(),
            result = %result.text(),
            "function returned"
        );

        ToolResponse {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            result,
        }
    }

    /// Run a decoded tool, turning a panic inside it into a failure.
    pub async fn invoke(&self, tool: Tool) -> ToolResult {
        let name = tool.kind().name();
        contain(name, self.run(tool)).await
    }

    async fn run(&self, tool: Tool) -> ToolResult {
        match tool {
            Tool::GetFilesInfo { directory } => tools::list_directory(&self.root, &directory).await,
            Tool::GetFileContent { file_path } => tools::read_file(&self.root, &file_path).await,
            Tool::WriteFile { file_path, content } => {
                tools::write_file(&self.root, &file_path, &content).await
            }
            Tool::RunPythonFile { file_path, args } => {
                self.runner.run(&self.root, &file_path, &args).await
            }
        }
    }
}

/// Await a tool future, converting a panic into a failure result.
async fn contain<F>(name: &str, fut: F) -> ToolResult
where
    F: Future<Output = ToolResult>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(tool = name, %message, "tool panicked");
            ToolResult::Failure(format!("Error: {}", message))
        }
    }
}
