//! # sandloop-core
//!
//! Sandboxed tool execution for LLM agents.
//!
//! ## Core Concepts
//! - **SandboxRoot**: the one directory every tool is confined to
//! - **Tools**: list a directory, read a file, write a file, run a script
//! - **Dispatcher**: turns model tool-calls into bounded, serializable results
//! - **Provider**: trait-based LLM communication (OpenAI-compatible APIs)

pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod provider;
pub mod sandbox;
pub mod schema;
pub mod tools;

pub use conversation::Conversation;
pub use dispatch::{Tool, ToolDispatcher, ToolResponse};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    OpenAIProvider, ProviderConfig, ProviderError, ProviderType, Role, ToolCall,
    ToolDefinition, Usage, UsageTracker,
};
pub use sandbox::SandboxRoot;
pub use schema::{tool_definitions, ToolKind};
pub use tools::{ExecutionOutcome, ScriptRunner, ToolResult, MAX_CHARS};
