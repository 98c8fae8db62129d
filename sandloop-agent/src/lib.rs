//! # Sandloop Agent
//!
//! The agent drives a bounded conversation between the model and the
//! sandboxed tools:
//! 1. The user provides a task description
//! 2. The model either answers or asks for tool calls
//! 3. Tool calls run in order, each result becomes a tool turn
//! 4. Repeat until the model answers, misbehaves, or the iteration cap hits
//!
//! Rate limits and rejected tool calls are retried per [`RetryPolicy`].

mod agent;
mod retry;

#[cfg(test)]
mod testing;

pub use agent::{
    AbortReason, Agent, AgentConfig, AgentOutcome, LoopStatus, DEFAULT_SYSTEM_PROMPT,
};
pub use retry::RetryPolicy;
