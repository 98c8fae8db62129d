//! Agent implementation - orchestrates the LLM <-> tool loop

use crate::retry::RetryPolicy;
use sandloop_core::{
    tool_definitions, ChatMessage, CompletionRequest, Conversation, Error, LlmProvider, ToolCall,
    ToolDispatcher, UsageTracker,
};

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful AI coding agent.

When a user asks a question or makes a request, make a function call plan. You can perform the following operations:

- List files and directories
- Read file contents
- Write files
- Run Python files

All paths you provide should be relative to the working directory. You do not need to specify the working directory in your function calls as it is automatically injected for security reasons.";

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Upper bound on model calls per run
    pub max_iterations: usize,
    pub retry: RetryPolicy,
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            retry: RetryPolicy::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Why a run stopped without an answer
#[derive(Debug)]
pub enum AbortReason {
    /// `max_iterations` model calls were made without a final answer
    IterationLimit(usize),
    /// The provider failed and retrying could not help
    Provider(Error),
    /// The model returned neither tool calls nor text
    MalformedResponse,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IterationLimit(n) => write!(f, "reached maximum iteration limit ({})", n),
            Self::Provider(err) => write!(f, "model call failed: {}", err),
            Self::MalformedResponse => write!(f, "model returned no tool calls and no content"),
        }
    }
}

#[derive(Debug)]
pub enum LoopStatus {
    Finished {
        answer: String,
    },
    Aborted {
        reason: AbortReason,
        /// Latest non-blank assistant text, if the model said anything
        last_message: Option<String>,
    },
}

/// Result from one agent run
#[derive(Debug)]
pub struct AgentOutcome {
    pub status: LoopStatus,
    pub conversation: Conversation,
    pub usage: UsageTracker,
    /// Model calls that returned a response
    pub iterations: usize,
}

impl AgentOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self.status, LoopStatus::Finished { .. })
    }

    pub fn answer(&self) -> Option<&str> {
        match &self.status {
            LoopStatus::Finished { answer } => Some(answer),
            LoopStatus::Aborted { .. } => None,
        }
    }
}

enum LoopState {
    AwaitingModel,
    HasToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
    ExecutingTools(Vec<ToolCall>),
    Finished(String),
    Aborted(AbortReason),
}

/// The agent orchestrator - drives the model until it answers or gives up.
pub struct Agent<P: LlmProvider> {
    provider: P,
    dispatcher: ToolDispatcher,
    config: AgentConfig,
}

impl<P: LlmProvider> Agent<P> {
    pub fn new(provider: P, dispatcher: ToolDispatcher) -> Self {
        Self::with_config(provider, dispatcher, AgentConfig::default())
    }

    pub fn with_config(provider: P, dispatcher: ToolDispatcher, config: AgentConfig) -> Self {
        Self {
            provider,
            dispatcher,
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run a task to completion.
    ///
    /// Never returns an error: every way a run can end is a [`LoopStatus`].
    pub async fn run(&self, prompt: &str) -> AgentOutcome {
        let mut conversation = Conversation::seeded(&self.config.system_prompt, prompt);
        let mut usage = UsageTracker::new();
        let mut iterations = 0;
        let tools = tool_definitions();
        let model = self.provider.default_model().to_string();

        tracing::debug!(%prompt, provider = self.provider.name(), %model, "starting agent run");

        let mut state = LoopState::AwaitingModel;
        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if iterations >= self.config.max_iterations {
                        let limit = self.config.max_iterations;
                        tracing::warn!(limit, "reached maximum iteration limit");
                        LoopState::Aborted(AbortReason::IterationLimit(limit))
                    } else {
                        let request = CompletionRequest::new(conversation.turns().to_vec())
                            .with_model(model.as_str())
                            .with_tools(tools.clone());

                        match self.config.retry.complete(&self.provider, &request).await {
                            Ok(response) => {
                                iterations += 1;
                                usage.track(&response.model, &response.usage);
                                tracing::debug!(
                                    iteration = iterations,
                                    prompt_tokens = response.usage.prompt_tokens,
                                    completion_tokens = response.usage.completion_tokens,
                                    "model responded"
                                );

                                let text = response.content.filter(|c| !c.trim().is_empty());
                                if !response.tool_calls.is_empty() {
                                    LoopState::HasToolCalls {
                                        content: text,
                                        calls: response.tool_calls,
                                    }
                                } else if let Some(answer) = text {
                                    conversation.push(ChatMessage::assistant(answer.as_str()));
                                    LoopState::Finished(answer)
                                } else {
                                    conversation.push(ChatMessage::assistant(""));
                                    LoopState::Aborted(AbortReason::MalformedResponse)
                                }
                            }
                            Err(err) => {
                                tracing::error!(
                                    iteration = iterations + 1,
                                    error = %err,
                                    "model call failed"
                                );
                                LoopState::Aborted(AbortReason::Provider(err))
                            }
                        }
                    }
                }
                LoopState::HasToolCalls { content, calls } => {
                    conversation.push(ChatMessage::assistant_with_tools(content, calls.clone()));
                    LoopState::ExecutingTools(calls)
                }
                LoopState::ExecutingTools(calls) => {
                    let mut turns = Vec::with_capacity(calls.len());
                    for call in &calls {
                        turns.push(self.dispatcher.dispatch(call).await.into_message());
                    }
                    conversation.extend(turns);
                    LoopState::AwaitingModel
                }
                LoopState::Finished(answer) => {
                    return AgentOutcome {
                        status: LoopStatus::Finished { answer },
                        conversation,
                        usage,
                        iterations,
                    };
                }
                LoopState::Aborted(reason) => {
                    let last_message = conversation
                        .last_assistant_text()
                        .filter(|text| !text.trim().is_empty())
                        .map(str::to_string);
                    return AgentOutcome {
                        status: LoopStatus::Aborted {
                            reason,
                            last_message,
                        },
                        conversation,
                        usage,
                        iterations,
                    };
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{text_response, tool_response, ScriptedProvider};
    use sandloop_core::{ErrorKind, ProviderError, Role, SandboxRoot};
    use serde_json::json;
    use std::fs;

    fn agent(
        replies: Vec<Result<sandloop_core::CompletionResponse, ProviderError>>,
    ) -> (tempfile::TempDir, Agent<ScriptedProvider>) {
        let tmp = tempfile::tempdir().unwrap();
        let dispatcher = ToolDispatcher::new(SandboxRoot::new(tmp.path()).unwrap());
        let config = AgentConfig {
            retry: RetryPolicy::immediate(),
            ..AgentConfig::default()
        };
        let agent = Agent::with_config(ScriptedProvider::new(replies), dispatcher, config);
        (tmp, agent)
    }

    #[tokio::test]
    async fn test_finishes_on_plain_answer() {
        let (_tmp, agent) = agent(vec![Ok(text_response("All done."))]);
        let outcome = agent.run("say hi").await;

        assert!(outcome.is_finished());
        assert_eq!(outcome.answer(), Some("All done."));
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.usage.total_calls, 1);

        let roles: Vec<Role> = outcome.conversation.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(
            outcome.conversation.turns()[0].content.as_deref(),
            Some(DEFAULT_SYSTEM_PROMPT)
        );
    }

    #[tokio::test]
    async fn test_tool_turns_follow_assistant_in_call_order() {
        let calls = vec![
            ToolCall::new("c1", "write_file", json!({"file_path": "a.txt", "content": "abc"})),
            ToolCall::new("c2", "get_file_content", json!({"file_path": "a.txt"})),
            ToolCall::new("c3", "get_file_content", json!({"file_path": "../escape.txt"})),
        ];
        let (tmp, agent) = agent(vec![
            Ok(tool_response(Some("working on it"), calls)),
            Ok(text_response("Wrote and read a.txt")),
        ]);
        let outcome = agent.run("write a file").await;

        assert_eq!(outcome.answer(), Some("Wrote and read a.txt"));
        assert_eq!(outcome.iterations, 2);
        assert_eq!(fs::read_to_string(tmp.path().join("a.txt")).unwrap(), "abc");

        let turns = outcome.conversation.turns();
        assert_eq!(turns.len(), 7);
        assert_eq!(turns[2].role, Role::Assistant);
        assert_eq!(turns[2].content.as_deref(), Some("working on it"));
        assert_eq!(turns[2].tool_calls.as_ref().map(Vec::len), Some(3));

        let ids: Vec<_> = turns[3..6].iter().map(|t| t.tool_call_id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(turns[4].content.as_deref(), Some(r#"{"result":"abc"}"#));
        assert!(turns[5].content.as_deref().unwrap().starts_with(r#"{"error":"Error: "#));

        // the second request carried every tool turn
        let requests = agent.provider.requests();
        assert_eq!(requests[1].messages.len(), 6);
        assert!(requests[1].tools.as_ref().is_some_and(|t| t.len() == 4));
    }

    #[tokio::test]
    async fn test_unknown_tool_feeds_back_and_continues() {
        let (_tmp, agent) = agent(vec![
            Ok(tool_response(None, vec![ToolCall::new("x", "delete_everything", "{}")])),
            Ok(text_response("I cannot do that.")),
        ]);
        let outcome = agent.run("delete it all").await;

        assert!(outcome.is_finished());
        let tool_turn = &outcome.conversation.turns()[3];
        assert_eq!(
            tool_turn.content.as_deref(),
            Some(r#"{"error":"Error: Unknown function: delete_everything"}"#)
        );
    }

    #[tokio::test]
    async fn test_blank_response_is_malformed() {
        let (_tmp, agent) = agent(vec![
            Ok(tool_response(Some("checking"), vec![ToolCall::new("1", "get_files_info", "{}")])),
            Ok(text_response("   ")),
        ]);
        let outcome = agent.run("list").await;

        match outcome.status {
            LoopStatus::Aborted { reason: AbortReason::MalformedResponse, last_message } => {
                assert_eq!(last_message.as_deref(), Some("checking"));
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_iteration_limit_reports_last_message() {
        let replies = (0..25)
            .map(|i| {
                let call = ToolCall::new(format!("c{}", i), "get_files_info", "{}");
                Ok(tool_response(Some(format!("step {}", i).as_str()), vec![call]))
            })
            .collect();
        let (_tmp, agent) = agent(replies);
        let outcome = agent.run("loop forever").await;

        assert_eq!(outcome.iterations, 20);
        assert_eq!(agent.provider.calls(), 20);
        match outcome.status {
            LoopStatus::Aborted { reason: AbortReason::IterationLimit(20), last_message } => {
                assert_eq!(last_message.as_deref(), Some("step 19"));
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retries_are_not_counted_as_iterations() {
        let (_tmp, agent) = agent(vec![
            Err(ProviderError::RateLimited { retry_after: Some(1) }),
            Err(ProviderError::ToolUseFailed("bad".into())),
            Ok(text_response("finally")),
        ]);
        let outcome = agent.run("hi").await;

        assert_eq!(outcome.answer(), Some("finally"));
        assert_eq!(outcome.iterations, 1);
        assert_eq!(agent.provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_provider_exhaustion_aborts() {
        let (_tmp, agent) = agent(vec![
            Err(ProviderError::RateLimited { retry_after: None }),
            Err(ProviderError::RateLimited { retry_after: None }),
        ]);
        let outcome = agent.run("hi").await;

        assert!(!outcome.is_finished());
        assert_eq!(outcome.iterations, 0);
        match outcome.status {
            LoopStatus::Aborted { reason: AbortReason::Provider(err), last_message } => {
                assert_eq!(err.kind(), ErrorKind::RateLimited);
                assert!(last_message.is_none());
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.retry, RetryPolicy::default());
        assert!(config.system_prompt.contains("relative to the working directory"));
        assert_eq!(
            AbortReason::IterationLimit(20).to_string(),
            "reached maximum iteration limit (20)"
        );
    }
}
