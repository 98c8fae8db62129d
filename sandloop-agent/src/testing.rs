//! Scripted provider for loop tests

use sandloop_core::{
    CompletionRequest, CompletionResponse, FinishReason, LlmProvider, ProviderError, ToolCall,
    Usage,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned responses in order and records every request it saw.
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn new(replies: Vec<Result<CompletionResponse, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Other("script exhausted".into())))
    }
}

fn response(content: Option<&str>, tool_calls: Vec<ToolCall>) -> CompletionResponse {
    let finish_reason = if tool_calls.is_empty() {
        FinishReason::Stop
    } else {
        FinishReason::ToolCalls
    };
    CompletionResponse {
        id: "resp".into(),
        model: "scripted-model".into(),
        content: content.map(str::to_string),
        tool_calls,
        finish_reason,
        usage: Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        },
    }
}

pub(crate) fn text_response(content: &str) -> CompletionResponse {
    response(Some(content), Vec::new())
}

pub(crate) fn tool_response(
    content: Option<&str>,
    tool_calls: Vec<ToolCall>,
) -> CompletionResponse {
    response(content, tool_calls)
}
