//! OpenAI-compatible provider implementation
//!
//! Works with OpenAI, Groq, vLLM, Ollama, and other OpenAI-compatible APIs.

use super::*;
use crate::error::Error;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                Error::config_invalid(format!("failed to create HTTP client: {}", e))
                    .with_operation("provider::new")
                    .set_source(e)
            })?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn build_request(&self, request: CompletionRequest) -> OpenAIRequest {
        let model = request.model.as_deref().unwrap_or(self.default_model());

        OpenAIRequest {
            model: model.to_string(),
            messages: request.messages.into_iter().map(OpenAIMessage::from).collect(),
            tools: request.tools.as_ref().map(|tools| {
                tools.iter().map(|t| OpenAITool {
                    r#type: "function".into(),
                    function: OpenAIFunction {
                        name: t.name.clone(),
                        description: Some(t.description.clone()),
                        parameters: Some(t.parameters.clone()),
                    },
                }).collect()
            }),
        }
    }
}

impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        match self.config.provider_type {
            ProviderType::Groq => "groq",
            ProviderType::Local => "local",
        }
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let api_request = self.build_request(request);

        let mut req = self.client
            .post(format!("{}/chat/completions", self.base_url()))
            .json(&api_request);

        if let Some(api_key) = &self.config.api_key {
            if !api_key.is_empty() {
                req = req.header("Authorization", format!("Bearer {}", api_key));
            }
        }

        let response = req.send().await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(status, retry_after, &text));
        }

        let api_response: OpenAIResponse = response.json().await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        into_completion(api_response)
    }
}

/// Map a non-success HTTP status and body onto a provider error
fn classify_error(status: u16, retry_after: Option<u64>, body: &str) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited { retry_after },
        401 => ProviderError::AuthenticationFailed,
        400 => {
            let detail = serde_json::from_str::<OpenAIErrorBody>(body).ok().map(|b| b.error);
            let is_tool_use = match &detail {
                Some(detail) => detail.code.as_deref() == Some("tool_use_failed"),
                None => body.contains("tool_use_failed"),
            };
            let message = detail
                .and_then(|d| d.message)
                .unwrap_or_else(|| body.to_string());
            if is_tool_use {
                ProviderError::ToolUseFailed(message)
            } else {
                ProviderError::Api { status, message }
            }
        }
        _ => ProviderError::Api { status, message: body.to_string() },
    }
}

fn into_completion(api_response: OpenAIResponse) -> Result<CompletionResponse, ProviderError> {
    let choice = api_response.choices.into_iter().next()
        .ok_or_else(|| ProviderError::Parse("No choices in response".into()))?;

    let tool_calls = choice.message.tool_calls
        .map(|tcs| tcs.into_iter().map(|tc| ToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments: serde_json::Value::String(tc.function.arguments),
        }).collect())
        .unwrap_or_default();

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    }).unwrap_or_default();

    Ok(CompletionResponse {
        id: api_response.id,
        model: api_response.model,
        content: choice.message.content,
        tool_calls,
        finish_reason: FinishReason::from_wire(choice.finish_reason.as_deref()),
        usage,
    })
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl From<ChatMessage> for OpenAIMessage {
    fn from(msg: ChatMessage) -> Self {
        Self {
            role: match msg.role {
                Role::System => "system".into(),
                Role::User => "user".into(),
                Role::Assistant => "assistant".into(),
                Role::Tool => "tool".into(),
            },
            content: msg.content,
            tool_calls: msg.tool_calls.map(|tcs| {
                tcs.into_iter().map(|tc| OpenAIToolCall {
                    r#type: "function".into(),
                    function: OpenAIFunctionCall {
                        arguments: tc.arguments_text(),
                        name: tc.name,
                    },
                    id: tc.id,
                }).collect()
            }),
            tool_call_id: msg.tool_call_id,
            name: msg.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAITool {
    r#type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: OpenAIFunctionCall,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new(ProviderConfig::groq("gsk-test")).unwrap()
    }

    #[test]
    fn test_provider_identity() {
        let p = provider();
        assert_eq!(p.name(), "groq");
        assert_eq!(p.default_model(), "llama-3.3-70b-versatile");
        assert_eq!(p.base_url(), "https://api.groq.com/openai/v1");

        let config = ProviderConfig::local("http://localhost:8000/v1/", "m");
        let p = OpenAIProvider::new(config).unwrap();
        assert_eq!(p.name(), "local");
        assert_eq!(p.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn test_request_serialization() {
        let args = serde_json::json!({"file_path": "a.txt", "content": "hi"});
        let call = ToolCall::new("call_1", "write_file", args);
        let request = CompletionRequest::new(vec![
            ChatMessage::system("sys"),
            ChatMessage::assistant_with_tools(None, vec![call]),
            ChatMessage::tool_result("call_1", "write_file", "{\"result\":\"ok\"}"),
        ])
        .with_tools(crate::schema::tool_definitions());

        let body = serde_json::to_value(provider().build_request(request)).unwrap();
        assert_eq!(body["model"], "llama-3.3-70b-versatile");
        assert_eq!(body["tools"].as_array().unwrap().len(), 4);
        assert_eq!(body["tools"][0]["type"], "function");

        let assistant = &body["messages"][1];
        assert_eq!(assistant["role"], "assistant");
        let args = assistant["tool_calls"][0]["function"]["arguments"].as_str().unwrap();
        let args: serde_json::Value = serde_json::from_str(args).unwrap();
        assert_eq!(args["file_path"], "a.txt");

        let tool = &body["messages"][2];
        assert_eq!(tool["role"], "tool");
        assert_eq!(tool["tool_call_id"], "call_1");
        assert_eq!(tool["name"], "write_file");
    }

    #[test]
    fn test_response_parsing() {
        let raw = serde_json::json!({
            "id": "chatcmpl-1",
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_a",
                        "type": "function",
                        "function": { "name": "get_files_info", "arguments": "{\"directory\":\".\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
        });

        let response = into_completion(serde_json::from_value(raw).unwrap()).unwrap();
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert!(response.content.is_none());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].parse_arguments().unwrap()["directory"], ".");
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[test]
    fn test_empty_choices_is_parse_error() {
        let raw = serde_json::json!({ "id": "x", "model": "m", "choices": [] });
        let err = into_completion(serde_json::from_value(raw).unwrap()).unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[test]
    fn test_error_classification() {
        assert!(matches!(
            classify_error(429, Some(30), ""),
            ProviderError::RateLimited { retry_after: Some(30) }
        ));
        assert!(matches!(classify_error(401, None, ""), ProviderError::AuthenticationFailed));

        let body = r#"{"error":{"message":"Failed to call a function","type":"invalid_request_error","code":"tool_use_failed"}}"#;
        match classify_error(400, None, body) {
            ProviderError::ToolUseFailed(msg) => assert_eq!(msg, "Failed to call a function"),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            classify_error(400, None, r#"{"error":{"message":"bad","code":"invalid"}}"#),
            ProviderError::Api { status: 400, .. }
        ));
        assert!(matches!(
            classify_error(400, None, "plain tool_use_failed text"),
            ProviderError::ToolUseFailed(_)
        ));
        assert!(matches!(
            classify_error(503, None, "down"),
            ProviderError::Api { status: 503, .. }
        ));
    }
}
