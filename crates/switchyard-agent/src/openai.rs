// OpenAI Protocol model client
//
// ModelClient for OpenAI-compatible `/chat/completions` endpoints, using
// non-streaming function calling.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::message::{ChatTurn, ToolInvocationRequest, TurnRole};
use crate::model::{ModelClient, ModelReply, ModelRequest};
use crate::tools::ToolDefinition;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";

/// OpenAI Protocol model client
///
/// # Example
///
/// ```ignore
/// let client = OpenAiChatClient::from_env()?;
/// // or
/// let client = OpenAiChatClient::new("your-api-key");
/// // or with a custom endpoint
/// let client = OpenAiChatClient::with_base_url("your-api-key", "http://localhost:8080/v1/chat/completions");
/// ```
#[derive(Clone)]
pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl OpenAiChatClient {
    /// Create a client for the default OpenAI endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_URL)
    }

    /// Create a client with a custom chat completions URL
    pub fn with_base_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }

    /// Create a client from OPENAI_API_KEY and optional OPENAI_BASE_URL
    /// (e.g. `http://localhost:11434/v1`)
    pub fn from_env() -> Result<Self, ModelError> {
        let api_key = std::env::var(ENV_API_KEY)
            .map_err(|_| ModelError::config(format!("{ENV_API_KEY} environment variable not set")))?;

        Ok(match std::env::var(ENV_BASE_URL) {
            Ok(base) if !base.trim().is_empty() => {
                Self::with_base_url(api_key, chat_completions_url(&base))
            }
            _ => Self::new(api_key),
        })
    }

    fn convert_turn(turn: &ChatTurn) -> OpenAiMessage {
        match turn.role {
            TurnRole::User => OpenAiMessage {
                role: "user".to_string(),
                content: Some(turn.content.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            TurnRole::Assistant => {
                let tool_calls: Vec<OpenAiToolCall> = turn
                    .tool_calls
                    .iter()
                    .map(|call| OpenAiToolCall {
                        id: call.call_id.clone(),
                        r#type: "function".to_string(),
                        function: OpenAiFunctionCall {
                            name: call.tool_name.clone(),
                            arguments: call.arguments_value().to_string(),
                        },
                    })
                    .collect();
                OpenAiMessage {
                    role: "assistant".to_string(),
                    content: if turn.content.is_empty() && !tool_calls.is_empty() {
                        None
                    } else {
                        Some(turn.content.clone())
                    },
                    tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                    tool_call_id: None,
                }
            }
            TurnRole::Tool => OpenAiMessage {
                role: "tool".to_string(),
                content: Some(turn.content.clone()),
                tool_calls: None,
                tool_call_id: turn.call_id().map(str::to_string),
            },
        }
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|tool| OpenAiTool {
                r#type: "function".to_string(),
                function: OpenAiFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect()
    }

    fn build_request(request: &ModelRequest) -> OpenAiRequest {
        let mut messages = Vec::with_capacity(request.history.len() + 1);
        if !request.system_prompt.is_empty() {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: Some(request.system_prompt.clone()),
                tool_calls: None,
                tool_call_id: None,
            });
        }
        messages.extend(request.history.iter().map(Self::convert_turn));

        OpenAiRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools: (!request.tools.is_empty()).then(|| Self::convert_tools(&request.tools)),
        }
    }

    fn parse_reply(response: OpenAiResponse) -> Result<ModelReply, ModelError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::invalid_response("response contained no choices"))?;

        let content = choice.message.content.unwrap_or_default();
        let tool_calls: Vec<ToolInvocationRequest> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let arguments = serde_json::from_str::<Value>(&call.function.arguments)
                    .unwrap_or_else(|e| {
                        warn!(
                            tool_name = %call.function.name,
                            error = %e,
                            "Tool call arguments are not valid JSON; using empty arguments"
                        );
                        Value::Object(Default::default())
                    });
                ToolInvocationRequest::new(call.id, call.function.name, arguments)
            })
            .collect();

        debug!(
            finish_reason = ?choice.finish_reason,
            tool_calls = tool_calls.len(),
            "Model reply received"
        );

        Ok(if tool_calls.is_empty() {
            ModelReply::text(content)
        } else {
            ModelReply::with_tools(content, tool_calls)
        })
    }
}

fn chat_completions_url(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{base}/chat/completions")
    }
}

#[async_trait]
impl ModelClient for OpenAiChatClient {
    async fn chat_with_tools(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
        let body = Self::build_request(&request);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::request(format!("Failed to send request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::invalid_response(e.to_string()))?;

        Self::parse_reply(parsed)
    }
}

impl std::fmt::Debug for OpenAiChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatClient")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    r#type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: OpenAiFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_completions_url() {
        assert_eq!(
            chat_completions_url("http://localhost:11434/v1/"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://api.example.com/v1/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_build_request_maps_turns() {
        let call = ToolInvocationRequest::new("call_1", "add", json!({"a": 1, "b": 2}));
        let request = ModelRequest {
            model: "gpt-4o-mini".to_string(),
            system_prompt: "Be brief.".to_string(),
            tools: Vec::new(),
            history: vec![
                ChatTurn::user("1 + 2?"),
                ChatTurn::assistant_with_tools("", vec![call]),
                ChatTurn::tool("call_1", "add", "3"),
            ],
            temperature: Some(0.0),
            max_tokens: None,
        };

        let body = serde_json::to_value(OpenAiChatClient::build_request(&request)).unwrap();
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["content"], Value::Null);
        assert_eq!(messages[2]["tool_calls"][0]["function"]["name"], "add");
        assert_eq!(
            serde_json::from_str::<Value>(
                messages[2]["tool_calls"][0]["function"]["arguments"]
                    .as_str()
                    .unwrap()
            )
            .unwrap(),
            json!({"a": 1, "b": 2})
        );
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert!(body.get("tools").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_reply_with_bad_arguments() {
        let response: OpenAiResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "add", "arguments": "{not json"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let reply = OpenAiChatClient::parse_reply(response).unwrap();
        assert_eq!(reply.tool_calls.len(), 1);
        assert!(reply.tool_calls[0].arguments.is_empty());
        assert_eq!(reply.turn.content, "");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = OpenAiChatClient::new("sk-secret");
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
