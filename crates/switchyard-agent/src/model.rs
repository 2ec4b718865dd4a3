// Model client abstraction
//
// A ModelClient takes the transcript plus the tool definitions and returns
// one assistant turn. The turn either answers the user (no tool calls) or
// selects one or more tools to run before the model is asked again.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ModelError;
use crate::message::{ChatTurn, ToolInvocationRequest};
use crate::tools::ToolDefinition;

/// Everything a model client needs for one call
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Model identifier (e.g., "gpt-4o-mini")
    pub model: String,

    pub system_prompt: String,

    pub tools: Vec<ToolDefinition>,

    /// Ordered transcript
    pub history: Vec<ChatTurn>,

    pub temperature: Option<f32>,

    pub max_tokens: Option<u32>,
}

/// One model reply
#[derive(Debug, Clone)]
pub struct ModelReply {
    /// Assistant turn to append to the transcript
    pub turn: ChatTurn,

    /// Tools the model selected; empty means the turn is the final answer
    pub tool_calls: Vec<ToolInvocationRequest>,
}

impl ModelReply {
    /// Final answer
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            turn: ChatTurn::assistant(content),
            tool_calls: Vec::new(),
        }
    }

    /// Reply that selects tools
    pub fn with_tools(content: impl Into<String>, tool_calls: Vec<ToolInvocationRequest>) -> Self {
        Self {
            turn: ChatTurn::assistant_with_tools(content, tool_calls.clone()),
            tool_calls,
        }
    }

    pub fn selected_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Chat model with function calling
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Ask the model for the next assistant turn
    async fn chat_with_tools(&self, request: ModelRequest) -> Result<ModelReply, ModelError>;
}

// ============================================================================
// ScriptedModelClient - Returns predefined replies
// ============================================================================

/// A scripted model reply
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    pub text: String,
    pub tool_calls: Vec<ToolInvocationRequest>,
}

impl ScriptedReply {
    /// Text-only reply
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Reply selecting tools
    pub fn with_tools(text: impl Into<String>, tool_calls: Vec<ToolInvocationRequest>) -> Self {
        Self {
            text: text.into(),
            tool_calls,
        }
    }

    fn into_reply(self) -> ModelReply {
        if self.tool_calls.is_empty() {
            ModelReply::text(self.text)
        } else {
            ModelReply::with_tools(self.text, self.tool_calls)
        }
    }
}

/// Model client for tests and demos
///
/// Returns queued replies in order and records every request. Once the queue
/// is empty it repeats the fallback reply, or fails with
/// [`ModelError::Exhausted`] when none is set. Clones share the queue and the
/// call log.
#[derive(Debug, Default, Clone)]
pub struct ScriptedModelClient {
    replies: Arc<RwLock<VecDeque<ScriptedReply>>>,
    fallback: Option<ScriptedReply>,
    latency: Option<Duration>,
    call_log: Arc<RwLock<Vec<ModelRequest>>>,
}

impl ScriptedModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client that answers with `replies` in order
    pub fn with_replies(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Arc::new(RwLock::new(replies.into())),
            ..Self::default()
        }
    }

    /// Reply used once the queue is empty
    pub fn with_fallback(mut self, reply: ScriptedReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Simulated latency of every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue another reply
    pub async fn push(&self, reply: ScriptedReply) {
        self.replies.write().await.push_back(reply);
    }

    /// Every request received so far
    pub async fn calls(&self) -> Vec<ModelRequest> {
        self.call_log.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.call_log.read().await.len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn chat_with_tools(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
        let call = {
            let mut log = self.call_log.write().await;
            log.push(request);
            log.len()
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self.replies.write().await.pop_front();
        next.or_else(|| self.fallback.clone())
            .map(ScriptedReply::into_reply)
            .ok_or(ModelError::Exhausted { call })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(history: Vec<ChatTurn>) -> ModelRequest {
        ModelRequest {
            model: "scripted".to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            tools: Vec::new(),
            history,
            temperature: None,
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let call = ToolInvocationRequest::new("call_1", "echo", json!({"message": "hi"}));
        let client = ScriptedModelClient::with_replies(vec![
            ScriptedReply::with_tools("", vec![call.clone()]),
            ScriptedReply::text("done"),
        ]);

        let first = client.chat_with_tools(request(vec![])).await.unwrap();
        assert!(first.selected_tools());
        assert_eq!(first.tool_calls, vec![call.clone()]);
        assert_eq!(first.turn.tool_calls, vec![call]);

        let second = client
            .chat_with_tools(request(vec![ChatTurn::user("hi")]))
            .await
            .unwrap();
        assert!(!second.selected_tools());
        assert_eq!(second.turn.content, "done");

        let calls = client.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].history[0].content, "hi");
    }

    #[tokio::test]
    async fn test_exhausted_without_fallback() {
        let client = ScriptedModelClient::new();

        let err = client.chat_with_tools(request(vec![])).await.unwrap_err();
        assert!(matches!(err, ModelError::Exhausted { call: 1 }));
    }

    #[tokio::test]
    async fn test_fallback_repeats() {
        let client = ScriptedModelClient::new().with_fallback(ScriptedReply::text("again"));

        for _ in 0..3 {
            let reply = client.chat_with_tools(request(vec![])).await.unwrap();
            assert_eq!(reply.turn.content, "again");
        }
        assert_eq!(client.call_count().await, 3);
    }
}
