// Chat turn types
//
// ChatTurn is a single entry in the conversation transcript. Tool calls the
// model selects travel as ToolInvocationRequests; what the tools returned
// travels back as ToolOutputRecords and tool-role turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// User input
    User,
    /// Model reply
    Assistant,
    /// Tool result
    Tool,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
            TurnRole::Tool => write!(f, "tool"),
        }
    }
}

/// Tool call a tool-role turn answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRef {
    pub call_id: String,
    pub tool_name: String,
}

/// A tool call selected by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Unique within one batch
    pub call_id: String,

    pub tool_name: String,

    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolInvocationRequest {
    /// Create a request. Arguments that are not a JSON object are treated as
    /// empty; anything other than `null` is logged.
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        let call_id = call_id.into();
        let tool_name = tool_name.into();
        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                warn!(
                    tool_name = %tool_name,
                    call_id = %call_id,
                    arguments = %other,
                    "Tool call arguments are not a JSON object; using empty arguments"
                );
                Map::new()
            }
        };
        Self {
            call_id,
            tool_name,
            arguments,
        }
    }

    /// Arguments as a JSON value
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }
}

/// A turn in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: Uuid,

    pub role: TurnRole,

    pub content: String,

    /// Set on tool-role turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallRef>,

    /// Tools the model selected (assistant turns only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocationRequest>,

    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    fn with_role(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            content: content.into(),
            tool_call: None,
            tool_calls: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(TurnRole::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(TurnRole::Assistant, content)
    }

    /// Create an assistant turn that selected tools
    pub fn assistant_with_tools(
        content: impl Into<String>,
        tool_calls: Vec<ToolInvocationRequest>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::with_role(TurnRole::Assistant, content)
        }
    }

    /// Create a tool-role turn answering `call_id`
    pub fn tool(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call: Some(ToolCallRef {
                call_id: call_id.into(),
                tool_name: tool_name.into(),
            }),
            ..Self::with_role(TurnRole::Tool, content)
        }
    }

    pub fn is_tool(&self) -> bool {
        self.role == TurnRole::Tool
    }

    /// Call id this turn answers, for tool-role turns
    pub fn call_id(&self) -> Option<&str> {
        self.tool_call.as_ref().map(|c| c.call_id.as_str())
    }
}

/// What one tool invocation produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutputRecord {
    pub call_id: String,

    pub tool_name: String,

    /// Text placed in the transcript
    pub content: String,

    /// Raw tool output (`{"error": ...}` on failure)
    pub raw: Value,

    pub success: bool,
}

impl ToolOutputRecord {
    /// Record a successful output; string outputs are used verbatim as content
    pub fn success(call_id: impl Into<String>, tool_name: impl Into<String>, raw: Value) -> Self {
        let content = match &raw {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content,
            raw,
            success: true,
        }
    }

    /// Record a failed invocation
    pub fn failure(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: message.clone(),
            raw: serde_json::json!({ "error": message }),
            success: false,
        }
    }

    /// Tool-role turn carrying this output
    pub fn to_turn(&self) -> ChatTurn {
        ChatTurn::tool(&self.call_id, &self.tool_name, &self.content)
    }
}
