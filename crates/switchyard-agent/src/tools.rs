// Tool abstraction
//
// Tools are defined with the `Tool` trait and registered with a
// `ToolRegistry`. The registry turns every invocation, including calls to
// tools it does not know and tools that panic, into a ToolOutputRecord, so a
// failing call never escapes the batch it belongs to.
//
// Design decisions:
// - ToolExecutionResult separates errors the model may see from internal ones
// - Internal errors are logged and replaced with a generic message

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::message::{ToolInvocationRequest, ToolOutputRecord};

/// Message shown to the model in place of internal error details
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred while executing the tool";

// ============================================================================
// Tool Execution Result - Error Handling Contract
// ============================================================================

/// Result of a tool execution.
///
/// - `Success`: output is returned to the model
/// - `ToolError`: expected failure the model should know about
///   (e.g., "division by zero", "city not found")
/// - `InternalError`: system failure whose details must not reach the model
#[derive(Debug)]
pub enum ToolExecutionResult {
    /// Successful execution with a JSON result
    Success(Value),

    /// Tool-level error that is safe to show to the model
    ToolError(String),

    /// Internal error; logged, then hidden behind a generic message
    InternalError(ToolInternalError),
}

impl ToolExecutionResult {
    /// Create a successful result
    pub fn success(value: impl Into<Value>) -> Self {
        ToolExecutionResult::Success(value.into())
    }

    /// Create a tool-level error (safe to show to the model)
    pub fn tool_error(message: impl Into<String>) -> Self {
        ToolExecutionResult::ToolError(message.into())
    }

    /// Create an internal error from a string message
    pub fn internal_error_msg(message: impl Into<String>) -> Self {
        ToolExecutionResult::InternalError(ToolInternalError::from_message(message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolExecutionResult::Success(_))
    }

    /// Convert to the record kept in the transcript.
    ///
    /// Failures become `Error: <message>` content; internal errors are logged
    /// with their details and reported with [`INTERNAL_ERROR_MESSAGE`].
    pub fn into_output_record(self, call_id: &str, tool_name: &str) -> ToolOutputRecord {
        match self {
            ToolExecutionResult::Success(value) => {
                ToolOutputRecord::success(call_id, tool_name, value)
            }
            ToolExecutionResult::ToolError(message) => {
                ToolOutputRecord::failure(call_id, tool_name, format!("Error: {message}"))
            }
            ToolExecutionResult::InternalError(err) => {
                error!(
                    tool_name = %tool_name,
                    call_id = %call_id,
                    error = %err.message,
                    "Tool internal error (details hidden from model)"
                );
                ToolOutputRecord::failure(
                    call_id,
                    tool_name,
                    format!("Error: {INTERNAL_ERROR_MESSAGE}"),
                )
            }
        }
    }
}

/// Internal error details (logged but not exposed to the model)
#[derive(Debug)]
pub struct ToolInternalError {
    pub message: String,
}

impl ToolInternalError {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ToolInternalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ToolInternalError {}

// ============================================================================
// Tool Trait
// ============================================================================

/// Tool description sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// A callable the model can select by name.
///
/// # Example
///
/// ```ignore
/// struct Shout;
///
/// #[async_trait]
/// impl Tool for Shout {
///     fn name(&self) -> &str {
///         "shout"
///     }
///
///     fn description(&self) -> &str {
///         "Upper-case the given text"
///     }
///
///     fn parameters_schema(&self) -> Value {
///         json!({
///             "type": "object",
///             "properties": { "text": { "type": "string" } },
///             "required": ["text"]
///         })
///     }
///
///     async fn execute(&self, arguments: Value) -> ToolExecutionResult {
///         match arguments.get("text").and_then(|v| v.as_str()) {
///             Some(text) => ToolExecutionResult::success(text.to_uppercase()),
///             None => ToolExecutionResult::tool_error("missing `text`"),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to select the tool
    fn name(&self) -> &str;

    /// What the tool does, shown to the model
    fn description(&self) -> &str;

    /// JSON schema for the tool's arguments
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with arguments conforming to `parameters_schema()`
    async fn execute(&self, arguments: Value) -> ToolExecutionResult;

    /// Execute on behalf of a specific call.
    ///
    /// The default implementation delegates to `execute()`.
    async fn invoke(&self, call_id: &str, arguments: Value) -> ToolExecutionResult {
        debug!(tool_name = %self.name(), call_id = %call_id, "Invoking tool");
        self.execute(arguments).await
    }

    /// Definition sent to the model
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

// ============================================================================
// ToolRegistry - Collection of Tools
// ============================================================================

/// Tools available to an agent, keyed by name
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with the four arithmetic tools: add, subtract, multiply, divide
    pub fn math() -> Self {
        use crate::math::{AddTool, DivideTool, MultiplyTool, SubtractTool};

        ToolRegistry::builder()
            .tool(AddTool)
            .tool(SubtractTool)
            .tool(MultiplyTool)
            .tool(DivideTool)
            .build()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool names, sorted
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Definitions for every tool, sorted by name
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.to_definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::new()
    }

    /// Run one requested call and record what happened.
    ///
    /// Never fails: an unknown tool, a tool error and a panicking tool all
    /// produce an unsuccessful record.
    pub async fn dispatch(&self, request: &ToolInvocationRequest) -> ToolOutputRecord {
        let call_id = request.call_id.as_str();
        let tool_name = request.tool_name.as_str();

        let Some(tool) = self.tools.get(tool_name) else {
            warn!(tool_name = %tool_name, call_id = %call_id, "Model requested unknown tool");
            return ToolOutputRecord::failure(
                call_id,
                tool_name,
                format!("Tool {tool_name} does not exist."),
            );
        };

        let result = AssertUnwindSafe(tool.invoke(call_id, request.arguments_value()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| ToolExecutionResult::internal_error_msg("tool panicked"));

        let record = result.into_output_record(call_id, tool_name);
        debug!(
            tool_name = %tool_name,
            call_id = %call_id,
            success = record.success,
            "Tool call finished"
        );
        record
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

// ============================================================================
// ToolRegistryBuilder - Fluent API for Building Registry
// ============================================================================

/// Builder for creating a ToolRegistry with a fluent API.
///
/// ```ignore
/// let registry = ToolRegistry::builder()
///     .tool(AddTool)
///     .tool(EchoTool)
///     .build();
/// ```
pub struct ToolRegistryBuilder {
    registry: ToolRegistry,
}

impl ToolRegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: ToolRegistry::new(),
        }
    }

    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        self.registry.register(tool);
        self
    }

    pub fn build(self) -> ToolRegistry {
        self.registry
    }
}

impl Default for ToolRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Built-in Tools
// ============================================================================

/// A tool that echoes back its message (useful for testing)
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo back the provided message. Useful for testing tool execution."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo back"
                }
            },
            "required": ["message"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> ToolExecutionResult {
        let message = arguments
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        ToolExecutionResult::success(message)
    }
}

/// A tool that always fails (useful for testing error handling)
pub struct FailingTool {
    error_message: String,
    use_internal_error: bool,
}

impl FailingTool {
    /// Fail with a tool-level error
    pub fn with_tool_error(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
            use_internal_error: false,
        }
    }

    /// Fail with an internal error
    pub fn with_internal_error(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
            use_internal_error: true,
        }
    }
}

impl Default for FailingTool {
    fn default() -> Self {
        Self::with_tool_error("Tool execution failed")
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "failing_tool"
    }

    fn description(&self) -> &str {
        "A tool that always fails (for testing error handling)"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    async fn execute(&self, _arguments: Value) -> ToolExecutionResult {
        if self.use_internal_error {
            ToolExecutionResult::internal_error_msg(&self.error_message)
        } else {
            ToolExecutionResult::tool_error(&self.error_message)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
