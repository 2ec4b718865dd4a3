// Tool-calling agent
//
// This crate builds a conversational agent on the switchyard step scheduler.
// The agent is three steps routed by event kind:
//
//   StartSignal → prepare_history → InputPrepared → invoke_model
//   invoke_model → ToolCallsRequested → dispatch_tools → InputPrepared
//   invoke_model → StopSignal (terminal)
//
// Key design decisions:
// - Collaborators (ModelClient, Tool, ChatMemory) are traits at the seams
// - A failing tool call becomes a tool turn, never a failed run
// - The run deadline is the only bound on the model/tools loop
// - In-memory and scripted implementations ship for tests and demos

pub mod agent;
pub mod config;
pub mod error;
pub mod event;
pub mod math;
pub mod message;
pub mod model;
pub mod state;
pub mod steps;
pub mod tools;

// In-memory implementations for examples and testing
pub mod memory;

// Model client implementations
pub mod openai;

// Re-exports for convenience
pub use agent::{AgentResponse, ToolCallingAgent, ToolCallingAgentBuilder};
pub use config::{AgentConfig, AgentConfigBuilder};
pub use error::{AgentError, MemoryError, ModelError, Result};
pub use event::{AgentEvent, AgentEventKind};
pub use math::{AddTool, DivideTool, MultiplyTool, SubtractTool};
pub use memory::{ChatMemory, InMemoryChatMemory};
pub use message::{ChatTurn, ToolCallRef, ToolInvocationRequest, ToolOutputRecord, TurnRole};
pub use model::{ModelClient, ModelReply, ModelRequest, ScriptedModelClient, ScriptedReply};
pub use openai::OpenAiChatClient;
pub use state::AgentState;
pub use steps::{DispatchTools, InvokeModel, PrepareHistory};
pub use tools::{
    EchoTool, FailingTool, Tool, ToolDefinition, ToolExecutionResult, ToolRegistry,
    ToolRegistryBuilder,
};
