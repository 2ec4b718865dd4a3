// Tool-calling agent
//
// ToolCallingAgent wires the three agent steps into a validated workflow and
// runs it once per user input. The agent itself holds only immutable
// configuration; each run gets its own Context, so one agent can serve many
// concurrent runs.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use switchyard_core::{EventEmitter, StepRecord, Workflow, WorkflowEvent};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::event::{AgentEvent, AgentEventKind};
use crate::memory::{ChatMemory, InMemoryChatMemory};
use crate::message::{ChatTurn, ToolOutputRecord};
use crate::model::ModelClient;
use crate::state::AgentState;
use crate::steps::{DispatchTools, InvokeModel, PrepareHistory};
use crate::tools::{Tool, ToolRegistry};

const WORKFLOW_NAME: &str = "tool_calling_agent";

/// Result of a successful agent run
#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    pub run_id: Uuid,

    /// Final answer text
    pub reply: String,

    /// Final assistant turn
    pub reply_turn: ChatTurn,

    /// Successful tool outputs of this run, in call order
    pub tool_outputs: Vec<ToolOutputRecord>,

    /// Step invocations, in order
    pub steps: Vec<StepRecord>,
}

impl AgentResponse {
    /// Names of the steps run, in order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step.as_str()).collect()
    }
}

/// Agent that loops between the model and its tools until the model answers
pub struct ToolCallingAgent {
    config: AgentConfig,
    tools: Arc<ToolRegistry>,
    workflow: Workflow<AgentEvent, AgentState>,
}

impl ToolCallingAgent {
    /// Build an agent; the step graph is validated here, before any run
    pub fn new(
        config: AgentConfig,
        client: Arc<dyn ModelClient>,
        tools: ToolRegistry,
    ) -> Result<Self> {
        Self::assemble(config, client, tools, None)
    }

    pub fn builder() -> ToolCallingAgentBuilder {
        ToolCallingAgentBuilder::new()
    }

    fn assemble(
        config: AgentConfig,
        client: Arc<dyn ModelClient>,
        tools: ToolRegistry,
        emitter: Option<Arc<dyn EventEmitter>>,
    ) -> Result<Self> {
        let tools = Arc::new(tools);

        let mut builder = Workflow::builder(
            WORKFLOW_NAME,
            AgentEventKind::StartSignal,
            AgentEventKind::StopSignal,
        )
        .step(PrepareHistory)
        .step(InvokeModel::new(
            client,
            tools.tool_definitions(),
            config.clone(),
        ))
        .step(DispatchTools::new(
            Arc::clone(&tools),
            config.parallel_tool_calls,
        ));
        if let Some(emitter) = emitter {
            builder = builder.emitter(emitter);
        }
        let workflow = builder.build()?;

        info!(
            model = %config.model,
            tools = ?tools.tool_names(),
            parallel_tool_calls = config.parallel_tool_calls,
            "Agent ready"
        );

        Ok(Self {
            config,
            tools,
            workflow,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The underlying step graph (for inspection)
    pub fn workflow(&self) -> &Workflow<AgentEvent, AgentState> {
        &self.workflow
    }

    /// Answer `input` in a fresh conversation
    pub async fn run(&self, input: impl Into<String>) -> Result<AgentResponse> {
        self.run_with_memory(input, Arc::new(InMemoryChatMemory::new()))
            .await
    }

    /// Answer `input` within a caller-owned conversation
    pub async fn run_with_memory(
        &self,
        input: impl Into<String>,
        memory: Arc<dyn ChatMemory>,
    ) -> Result<AgentResponse> {
        self.run_with_timeout(input, memory, self.config.timeout)
            .await
    }

    /// Answer `input` with an explicit deadline.
    ///
    /// When the run fails (timeout included) no partial answer is returned and
    /// `memory` is truncated back to the length it had before the run, so a
    /// failed turn never leaves an unanswered tool call behind. Runs sharing
    /// one memory must not overlap.
    pub async fn run_with_timeout(
        &self,
        input: impl Into<String>,
        memory: Arc<dyn ChatMemory>,
        timeout: Duration,
    ) -> Result<AgentResponse> {
        let prior_len = memory.len().await?;
        let result = self
            .workflow
            .run_with_timeout(
                AgentEvent::start(input),
                AgentState::new(Arc::clone(&memory)),
                timeout,
            )
            .await;

        let completed = match result {
            Ok(completed) => completed,
            Err(err) => {
                rollback(memory.as_ref(), prior_len).await;
                return Err(err.into());
            }
        };

        match completed.event {
            AgentEvent::StopSignal {
                reply,
                tool_outputs,
            } => Ok(AgentResponse {
                run_id: completed.run_id,
                reply: reply.content.clone(),
                reply_turn: reply,
                tool_outputs,
                steps: completed.steps,
            }),
            other => {
                rollback(memory.as_ref(), prior_len).await;
                Err(AgentError::Routing(format!(
                    "run ended with {} instead of StopSignal",
                    other.kind()
                )))
            }
        }
    }
}

/// Drop the turns a failed run appended
async fn rollback(memory: &dyn ChatMemory, len: usize) {
    if let Err(e) = memory.truncate(len).await {
        warn!(error = %e, len, "Failed to roll back chat memory after a failed run");
    }
}

impl std::fmt::Debug for ToolCallingAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCallingAgent")
            .field("config", &self.config)
            .field("tools", &self.tools)
            .finish()
    }
}

// ============================================================================
// ToolCallingAgentBuilder - Fluent API for building an agent
// ============================================================================

/// Builder for a [`ToolCallingAgent`]
#[derive(Default)]
pub struct ToolCallingAgentBuilder {
    config: AgentConfig,
    client: Option<Arc<dyn ModelClient>>,
    tools: ToolRegistry,
    emitter: Option<Arc<dyn EventEmitter>>,
}

impl ToolCallingAgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Model client (required)
    pub fn model_client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Replace the tool set
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Add one tool
    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.register(tool);
        self
    }

    /// Observe run events
    pub fn emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn build(self) -> Result<ToolCallingAgent> {
        let client = self
            .client
            .ok_or_else(|| AgentError::config("a model client is required"))?;
        ToolCallingAgent::assemble(self.config, client, self.tools, self.emitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScriptedModelClient, ScriptedReply};

    #[test]
    fn test_builder_requires_model_client() {
        let err = ToolCallingAgent::builder().build().unwrap_err();
        assert!(matches!(err, AgentError::Configuration(ref msg) if msg.contains("model client")));
    }

    #[test]
    fn test_step_graph_has_documented_loop() {
        let agent = ToolCallingAgent::new(
            AgentConfig::default(),
            Arc::new(ScriptedModelClient::new()),
            ToolRegistry::math(),
        )
        .unwrap();

        let registry = agent.workflow().registry();
        assert_eq!(registry.len(), 3);
        assert!(registry.has_cycle());

        let edges = registry.edges();
        assert!(edges[&AgentEventKind::ToolCallsRequested].contains(&AgentEventKind::InputPrepared));
        assert!(edges[&AgentEventKind::InputPrepared].contains(&AgentEventKind::StopSignal));
    }

    #[tokio::test]
    async fn test_greeting_takes_two_steps() {
        let agent = ToolCallingAgent::builder()
            .model_client(Arc::new(ScriptedModelClient::with_replies(vec![
                ScriptedReply::text("Hello! How can I help you today?"),
            ])))
            .build()
            .unwrap();

        let response = agent.run("Hello!").await.unwrap();

        assert_eq!(response.reply, "Hello! How can I help you today?");
        assert!(response.tool_outputs.is_empty());
        assert_eq!(response.step_names(), vec!["prepare_history", "invoke_model"]);
    }
}
