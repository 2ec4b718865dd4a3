// Agent steps
//
// The three steps of the tool-calling loop. Each one is wired to the others
// only through the event kinds it accepts and emits:
//
// - prepare_history: StartSignal → InputPrepared
// - invoke_model:    InputPrepared → ToolCallsRequested | StopSignal
// - dispatch_tools:  ToolCallsRequested → InputPrepared (the loop edge)

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use switchyard_core::{Context, Step, WorkflowEvent};
use tracing::{debug, info};

use crate::config::AgentConfig;
use crate::event::{AgentEvent, AgentEventKind};
use crate::message::{ChatTurn, ToolOutputRecord};
use crate::model::{ModelClient, ModelRequest};
use crate::state::AgentState;
use crate::tools::{ToolDefinition, ToolRegistry};

fn unexpected(step: &str, event: &AgentEvent) -> anyhow::Error {
    anyhow::anyhow!("{step} cannot handle {}", event.kind())
}

// ============================================================================
// PrepareHistory
// ============================================================================

/// Starts a run: records the user input and hands the history to the model
#[derive(Debug, Default, Clone, Copy)]
pub struct PrepareHistory;

#[async_trait]
impl Step<AgentEvent, AgentState> for PrepareHistory {
    fn name(&self) -> &str {
        "prepare_history"
    }

    fn accepts(&self) -> AgentEventKind {
        AgentEventKind::StartSignal
    }

    fn emits(&self) -> Vec<AgentEventKind> {
        vec![AgentEventKind::InputPrepared]
    }

    async fn run(
        &self,
        event: AgentEvent,
        ctx: &mut Context<AgentState>,
    ) -> anyhow::Result<AgentEvent> {
        let input = match event {
            AgentEvent::StartSignal { input } => input,
            other => return Err(unexpected(self.name(), &other)),
        };

        ctx.state_mut().reset_tool_outputs();

        let memory = Arc::clone(ctx.state().memory());
        memory.append(ChatTurn::user(input)).await?;
        let history = memory.snapshot().await?;

        debug!(history_len = history.len(), "History prepared");
        Ok(AgentEvent::InputPrepared { history })
    }
}

// ============================================================================
// InvokeModel
// ============================================================================

/// Asks the model for the next turn
pub struct InvokeModel {
    client: Arc<dyn ModelClient>,
    tools: Vec<ToolDefinition>,
    config: AgentConfig,
}

impl InvokeModel {
    pub fn new(client: Arc<dyn ModelClient>, tools: Vec<ToolDefinition>, config: AgentConfig) -> Self {
        Self {
            client,
            tools,
            config,
        }
    }
}

#[async_trait]
impl Step<AgentEvent, AgentState> for InvokeModel {
    fn name(&self) -> &str {
        "invoke_model"
    }

    fn accepts(&self) -> AgentEventKind {
        AgentEventKind::InputPrepared
    }

    fn emits(&self) -> Vec<AgentEventKind> {
        vec![AgentEventKind::ToolCallsRequested, AgentEventKind::StopSignal]
    }

    async fn run(
        &self,
        event: AgentEvent,
        ctx: &mut Context<AgentState>,
    ) -> anyhow::Result<AgentEvent> {
        let history = match event {
            AgentEvent::InputPrepared { history } => history,
            other => return Err(unexpected(self.name(), &other)),
        };

        let request = ModelRequest {
            model: self.config.model.clone(),
            system_prompt: self.config.system_prompt.clone(),
            tools: self.tools.clone(),
            history,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let reply = self.client.chat_with_tools(request).await?;

        ctx.state().memory().append(reply.turn.clone()).await?;

        if reply.tool_calls.is_empty() {
            info!(
                tool_outputs = ctx.state().tool_outputs().len(),
                "Model produced final answer"
            );
            return Ok(AgentEvent::StopSignal {
                reply: reply.turn,
                tool_outputs: ctx.state().tool_outputs().to_vec(),
            });
        }

        info!(
            tool_calls = reply.tool_calls.len(),
            tools = ?reply.tool_calls.iter().map(|c| c.tool_name.as_str()).collect::<Vec<_>>(),
            "Model selected tools"
        );
        Ok(AgentEvent::ToolCallsRequested {
            calls: reply.tool_calls,
        })
    }
}

// ============================================================================
// DispatchTools
// ============================================================================

/// Runs the selected tools and feeds their results back to the model
pub struct DispatchTools {
    tools: Arc<ToolRegistry>,
    parallel: bool,
}

impl DispatchTools {
    pub fn new(tools: Arc<ToolRegistry>, parallel: bool) -> Self {
        Self { tools, parallel }
    }
}

#[async_trait]
impl Step<AgentEvent, AgentState> for DispatchTools {
    fn name(&self) -> &str {
        "dispatch_tools"
    }

    fn accepts(&self) -> AgentEventKind {
        AgentEventKind::ToolCallsRequested
    }

    fn emits(&self) -> Vec<AgentEventKind> {
        vec![AgentEventKind::InputPrepared]
    }

    async fn run(
        &self,
        event: AgentEvent,
        ctx: &mut Context<AgentState>,
    ) -> anyhow::Result<AgentEvent> {
        let calls = match event {
            AgentEvent::ToolCallsRequested { calls } => calls,
            other => return Err(unexpected(self.name(), &other)),
        };

        // join_all yields results in input order, whatever order they finish in
        let records: Vec<ToolOutputRecord> = if self.parallel {
            join_all(calls.iter().map(|call| self.tools.dispatch(call))).await
        } else {
            let mut records = Vec::with_capacity(calls.len());
            for call in &calls {
                records.push(self.tools.dispatch(call).await);
            }
            records
        };

        let mut turns = Vec::with_capacity(records.len());
        let mut failed = 0usize;
        for record in records {
            turns.push(record.to_turn());
            if record.success {
                ctx.state_mut().record_tool_output(record);
            } else {
                failed += 1;
            }
        }

        let memory = Arc::clone(ctx.state().memory());
        memory.append_batch(turns).await?;
        let history = memory.snapshot().await?;

        info!(
            tool_calls = calls.len(),
            failed,
            parallel = self.parallel,
            "Tool calls dispatched"
        );
        Ok(AgentEvent::InputPrepared { history })
    }
}
