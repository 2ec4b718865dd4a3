// Agent events
//
// The four events that route the agent's steps:
//
// ```text
// StartSignal → prepare_history → InputPrepared → invoke_model ─┬→ StopSignal
//                                        ↑                      │
//                                        └── dispatch_tools ←── ToolCallsRequested
// ```

use serde::{Deserialize, Serialize};
use switchyard_core::WorkflowEvent;

use crate::message::{ChatTurn, ToolInvocationRequest, ToolOutputRecord};

/// Events flowing between the agent's steps
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// User input that starts a run
    StartSignal { input: String },

    /// Full ordered history, ready for the model
    InputPrepared { history: Vec<ChatTurn> },

    /// Tools the model selected, in the order it returned them
    ToolCallsRequested { calls: Vec<ToolInvocationRequest> },

    /// Final model turn plus every successful tool output of the run
    StopSignal {
        reply: ChatTurn,
        tool_outputs: Vec<ToolOutputRecord>,
    },
}

impl AgentEvent {
    pub fn start(input: impl Into<String>) -> Self {
        AgentEvent::StartSignal {
            input: input.into(),
        }
    }
}

/// Routing key of an [`AgentEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentEventKind {
    StartSignal,
    InputPrepared,
    ToolCallsRequested,
    StopSignal,
}

impl std::fmt::Display for AgentEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentEventKind::StartSignal => "StartSignal",
            AgentEventKind::InputPrepared => "InputPrepared",
            AgentEventKind::ToolCallsRequested => "ToolCallsRequested",
            AgentEventKind::StopSignal => "StopSignal",
        };
        f.write_str(name)
    }
}

impl WorkflowEvent for AgentEvent {
    type Kind = AgentEventKind;

    fn kind(&self) -> AgentEventKind {
        match self {
            AgentEvent::StartSignal { .. } => AgentEventKind::StartSignal,
            AgentEvent::InputPrepared { .. } => AgentEventKind::InputPrepared,
            AgentEvent::ToolCallsRequested { .. } => AgentEventKind::ToolCallsRequested,
            AgentEvent::StopSignal { .. } => AgentEventKind::StopSignal,
        }
    }
}
