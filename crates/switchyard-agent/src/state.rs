// Per-run agent state
//
// AgentState is the user state carried by the run Context: a handle to the
// chat memory plus the scratch list of tool outputs gathered during the run.

use std::sync::Arc;

use crate::memory::ChatMemory;
use crate::message::ToolOutputRecord;

/// State owned by one agent run
pub struct AgentState {
    memory: Arc<dyn ChatMemory>,
    tool_outputs: Vec<ToolOutputRecord>,
}

impl AgentState {
    pub fn new(memory: Arc<dyn ChatMemory>) -> Self {
        Self {
            memory,
            tool_outputs: Vec::new(),
        }
    }

    /// Chat memory for this run
    pub fn memory(&self) -> &Arc<dyn ChatMemory> {
        &self.memory
    }

    /// Successful tool outputs gathered so far, in call order
    pub fn tool_outputs(&self) -> &[ToolOutputRecord] {
        &self.tool_outputs
    }

    pub fn record_tool_output(&mut self, record: ToolOutputRecord) {
        self.tool_outputs.push(record);
    }

    /// Clear the scratch list
    pub fn reset_tool_outputs(&mut self) {
        self.tool_outputs.clear();
    }

    pub fn into_tool_outputs(self) -> Vec<ToolOutputRecord> {
        self.tool_outputs
    }
}

impl std::fmt::Debug for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentState")
            .field("tool_outputs", &self.tool_outputs.len())
            .finish()
    }
}
