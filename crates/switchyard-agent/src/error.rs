// Error types for the tool-calling agent

use std::time::Duration;

use switchyard_core::WorkflowError;
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors raised by a model client
#[derive(Debug, Error)]
pub enum ModelError {
    /// Request could not be sent or the connection failed
    #[error("model request failed: {0}")]
    Request(String),

    /// Endpoint answered with a non-success status
    #[error("model API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Response body could not be interpreted
    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    /// Client is missing credentials or settings
    #[error("model client configuration error: {0}")]
    Configuration(String),

    /// Scripted client ran out of replies
    #[error("no scripted reply left for model call {call}")]
    Exhausted { call: usize },
}

impl ModelError {
    /// Create a request error
    pub fn request(msg: impl Into<String>) -> Self {
        ModelError::Request(msg.into())
    }

    /// Create an invalid response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        ModelError::InvalidResponse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        ModelError::Configuration(msg.into())
    }
}

/// Errors raised by a chat memory backend
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("chat memory error: {0}")]
    Store(String),
}

impl MemoryError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        MemoryError::Store(msg.into())
    }
}

/// Errors returned by an agent run
#[derive(Debug, Error)]
pub enum AgentError {
    /// The step graph or agent settings are invalid
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An event was routed where it should never go
    #[error("routing error: {0}")]
    Routing(String),

    /// Deadline passed before the model produced a final answer
    #[error("agent run timed out after {elapsed:?} ({steps} steps executed)")]
    Timeout { elapsed: Duration, steps: usize },

    /// Model client failure
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Chat memory failure
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// Any other step failure
    #[error("step `{step}` failed: {source}")]
    Step {
        step: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AgentError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        AgentError::Configuration(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentError::Timeout { .. })
    }
}

impl From<WorkflowError> for AgentError {
    fn from(err: WorkflowError) -> Self {
        if err.is_configuration() {
            return AgentError::Configuration(err.to_string());
        }
        if err.is_routing() {
            return AgentError::Routing(err.to_string());
        }
        match err {
            WorkflowError::Timeout { elapsed, steps } => AgentError::Timeout { elapsed, steps },
            WorkflowError::StepFailed { step, source } => {
                // Collaborator errors surface with their own type
                let source = match source.downcast::<ModelError>() {
                    Ok(model) => return AgentError::Model(model),
                    Err(source) => source,
                };
                match source.downcast::<MemoryError>() {
                    Ok(memory) => AgentError::Memory(memory),
                    Err(source) => AgentError::Step { step, source },
                }
            }
            other => AgentError::Routing(other.to_string()),
        }
    }
}
