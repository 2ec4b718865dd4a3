// Error types for the step scheduler

use std::time::Duration;

use thiserror::Error;

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors raised while building or running a workflow
///
/// Event kinds and step names are carried as strings so the error type stays
/// independent of the concrete event enum.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Registry was built without any steps
    #[error("workflow has no steps")]
    EmptyRegistry,

    /// Two steps accept the same event kind
    #[error("event {kind} is accepted by both `{first}` and `{second}`")]
    AmbiguousRouting {
        kind: String,
        first: String,
        second: String,
    },

    /// No chain of declared emissions leads from the start kind to the terminal kind
    #[error("terminal event {terminal} cannot be reached from start event {start}")]
    UnreachableTerminal { start: String, terminal: String },

    /// A step declares an emission nobody accepts and that is not terminal
    #[error("step `{step}` emits {kind} but no step accepts it")]
    DanglingEmission { step: String, kind: String },

    /// A step accepts an event kind that is never produced from the start kind
    #[error("step `{step}` accepts {kind}, which is never produced from the start event")]
    UnreachableStep { step: String, kind: String },

    /// Dispatcher found no step for the pending event
    #[error("no step handles event {kind}")]
    NoHandlerForEvent { kind: String },

    /// A step returned an event kind it did not declare
    #[error("step `{step}` emitted {kind}, which it does not declare")]
    UndeclaredEmission { step: String, kind: String },

    /// Run was started with an event of the wrong kind
    #[error("run must start with {expected}, got {actual}")]
    InvalidStartEvent { expected: String, actual: String },

    /// Deadline passed before a terminal event was produced
    #[error("run timed out after {elapsed:?} ({steps} steps executed)")]
    Timeout { elapsed: Duration, steps: usize },

    /// A step handler returned an error
    #[error("step `{step}` failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: anyhow::Error,
    },

    /// Event emission error
    #[error("event emission error: {0}")]
    EventEmission(String),
}

impl WorkflowError {
    /// Create an event emission error
    pub fn event(msg: impl Into<String>) -> Self {
        WorkflowError::EventEmission(msg.into())
    }

    /// True for errors detected while validating the step graph
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            WorkflowError::EmptyRegistry
                | WorkflowError::AmbiguousRouting { .. }
                | WorkflowError::UnreachableTerminal { .. }
                | WorkflowError::DanglingEmission { .. }
                | WorkflowError::UnreachableStep { .. }
        )
    }

    /// True for dispatch-time routing defects
    pub fn is_routing(&self) -> bool {
        matches!(
            self,
            WorkflowError::NoHandlerForEvent { .. }
                | WorkflowError::UndeclaredEmission { .. }
                | WorkflowError::InvalidStartEvent { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WorkflowError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let config = WorkflowError::DanglingEmission {
            step: "tools".to_string(),
            kind: "ToolCallsRequested".to_string(),
        };
        assert!(config.is_configuration());
        assert!(!config.is_routing());

        let routing = WorkflowError::NoHandlerForEvent {
            kind: "InputPrepared".to_string(),
        };
        assert!(routing.is_routing());
        assert!(!routing.is_configuration());

        let timeout = WorkflowError::Timeout {
            elapsed: Duration::from_secs(3),
            steps: 7,
        };
        assert!(timeout.is_timeout());
        assert!(!timeout.is_configuration());
    }

    #[test]
    fn test_step_failed_keeps_source() {
        let err = WorkflowError::StepFailed {
            step: "invoke_model".to_string(),
            source: anyhow::anyhow!("connection reset"),
        };

        assert_eq!(
            err.to_string(),
            "step `invoke_model` failed: connection reset"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
