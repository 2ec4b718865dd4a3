// Run events for observation
//
// RunEvent tracks the lifecycle of a workflow run: start, each step
// invocation, and completion or failure. Events are delivered to an
// EventEmitter; emission failures are logged and never affect the run.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

/// Events emitted during a workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Run started
    RunStarted {
        workflow: String,
        run_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A step is about to handle an event
    StepStarted {
        run_id: Uuid,
        sequence: usize,
        step: String,
        accepted: String,
        timestamp: DateTime<Utc>,
    },

    /// A step produced its event
    StepCompleted {
        run_id: Uuid,
        sequence: usize,
        step: String,
        emitted: String,
        duration_ms: i64,
        timestamp: DateTime<Utc>,
    },

    /// Terminal event produced
    RunCompleted {
        run_id: Uuid,
        total_steps: usize,
        timestamp: DateTime<Utc>,
    },

    /// Run failed (timeout, routing defect or step error)
    RunFailed {
        run_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl RunEvent {
    pub fn run_started(workflow: impl Into<String>, run_id: Uuid) -> Self {
        RunEvent::RunStarted {
            workflow: workflow.into(),
            run_id,
            timestamp: Utc::now(),
        }
    }

    pub fn step_started(
        run_id: Uuid,
        sequence: usize,
        step: impl Into<String>,
        accepted: impl Into<String>,
    ) -> Self {
        RunEvent::StepStarted {
            run_id,
            sequence,
            step: step.into(),
            accepted: accepted.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn step_completed(
        run_id: Uuid,
        sequence: usize,
        step: impl Into<String>,
        emitted: impl Into<String>,
        duration_ms: i64,
    ) -> Self {
        RunEvent::StepCompleted {
            run_id,
            sequence,
            step: step.into(),
            emitted: emitted.into(),
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn run_completed(run_id: Uuid, total_steps: usize) -> Self {
        RunEvent::RunCompleted {
            run_id,
            total_steps,
            timestamp: Utc::now(),
        }
    }

    pub fn run_failed(run_id: Uuid, error: impl Into<String>) -> Self {
        RunEvent::RunFailed {
            run_id,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    /// Run this event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            RunEvent::RunStarted { run_id, .. }
            | RunEvent::StepStarted { run_id, .. }
            | RunEvent::StepCompleted { run_id, .. }
            | RunEvent::RunCompleted { run_id, .. }
            | RunEvent::RunFailed { run_id, .. } => *run_id,
        }
    }
}

// ============================================================================
// EventEmitter - For observing runs
// ============================================================================

/// Trait for receiving run events
///
/// Implementations can:
/// - Collect events in memory for testing
/// - Forward events to logs
/// - Do nothing (no-op implementation)
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Emit a single event
    async fn emit(&self, event: RunEvent) -> Result<()>;

    /// Emit multiple events
    async fn emit_batch(&self, events: Vec<RunEvent>) -> Result<()> {
        for event in events {
            self.emit(event).await?;
        }
        Ok(())
    }
}

/// Emitter that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventEmitter;

#[async_trait]
impl EventEmitter for NoopEventEmitter {
    async fn emit(&self, _event: RunEvent) -> Result<()> {
        Ok(())
    }
}

/// Emitter that writes every event to the `tracing` log at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventEmitter;

#[async_trait]
impl EventEmitter for TracingEventEmitter {
    async fn emit(&self, event: RunEvent) -> Result<()> {
        tracing::debug!(run_id = %event.run_id(), event = ?event, "Run event");
        Ok(())
    }
}

/// In-memory event emitter
///
/// Collects events for later inspection. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventEmitter {
    events: Arc<RwLock<Vec<RunEvent>>>,
}

impl InMemoryEventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events collected so far
    pub async fn events(&self) -> Vec<RunEvent> {
        self.events.read().await.clone()
    }

    /// Names of the steps started, in order
    pub async fn started_steps(&self) -> Vec<String> {
        self.events
            .read()
            .await
            .iter()
            .filter_map(|event| match event {
                RunEvent::StepStarted { step, .. } => Some(step.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventEmitter for InMemoryEventEmitter {
    async fn emit(&self, event: RunEvent) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}
