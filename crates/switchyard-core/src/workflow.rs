// Workflow dispatcher
//
// Workflow drives a run from a start event to a terminal event:
//
// ```text
// start event → step(kind) → event → step(kind) → ... → terminal event
// ```
//
// Each iteration looks up the step registered for the pending event's kind,
// hands it the event and the run's Context, and feeds the single event it
// returns into the next iteration. Loops are legal; the only bound on them
// is the run deadline, checked between steps.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::context::Context;
use crate::error::{Result, WorkflowError};
use crate::event::WorkflowEvent;
use crate::events::{EventEmitter, NoopEventEmitter, RunEvent};
use crate::registry::StepRegistry;
use crate::step::{Step, StepRecord};

/// Longest deadline a run gets, about thirty years
pub const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout.min(FAR_FUTURE)).unwrap_or(now)
}

/// A run that reached its terminal event
#[derive(Debug)]
pub struct Completed<E, S> {
    pub run_id: Uuid,

    /// The terminal event
    pub event: E,

    /// Run state as left by the last step
    pub state: S,

    /// Every step invocation, in order
    pub steps: Vec<StepRecord>,

    pub elapsed: Duration,
}

/// Immutable, validated workflow; safe to share across concurrent runs
pub struct Workflow<E: WorkflowEvent, S: Send> {
    name: String,
    registry: StepRegistry<E, S>,
    emitter: Arc<dyn EventEmitter>,
}

impl<E: WorkflowEvent, S: Send + 'static> Workflow<E, S> {
    /// Wrap an already validated registry
    pub fn new(name: impl Into<String>, registry: StepRegistry<E, S>) -> Self {
        Self {
            name: name.into(),
            registry,
            emitter: Arc::new(NoopEventEmitter),
        }
    }

    /// Start building a workflow
    pub fn builder(
        name: impl Into<String>,
        start: E::Kind,
        terminal: E::Kind,
    ) -> WorkflowBuilder<E, S> {
        WorkflowBuilder::new(name, start, terminal)
    }

    /// Replace the run event emitter
    pub fn with_emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &StepRegistry<E, S> {
        &self.registry
    }

    /// Run with a deadline `timeout` from now.
    ///
    /// A timeout too large to represent as an instant (e.g. `Duration::MAX`)
    /// is clamped to [`FAR_FUTURE`] from now.
    pub async fn run_with_timeout(
        &self,
        start: E,
        state: S,
        timeout: Duration,
    ) -> Result<Completed<E, S>> {
        self.run(start, state, deadline_after(timeout)).await
    }

    /// Run from `start` until a terminal event is produced or `deadline` passes.
    ///
    /// The deadline is checked before every step invocation and once more when
    /// the terminal event arrives; a step already in flight is never
    /// interrupted. On timeout the run state is dropped and no partial result
    /// is returned.
    pub async fn run(&self, start: E, state: S, deadline: Instant) -> Result<Completed<E, S>> {
        let expected = self.registry.start_kind();
        if start.kind() != expected {
            return Err(WorkflowError::InvalidStartEvent {
                expected: expected.to_string(),
                actual: start.kind().to_string(),
            });
        }

        let ctx = Context::new(state, deadline);
        let run_id = ctx.run_id();
        let span = info_span!("workflow.run", workflow = %self.name, run_id = %run_id);

        let result = self.dispatch(start, ctx).instrument(span).await;

        match &result {
            Ok(completed) => {
                self.notify(RunEvent::run_completed(run_id, completed.steps.len()))
                    .await
            }
            Err(e) => self.notify(RunEvent::run_failed(run_id, e.to_string())).await,
        }

        result
    }

    async fn dispatch(&self, start: E, mut ctx: Context<S>) -> Result<Completed<E, S>> {
        let run_id = ctx.run_id();
        let terminal = self.registry.terminal_kind();
        let mut records: Vec<StepRecord> = Vec::new();
        let mut current = start;

        self.notify(RunEvent::run_started(&self.name, run_id)).await;
        info!(remaining_ms = ctx.remaining().as_millis() as u64, "Run started");

        loop {
            if ctx.is_expired() {
                return Err(self.timeout(&ctx));
            }

            let accepted = current.kind();
            let descriptor =
                self.registry
                    .handler_for(accepted)
                    .ok_or_else(|| WorkflowError::NoHandlerForEvent {
                        kind: accepted.to_string(),
                    })?;
            let step_name = descriptor.name();
            let sequence = ctx.steps_executed() + 1;

            self.notify(RunEvent::step_started(
                run_id,
                sequence,
                step_name,
                accepted.to_string(),
            ))
            .await;

            let started_at = Utc::now();
            let step_span = info_span!(
                "workflow.step",
                step = %step_name,
                sequence,
                accepted = %accepted
            );
            let next = descriptor
                .handler()
                .run(current, &mut ctx)
                .instrument(step_span)
                .await
                .map_err(|source| WorkflowError::StepFailed {
                    step: step_name.to_string(),
                    source,
                })?;
            ctx.record_step();

            let emitted = next.kind();
            if !descriptor.declares(emitted) {
                return Err(WorkflowError::UndeclaredEmission {
                    step: step_name.to_string(),
                    kind: emitted.to_string(),
                });
            }

            let record = StepRecord {
                run_id,
                sequence,
                step: step_name.to_string(),
                accepted: accepted.to_string(),
                emitted: emitted.to_string(),
                started_at,
                completed_at: Utc::now(),
            };
            debug!(
                step = %step_name,
                sequence,
                emitted = %emitted,
                duration_ms = record.duration_ms(),
                "Step completed"
            );
            self.notify(RunEvent::step_completed(
                run_id,
                sequence,
                step_name,
                emitted.to_string(),
                record.duration_ms(),
            ))
            .await;
            records.push(record);

            if emitted == terminal {
                if ctx.is_expired() {
                    return Err(self.timeout(&ctx));
                }
                let elapsed = ctx.elapsed();
                info!(
                    steps = records.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Run completed"
                );
                return Ok(Completed {
                    run_id,
                    event: next,
                    state: ctx.into_state(),
                    steps: records,
                    elapsed,
                });
            }

            current = next;
        }
    }

    fn timeout(&self, ctx: &Context<S>) -> WorkflowError {
        warn!(
            steps = ctx.steps_executed(),
            elapsed_ms = ctx.elapsed().as_millis() as u64,
            "Run deadline expired"
        );
        WorkflowError::Timeout {
            elapsed: ctx.elapsed(),
            steps: ctx.steps_executed(),
        }
    }

    async fn notify(&self, event: RunEvent) {
        if let Err(e) = self.emitter.emit(event).await {
            warn!(error = %e, "Failed to emit run event");
        }
    }
}

impl<E: WorkflowEvent, S: Send> std::fmt::Debug for Workflow<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("registry", &self.registry)
            .finish()
    }
}

// ============================================================================
// WorkflowBuilder - Fluent API for building a workflow
// ============================================================================

/// Builder for a [`Workflow`]; validation happens in [`WorkflowBuilder::build`]
pub struct WorkflowBuilder<E: WorkflowEvent, S: Send> {
    name: String,
    start: E::Kind,
    terminal: E::Kind,
    steps: Vec<Arc<dyn Step<E, S>>>,
    emitter: Option<Arc<dyn EventEmitter>>,
}

impl<E: WorkflowEvent, S: Send + 'static> WorkflowBuilder<E, S> {
    pub fn new(name: impl Into<String>, start: E::Kind, terminal: E::Kind) -> Self {
        Self {
            name: name.into(),
            start,
            terminal,
            steps: Vec::new(),
            emitter: None,
        }
    }

    /// Register a step
    pub fn step(mut self, step: impl Step<E, S> + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Set the run event emitter
    pub fn emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Validate the step graph and build the workflow
    pub fn build(self) -> Result<Workflow<E, S>> {
        let registry = StepRegistry::new(self.steps, self.start, self.terminal)?;
        let workflow = Workflow::new(self.name, registry);
        Ok(match self.emitter {
            Some(emitter) => workflow.with_emitter(emitter),
            None => workflow,
        })
    }
}
