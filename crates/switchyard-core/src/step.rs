// Step abstraction
//
// A step is a handler bound to exactly one accepted event kind and one or
// more possible emitted kinds. Steps with several outcomes declare every
// kind they may return; the dispatcher routes on whichever variant comes back.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::Context;
use crate::event::WorkflowEvent;

/// A single handler in a workflow
///
/// # Example
///
/// ```ignore
/// struct Shout;
///
/// #[async_trait]
/// impl Step<Signal, ()> for Shout {
///     fn name(&self) -> &str {
///         "shout"
///     }
///
///     fn accepts(&self) -> SignalKind {
///         SignalKind::Start
///     }
///
///     fn emits(&self) -> Vec<SignalKind> {
///         vec![SignalKind::Stop]
///     }
///
///     async fn run(&self, event: Signal, _ctx: &mut Context<()>) -> anyhow::Result<Signal> {
///         Ok(Signal::Stop(event.text().to_uppercase()))
///     }
/// }
/// ```
#[async_trait]
pub trait Step<E: WorkflowEvent, S: Send>: Send + Sync {
    /// Step name, used in logs, errors and step records
    fn name(&self) -> &str;

    /// The single event kind this step handles
    fn accepts(&self) -> E::Kind;

    /// Every event kind this step may return
    fn emits(&self) -> Vec<E::Kind>;

    /// Handle one event, producing exactly one new event
    async fn run(&self, event: E, ctx: &mut Context<S>) -> anyhow::Result<E>;
}

/// Registration record for a step, captured once at construction
pub struct StepDescriptor<E: WorkflowEvent, S: Send> {
    name: String,
    accepts: E::Kind,
    emits: BTreeSet<E::Kind>,
    handler: Arc<dyn Step<E, S>>,
}

impl<E: WorkflowEvent, S: Send> StepDescriptor<E, S> {
    /// Capture a step's declared signature
    pub fn from_step(handler: Arc<dyn Step<E, S>>) -> Self {
        Self {
            name: handler.name().to_string(),
            accepts: handler.accepts(),
            emits: handler.emits().into_iter().collect(),
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accepts(&self) -> E::Kind {
        self.accepts
    }

    pub fn emits(&self) -> &BTreeSet<E::Kind> {
        &self.emits
    }

    /// Check whether the step declared `kind` among its emissions
    pub fn declares(&self, kind: E::Kind) -> bool {
        self.emits.contains(&kind)
    }

    pub fn handler(&self) -> &Arc<dyn Step<E, S>> {
        &self.handler
    }
}

impl<E: WorkflowEvent, S: Send> fmt::Debug for StepDescriptor<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDescriptor")
            .field("name", &self.name)
            .field("accepts", &self.accepts)
            .field("emits", &self.emits)
            .finish()
    }
}

/// Record of one completed step invocation within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Run this step belongs to
    pub run_id: Uuid,

    /// 1-indexed position in the run
    pub sequence: usize,

    /// Step name
    pub step: String,

    /// Kind of the event the step consumed
    pub accepted: String,

    /// Kind of the event the step produced
    pub emitted: String,

    pub started_at: DateTime<Utc>,

    pub completed_at: DateTime<Utc>,
}

impl StepRecord {
    /// Duration of the invocation in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }
}
