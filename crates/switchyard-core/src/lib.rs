// Event-routed step scheduler
//
// This crate provides a domain-agnostic runtime in which independently
// defined steps are connected by the kind of event each one accepts and emits.
//
// Key design decisions:
// - Events are closed enums with a fieldless Kind tag used as the routing key
// - The step graph is validated once, when the StepRegistry is built
// - Loops are allowed; the run deadline is the only bound on iteration
// - Per-run state lives in a Context owned by exactly one run
// - Run lifecycle is observable through the EventEmitter trait

pub mod context;
pub mod error;
pub mod event;
pub mod events;
pub mod registry;
pub mod step;
pub mod workflow;

// Re-exports for convenience
pub use context::Context;
pub use error::{Result, WorkflowError};
pub use event::WorkflowEvent;
pub use events::{
    EventEmitter, InMemoryEventEmitter, NoopEventEmitter, RunEvent, TracingEventEmitter,
};
pub use registry::StepRegistry;
pub use step::{Step, StepDescriptor, StepRecord};
pub use workflow::{Completed, Workflow, WorkflowBuilder, FAR_FUTURE};
