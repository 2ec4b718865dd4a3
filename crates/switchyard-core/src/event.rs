// Workflow events
//
// Steps are wired together by the kind of event they accept and emit.
// An event type is usually a closed enum; its kind is the fieldless tag
// used as the routing key.

use std::fmt;
use std::hash::Hash;

/// An immutable payload flowing between steps.
///
/// Steps receive events by value and produce new ones; nothing mutates an
/// event once it has been emitted.
pub trait WorkflowEvent: Send + 'static {
    /// Routing key for this event type
    type Kind: Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Kind of this particular event
    fn kind(&self) -> Self::Kind;
}
