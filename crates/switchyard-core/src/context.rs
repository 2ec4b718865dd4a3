// Per-run context
//
// A Context is created fresh for every run and handed to each step by
// mutable reference. It is never shared between runs, so the state it owns
// needs no locking.

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

/// Mutable state owned by a single in-flight run
#[derive(Debug)]
pub struct Context<S> {
    run_id: Uuid,
    started_at: Instant,
    deadline: Instant,
    steps_executed: usize,
    state: S,
}

impl<S> Context<S> {
    /// Create a context for a run that must finish before `deadline`
    pub fn new(state: S, deadline: Instant) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            started_at: Instant::now(),
            deadline,
            steps_executed: 0,
            state,
        }
    }

    /// Unique ID of this run
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Time left before the deadline (zero once expired)
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Number of step invocations completed so far
    pub fn steps_executed(&self) -> usize {
        self.steps_executed
    }

    pub(crate) fn record_step(&mut self) {
        self.steps_executed += 1;
    }

    /// Shared run state
    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Consume the context, returning the run state
    pub fn into_state(self) -> S {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_tracking() {
        let ctx = Context::new(Vec::<String>::new(), Instant::now() + Duration::from_secs(5));
        assert!(!ctx.is_expired());
        assert_eq!(ctx.remaining(), Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ctx.remaining(), Duration::from_secs(3));
        assert_eq!(ctx.elapsed(), Duration::from_secs(2));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_state_access() {
        let mut ctx = Context::new(vec![1, 2], Instant::now() + Duration::from_secs(1));
        ctx.state_mut().push(3);
        ctx.record_step();

        assert_eq!(ctx.steps_executed(), 1);
        assert_eq!(ctx.state(), &vec![1, 2, 3]);
        assert_eq!(ctx.into_state(), vec![1, 2, 3]);
    }
}
