//! Step registry and graph validation
//!
//! The registry maps every event kind to the single step that accepts it.
//! It is validated once, when built: a registry that exists is a registry
//! whose step graph leads from the start kind to the terminal kind.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, WorkflowError};
use crate::event::WorkflowEvent;
use crate::step::{Step, StepDescriptor};

/// Validated, immutable routing table for a workflow
pub struct StepRegistry<E: WorkflowEvent, S: Send> {
    descriptors: Vec<StepDescriptor<E, S>>,
    routes: HashMap<E::Kind, usize>,
    start: E::Kind,
    terminal: E::Kind,
}

impl<E: WorkflowEvent, S: Send> StepRegistry<E, S> {
    /// Build and validate a registry.
    ///
    /// Checks, in order:
    /// 1. at least one step is registered
    /// 2. no two steps accept the same kind
    /// 3. every declared emission is accepted by some step or is the terminal kind
    /// 4. the terminal kind is produced along some path from the start kind
    /// 5. every step's accepted kind is reachable from the start kind
    pub fn new(
        steps: Vec<Arc<dyn Step<E, S>>>,
        start: E::Kind,
        terminal: E::Kind,
    ) -> Result<Self> {
        if steps.is_empty() {
            return Err(WorkflowError::EmptyRegistry);
        }

        let descriptors: Vec<StepDescriptor<E, S>> =
            steps.into_iter().map(StepDescriptor::from_step).collect();

        let mut routes: HashMap<E::Kind, usize> = HashMap::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.iter().enumerate() {
            if let Some(&existing) = routes.get(&descriptor.accepts()) {
                return Err(WorkflowError::AmbiguousRouting {
                    kind: descriptor.accepts().to_string(),
                    first: descriptors[existing].name().to_string(),
                    second: descriptor.name().to_string(),
                });
            }
            routes.insert(descriptor.accepts(), index);
        }

        for descriptor in &descriptors {
            if let Some(kind) = descriptor
                .emits()
                .iter()
                .find(|kind| **kind != terminal && !routes.contains_key(*kind))
            {
                return Err(WorkflowError::DanglingEmission {
                    step: descriptor.name().to_string(),
                    kind: kind.to_string(),
                });
            }
        }

        let produced = produced_kinds(&descriptors, &routes, start, terminal);

        if !produced.contains(&terminal) {
            return Err(WorkflowError::UnreachableTerminal {
                start: start.to_string(),
                terminal: terminal.to_string(),
            });
        }

        for descriptor in &descriptors {
            let kind = descriptor.accepts();
            let reachable = kind == start || (kind != terminal && produced.contains(&kind));
            if !reachable {
                return Err(WorkflowError::UnreachableStep {
                    step: descriptor.name().to_string(),
                    kind: kind.to_string(),
                });
            }
        }

        debug!(
            steps = descriptors.len(),
            start = %start,
            terminal = %terminal,
            "Step registry validated"
        );

        Ok(Self {
            descriptors,
            routes,
            start,
            terminal,
        })
    }

    /// Kind that starts every run
    pub fn start_kind(&self) -> E::Kind {
        self.start
    }

    /// Kind whose production ends a run
    pub fn terminal_kind(&self) -> E::Kind {
        self.terminal
    }

    /// Step registered for `kind`, if any
    pub fn handler_for(&self, kind: E::Kind) -> Option<&StepDescriptor<E, S>> {
        self.routes.get(&kind).map(|&index| &self.descriptors[index])
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Event-kind adjacency: accepted kind → kinds its step may emit
    pub fn edges(&self) -> BTreeMap<E::Kind, BTreeSet<E::Kind>> {
        self.descriptors
            .iter()
            .map(|d| (d.accepts(), d.emits().clone()))
            .collect()
    }

    /// Whether some step can re-emit a kind that leads back to itself
    pub fn has_cycle(&self) -> bool {
        let edges = self.edges();
        // Iterative DFS with colouring: 1 = on stack, 2 = done
        let mut colour: HashMap<E::Kind, u8> = HashMap::new();
        for &root in edges.keys() {
            if colour.contains_key(&root) {
                continue;
            }
            let mut stack: Vec<(E::Kind, Vec<E::Kind>)> =
                vec![(root, successors(&edges, root))];
            colour.insert(root, 1);
            loop {
                let Some((node, pending)) = stack.last_mut() else {
                    break;
                };
                let node = *node;
                match pending.pop() {
                    Some(next) => match colour.get(&next) {
                        Some(1) => return true,
                        Some(_) => {}
                        None => {
                            colour.insert(next, 1);
                            stack.push((next, successors(&edges, next)));
                        }
                    },
                    None => {
                        colour.insert(node, 2);
                        stack.pop();
                    }
                }
            }
        }
        false
    }
}

impl<E: WorkflowEvent, S: Send> fmt::Debug for StepRegistry<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("start", &self.start)
            .field("terminal", &self.terminal)
            .field("steps", &self.descriptors)
            .finish()
    }
}

fn successors<K: Copy + Ord>(edges: &BTreeMap<K, BTreeSet<K>>, kind: K) -> Vec<K> {
    edges
        .get(&kind)
        .map(|next| next.iter().copied().collect())
        .unwrap_or_default()
}

/// Kinds emitted along any path from the start kind.
///
/// The start kind is always expanded; afterwards the terminal kind is never
/// expanded, since producing it ends the run.
fn produced_kinds<E: WorkflowEvent, S: Send>(
    descriptors: &[StepDescriptor<E, S>],
    routes: &HashMap<E::Kind, usize>,
    start: E::Kind,
    terminal: E::Kind,
) -> BTreeSet<E::Kind> {
    let mut produced = BTreeSet::new();
    let mut expanded = BTreeSet::new();
    let mut queue = VecDeque::from([start]);

    while let Some(kind) = queue.pop_front() {
        if !expanded.insert(kind) {
            continue;
        }
        let Some(&index) = routes.get(&kind) else {
            continue;
        };
        for &next in descriptors[index].emits() {
            produced.insert(next);
            if next != terminal {
                queue.push_back(next);
            }
        }
    }

    produced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use async_trait::async_trait;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum Kind {
        Start,
        Middle,
        Retry,
        Stop,
        Orphan,
    }

    impl fmt::Display for Kind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    struct Signal(Kind);

    impl WorkflowEvent for Signal {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            self.0
        }
    }

    struct Declared {
        name: &'static str,
        accepts: Kind,
        emits: Vec<Kind>,
    }

    #[async_trait]
    impl Step<Signal, ()> for Declared {
        fn name(&self) -> &str {
            self.name
        }

        fn accepts(&self) -> Kind {
            self.accepts
        }

        fn emits(&self) -> Vec<Kind> {
            self.emits.clone()
        }

        async fn run(&self, _event: Signal, _ctx: &mut Context<()>) -> anyhow::Result<Signal> {
            Ok(Signal(self.emits[0]))
        }
    }

    fn step(name: &'static str, accepts: Kind, emits: &[Kind]) -> Arc<dyn Step<Signal, ()>> {
        Arc::new(Declared {
            name,
            accepts,
            emits: emits.to_vec(),
        })
    }

    fn build(steps: Vec<Arc<dyn Step<Signal, ()>>>) -> Result<StepRegistry<Signal, ()>> {
        StepRegistry::new(steps, Kind::Start, Kind::Stop)
    }

    #[test]
    fn test_linear_registry() {
        let registry = build(vec![
            step("first", Kind::Start, &[Kind::Middle]),
            step("second", Kind::Middle, &[Kind::Stop]),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.start_kind(), Kind::Start);
        assert_eq!(registry.terminal_kind(), Kind::Stop);
        assert_eq!(registry.handler_for(Kind::Middle).unwrap().name(), "second");
        assert!(registry.handler_for(Kind::Stop).is_none());
        assert!(!registry.has_cycle());
    }

    #[test]
    fn test_cyclic_registry() {
        let registry = build(vec![
            step("first", Kind::Start, &[Kind::Middle]),
            step("second", Kind::Middle, &[Kind::Retry, Kind::Stop]),
            step("retry", Kind::Retry, &[Kind::Middle]),
        ])
        .unwrap();

        assert!(registry.has_cycle());
        let edges = registry.edges();
        assert!(edges[&Kind::Retry].contains(&Kind::Middle));
    }

    #[test]
    fn test_empty_registry() {
        let err = build(vec![]).unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyRegistry));
    }

    #[test]
    fn test_ambiguous_routing() {
        let err = build(vec![
            step("first", Kind::Start, &[Kind::Stop]),
            step("second", Kind::Start, &[Kind::Stop]),
        ])
        .unwrap_err();

        match err {
            WorkflowError::AmbiguousRouting {
                kind,
                first,
                second,
            } => {
                assert_eq!(kind, "Start");
                assert_eq!(first, "first");
                assert_eq!(second, "second");
            }
            other => panic!("Expected AmbiguousRouting, got {other:?}"),
        }
    }

    #[test]
    fn test_dangling_emission() {
        let err = build(vec![step("first", Kind::Start, &[Kind::Orphan, Kind::Stop])]).unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::DanglingEmission { ref step, ref kind } if step == "first" && kind == "Orphan"
        ));
    }

    #[test]
    fn test_unreachable_terminal() {
        let err = build(vec![
            step("first", Kind::Start, &[Kind::Middle]),
            step("second", Kind::Middle, &[Kind::Start]),
        ])
        .unwrap_err();

        assert!(matches!(err, WorkflowError::UnreachableTerminal { .. }));
    }

    #[test]
    fn test_missing_start_step_is_unreachable_terminal() {
        let err = build(vec![step("second", Kind::Middle, &[Kind::Stop])]).unwrap_err();
        assert!(matches!(err, WorkflowError::UnreachableTerminal { .. }));
    }

    #[test]
    fn test_unreachable_step() {
        let err = build(vec![
            step("first", Kind::Start, &[Kind::Stop]),
            step("island", Kind::Retry, &[Kind::Stop]),
        ])
        .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::UnreachableStep { ref step, .. } if step == "island"
        ));
    }

    #[test]
    fn test_step_accepting_terminal_is_unreachable() {
        let err = build(vec![
            step("first", Kind::Start, &[Kind::Stop]),
            step("after_stop", Kind::Stop, &[Kind::Stop]),
        ])
        .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::UnreachableStep { ref step, .. } if step == "after_stop"
        ));
    }
}
