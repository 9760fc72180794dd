//! Builder API for declaring machines.
//!
//! Machines are declared in full before they run: register states, set each
//! composite's bounds, add transitions, then [`build`](HsmBuilder::build).
//! The builder is consumed by `build`, which is what makes transition tables
//! immutable once a machine exists; there is no way to add a transition to a
//! started machine.

mod error;
pub mod macros;

pub use error::BuildError;

use crate::core::{EventId, Inert, StateHandler, StateId};
use crate::diag::{DiagnosticSink, TracingSink};
use crate::machine::{Hsm, MachineNode, Node, NodeKind, Transition, TransitionDef, TransitionTable};
use crate::queue::EventQueue;
use std::collections::HashSet;
use std::sync::Arc;

struct Seed<C> {
    name: String,
    parent: Option<StateId>,
    kind: SeedKind<C>,
}

enum SeedKind<C> {
    Leaf(Box<dyn StateHandler<C>>),
    Machine {
        start: Option<StateId>,
        stop: Option<StateId>,
        transitions: Vec<Transition<C>>,
    },
    Orthogonal([StateId; 2]),
}

/// Declarative constructor for [`Hsm`].
///
/// # Example
///
/// ```rust
/// use strata::builder::HsmBuilder;
/// use strata::core::EventId;
/// use strata::machine::TransitionDef;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut b = HsmBuilder::<()>::new();
/// let deck = b.machine("deck");
/// let stopped = b.leaf(deck, "stopped")?;
/// let playing = b.leaf(deck, "playing")?;
/// b.bounds(deck, stopped, None)?;
/// b.transition(deck, TransitionDef::new(stopped, EventId::new(1), playing))?;
/// b.transition(deck, TransitionDef::new(playing, EventId::new(2), stopped))?;
///
/// let hsm = b.build(deck, ())?;
/// assert_eq!(hsm.name_of(hsm.root()), Some("deck"));
/// # Ok(())
/// # }
/// ```
pub struct HsmBuilder<C> {
    nodes: Vec<Seed<C>>,
    queue: EventQueue,
    sink: Arc<dyn DiagnosticSink>,
}

impl<C: Send + 'static> HsmBuilder<C> {
    /// Create a builder with a fresh queue and the tracing sink.
    pub fn new() -> Self {
        HsmBuilder {
            nodes: Vec::new(),
            queue: EventQueue::new(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Use an existing event queue instead of a fresh one.
    pub fn with_queue(mut self, queue: EventQueue) -> Self {
        self.queue = queue;
        self
    }

    /// Use a custom diagnostic sink.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Register a top-level composite machine (a root candidate, or a future
    /// orthogonal region).
    pub fn machine(&mut self, name: impl Into<String>) -> StateId {
        self.push(Seed {
            name: name.into(),
            parent: None,
            kind: SeedKind::Machine {
                start: None,
                stop: None,
                transitions: Vec::new(),
            },
        })
    }

    /// Register a composite machine nested inside `parent`.
    pub fn submachine(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
    ) -> Result<StateId, BuildError> {
        self.expect_machine(parent)?;
        Ok(self.push(Seed {
            name: name.into(),
            parent: Some(parent),
            kind: SeedKind::Machine {
                start: None,
                stop: None,
                transitions: Vec::new(),
            },
        }))
    }

    /// Register a leaf state with no behavior.
    pub fn leaf(&mut self, machine: StateId, name: impl Into<String>) -> Result<StateId, BuildError> {
        self.leaf_with(machine, name, Inert)
    }

    /// Register a leaf state with a handler.
    pub fn leaf_with(
        &mut self,
        machine: StateId,
        name: impl Into<String>,
        handler: impl StateHandler<C> + 'static,
    ) -> Result<StateId, BuildError> {
        self.expect_machine(machine)?;
        Ok(self.push(Seed {
            name: name.into(),
            parent: Some(machine),
            kind: SeedKind::Leaf(Box::new(handler)),
        }))
    }

    /// Compose two machines into an orthogonal pair at the top level.
    ///
    /// Both regions logically receive every event the pair sees, but an
    /// event recognized by both is delivered to `first` only; declaration
    /// order is the tie-break.
    pub fn orthogonal(
        &mut self,
        name: impl Into<String>,
        first: StateId,
        second: StateId,
    ) -> Result<StateId, BuildError> {
        self.compose_orthogonal(None, name.into(), first, second)
    }

    /// Compose two machines into an orthogonal pair nested inside `parent`.
    pub fn orthogonal_in(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
        first: StateId,
        second: StateId,
    ) -> Result<StateId, BuildError> {
        self.expect_machine(parent)?;
        self.compose_orthogonal(Some(parent), name.into(), first, second)
    }

    /// Set a machine's start state (entered on activation) and optional stop
    /// state (reaching it shuts the machine down).
    pub fn bounds(
        &mut self,
        machine: StateId,
        start: StateId,
        stop: Option<StateId>,
    ) -> Result<(), BuildError> {
        self.expect_child(machine, start)?;
        if let Some(stop) = stop {
            self.expect_child(machine, stop)?;
        }
        let machine_name = self.name(machine);
        match &mut self.seed_mut(machine)?.kind {
            SeedKind::Machine {
                start: slot_start,
                stop: slot_stop,
                ..
            } => {
                *slot_start = Some(start);
                *slot_stop = stop;
                Ok(())
            }
            _ => Err(BuildError::NotAMachine(machine_name)),
        }
    }

    /// Add a transition to a machine's table.
    ///
    /// Both endpoints must be immediate children of `machine`. Defining the
    /// same `(from, event)` key twice is rejected rather than overwritten.
    pub fn transition(
        &mut self,
        machine: StateId,
        def: TransitionDef<C>,
    ) -> Result<(), BuildError> {
        let transition = def.into_transition();
        self.expect_child(machine, transition.from())?;
        self.expect_child(machine, transition.to())?;

        let machine_name = self.name(machine);
        let from_name = self.name(transition.from());
        match &mut self.seed_mut(machine)?.kind {
            SeedKind::Machine { transitions, .. } => {
                let key = (transition.from(), transition.trigger());
                if transitions
                    .iter()
                    .any(|existing| (existing.from(), existing.trigger()) == key)
                {
                    return Err(BuildError::DuplicateTransition {
                        machine: machine_name,
                        from: from_name,
                        event: transition.trigger(),
                    });
                }
                transitions.push(transition);
                Ok(())
            }
            _ => Err(BuildError::NotAMachine(machine_name)),
        }
    }

    /// Validate the definition and assemble the machine.
    ///
    /// Checks that `root` is an unparented composite, that every node is
    /// attached beneath it, and that every machine has a start state; then
    /// fixes each machine's recognized-event set (its own triggers plus
    /// those of nested machines) and freezes the tables.
    pub fn build(self, root: StateId, ctx: C) -> Result<Hsm<C>, BuildError> {
        let root_seed = self.seed(root)?;
        if root_seed.parent.is_some() {
            return Err(BuildError::RootHasParent(root_seed.name.clone()));
        }
        if matches!(root_seed.kind, SeedKind::Leaf(_)) {
            return Err(BuildError::NotAMachine(root_seed.name.clone()));
        }

        for (index, seed) in self.nodes.iter().enumerate() {
            let mut cursor = StateId::new(index as u32);
            let mut hops = 0;
            while cursor != root {
                match self.nodes[cursor.index()].parent {
                    Some(parent) => cursor = parent,
                    None => return Err(BuildError::Detached(seed.name.clone())),
                }
                hops += 1;
                if hops > self.nodes.len() {
                    return Err(BuildError::Detached(seed.name.clone()));
                }
            }
        }

        let recognized: Vec<HashSet<EventId>> = (0..self.nodes.len())
            .map(|index| self.recognized(StateId::new(index as u32)))
            .collect();

        let HsmBuilder { nodes: seeds, queue, sink } = self;
        let mut nodes = Vec::with_capacity(seeds.len());
        for (seed, events) in seeds.into_iter().zip(recognized) {
            let kind = match seed.kind {
                SeedKind::Leaf(handler) => NodeKind::Leaf { handler },
                SeedKind::Orthogonal(regions) => NodeKind::Orthogonal { regions },
                SeedKind::Machine {
                    start,
                    stop,
                    transitions,
                } => {
                    let Some(start) = start else {
                        return Err(BuildError::MissingStartState { machine: seed.name });
                    };
                    let mut table = TransitionTable::new();
                    for transition in transitions {
                        table.insert(transition);
                    }
                    NodeKind::Machine(MachineNode {
                        start,
                        stop,
                        current: None,
                        table,
                        events,
                    })
                }
            };
            nodes.push(Node {
                name: seed.name,
                parent: seed.parent,
                kind,
            });
        }

        Ok(Hsm::assemble(nodes, root, ctx, queue, sink))
    }

    fn compose_orthogonal(
        &mut self,
        parent: Option<StateId>,
        name: String,
        first: StateId,
        second: StateId,
    ) -> Result<StateId, BuildError> {
        for region in [first, second] {
            let seed = self.seed(region)?;
            if !matches!(seed.kind, SeedKind::Machine { .. }) {
                return Err(BuildError::NotAMachine(seed.name.clone()));
            }
            if seed.parent.is_some() {
                return Err(BuildError::AlreadyParented(seed.name.clone()));
            }
        }
        // A region sitting above the requested parent would close a cycle.
        if let Some(parent) = parent {
            let mut cursor = Some(parent);
            while let Some(ancestor) = cursor {
                if ancestor == first || ancestor == second {
                    return Err(BuildError::AlreadyParented(self.name(ancestor)));
                }
                cursor = self.nodes[ancestor.index()].parent;
            }
        }

        let id = self.push(Seed {
            name,
            parent,
            kind: SeedKind::Orthogonal([first, second]),
        });
        self.nodes[first.index()].parent = Some(id);
        self.nodes[second.index()].parent = Some(id);
        Ok(id)
    }

    fn push(&mut self, seed: Seed<C>) -> StateId {
        let id = StateId::new(self.nodes.len() as u32);
        self.nodes.push(seed);
        id
    }

    fn seed(&self, id: StateId) -> Result<&Seed<C>, BuildError> {
        self.nodes.get(id.index()).ok_or(BuildError::UnknownState(id))
    }

    fn seed_mut(&mut self, id: StateId) -> Result<&mut Seed<C>, BuildError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(BuildError::UnknownState(id))
    }

    fn name(&self, id: StateId) -> String {
        self.nodes
            .get(id.index())
            .map(|seed| seed.name.clone())
            .unwrap_or_default()
    }

    fn expect_machine(&self, id: StateId) -> Result<(), BuildError> {
        let seed = self.seed(id)?;
        match seed.kind {
            SeedKind::Machine { .. } => Ok(()),
            _ => Err(BuildError::NotAMachine(seed.name.clone())),
        }
    }

    fn expect_child(&self, machine: StateId, state: StateId) -> Result<(), BuildError> {
        self.expect_machine(machine)?;
        let seed = self.seed(state)?;
        if seed.parent == Some(machine) {
            Ok(())
        } else {
            Err(BuildError::ForeignState {
                machine: self.name(machine),
                state: seed.name.clone(),
            })
        }
    }

    fn recognized(&self, id: StateId) -> HashSet<EventId> {
        match &self.nodes[id.index()].kind {
            SeedKind::Machine { transitions, .. } => {
                let mut events: HashSet<EventId> =
                    transitions.iter().map(Transition::trigger).collect();
                for (index, seed) in self.nodes.iter().enumerate() {
                    let child = StateId::new(index as u32);
                    if seed.parent == Some(id)
                        && !matches!(seed.kind, SeedKind::Leaf(_))
                    {
                        events.extend(self.recognized(child));
                    }
                }
                events
            }
            SeedKind::Orthogonal([first, second]) => {
                let mut events = self.recognized(*first);
                events.extend(self.recognized(*second));
                events
            }
            SeedKind::Leaf(_) => HashSet::new(),
        }
    }
}

impl<C: Send + 'static> Default for HsmBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventId;

    const GO: EventId = EventId::new(1);
    const BACK: EventId = EventId::new(2);

    #[test]
    fn builder_rejects_missing_start_state() {
        let mut b = HsmBuilder::<()>::new();
        let m = b.machine("m");
        let a = b.leaf(m, "a").unwrap();
        let z = b.leaf(m, "z").unwrap();
        b.transition(m, TransitionDef::new(a, GO, z)).unwrap();

        let result = b.build(m, ());
        assert!(matches!(result, Err(BuildError::MissingStartState { .. })));
    }

    #[test]
    fn builder_rejects_duplicate_transition_keys() {
        let mut b = HsmBuilder::<()>::new();
        let m = b.machine("m");
        let a = b.leaf(m, "a").unwrap();
        let z = b.leaf(m, "z").unwrap();
        b.bounds(m, a, None).unwrap();
        b.transition(m, TransitionDef::new(a, GO, z)).unwrap();

        let result = b.transition(m, TransitionDef::new(a, GO, a));
        assert!(matches!(result, Err(BuildError::DuplicateTransition { .. })));
    }

    #[test]
    fn distinct_events_from_one_state_are_fine() {
        let mut b = HsmBuilder::<()>::new();
        let m = b.machine("m");
        let a = b.leaf(m, "a").unwrap();
        let z = b.leaf(m, "z").unwrap();
        b.bounds(m, a, None).unwrap();
        b.transition(m, TransitionDef::new(a, GO, z)).unwrap();
        b.transition(m, TransitionDef::new(a, BACK, z)).unwrap();

        assert!(b.build(m, ()).is_ok());
    }

    #[test]
    fn builder_rejects_foreign_transition_endpoints() {
        let mut b = HsmBuilder::<()>::new();
        let m = b.machine("m");
        let other = b.machine("other");
        let a = b.leaf(m, "a").unwrap();
        let elsewhere = b.leaf(other, "elsewhere").unwrap();

        let result = b.transition(m, TransitionDef::new(a, GO, elsewhere));
        assert!(matches!(result, Err(BuildError::ForeignState { .. })));
    }

    #[test]
    fn builder_rejects_leaf_as_region() {
        let mut b = HsmBuilder::<()>::new();
        let m = b.machine("m");
        let a = b.leaf(m, "a").unwrap();
        let other = b.machine("other");

        let result = b.orthogonal("o", a, other);
        assert!(matches!(result, Err(BuildError::NotAMachine(_))));
    }

    #[test]
    fn builder_rejects_parented_region() {
        let mut b = HsmBuilder::<()>::new();
        let outer = b.machine("outer");
        let nested = b.submachine(outer, "nested").unwrap();
        let other = b.machine("other");

        let result = b.orthogonal("o", nested, other);
        assert!(matches!(result, Err(BuildError::AlreadyParented(_))));
    }

    #[test]
    fn builder_rejects_detached_machines() {
        let mut b = HsmBuilder::<()>::new();
        let m = b.machine("m");
        let a = b.leaf(m, "a").unwrap();
        let z = b.leaf(m, "z").unwrap();
        b.bounds(m, a, None).unwrap();
        b.transition(m, TransitionDef::new(a, GO, z)).unwrap();

        // Registered but never attached anywhere.
        let stray = b.machine("stray");
        let s = b.leaf(stray, "s").unwrap();
        b.bounds(stray, s, None).unwrap();

        let result = b.build(m, ());
        assert!(matches!(result, Err(BuildError::Detached(_))));
    }

    #[test]
    fn recognized_events_include_nested_machines() {
        let mut b = HsmBuilder::<()>::new();
        let outer = b.machine("outer");
        let nested = b.submachine(outer, "nested").unwrap();
        let n1 = b.leaf(nested, "n1").unwrap();
        let n2 = b.leaf(nested, "n2").unwrap();
        let idle = b.leaf(outer, "idle").unwrap();
        b.bounds(outer, idle, None).unwrap();
        b.bounds(nested, n1, None).unwrap();
        b.transition(outer, TransitionDef::new(idle, GO, nested)).unwrap();
        b.transition(nested, TransitionDef::new(n1, BACK, n2)).unwrap();

        let hsm = b.build(outer, ()).unwrap();
        let events = hsm.events_of(outer).unwrap();
        assert!(events.contains(&GO));
        assert!(events.contains(&BACK));

        let nested_events = hsm.events_of(nested).unwrap();
        assert!(nested_events.contains(&BACK));
        assert!(!nested_events.contains(&GO));

        assert_eq!(hsm.table_of(outer).unwrap().len(), 1);
        assert_eq!(hsm.table_of(nested).unwrap().len(), 1);
    }

    #[test]
    fn root_must_be_a_composite() {
        let mut b = HsmBuilder::<()>::new();
        let m = b.machine("m");
        let a = b.leaf(m, "a").unwrap();
        b.bounds(m, a, None).unwrap();

        let result = b.build(a, ());
        assert!(matches!(result, Err(BuildError::NotAMachine(_))));
    }
}
