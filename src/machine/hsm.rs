//! The hierarchical machine: state arena, entry/exit chains, and the
//! descend-and-bubble dispatch algorithm.

use crate::core::{Event, EventId, StateHandler, StateId, TransitionJournal, TransitionRecord};
use crate::diag::{DiagnosticSink, Severity};
use crate::machine::error::EngineError;
use crate::machine::table::TransitionTable;
use crate::queue::EventQueue;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) struct Node<C> {
    pub(crate) name: String,
    pub(crate) parent: Option<StateId>,
    pub(crate) kind: NodeKind<C>,
}

pub(crate) enum NodeKind<C> {
    Leaf {
        handler: Box<dyn StateHandler<C>>,
    },
    Machine(MachineNode<C>),
    Orthogonal {
        regions: [StateId; 2],
    },
}

pub(crate) struct MachineNode<C> {
    pub(crate) start: StateId,
    pub(crate) stop: Option<StateId>,
    pub(crate) current: Option<StateId>,
    pub(crate) table: TransitionTable<C>,
    /// Event ids this machine or any nested machine reacts to. Fixed at
    /// build time; consulted by orthogonal routing.
    pub(crate) events: HashSet<EventId>,
}

/// A built hierarchical state machine.
///
/// `Hsm` owns every state node, the application context `C`, the shared
/// event queue handle, and the dispatch journal. All hooks, guards, and
/// actions run on whichever thread calls [`dispatch`](Hsm::dispatch), which
/// under [`Runtime`](crate::exec::Runtime) is the dedicated dispatch thread.
///
/// Construction goes through [`HsmBuilder`](crate::builder::HsmBuilder);
/// after `build` the transition tables are immutable, so dispatch reads them
/// without locks.
///
/// # Example
///
/// ```rust
/// use strata::builder::HsmBuilder;
/// use strata::core::{Event, EventId};
/// use strata::machine::TransitionDef;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut b = HsmBuilder::<()>::new();
/// let light = b.machine("light");
/// let red = b.leaf(light, "red")?;
/// let green = b.leaf(light, "green")?;
/// b.bounds(light, red, None)?;
/// b.transition(light, TransitionDef::new(red, EventId::new(1), green))?;
///
/// let mut hsm = b.build(light, ())?;
/// hsm.enter()?;
/// hsm.dispatch(&Event::new(EventId::new(1)));
///
/// assert_eq!(hsm.active_leaf(), Some(green));
/// hsm.exit();
/// # Ok(())
/// # }
/// ```
pub struct Hsm<C> {
    nodes: Vec<Node<C>>,
    root: StateId,
    ctx: C,
    queue: EventQueue,
    interrupt: Arc<AtomicBool>,
    sink: Arc<dyn DiagnosticSink>,
    journal: TransitionJournal,
    entered: bool,
}

enum Decision {
    Fire {
        from: StateId,
        to: StateId,
        internal: bool,
    },
    Rejected,
    Miss,
}

enum Step {
    Machine,
    Orthogonal([StateId; 2]),
    Leaf,
}

impl<C> Hsm<C> {
    pub(crate) fn assemble(
        nodes: Vec<Node<C>>,
        root: StateId,
        ctx: C,
        queue: EventQueue,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Hsm {
            nodes,
            root,
            ctx,
            queue,
            interrupt: Arc::new(AtomicBool::new(false)),
            sink,
            journal: TransitionJournal::new(),
            entered: false,
        }
    }

    /// Activate the machine: every composite on the initial chain gets its
    /// `current` set to its start state, and orthogonal regions activate in
    /// order.
    ///
    /// Start states are made current without running their entry hooks;
    /// hooks fire when transitions move the machine. The lifecycle is
    /// one-shot: entering an already-active or already-shut-down machine
    /// fails.
    pub fn enter(&mut self) -> Result<(), EngineError> {
        if self.entered || self.interrupt.load(Ordering::Relaxed) {
            return Err(EngineError::AlreadyStarted);
        }
        self.entered = true;
        self.enter_node(self.root);
        Ok(())
    }

    /// Shut the machine down: the active descendant chain exits
    /// deepest-first (every state that saw `on_entry` sees `on_exit`),
    /// `current` pointers clear, the interrupt flag raises, and the queue
    /// stops. Idempotent.
    pub fn exit(&mut self) {
        if !self.entered {
            return;
        }
        self.exit_node(self.root);
        self.entered = false;
        self.interrupt.store(true, Ordering::Relaxed);
        self.queue.stop();
    }

    /// Dispatch one event.
    ///
    /// Descends to the innermost active machine, lets the active leaf
    /// observe the event, then looks up the transition table there. A miss
    /// bubbles to the enclosing machine; a miss at the top is logged and
    /// the event discarded. Does nothing once the machine has exited.
    pub fn dispatch(&mut self, event: &Event) {
        if !self.entered {
            return;
        }
        let active = self.active_machine_from(self.root);
        self.observe_at_leaf(active, event);
        self.execute_at(active, event, self.root);
    }

    /// The deepest active state: follow `current` pointers from the root
    /// (orthogonal nodes descend through their first region). `None` before
    /// entry and after exit.
    pub fn active_leaf(&self) -> Option<StateId> {
        if !self.entered {
            return None;
        }
        let mut cursor = self.root;
        loop {
            match &self.nodes[cursor.index()].kind {
                NodeKind::Machine(machine) => match machine.current {
                    Some(child) => cursor = child,
                    None => return Some(cursor),
                },
                NodeKind::Orthogonal { regions } => cursor = regions[0],
                NodeKind::Leaf { .. } => return Some(cursor),
            }
        }
    }

    /// The active child of a composite, or `None` if the composite is not
    /// active (or `machine` is not a composite).
    pub fn current_of(&self, machine: StateId) -> Option<StateId> {
        match &self.nodes.get(machine.index())?.kind {
            NodeKind::Machine(node) => node.current,
            NodeKind::Orthogonal { regions } => Some(regions[0]),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Event identifiers recognized by a machine, including those of nested
    /// machines.
    pub fn events_of(&self, machine: StateId) -> Option<&HashSet<EventId>> {
        match &self.nodes.get(machine.index())?.kind {
            NodeKind::Machine(node) => Some(&node.events),
            _ => None,
        }
    }

    /// A machine's transition table.
    pub fn table_of(&self, machine: StateId) -> Option<&TransitionTable<C>> {
        match &self.nodes.get(machine.index())?.kind {
            NodeKind::Machine(node) => Some(&node.table),
            _ => None,
        }
    }

    /// Diagnostic name of a state.
    pub fn name_of(&self, state: StateId) -> Option<&str> {
        self.nodes.get(state.index()).map(|node| node.name.as_str())
    }

    /// The parent of a state. `None` for the root.
    pub fn parent_of(&self, state: StateId) -> Option<StateId> {
        self.nodes.get(state.index())?.parent
    }

    /// The root state.
    pub fn root(&self) -> StateId {
        self.root
    }

    /// A producer handle to the shared event queue.
    pub fn queue(&self) -> EventQueue {
        self.queue.clone()
    }

    /// Whether the machine is active.
    pub fn is_entered(&self) -> bool {
        self.entered
    }

    /// Whether shutdown has been signalled.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Shared handle to the interrupt flag, for external shutdown paths.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// The application context.
    pub fn context(&self) -> &C {
        &self.ctx
    }

    /// Mutable access to the application context.
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    /// The dispatch journal.
    pub fn journal(&self) -> &TransitionJournal {
        &self.journal
    }

    /// Mutable journal access (e.g. to bound or clear it).
    pub fn journal_mut(&mut self) -> &mut TransitionJournal {
        &mut self.journal
    }

    pub(crate) fn sink(&self) -> Arc<dyn DiagnosticSink> {
        Arc::clone(&self.sink)
    }

    /// Descend from `origin` to the innermost machine with an active leaf
    /// (or the deepest machine still holding activity).
    fn active_machine_from(&self, origin: StateId) -> StateId {
        let mut m = origin;
        loop {
            match &self.nodes[m.index()].kind {
                NodeKind::Orthogonal { regions } => m = regions[0],
                NodeKind::Machine(machine) => match machine.current {
                    Some(child) => match &self.nodes[child.index()].kind {
                        NodeKind::Leaf { .. } => return m,
                        NodeKind::Machine(nested) => {
                            if nested.current.is_some() {
                                m = child;
                            } else {
                                return m;
                            }
                        }
                        NodeKind::Orthogonal { .. } => m = child,
                    },
                    None => return m,
                },
                NodeKind::Leaf { .. } => return m,
            }
        }
    }

    fn observe_at_leaf(&mut self, machine: StateId, event: &Event) {
        let Some(leaf) = self.current_of(machine) else {
            return;
        };
        let Node { kind, .. } = &mut self.nodes[leaf.index()];
        if let NodeKind::Leaf { handler } = kind {
            handler.on_event(&mut self.ctx, event);
        }
    }

    /// Try machines from `origin` upward until one handles the event.
    /// `floor` bounds the walk: dispatch starts with the root as floor, and
    /// orthogonal routing narrows it to the chosen region so an event
    /// cannot ping-pong through the orthogonal node forever.
    fn execute_at(&mut self, origin: StateId, event: &Event, floor: StateId) {
        let mut m = origin;
        let mut floor = floor;
        loop {
            let step = match &self.nodes[m.index()].kind {
                NodeKind::Machine(_) => Step::Machine,
                NodeKind::Orthogonal { regions } => Step::Orthogonal(*regions),
                NodeKind::Leaf { .. } => Step::Leaf,
            };
            match step {
                Step::Machine => {
                    if self.try_fire(m, event) {
                        return;
                    }
                }
                Step::Orthogonal([first, second]) => {
                    if self.recognizes(first, event.id()) {
                        floor = first;
                        m = self.active_machine_from(first);
                        continue;
                    }
                    if self.recognizes(second, event.id()) {
                        floor = second;
                        m = self.active_machine_from(second);
                        continue;
                    }
                }
                Step::Leaf => {}
            }
            if m == floor {
                self.report_unhandled(m, event);
                return;
            }
            match self.nodes[m.index()].parent {
                Some(parent) => m = parent,
                None => {
                    self.report_unhandled(m, event);
                    return;
                }
            }
        }
    }

    fn recognizes(&self, machine: StateId, event: EventId) -> bool {
        match &self.nodes[machine.index()].kind {
            NodeKind::Machine(node) => node.events.contains(&event),
            _ => false,
        }
    }

    /// One lookup-guard-commit cycle at a single machine. Returns `true`
    /// when the event is consumed here, either by firing or by a guard
    /// rejection (rejections do not bubble).
    fn try_fire(&mut self, m: StateId, event: &Event) -> bool {
        let decision = {
            let NodeKind::Machine(machine) = &self.nodes[m.index()].kind else {
                return false;
            };
            let Some(cur) = machine.current else {
                return false;
            };
            match machine.table.next(cur, event.id()) {
                None => Decision::Miss,
                Some(transition) => {
                    let pass = match &transition.guard {
                        Some(guard) => guard.check(&self.ctx, event),
                        None => true,
                    };
                    if pass {
                        Decision::Fire {
                            from: cur,
                            to: transition.to,
                            internal: transition.from == transition.to,
                        }
                    } else {
                        Decision::Rejected
                    }
                }
            }
        };

        match decision {
            Decision::Miss => false,
            Decision::Rejected => {
                let line = format!("'{}': Guard prevented transition", self.nodes[m.index()].name);
                self.log(Severity::Info, line);
                true
            }
            Decision::Fire { from, to, internal } => {
                if internal {
                    self.run_action(m, from, event);
                } else {
                    self.exit_node(from);
                    self.run_action(m, from, event);
                    self.enter_node(to);
                }
                if let NodeKind::Machine(machine) = &mut self.nodes[m.index()].kind {
                    machine.current = Some(to);
                }
                self.record_transition(m, from, to, event, internal);

                let reached_stop = match &self.nodes[m.index()].kind {
                    NodeKind::Machine(machine) => machine.stop == Some(to),
                    _ => false,
                };
                if reached_stop {
                    if m == self.root {
                        self.exit();
                    } else {
                        self.exit_node(m);
                    }
                }
                true
            }
        }
    }

    fn run_action(&mut self, m: StateId, from: StateId, event: &Event) {
        let Node { kind, .. } = &mut self.nodes[m.index()];
        if let NodeKind::Machine(machine) = kind {
            if let Some(transition) = machine.table.next_mut(from, event.id()) {
                if let Some(action) = &mut transition.action {
                    action.run(&mut self.ctx, event);
                }
            }
        }
    }

    fn enter_node(&mut self, id: StateId) {
        let step = match &self.nodes[id.index()].kind {
            NodeKind::Leaf { .. } => Step::Leaf,
            NodeKind::Machine(_) => Step::Machine,
            NodeKind::Orthogonal { regions } => Step::Orthogonal(*regions),
        };
        match step {
            Step::Leaf => {
                let Node { kind, .. } = &mut self.nodes[id.index()];
                if let NodeKind::Leaf { handler } = kind {
                    handler.on_entry(&mut self.ctx);
                }
            }
            Step::Machine => {
                let line = format!("entering '{}'", self.nodes[id.index()].name);
                self.log(Severity::Info, line);
                if let NodeKind::Machine(machine) = &mut self.nodes[id.index()].kind {
                    machine.current = Some(machine.start);
                }
            }
            Step::Orthogonal([first, second]) => {
                let line = format!("entering '{}'", self.nodes[id.index()].name);
                self.log(Severity::Info, line);
                self.enter_node(first);
                self.enter_node(second);
            }
        }
    }

    fn exit_node(&mut self, id: StateId) {
        enum ExitStep {
            Leaf,
            Machine(Option<StateId>),
            Orthogonal([StateId; 2]),
        }
        let step = match &self.nodes[id.index()].kind {
            NodeKind::Leaf { .. } => ExitStep::Leaf,
            NodeKind::Machine(machine) => ExitStep::Machine(machine.current),
            NodeKind::Orthogonal { regions } => ExitStep::Orthogonal(*regions),
        };
        match step {
            ExitStep::Leaf => {
                let Node { kind, .. } = &mut self.nodes[id.index()];
                if let NodeKind::Leaf { handler } = kind {
                    handler.on_exit(&mut self.ctx);
                }
            }
            ExitStep::Machine(current) => {
                // Exit the active chain before clearing the pointer so
                // nested states see their exit hooks.
                if let Some(child) = current {
                    self.exit_node(child);
                }
                if let NodeKind::Machine(machine) = &mut self.nodes[id.index()].kind {
                    machine.current = None;
                }
                let line = format!("exiting '{}'", self.nodes[id.index()].name);
                self.log(Severity::Info, line);
            }
            ExitStep::Orthogonal([first, second]) => {
                // Mirror of entry, in reverse.
                self.exit_node(second);
                self.exit_node(first);
                let line = format!("exiting '{}'", self.nodes[id.index()].name);
                self.log(Severity::Info, line);
            }
        }
    }

    fn record_transition(
        &mut self,
        machine: StateId,
        from: StateId,
        to: StateId,
        event: &Event,
        internal: bool,
    ) {
        let machine_name = self.nodes[machine.index()].name.clone();
        let from_name = self.nodes[from.index()].name.clone();
        let to_name = self.nodes[to.index()].name.clone();

        let line = if internal {
            format!("'{machine_name}': '{from_name}' handled event {} internally", event.id())
        } else {
            format!("'{machine_name}': '{from_name}' --{}--> '{to_name}'", event.id())
        };
        self.log(Severity::Info, line);

        self.journal.record(TransitionRecord {
            machine: machine_name,
            from: from_name,
            to: to_name,
            event: event.id(),
            at: Utc::now(),
            internal,
        });
    }

    fn report_unhandled(&self, at: StateId, event: &Event) {
        let line = format!(
            "'{}': unhandled event {} at top level",
            self.nodes[at.index()].name,
            event.id()
        );
        self.log(Severity::Error, line);
    }

    fn log(&self, severity: Severity, line: impl AsRef<str>) {
        self.sink.write_line(severity, line.as_ref());
    }
}
