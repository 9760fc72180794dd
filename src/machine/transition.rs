//! Transition records and their fluent definition builder.

use crate::core::{Action, Event, EventId, Guard, StateId};

/// A transition held by a machine's table.
///
/// When `from == to` the transition is internal: entry and exit hooks are
/// suppressed and only the action runs. The guard is evaluated by the
/// machine before committing, never by the transition itself, so a rejection
/// can be logged without side effects.
pub struct Transition<C> {
    pub(crate) from: StateId,
    pub(crate) trigger: EventId,
    pub(crate) to: StateId,
    pub(crate) guard: Option<Guard<C>>,
    pub(crate) action: Option<Action<C>>,
}

impl<C> Transition<C> {
    /// Source state.
    pub fn from(&self) -> StateId {
        self.from
    }

    /// Triggering event.
    pub fn trigger(&self) -> EventId {
        self.trigger
    }

    /// Target state.
    pub fn to(&self) -> StateId {
        self.to
    }

    /// Whether this is an internal (hook-suppressing) self-transition.
    pub fn is_internal(&self) -> bool {
        self.from == self.to
    }

    /// Whether a guard is attached.
    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }
}

/// Fluent definition of a transition, consumed by
/// [`HsmBuilder::transition`](crate::builder::HsmBuilder::transition).
///
/// # Example
///
/// ```rust
/// use strata::builder::HsmBuilder;
/// use strata::core::{Event, EventId};
/// use strata::machine::TransitionDef;
///
/// let mut b = HsmBuilder::<u32>::new();
/// let m = b.machine("counter");
/// let idle = b.leaf(m, "idle").unwrap();
/// let busy = b.leaf(m, "busy").unwrap();
/// b.bounds(m, idle, None).unwrap();
///
/// b.transition(
///     m,
///     TransitionDef::new(idle, EventId::new(1), busy)
///         .when(|count: &u32, _ev: &Event| *count < 10)
///         .then(|count: &mut u32, _ev: &Event| *count += 1),
/// )
/// .unwrap();
/// ```
pub struct TransitionDef<C> {
    from: StateId,
    trigger: EventId,
    to: StateId,
    guard: Option<Guard<C>>,
    action: Option<Action<C>>,
}

impl<C> TransitionDef<C> {
    /// Define a transition from `from` to `to`, triggered by `trigger`.
    pub fn new(from: StateId, trigger: impl Into<EventId>, to: StateId) -> Self {
        TransitionDef {
            from,
            trigger: trigger.into(),
            to,
            guard: None,
            action: None,
        }
    }

    /// Define an internal transition: `state` handles `trigger` without
    /// leaving, suppressing entry and exit hooks.
    pub fn internal(state: StateId, trigger: impl Into<EventId>) -> Self {
        Self::new(state, trigger, state)
    }

    /// Attach a pre-built guard.
    pub fn guard(mut self, guard: Guard<C>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Attach a guard from a closure.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> bool + Send + 'static,
    {
        self.guard(Guard::new(predicate))
    }

    /// Attach a pre-built action.
    pub fn action(mut self, action: Action<C>) -> Self {
        self.action = Some(action);
        self
    }

    /// Attach an action from a closure.
    pub fn then<F>(self, effect: F) -> Self
    where
        F: FnMut(&mut C, &Event) + Send + 'static,
    {
        self.action(Action::new(effect))
    }

    pub(crate) fn into_transition(self) -> Transition<C> {
        Transition {
            from: self.from,
            trigger: self.trigger,
            to: self.to,
            guard: self.guard,
            action: self.action,
        }
    }
}
