//! State identity and the handler contract for leaf states.
//!
//! Every state in a machine is registered in an arena owned by the root and
//! addressed by a [`StateId`]. Identity is the arena index, never the name:
//! two states may share a name and remain distinct, and identifiers are
//! deterministic across runs.

use crate::core::Event;

/// Stable handle for a registered state.
///
/// Produced by [`HsmBuilder`](crate::builder::HsmBuilder) registration calls
/// and used everywhere a state is referenced: transition definitions, current
/// state queries, journal inspection.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StateId(u32);

impl StateId {
    pub(crate) const fn new(index: u32) -> Self {
        StateId(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Behavior attached to a leaf state.
///
/// All methods default to no-ops; implement only the hooks a state needs.
/// Hooks receive the machine's application context `C` mutably, which is how
/// state behavior communicates with the embedding application without
/// downcasting.
///
/// `on_entry` runs when a transition makes the state active, `on_exit` when
/// an external transition or machine shutdown leaves it. `on_event` is an
/// observation hook: the single active leaf sees every event dequeued by the
/// loop before table lookup, whether or not a transition fires. Handling
/// decisions belong to transition tables, not to this hook.
///
/// # Example
///
/// ```rust
/// use strata::core::{Event, StateHandler};
///
/// struct Door {
///     times_opened: u32,
/// }
///
/// struct OpenState;
///
/// impl StateHandler<Door> for OpenState {
///     fn on_entry(&mut self, ctx: &mut Door) {
///         ctx.times_opened += 1;
///     }
/// }
/// ```
pub trait StateHandler<C>: Send {
    /// Called when this state becomes active.
    fn on_entry(&mut self, _ctx: &mut C) {}

    /// Called when this state is left.
    fn on_exit(&mut self, _ctx: &mut C) {}

    /// Called for every event dequeued while this state is the active leaf.
    fn on_event(&mut self, _ctx: &mut C, _event: &Event) {}
}

/// A handler with no behavior. The default for states registered without one.
pub struct Inert;

impl<C> StateHandler<C> for Inert {}

type HookFn<C> = Box<dyn FnMut(&mut C) + Send>;
type ObserveFn<C> = Box<dyn FnMut(&mut C, &Event) + Send>;

/// Closure-built handler for states that do not warrant a named type.
///
/// # Example
///
/// ```rust
/// use strata::core::Hooks;
///
/// let handler = Hooks::new()
///     .entry(|count: &mut u32| *count += 1)
///     .exit(|count: &mut u32| *count = count.saturating_sub(1));
/// # let _ = handler;
/// ```
pub struct Hooks<C> {
    entry: Option<HookFn<C>>,
    exit: Option<HookFn<C>>,
    observe: Option<ObserveFn<C>>,
}

impl<C> Hooks<C> {
    /// A handler with no hooks attached.
    pub fn new() -> Self {
        Hooks {
            entry: None,
            exit: None,
            observe: None,
        }
    }

    /// Attach an entry hook.
    pub fn entry<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut C) + Send + 'static,
    {
        self.entry = Some(Box::new(hook));
        self
    }

    /// Attach an exit hook.
    pub fn exit<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut C) + Send + 'static,
    {
        self.exit = Some(Box::new(hook));
        self
    }

    /// Attach an event observation hook.
    pub fn observe<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut C, &Event) + Send + 'static,
    {
        self.observe = Some(Box::new(hook));
        self
    }
}

impl<C> Default for Hooks<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send> StateHandler<C> for Hooks<C> {
    fn on_entry(&mut self, ctx: &mut C) {
        if let Some(hook) = &mut self.entry {
            hook(ctx);
        }
    }

    fn on_exit(&mut self, ctx: &mut C) {
        if let Some(hook) = &mut self.exit {
            hook(ctx);
        }
    }

    fn on_event(&mut self, ctx: &mut C, event: &Event) {
        if let Some(hook) = &mut self.observe {
            hook(ctx, event);
        }
    }
}
