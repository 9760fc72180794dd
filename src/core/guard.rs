//! Guard predicates and transition actions.
//!
//! Guards are pure boolean functions evaluated before a transition commits.
//! Actions are the side-effecting callbacks that run between the exit and
//! entry hooks of an external transition (or alone, for internal ones).

use crate::core::Event;

/// Pure predicate that decides whether a transition may fire.
///
/// Guards read the application context and the triggering event; they must
/// not mutate either. A rejecting guard leaves the machine exactly where it
/// was: no hooks run and the event does not bubble.
///
/// # Example
///
/// ```rust
/// use strata::core::{Event, EventId, Guard};
///
/// struct Vault {
///     unlocked: bool,
/// }
///
/// let may_open = Guard::new(|vault: &Vault, _ev: &Event| vault.unlocked);
///
/// let open = Event::new(EventId::new(1));
/// assert!(may_open.check(&Vault { unlocked: true }, &open));
/// assert!(!may_open.check(&Vault { unlocked: false }, &open));
/// ```
pub struct Guard<C> {
    predicate: Box<dyn Fn(&C, &Event) -> bool + Send>,
}

impl<C> Guard<C> {
    /// Create a guard from a predicate function.
    ///
    /// The predicate should be deterministic for a given context and event;
    /// the engine may evaluate it without committing a transition.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> bool + Send + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    /// Evaluate the guard.
    pub fn check(&self, ctx: &C, event: &Event) -> bool {
        (self.predicate)(ctx, event)
    }
}

/// Side-effecting callback carried by a transition.
///
/// Actions run on the dispatch thread, after the source state's exit hook
/// and before the target state's entry hook. They may mutate the context and
/// may push further events onto the machine's queue, but must not block on
/// the queue themselves.
///
/// # Example
///
/// ```rust
/// use strata::core::{Action, Event, EventId};
///
/// let mut count_fires = Action::new(|fired: &mut u32, _ev: &Event| *fired += 1);
///
/// let mut fired = 0u32;
/// count_fires.run(&mut fired, &Event::new(EventId::new(1)));
/// assert_eq!(fired, 1);
/// ```
pub struct Action<C> {
    effect: Box<dyn FnMut(&mut C, &Event) + Send>,
}

impl<C> Action<C> {
    /// Create an action from a callback.
    pub fn new<F>(effect: F) -> Self
    where
        F: FnMut(&mut C, &Event) + Send + 'static,
    {
        Action {
            effect: Box::new(effect),
        }
    }

    /// Execute the action.
    pub fn run(&mut self, ctx: &mut C, event: &Event) {
        (self.effect)(ctx, event)
    }
}
