//! Definition-time errors.

use crate::core::{EventId, StateId};
use thiserror::Error;

/// Errors raised while defining a machine.
///
/// Machines that build successfully satisfy the structural invariants the
/// dispatcher relies on: every composite has a start state, every transition
/// endpoint belongs to its machine, and no `(state, event)` key is defined
/// twice.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The referenced state id does not exist in this builder.
    #[error("unknown state id {0:?}")]
    UnknownState(StateId),

    /// A composite-only operation was applied to a leaf or region pair.
    #[error("state '{0}' is not a composite machine")]
    NotAMachine(String),

    /// `build` found a machine without a configured start state.
    #[error("machine '{machine}' has no start state configured")]
    MissingStartState { machine: String },

    /// A transition endpoint or bound is not an immediate child of the
    /// machine it was given to.
    #[error("state '{state}' does not belong to machine '{machine}'")]
    ForeignState { machine: String, state: String },

    /// A `(from, event)` key was defined twice. Transition tables never
    /// overwrite silently.
    #[error("duplicate transition from '{from}' on event {event} in machine '{machine}'")]
    DuplicateTransition {
        machine: String,
        from: String,
        event: EventId,
    },

    /// An orthogonal region must be a machine that has not been attached
    /// anywhere else.
    #[error("state '{0}' already has a parent")]
    AlreadyParented(String),

    /// `build` found a node that is neither the root nor reachable from it.
    #[error("state '{0}' is not attached to the machine tree")]
    Detached(String),

    /// The requested root has a parent and cannot be a root.
    #[error("root state '{0}' must not have a parent")]
    RootHasParent(String),
}
