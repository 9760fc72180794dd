//! Core value types of the runtime.
//!
//! This module holds the data model the engine is built from:
//! - Events and their identifiers
//! - State identity and the leaf handler contract
//! - Guard predicates and transition actions
//! - The diagnostic transition journal

mod event;
mod guard;
mod journal;
mod state;

pub use event::{Event, EventId};
pub use guard::{Action, Guard};
pub use journal::{TransitionJournal, TransitionRecord};
pub use state::{Hooks, Inert, StateHandler, StateId};
