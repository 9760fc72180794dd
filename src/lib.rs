//! Strata: a hierarchical state machine runtime
//!
//! Strata lets applications declare nested finite-state machines with
//! guards, actions, composite states, and orthogonal regions, then drives
//! them by consuming events from an interruptible queue. The library is
//! embedded: the root machine owns one dispatch thread (or any driver you
//! supply), producers push events from anywhere, and every hook, guard, and
//! action runs serialized on the dispatch side.
//!
//! # Core Concepts
//!
//! - **Events**: identity-compared tokens with optional opaque payloads
//! - **States**: arena-registered nodes, leaves with entry/exit hooks,
//!   composites with their own transition tables
//! - **Dispatch**: events go to the innermost active machine and bubble up
//!   to ancestors until handled
//! - **Orthogonal regions**: two machines side by side, each receiving the
//!   events it recognizes
//! - **Execution policies**: a dedicated dispatch thread by default,
//!   swappable for cooperative drivers
//!
//! # Example
//!
//! ```rust
//! use strata::builder::HsmBuilder;
//! use strata::core::Event;
//! use strata::event_enum;
//! use strata::machine::TransitionDef;
//!
//! event_enum! {
//!     enum Gate {
//!         Coin,
//!         Push,
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut b = HsmBuilder::<u32>::new();
//! let turnstile = b.machine("turnstile");
//! let locked = b.leaf(turnstile, "locked")?;
//! let unlocked = b.leaf(turnstile, "unlocked")?;
//! b.bounds(turnstile, locked, None)?;
//! b.transition(
//!     turnstile,
//!     TransitionDef::new(locked, Gate::Coin, unlocked)
//!         .then(|coins: &mut u32, _ev| *coins += 1),
//! )?;
//! b.transition(turnstile, TransitionDef::new(unlocked, Gate::Push, locked))?;
//!
//! let mut hsm = b.build(turnstile, 0)?;
//! hsm.enter()?;
//! hsm.dispatch(&Event::from(Gate::Coin));
//! hsm.dispatch(&Event::from(Gate::Push));
//!
//! assert_eq!(hsm.context(), &1);
//! assert_eq!(hsm.active_leaf(), Some(locked));
//! hsm.exit();
//! # Ok(())
//! # }
//! ```
//!
//! For a machine running on its own thread, hand it to
//! [`Runtime::threaded`](exec::Runtime::threaded) and push events from
//! anywhere; see the `exec` module.

pub mod builder;
pub mod core;
pub mod diag;
pub mod exec;
pub mod machine;
pub mod queue;

// Re-export commonly used types
pub use builder::{BuildError, HsmBuilder};
pub use self::core::{Action, Event, EventId, Guard, Hooks, Inert, StateHandler, StateId};
pub use self::core::{TransitionJournal, TransitionRecord};
pub use diag::{DiagnosticSink, MemorySink, NullSink, Severity, TracingSink};
pub use exec::{Dispatcher, ExecutionPolicy, Runtime, ThreadExecutionPolicy};
pub use machine::{EngineError, Hsm, Transition, TransitionDef, TransitionTable};
pub use queue::{EventQueue, QueueError};
