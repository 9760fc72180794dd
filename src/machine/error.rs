//! Lifecycle and execution errors.

use thiserror::Error;

/// Faults in machine lifecycle or loop execution.
///
/// Event-domain conditions (missed lookups, rejected guards, unhandled
/// events) are diagnostics, not errors; the machine stays responsive through
/// them. These variants cover misuse of the lifecycle and genuine thread or
/// queue failures.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `enter` was called on a machine that is already active, or a policy
    /// was started twice.
    #[error("machine already started")]
    AlreadyStarted,

    /// A policy or runtime operation required a running dispatch loop.
    #[error("dispatch loop is not running")]
    NotRunning,

    /// The queue reported an interruption while the interrupt flag was
    /// clear. Something stopped the queue outside the shutdown protocol.
    #[error("event queue interrupted outside of shutdown")]
    UnexpectedInterrupt,

    /// The dispatch thread panicked.
    #[error("dispatch thread panicked")]
    WorkerPanicked,

    /// The dispatch thread could not be spawned.
    #[error("failed to spawn dispatch thread")]
    Spawn(#[from] std::io::Error),
}
