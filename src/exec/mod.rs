//! Execution policies: how the dispatch loop is driven.
//!
//! The engine separates *what* dispatch does ([`Hsm::dispatch`]) from *what
//! drives it*. A [`Dispatcher`] owns an entered machine and pumps its queue;
//! an [`ExecutionPolicy`] decides where that pump runs. The shipped
//! [`ThreadExecutionPolicy`] gives the root machine a dedicated thread, per
//! the engine's scheduling model: every hook, guard, and action runs on that
//! one thread, and producers only ever touch the queue.

use crate::diag::Severity;
use crate::machine::{EngineError, Hsm};
use crate::queue::{EventQueue, QueueError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Owns an entered machine and pumps events from its queue into dispatch.
pub struct Dispatcher<C> {
    hsm: Hsm<C>,
    queue: EventQueue,
    interrupt: Arc<AtomicBool>,
}

impl<C> Dispatcher<C> {
    /// Wrap an entered machine.
    pub fn new(hsm: Hsm<C>) -> Self {
        let queue = hsm.queue();
        let interrupt = hsm.interrupt_handle();
        Dispatcher {
            hsm,
            queue,
            interrupt,
        }
    }

    /// Run the dispatch loop until shutdown.
    ///
    /// Blocks in `next_event` between events. A queue interruption with the
    /// machine's interrupt flag set is the normal shutdown signal and ends
    /// the loop cleanly; an interruption with the flag clear means something
    /// stopped the queue outside the shutdown protocol and is propagated as
    /// fatal.
    pub fn run(&mut self) -> Result<(), EngineError> {
        while !self.interrupt.load(Ordering::Relaxed) {
            match self.queue.next_event() {
                Ok(event) => self.hsm.dispatch(&event),
                Err(QueueError::Interrupted) => {
                    let name = self
                        .hsm
                        .name_of(self.hsm.root())
                        .unwrap_or_default()
                        .to_string();
                    if self.interrupt.load(Ordering::Relaxed) {
                        self.hsm.sink().write_line(
                            Severity::Warning,
                            &format!("'{name}': exiting event loop on interrupt"),
                        );
                        return Ok(());
                    }
                    self.hsm.sink().write_line(
                        Severity::Error,
                        &format!("'{name}': event queue interrupted outside of shutdown"),
                    );
                    return Err(EngineError::UnexpectedInterrupt);
                }
            }
        }
        Ok(())
    }

    /// The wrapped machine.
    pub fn machine(&self) -> &Hsm<C> {
        &self.hsm
    }

    /// Unwrap the machine.
    pub fn into_inner(self) -> Hsm<C> {
        self.hsm
    }
}

/// Strategy for driving a [`Dispatcher`].
///
/// `start` takes ownership of the dispatcher and begins running its loop;
/// `stop` waits for the loop to finish and hands the dispatcher back.
/// Policies must tolerate `stop` without a prior successful `start` by
/// failing with [`EngineError::NotRunning`].
pub trait ExecutionPolicy<C: Send + 'static>: Send {
    /// Begin driving the loop.
    fn start(&mut self, dispatcher: Dispatcher<C>) -> Result<(), EngineError>;

    /// Wait for the loop to terminate and recover the dispatcher.
    fn stop(&mut self) -> Result<Dispatcher<C>, EngineError>;
}

/// The default policy: a dedicated dispatch thread.
pub struct ThreadExecutionPolicy<C: Send + 'static> {
    worker: Option<JoinHandle<(Dispatcher<C>, Result<(), EngineError>)>>,
}

impl<C: Send + 'static> ThreadExecutionPolicy<C> {
    pub fn new() -> Self {
        ThreadExecutionPolicy { worker: None }
    }
}

impl<C: Send + 'static> Default for ThreadExecutionPolicy<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + 'static> ExecutionPolicy<C> for ThreadExecutionPolicy<C> {
    fn start(&mut self, dispatcher: Dispatcher<C>) -> Result<(), EngineError> {
        if self.worker.is_some() {
            return Err(EngineError::AlreadyStarted);
        }
        let handle = std::thread::Builder::new()
            .name("strata-dispatch".to_string())
            .spawn(move || {
                let mut dispatcher = dispatcher;
                let outcome = dispatcher.run();
                (dispatcher, outcome)
            })?;
        self.worker = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<Dispatcher<C>, EngineError> {
        let worker = self.worker.take().ok_or(EngineError::NotRunning)?;
        let (dispatcher, outcome) = worker.join().map_err(|_| EngineError::WorkerPanicked)?;
        outcome?;
        Ok(dispatcher)
    }
}

/// Controller for a machine running under an execution policy.
///
/// `Runtime` is the cross-thread face of a running machine: producers push
/// events through it, and any thread may stop it. Shutdown is idempotent and
/// follows the protocol the loop expects: raise the interrupt flag, stop the
/// queue, join the loop, then run the exit chain if the machine had not
/// already exited itself. Dropping a running runtime performs the same
/// ordered shutdown.
///
/// # Example
///
/// ```rust
/// use strata::builder::HsmBuilder;
/// use strata::core::{Event, EventId};
/// use strata::exec::Runtime;
/// use strata::machine::TransitionDef;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut b = HsmBuilder::<()>::new();
/// let m = b.machine("m");
/// let a = b.leaf(m, "a")?;
/// let z = b.leaf(m, "z")?;
/// b.bounds(m, a, None)?;
/// b.transition(m, TransitionDef::new(a, EventId::new(1), z))?;
///
/// let mut runtime = Runtime::threaded(b.build(m, ())?)?;
/// runtime.push(Event::new(EventId::new(1)));
/// runtime.stop()?;
///
/// let hsm = runtime.into_machine()?;
/// assert!(!hsm.is_entered());
/// # Ok(())
/// # }
/// ```
pub struct Runtime<C: Send + 'static, P: ExecutionPolicy<C>> {
    queue: EventQueue,
    interrupt: Arc<AtomicBool>,
    policy: P,
    machine: Option<Hsm<C>>,
    stopped: bool,
}

impl<C: Send + 'static> Runtime<C, ThreadExecutionPolicy<C>> {
    /// Launch a machine on a dedicated dispatch thread.
    pub fn threaded(hsm: Hsm<C>) -> Result<Self, EngineError> {
        Self::launch(hsm, ThreadExecutionPolicy::new())
    }
}

impl<C: Send + 'static, P: ExecutionPolicy<C>> Runtime<C, P> {
    /// Enter the machine on the calling thread, then hand it to the policy.
    pub fn launch(mut hsm: Hsm<C>, mut policy: P) -> Result<Self, EngineError> {
        hsm.enter()?;
        let queue = hsm.queue();
        let interrupt = hsm.interrupt_handle();
        policy.start(Dispatcher::new(hsm))?;
        Ok(Runtime {
            queue,
            interrupt,
            policy,
            machine: None,
            stopped: false,
        })
    }

    /// A producer handle to the machine's queue.
    pub fn queue(&self) -> EventQueue {
        self.queue.clone()
    }

    /// Push an event onto the machine's queue.
    pub fn push(&self, event: impl Into<crate::core::Event>) {
        self.queue.push(event.into());
    }

    /// Whether shutdown has been signalled (by this runtime or by the
    /// machine reaching its stop state).
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Shut the machine down from any thread. Idempotent: further calls are
    /// no-ops.
    ///
    /// If the machine already exited on its own (stop state reached), this
    /// just joins the loop; otherwise the exit chain runs here, on the
    /// calling thread, after the loop has terminated.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        self.interrupt.store(true, Ordering::Relaxed);
        self.queue.stop();
        let dispatcher = self.policy.stop()?;
        let mut hsm = dispatcher.into_inner();
        if hsm.is_entered() {
            hsm.exit();
        }
        self.machine = Some(hsm);
        Ok(())
    }

    /// Stop (if still running) and recover the machine for inspection.
    pub fn into_machine(mut self) -> Result<Hsm<C>, EngineError> {
        self.stop()?;
        self.machine.take().ok_or(EngineError::NotRunning)
    }
}

impl<C: Send + 'static, P: ExecutionPolicy<C>> Drop for Runtime<C, P> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::HsmBuilder;
    use crate::core::{Event, EventId};
    use crate::machine::TransitionDef;
    use std::sync::mpsc;
    use std::time::Duration;

    const STEP: EventId = EventId::new(1);

    fn two_state_machine(
        notify: mpsc::Sender<&'static str>,
    ) -> crate::machine::Hsm<()> {
        let mut b = HsmBuilder::<()>::new();
        let m = b.machine("m");
        let a = b.leaf(m, "a").unwrap();
        let z = b.leaf(m, "z").unwrap();
        b.bounds(m, a, None).unwrap();
        b.transition(
            m,
            TransitionDef::new(a, STEP, z).then(move |_ctx, _ev| {
                let _ = notify.send("stepped");
            }),
        )
        .unwrap();
        b.build(m, ()).unwrap()
    }

    #[test]
    fn threaded_runtime_dispatches_pushed_events() {
        let (tx, rx) = mpsc::channel();
        let mut runtime = Runtime::threaded(two_state_machine(tx)).unwrap();

        runtime.push(Event::new(STEP));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok("stepped"));

        runtime.stop().unwrap();
        let hsm = runtime.into_machine().unwrap();
        assert!(!hsm.is_entered());
        assert_eq!(hsm.journal().len(), 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let (tx, _rx) = mpsc::channel();
        let mut runtime = Runtime::threaded(two_state_machine(tx)).unwrap();

        runtime.stop().unwrap();
        runtime.stop().unwrap();
        assert!(runtime.is_interrupted());
    }

    #[test]
    fn external_queue_stop_is_a_fatal_interrupt() {
        let (tx, _rx) = mpsc::channel();
        let mut runtime = Runtime::threaded(two_state_machine(tx)).unwrap();

        // Stop the queue without raising the interrupt flag: the loop must
        // treat this as an unexpected shutdown.
        runtime.queue().stop();
        // Let the loop observe the interruption before stop() raises the flag.
        std::thread::sleep(Duration::from_millis(200));
        let result = runtime.stop();
        assert!(matches!(result, Err(EngineError::UnexpectedInterrupt)));
    }

    #[test]
    fn policy_stop_without_start_reports_not_running() {
        let mut policy: ThreadExecutionPolicy<()> = ThreadExecutionPolicy::new();
        assert!(matches!(policy.stop(), Err(EngineError::NotRunning)));
    }

    #[test]
    fn dropping_a_runtime_shuts_the_machine_down() {
        let (tx, _rx) = mpsc::channel();
        let runtime = Runtime::threaded(two_state_machine(tx)).unwrap();
        let queue = runtime.queue();

        drop(runtime);
        assert!(queue.is_stopped());
    }
}
