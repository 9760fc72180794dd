//! Interruptible blocking event queue.
//!
//! The queue is the only cross-thread mutation point in the engine: any
//! thread may push, exactly one dispatch loop consumes. [`EventQueue`] is a
//! cheap cloneable handle; all clones address the same queue.

use crate::core::Event;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Queue failures surfaced to consumers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was stopped while (or before) waiting for an event.
    #[error("event queue interrupted")]
    Interrupted,
}

struct QueueState {
    events: VecDeque<Event>,
    stopped: bool,
}

struct Inner {
    state: Mutex<QueueState>,
    ready: Condvar,
}

/// Multi-producer, single-consumer FIFO with blocking dequeue and an
/// interruptible stop.
///
/// Ordering is strict FIFO as observed by the queue. After [`stop`],
/// undelivered events are discarded, later pushes are ignored, and every
/// [`next_event`] call fails with [`QueueError::Interrupted`].
///
/// [`stop`]: EventQueue::stop
/// [`next_event`]: EventQueue::next_event
///
/// # Example
///
/// ```rust
/// use strata::core::{Event, EventId};
/// use strata::queue::{EventQueue, QueueError};
///
/// let queue = EventQueue::new();
/// queue.push(Event::new(EventId::new(1)));
///
/// assert_eq!(queue.next_event().map(|ev| ev.id()), Ok(EventId::new(1)));
///
/// queue.stop();
/// assert_eq!(queue.next_event(), Err(QueueError::Interrupted));
/// ```
#[derive(Clone)]
pub struct EventQueue {
    inner: Arc<Inner>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        EventQueue {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    events: VecDeque::new(),
                    stopped: false,
                }),
                ready: Condvar::new(),
            }),
        }
    }

    /// Append an event. Never blocks.
    ///
    /// Events pushed after [`stop`](EventQueue::stop) are silently dropped.
    pub fn push(&self, event: Event) {
        let mut state = self.lock();
        if state.stopped {
            return;
        }
        state.events.push_back(event);
        drop(state);
        self.inner.ready.notify_one();
    }

    /// Dequeue the next event, blocking until one arrives.
    ///
    /// Fails with [`QueueError::Interrupted`] once the queue has been
    /// stopped, including for consumers already blocked in this call.
    pub fn next_event(&self) -> Result<Event, QueueError> {
        let mut state = self.lock();
        loop {
            if state.stopped {
                return Err(QueueError::Interrupted);
            }
            if let Some(event) = state.events.pop_front() {
                return Ok(event);
            }
            state = self
                .inner
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stop the queue: wake every blocked consumer and discard undelivered
    /// events. Idempotent.
    pub fn stop(&self) {
        let mut state = self.lock();
        if state.stopped {
            return;
        }
        state.stopped = true;
        state.events.clear();
        drop(state);
        self.inner.ready.notify_all();
    }

    /// Whether [`stop`](EventQueue::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Number of undelivered events.
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    /// Whether no events are waiting.
    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    // A panicked producer must not wedge the dispatch loop, so poisoning is
    // absorbed rather than propagated.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventId;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn delivers_in_fifo_order() {
        let queue = EventQueue::new();
        for id in 1..=4u32 {
            queue.push(Event::new(EventId::new(id)));
        }

        let drained: Vec<u32> = (0..4)
            .map(|_| queue.next_event().unwrap().id().raw())
            .collect();
        assert_eq!(drained, vec![1, 2, 3, 4]);
    }

    #[test]
    fn clones_share_the_same_queue() {
        let queue = EventQueue::new();
        let producer = queue.clone();

        producer.push(Event::new(EventId::new(7)));
        assert_eq!(queue.next_event().unwrap().id(), EventId::new(7));
    }

    #[test]
    fn stop_wakes_blocked_consumer() {
        let queue = EventQueue::new();
        let consumer = queue.clone();

        let waiter = thread::spawn(move || consumer.next_event());

        // Give the consumer time to block before interrupting it.
        thread::sleep(Duration::from_millis(20));
        queue.stop();

        assert_eq!(waiter.join().unwrap(), Err(QueueError::Interrupted));
    }

    #[test]
    fn stop_discards_undelivered_events() {
        let queue = EventQueue::new();
        queue.push(Event::new(EventId::new(1)));
        queue.push(Event::new(EventId::new(2)));

        queue.stop();

        assert!(queue.is_empty());
        assert_eq!(queue.next_event(), Err(QueueError::Interrupted));
    }

    #[test]
    fn push_after_stop_is_ignored() {
        let queue = EventQueue::new();
        queue.stop();
        queue.push(Event::new(EventId::new(3)));

        assert!(queue.is_empty());
    }

    #[test]
    fn stop_is_idempotent() {
        let queue = EventQueue::new();
        queue.stop();
        queue.stop();

        assert!(queue.is_stopped());
        assert_eq!(queue.next_event(), Err(QueueError::Interrupted));
    }

    #[test]
    fn concurrent_producers_all_deliver() {
        let queue = EventQueue::new();
        let handles: Vec<_> = (0..4u32)
            .map(|id| {
                let producer = queue.clone();
                thread::spawn(move || producer.push(Event::new(EventId::new(id))))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen: Vec<u32> = (0..4)
            .map(|_| queue.next_event().unwrap().id().raw())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }
}
