//! Event values consumed by the dispatch loop.
//!
//! Events are immutable tokens identified by an [`EventId`]. Equality and
//! hashing consider the identifier only, so an event with a payload and one
//! without are the same event as far as transition tables are concerned.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Stable identifier for an event kind.
///
/// Identifiers are small integers, typically produced from an application
/// enum via the [`event_enum!`](crate::event_enum) macro. They are
/// deterministic across runs and across copies, which makes transition
/// tables keyed on them reproducible.
///
/// # Example
///
/// ```rust
/// use strata::core::EventId;
///
/// let id = EventId::new(3);
/// assert_eq!(id.raw(), 3);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct EventId(u32);

impl EventId {
    /// Create an identifier from its raw value.
    pub const fn new(raw: u32) -> Self {
        EventId(raw)
    }

    /// The raw integer value.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EventId {
    fn from(raw: u32) -> Self {
        EventId(raw)
    }
}

/// An immutable event token with an identifier and optional opaque payload.
///
/// Payloads ride along for the benefit of actions and handlers; they take no
/// part in equality, hashing, or table lookup. Cloning an event is cheap
/// (the payload is reference-counted).
///
/// # Example
///
/// ```rust
/// use strata::core::{Event, EventId};
///
/// let plain = Event::new(EventId::new(7));
/// let loaded = Event::with_payload(EventId::new(7), "door 3".to_string());
///
/// // Identity-only equality: the payload does not distinguish them.
/// assert_eq!(plain, loaded);
/// assert_eq!(loaded.payload::<String>().map(String::as_str), Some("door 3"));
/// assert_eq!(plain.payload::<String>(), None);
/// ```
#[derive(Clone)]
pub struct Event {
    id: EventId,
    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl Event {
    /// Create an event with no payload.
    pub fn new(id: impl Into<EventId>) -> Self {
        Event {
            id: id.into(),
            payload: None,
        }
    }

    /// Create an event carrying an opaque payload.
    pub fn with_payload<T>(id: impl Into<EventId>, payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Event {
            id: id.into(),
            payload: Some(Arc::new(payload)),
        }
    }

    /// The event identifier.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Whether a payload is attached.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Borrow the payload, downcast to a concrete type.
    ///
    /// Returns `None` when no payload is attached or the type does not
    /// match.
    pub fn payload<T>(&self) -> Option<&T>
    where
        T: Any + Send + Sync,
    {
        self.payload.as_deref()?.downcast_ref()
    }
}

impl From<EventId> for Event {
    fn from(id: EventId) -> Self {
        Event::new(id)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("payload", &self.payload.as_ref().map(|_| "<opaque>"))
            .finish()
    }
}
