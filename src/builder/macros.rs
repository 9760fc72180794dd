//! Macros for declaring event domains.

/// Declare an enumerable event domain.
///
/// Generates a fieldless enum with `id()` and `name()` methods plus `From`
/// conversions into [`EventId`](crate::core::EventId) and
/// [`Event`](crate::core::Event), so variants can be passed directly to
/// transition definitions and queue pushes.
///
/// # Example
///
/// ```
/// use strata::core::{Event, EventId};
/// use strata::event_enum;
///
/// event_enum! {
///     pub enum DeckEvent {
///         Play,
///         Pause,
///         Eject,
///     }
/// }
///
/// assert_eq!(DeckEvent::Play.id(), EventId::new(0));
/// assert_eq!(DeckEvent::Eject.name(), "Eject");
///
/// let event: Event = DeckEvent::Pause.into();
/// assert_eq!(event.id(), DeckEvent::Pause.id());
/// ```
#[macro_export]
macro_rules! event_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            /// Stable identifier for this event kind.
            $vis const fn id(self) -> $crate::core::EventId {
                $crate::core::EventId::new(self as u32)
            }

            /// Variant name, for diagnostics.
            $vis const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }

        impl ::core::convert::From<$name> for $crate::core::EventId {
            fn from(value: $name) -> Self {
                value.id()
            }
        }

        impl ::core::convert::From<$name> for $crate::core::Event {
            fn from(value: $name) -> Self {
                $crate::core::Event::new(value.id())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Event, EventId};

    event_enum! {
        enum TestEvent {
            Start,
            Tick,
            Finish,
        }
    }

    #[test]
    fn ids_follow_declaration_order() {
        assert_eq!(TestEvent::Start.id(), EventId::new(0));
        assert_eq!(TestEvent::Tick.id(), EventId::new(1));
        assert_eq!(TestEvent::Finish.id(), EventId::new(2));
    }

    #[test]
    fn names_match_variants() {
        assert_eq!(TestEvent::Start.name(), "Start");
        assert_eq!(TestEvent::Finish.name(), "Finish");
    }

    #[test]
    fn converts_into_event_id_and_event() {
        let id: EventId = TestEvent::Tick.into();
        assert_eq!(id, EventId::new(1));

        let event: Event = TestEvent::Tick.into();
        assert_eq!(event.id(), EventId::new(1));
        assert!(!event.has_payload());
    }

    #[test]
    fn macro_supports_visibility_and_attributes() {
        event_enum! {
            /// Events visible outside the module.
            pub enum PublicEvent {
                One,
                Two,
            }
        }

        assert_eq!(PublicEvent::Two.id(), EventId::new(1));
    }
}
