//! Property-based tests for the dispatch engine.
//!
//! These tests use proptest to verify ordering, purity, and lifecycle
//! properties across many randomly generated event sequences.

use proptest::prelude::*;
use std::collections::HashMap;

use strata::builder::HsmBuilder;
use strata::core::{Event, EventId, Hooks};
use strata::machine::{Hsm, TransitionDef};
use strata::queue::EventQueue;

const GO: EventId = EventId::new(0);
const BACK: EventId = EventId::new(1);
const NOISE: EventId = EventId::new(7);

#[derive(Default, Clone, Debug, PartialEq)]
struct Counters {
    entries: HashMap<String, u32>,
    exits: HashMap<String, u32>,
    observed: Vec<u32>,
}

fn count_entry(name: &'static str) -> impl FnMut(&mut Counters) + Send + 'static {
    move |ctx: &mut Counters| *ctx.entries.entry(name.to_string()).or_default() += 1
}

fn count_exit(name: &'static str) -> impl FnMut(&mut Counters) + Send + 'static {
    move |ctx: &mut Counters| *ctx.exits.entry(name.to_string()).or_default() += 1
}

/// Two leaves cycling on GO/BACK, with counting hooks on both.
fn cycling_machine() -> Hsm<Counters> {
    let mut b = HsmBuilder::<Counters>::new();
    let m = b.machine("m");
    let a = b
        .leaf_with(m, "a", Hooks::new().entry(count_entry("a")).exit(count_exit("a")))
        .unwrap();
    let z = b
        .leaf_with(m, "z", Hooks::new().entry(count_entry("z")).exit(count_exit("z")))
        .unwrap();
    b.bounds(m, a, None).unwrap();
    b.transition(m, TransitionDef::new(a, GO, z)).unwrap();
    b.transition(m, TransitionDef::new(z, BACK, a)).unwrap();
    b.build(m, Counters::default()).unwrap()
}

/// A three-deep nest: outer > mid > inner, inner recording observed events
/// through internal transitions.
fn nested_machine() -> Hsm<Counters> {
    let mut b = HsmBuilder::<Counters>::new();
    let outer = b.machine("outer");
    let mid = b.submachine(outer, "mid").unwrap();
    let inner = b.submachine(mid, "inner").unwrap();
    let hub = b.leaf(inner, "hub").unwrap();
    let idle_mid = b.leaf(mid, "idle_mid").unwrap();
    let idle_outer = b.leaf(outer, "idle_outer").unwrap();

    b.bounds(outer, idle_outer, None).unwrap();
    b.bounds(mid, idle_mid, None).unwrap();
    b.bounds(inner, hub, None).unwrap();

    b.transition(outer, TransitionDef::new(idle_outer, GO, mid)).unwrap();
    b.transition(mid, TransitionDef::new(idle_mid, GO, inner)).unwrap();
    b.transition(
        inner,
        TransitionDef::internal(hub, BACK)
            .then(|ctx: &mut Counters, ev: &Event| ctx.observed.push(ev.id().raw())),
    )
    .unwrap();

    b.build(outer, Counters::default()).unwrap()
}

prop_compose! {
    fn arbitrary_event()(id in 0..2u32) -> Event {
        Event::new(EventId::new(id))
    }
}

proptest! {
    #[test]
    fn queue_preserves_push_order(ids in prop::collection::vec(0..100u32, 0..32)) {
        let queue = EventQueue::new();
        for id in &ids {
            queue.push(Event::new(EventId::new(*id)));
        }

        let drained: Vec<u32> = (0..ids.len())
            .map(|_| queue.next_event().unwrap().id().raw())
            .collect();
        prop_assert_eq!(drained, ids);
    }

    #[test]
    fn dispatch_order_matches_event_order(ids in prop::collection::vec(0..4u32, 0..24)) {
        // One hub state with an internal transition per event id: every
        // event is consumed in order with no state change.
        let mut b = HsmBuilder::<Counters>::new();
        let m = b.machine("m");
        let hub = b.leaf(m, "hub").unwrap();
        b.bounds(m, hub, None).unwrap();
        for id in 0..4u32 {
            b.transition(
                m,
                TransitionDef::internal(hub, EventId::new(id))
                    .then(|ctx: &mut Counters, ev: &Event| ctx.observed.push(ev.id().raw())),
            )
            .unwrap();
        }
        let mut hsm = b.build(m, Counters::default()).unwrap();
        hsm.enter().unwrap();

        for id in &ids {
            hsm.dispatch(&Event::new(EventId::new(*id)));
        }

        prop_assert_eq!(&hsm.context().observed, &ids);
    }

    #[test]
    fn active_leaf_is_unique_and_rooted(events in prop::collection::vec(arbitrary_event(), 0..24)) {
        let mut hsm = cycling_machine();
        hsm.enter().unwrap();

        for event in &events {
            hsm.dispatch(event);

            let leaf = hsm.active_leaf();
            prop_assert!(leaf.is_some());

            // The active leaf's parent chain must reach the root.
            let mut cursor = leaf.unwrap();
            let mut hops = 0;
            while let Some(parent) = hsm.parent_of(cursor) {
                cursor = parent;
                hops += 1;
                prop_assert!(hops < 16);
            }
            prop_assert_eq!(cursor, hsm.root());
        }
    }

    #[test]
    fn rejected_guard_never_changes_state(attempts in prop::collection::vec(any::<bool>(), 1..16)) {
        let mut b = HsmBuilder::<Counters>::new();
        let m = b.machine("m");
        let a = b
            .leaf_with(m, "a", Hooks::new().exit(count_exit("a")))
            .unwrap();
        let z = b
            .leaf_with(m, "z", Hooks::new().entry(count_entry("z")))
            .unwrap();
        b.bounds(m, a, None).unwrap();
        // The guard consults the event payload so each dispatch decides
        // independently of machine state.
        b.transition(
            m,
            TransitionDef::new(a, GO, z)
                .when(|_ctx: &Counters, ev: &Event| *ev.payload::<bool>().unwrap_or(&false)),
        )
        .unwrap();

        let mut hsm = b.build(m, Counters::default()).unwrap();
        hsm.enter().unwrap();

        for allow in &attempts {
            hsm.dispatch(&Event::with_payload(GO, *allow));
            if *allow {
                break;
            }
            // Rejected: no hooks ran and the state is unchanged.
            prop_assert_eq!(hsm.active_leaf(), Some(a));
            prop_assert!(hsm.context().exits.is_empty());
            prop_assert!(hsm.context().entries.is_empty());
        }
    }

    #[test]
    fn every_entry_is_paired_with_an_exit(events in prop::collection::vec(arbitrary_event(), 0..24)) {
        let mut hsm = cycling_machine();
        hsm.enter().unwrap();
        for event in &events {
            hsm.dispatch(event);
        }
        hsm.exit();

        // Start states become current without an entry hook, so a state may
        // see at most one more exit than entries; never the other way.
        let ctx = hsm.context();
        for name in ["a", "z"] {
            let entries = ctx.entries.get(name).copied().unwrap_or(0);
            let exits = ctx.exits.get(name).copied().unwrap_or(0);
            prop_assert!(exits >= entries, "{}: exits {} < entries {}", name, exits, entries);
            prop_assert!(exits <= entries + 1, "{}: exits {} > entries {} + 1", name, exits, entries);
        }
    }

    #[test]
    fn unrecognized_events_bubble_and_terminate(depth_events in prop::collection::vec(Just(NOISE), 1..8)) {
        let mut hsm = nested_machine();
        hsm.enter().unwrap();
        // Descend into the innermost machine.
        hsm.dispatch(&Event::new(GO));
        hsm.dispatch(&Event::new(GO));

        let before = hsm.active_leaf();
        for event_id in &depth_events {
            // Nobody recognizes NOISE; each dispatch must return after a
            // bounded bubble and leave the configuration alone.
            hsm.dispatch(&Event::new(*event_id));
        }
        prop_assert_eq!(hsm.active_leaf(), before);
    }

    #[test]
    fn shutdown_is_idempotent(events in prop::collection::vec(arbitrary_event(), 0..12)) {
        let mut hsm = cycling_machine();
        hsm.enter().unwrap();
        for event in &events {
            hsm.dispatch(event);
        }

        hsm.exit();
        let after_first = hsm.context().clone();
        hsm.exit();
        let after_second = hsm.context().clone();

        prop_assert_eq!(after_first, after_second);
        prop_assert!(!hsm.is_entered());
    }

    #[test]
    fn journal_round_trips_through_serde(events in prop::collection::vec(arbitrary_event(), 0..16)) {
        let mut hsm = cycling_machine();
        hsm.enter().unwrap();
        for event in &events {
            hsm.dispatch(event);
        }

        let json = serde_json::to_string(hsm.journal()).unwrap();
        let back: strata::core::TransitionJournal = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(back.records(), hsm.journal().records());
    }
}
