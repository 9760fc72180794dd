//! Traffic Light
//!
//! A cyclic machine driven cooperatively on the calling thread, showing the
//! builder API, internal transitions, and the dispatch journal.
//!
//! Run with: cargo run --example traffic_light

use strata::builder::HsmBuilder;
use strata::core::Event;
use strata::event_enum;
use strata::machine::TransitionDef;

event_enum! {
    enum LightEvent {
        Next,
        Ping,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut b = HsmBuilder::<u32>::new();
    let light = b.machine("light");
    let red = b.leaf(light, "red")?;
    let green = b.leaf(light, "green")?;
    let yellow = b.leaf(light, "yellow")?;
    b.bounds(light, red, None)?;

    b.transition(light, TransitionDef::new(red, LightEvent::Next, green))?;
    b.transition(light, TransitionDef::new(green, LightEvent::Next, yellow))?;
    b.transition(light, TransitionDef::new(yellow, LightEvent::Next, red))?;
    // Health pings are absorbed without leaving the current state.
    b.transition(
        light,
        TransitionDef::internal(red, LightEvent::Ping).then(|pings: &mut u32, _ev| *pings += 1),
    )?;

    let mut hsm = b.build(light, 0)?;
    hsm.enter()?;

    for _ in 0..3 {
        hsm.dispatch(&Event::from(LightEvent::Next));
    }
    hsm.dispatch(&Event::from(LightEvent::Ping));

    println!("cycled back to: {:?}", hsm.active_leaf().and_then(|s| hsm.name_of(s)));
    println!("pings absorbed: {}", hsm.context());
    println!("journal:");
    for record in hsm.journal().records() {
        let kind = if record.internal { "internal" } else { "external" };
        println!("  {} -> {} on event {} ({kind})", record.from, record.to, record.event);
    }

    hsm.exit();
    Ok(())
}
