//! Media Deck
//!
//! Two orthogonal regions (transport and volume) running on a dedicated
//! dispatch thread, fed from the main thread through the shared queue.
//!
//! Run with: cargo run --example media_deck

use strata::builder::HsmBuilder;
use strata::event_enum;
use strata::exec::Runtime;
use strata::machine::TransitionDef;

event_enum! {
    enum DeckEvent {
        Play,
        Pause,
        Mute,
        Unmute,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut b = HsmBuilder::<()>::new();

    let transport = b.machine("transport");
    let paused = b.leaf(transport, "paused")?;
    let playing = b.leaf(transport, "playing")?;
    b.bounds(transport, paused, None)?;
    b.transition(transport, TransitionDef::new(paused, DeckEvent::Play, playing))?;
    b.transition(transport, TransitionDef::new(playing, DeckEvent::Pause, paused))?;

    let volume = b.machine("volume");
    let audible = b.leaf(volume, "audible")?;
    let muted = b.leaf(volume, "muted")?;
    b.bounds(volume, audible, None)?;
    b.transition(volume, TransitionDef::new(audible, DeckEvent::Mute, muted))?;
    b.transition(volume, TransitionDef::new(muted, DeckEvent::Unmute, audible))?;

    let deck = b.orthogonal("deck", transport, volume)?;
    let mut runtime = Runtime::threaded(b.build(deck, ())?)?;

    // Each region advances only on the events it recognizes.
    runtime.push(DeckEvent::Play);
    runtime.push(DeckEvent::Mute);
    runtime.push(DeckEvent::Unmute);

    std::thread::sleep(std::time::Duration::from_millis(100));
    runtime.stop()?;

    let hsm = runtime.into_machine()?;
    println!("journal after shutdown:");
    for record in hsm.journal().records() {
        println!("  [{}] {} -> {} on event {}", record.machine, record.from, record.to, record.event);
    }
    Ok(())
}
