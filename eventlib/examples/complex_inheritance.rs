//! Handlers registered along a diamond-shaped hierarchy.
//!
//! ```text
//!        Base
//!       /    \
//!    Left    Right
//!       \    /
//!       Merged
//! ```
//!
//! A handler runs at most once per event, however many paths lead to it.
//!
//! Run with `cargo run --example complex_inheritance --features macros`.

use eventlib::{BoxError, Event, EventExt, subscribe};

#[derive(Event, Debug, Default)]
struct Base;

#[derive(Event, Debug, Default)]
struct Left {
    #[event(parent)]
    base: Base,
}

#[derive(Event, Debug, Default)]
struct Right {
    #[event(parent)]
    base: Base,
}

#[derive(Event, Debug, Default)]
struct Merged {
    #[event(parent)]
    left: Left,
    #[event(parent)]
    right: Right,
}

/// Handle any base event.
#[subscribe]
fn on_base(event: &Base) {
    println!("on_base({event:?})");
}

/// Handle any left event.
#[subscribe]
fn on_left(event: &Left) {
    println!("on_left({event:?})");
}

/// Handle any right event.
#[subscribe]
fn on_right(event: &Right) {
    println!("on_right({event:?})");
}

/// Handle any merged event.
#[subscribe]
fn on_merged(event: &Merged) {
    println!("on_merged({event:?})");
}

fn main() -> Result<(), BoxError> {
    println!("Merged event:");
    // on_base, on_right, on_left, on_merged
    Merged::default().emit()?;

    println!("\nLeft event:");
    // on_base, on_left
    Left::default().emit()?;

    println!("\nRight event:");
    // on_base, on_right
    Right::default().emit()?;

    Ok(())
}
