//! Isolated and copied event systems.
//!
//! Two systems built independently never see each other's subscriptions. A
//! system built from a parent starts with the parent's subscriptions; later
//! subscriptions on either side stay local.
//!
//! Run with `cargo run --example copied_systems`.

use eventlib::prelude::*;

#[derive(Debug)]
struct Foo {
    value: &'static str,
}

impl Event for Foo {}

#[derive(Debug)]
struct Bar {
    value: &'static str,
}

impl Event for Bar {}

fn main() -> Result<(), BoxError> {
    // Isolated systems.
    let system_a = EventSystem::new();
    let system_b = EventSystem::new();
    system_a
        .subscribe::<Foo>()
        .handler(|event: &mut Foo| println!("on_event_a({event:?})"))?;
    system_b
        .subscribe::<Foo>()
        .handler(|event: &mut Foo| println!("on_event_b({event:?})"))?;

    system_a.emit(&mut Foo { value: "Hello" })?;
    system_b.emit(&mut Foo { value: "World" })?;
    println!("---");

    // A copy extending the original.
    let original = EventSystem::new();
    original
        .subscribe::<Foo>()
        .name("on_foo")
        .handler(|event: &mut Foo| println!("on_foo({event:?})"))?;

    let extended = EventSystem::from_parent(&original);
    extended
        .subscribe::<Bar>()
        .name("on_bar")
        .handler(|event: &mut Bar| println!("on_bar({event:?})"))?;

    original.emit(&mut Foo { value: "Foo" })?;
    // Nothing happens: `on_bar` only exists in the copy.
    original.emit(&mut Bar { value: "Bar" })?;
    println!("---");
    extended.emit(&mut Foo { value: "Hello" })?;
    extended.emit(&mut Bar { value: "World" })?;

    Ok(())
}
