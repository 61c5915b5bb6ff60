//! An async scope wrapping asynchronous and synchronous handlers.
//!
//! Run with `cargo run --example async_monitor --features macros`.

use eventlib::{
    AsyncScope, BoxError, ErrorGroup, Event, EventExt, ExitAction, subscribe,
};

#[derive(Event, Debug, Default)]
struct MyEvent;

/// Announces the event before any other handler and after all of them.
#[derive(Debug, Default)]
struct Monitor;

#[subscribe(priority = -1000)]
impl AsyncScope<MyEvent> for Monitor {
    type Guard = ();

    async fn enter(&self, _event: &mut MyEvent) -> Result<(), BoxError> {
        println!("Event received");
        Ok(())
    }

    async fn exit(
        &self,
        _guard: (),
        _event: &mut MyEvent,
        _in_flight: Option<&ErrorGroup>,
    ) -> Result<ExitAction, BoxError> {
        println!("Event processed");
        Ok(ExitAction::Propagate)
    }
}

#[subscribe]
async fn async_on_event(_event: &mut MyEvent) {
    tokio::task::yield_now().await;
    println!("async_on_event");
}

#[subscribe]
fn on_event(_event: &mut MyEvent) {
    println!("on_event");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BoxError> {
    MyEvent.emit_async().await?;
    Ok(())
}
