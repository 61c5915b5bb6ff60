//! A mixed benchmark case: every handler kind on a two-level hierarchy.
//!
//! The hand-written equivalent of one dispatch is [`run_reference`]: two
//! async scopes around two sync scopes around two sync handlers and one
//! async handler. [`run_library`] runs the same thing through an
//! [`EventSystem`].
//!
//! Run with `cargo run --release --example benchmark [iterations]`.

use eventlib::{
    AsyncHandler, AsyncScope, BoxError, ErrorGroup, Event, EventSystem, ExitAction, Extends,
    Scope, Supertype, scope_fn,
};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct A;

impl Event for A {}

#[derive(Debug, Default)]
struct B {
    a: A,
    /// Scopes currently open.
    depth: u32,
    /// `depth` as seen by the innermost handler.
    depth_seen: u32,
}

impl Event for B {
    fn supertypes() -> Vec<Supertype> {
        vec![Supertype::of::<Self, A>()]
    }
}

impl Extends<A> for B {
    fn upcast_mut(&mut self) -> &mut A {
        &mut self.a
    }
}

fn sync_func0(_: &mut A) {}

fn sync_func1(event: &mut B) {
    event.depth_seen = event.depth;
}

struct AsyncFunc;

impl AsyncHandler<B> for AsyncFunc {
    async fn handle(&self, _event: &mut B) -> Result<(), BoxError> {
        tokio::task::yield_now().await;
        Ok(())
    }
}

struct AsyncContextFunc;

impl AsyncScope<B> for AsyncContextFunc {
    type Guard = ();

    async fn enter(&self, event: &mut B) -> Result<(), BoxError> {
        tokio::task::yield_now().await;
        event.depth += 1;
        Ok(())
    }

    async fn exit(
        &self,
        _guard: (),
        event: &mut B,
        _in_flight: Option<&ErrorGroup>,
    ) -> Result<ExitAction, BoxError> {
        tokio::task::yield_now().await;
        event.depth -= 1;
        Ok(ExitAction::Propagate)
    }
}

struct AsyncContextClass;

impl AsyncScope<B> for AsyncContextClass {
    type Guard = ();

    async fn enter(&self, event: &mut B) -> Result<(), BoxError> {
        event.depth += 1;
        Ok(())
    }

    async fn exit(
        &self,
        _guard: (),
        event: &mut B,
        _in_flight: Option<&ErrorGroup>,
    ) -> Result<ExitAction, BoxError> {
        event.depth -= 1;
        Ok(ExitAction::Propagate)
    }
}

struct SyncContextClass;

impl Scope<B> for SyncContextClass {
    type Guard = ();

    fn enter(&self, event: &mut B) -> Result<(), BoxError> {
        event.depth += 1;
        Ok(())
    }

    fn exit(
        &self,
        _guard: (),
        event: &mut B,
        _in_flight: Option<&ErrorGroup>,
    ) -> Result<ExitAction, BoxError> {
        event.depth -= 1;
        Ok(ExitAction::Propagate)
    }
}

/// A sync scope built from closures.
fn sync_context_func() -> impl Scope<B, Guard = ()> {
    scope_fn(
        |event: &mut B| {
            event.depth += 1;
            Ok(())
        },
        |_, event: &mut B, _| {
            event.depth -= 1;
            Ok(ExitAction::Propagate)
        },
    )
}

/// Prepare the event system.
fn build(system: &EventSystem) -> Result<(), BoxError> {
    system.subscribe::<B>().priority(-2).scope_async(AsyncContextFunc)?;
    system.subscribe::<B>().priority(-2).scope_async(AsyncContextClass)?;

    system.subscribe::<B>().priority(-1).scope(sync_context_func())?;
    system.subscribe::<B>().priority(-1).scope(SyncContextClass)?;

    system.subscribe::<A>().priority(0).handler(sync_func0)?;
    system.subscribe::<B>().priority(1).handler(sync_func1)?;
    system.subscribe::<B>().priority(2).handler_async(AsyncFunc)?;
    Ok(())
}

fn new_event() -> B {
    B::default()
}

/// The dispatch written out by hand.
async fn run_reference(event: &mut B) -> Result<(), BoxError> {
    AsyncScope::enter(&AsyncContextFunc, event).await?;
    AsyncScope::enter(&AsyncContextClass, event).await?;
    let context_func = sync_context_func();
    Scope::enter(&context_func, event)?;
    Scope::enter(&SyncContextClass, event)?;

    sync_func0(&mut event.a);
    sync_func1(event);
    AsyncHandler::handle(&AsyncFunc, event).await?;

    Scope::exit(&SyncContextClass, (), event, None)?;
    Scope::exit(&context_func, (), event, None)?;
    AsyncScope::exit(&AsyncContextClass, (), event, None).await?;
    AsyncScope::exit(&AsyncContextFunc, (), event, None).await?;
    Ok(())
}

async fn run_library(system: &EventSystem, event: &mut B) -> Result<(), BoxError> {
    system.emit_async(event).await?;
    Ok(())
}

fn report(label: &str, iterations: u32, elapsed: Duration) {
    println!(
        "{label:>9}: {iterations} dispatches in {elapsed:?} ({:?} each)",
        elapsed / iterations.max(1)
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BoxError> {
    let iterations: u32 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 10_000,
    };

    let system = EventSystem::new();
    build(&system)?;

    let started = Instant::now();
    for _ in 0..iterations {
        run_reference(&mut new_event()).await?;
    }
    report("reference", iterations, started.elapsed());

    let started = Instant::now();
    for _ in 0..iterations {
        run_library(&system, &mut new_event()).await?;
    }
    report("eventlib", iterations, started.elapsed());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reference_matches_library() {
        let system = EventSystem::new();
        build(&system).unwrap();

        let mut reference = new_event();
        run_reference(&mut reference).await.unwrap();
        let mut library = new_event();
        run_library(&system, &mut library).await.unwrap();

        assert_eq!(reference.depth_seen, 4);
        assert_eq!(library.depth_seen, reference.depth_seen);
        assert_eq!((reference.depth, library.depth), (0, 0));
    }
}
