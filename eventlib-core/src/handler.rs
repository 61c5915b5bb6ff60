//! # Plain Handlers
//!
//! A plain handler is invoked once per dispatch with exclusive access to the
//! event. Handlers run strictly one after another, so a field written by one
//! handler (a cancellation flag, say) is visible to every later handler
//! without synchronization.
//!
//! # Usage Patterns
//!
//! 1. **Closure**: `|event: &mut MyEvent| { ... }` implements [`Handler`]
//! 2. **Struct implementation**: `impl Handler<MyEvent> for MyHandler`
//! 3. **Asynchronous**: `impl AsyncHandler<MyEvent> for MyHandler`, usable
//!    only with `emit_async`

use crate::{error::BoxError, event::Event};
use std::fmt;
use std::future::Future;

/// The four shapes a subscriber can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// A [`Handler`].
    PlainSync,
    /// An [`AsyncHandler`].
    PlainAsync,
    /// A [`Scope`](crate::Scope).
    ScopedSync,
    /// An [`AsyncScope`](crate::AsyncScope).
    ScopedAsync,
}

impl HandlerKind {
    /// Whether handlers of this kind need `emit_async`.
    pub const fn is_async(self) -> bool {
        matches!(self, HandlerKind::PlainAsync | HandlerKind::ScopedAsync)
    }

    /// Whether handlers of this kind wrap the steps after them.
    pub const fn is_scoped(self) -> bool {
        matches!(self, HandlerKind::ScopedSync | HandlerKind::ScopedAsync)
    }

    /// Returns a short stable label for logs.
    pub const fn as_label(self) -> &'static str {
        match self {
            HandlerKind::PlainSync => "plain-sync",
            HandlerKind::PlainAsync => "plain-async",
            HandlerKind::ScopedSync => "scoped-sync",
            HandlerKind::ScopedAsync => "scoped-async",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Trait for converting a handler's return value into its outcome.
///
/// # Default Implementations
///
/// - `()` → success
/// - `Result<(), E>` → success, or the error boxed
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a handler outcome",
    label = "handlers must return `()` or `Result<(), E>`",
    note = "the error type must convert into `BoxError`."
)]
pub trait IntoOutcome {
    /// Convert the return value.
    fn into_outcome(self) -> Result<(), BoxError>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> IntoOutcome for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// A synchronous plain handler.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle events of type `{E}`",
    label = "missing `Handler<{E}>` implementation",
    note = "Handlers implement `handle`, or are closures `Fn(&mut {E})`."
)]
pub trait Handler<E: Event>: Send + Sync + 'static {
    /// Handle the event.
    fn handle(&self, event: &mut E) -> Result<(), BoxError>;
}

// Blanket impl for closures
impl<E, F, R> Handler<E> for F
where
    E: Event,
    F: Fn(&mut E) -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
    fn handle(&self, event: &mut E) -> Result<(), BoxError> {
        (self)(event).into_outcome()
    }
}

/// An asynchronous plain handler.
///
/// The returned future may suspend; the dispatch waits for it to finish
/// before the next step starts.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot asynchronously handle events of type `{E}`",
    label = "missing `AsyncHandler<{E}>` implementation",
    note = "Async handlers implement `async fn handle(&self, event: &mut {E})`."
)]
pub trait AsyncHandler<E: Event>: Send + Sync + 'static {
    /// Handle the event.
    fn handle(&self, event: &mut E) -> impl Future<Output = Result<(), BoxError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        count: u32,
    }
    impl Event for Counter {}

    fn bump(event: &mut Counter) {
        event.count += 1;
    }

    #[test]
    fn test_closure_handlers() {
        let mut event = Counter { count: 0 };
        Handler::handle(&bump, &mut event).unwrap();

        let failing = |_: &mut Counter| -> Result<(), std::io::Error> {
            Err(std::io::Error::other("nope"))
        };
        let err = Handler::handle(&failing, &mut event).unwrap_err();
        assert_eq!(err.to_string(), "nope");
        assert_eq!(event.count, 1);
    }

    #[test]
    fn test_kind_labels() {
        assert!(HandlerKind::PlainAsync.is_async());
        assert!(!HandlerKind::ScopedSync.is_async());
        assert!(HandlerKind::ScopedAsync.is_scoped());
        assert_eq!(HandlerKind::ScopedSync.to_string(), "scoped-sync");
    }
}
