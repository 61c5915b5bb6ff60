//! # Scoped Handlers
//!
//! A scope wraps every step that runs after it in a dispatch: it is entered
//! in priority order like any other handler, yields a guard, and is released
//! once everything nested inside it has finished. Release happens on every
//! exit path, in reverse order of entry.
//!
//! While being released a scope sees the failures in flight (if any) and
//! decides whether they keep propagating ([`ExitAction::Propagate`]) or are
//! absorbed ([`ExitAction::Absorb`]).

use crate::{
    error::{BoxError, ErrorGroup},
    event::Event,
};
use std::future::Future;
use std::marker::PhantomData;

/// What a released scope does with the failures in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitAction {
    /// Let the failures continue outward.
    #[default]
    Propagate,
    /// Absorb the failures; outer scopes and the caller no longer see them.
    Absorb,
}

/// A synchronous scoped handler.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Scope` for `{E}`",
    label = "missing `Scope<{E}>` implementation",
    note = "Scopes implement `enter` and `exit`; see also `scope_fn`."
)]
pub trait Scope<E: Event>: Send + Sync + 'static {
    /// The value held while the scope is open.
    type Guard: Send + 'static;

    /// Open the scope.
    fn enter(&self, event: &mut E) -> Result<Self::Guard, BoxError>;

    /// Release the scope.
    ///
    /// `in_flight` holds the failures propagating through this scope, if any.
    fn exit(
        &self,
        guard: Self::Guard,
        event: &mut E,
        in_flight: Option<&ErrorGroup>,
    ) -> Result<ExitAction, BoxError>;
}

/// An asynchronous scoped handler.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `AsyncScope` for `{E}`",
    label = "missing `AsyncScope<{E}>` implementation",
    note = "Async scopes implement `async fn enter` and `async fn exit`."
)]
pub trait AsyncScope<E: Event>: Send + Sync + 'static {
    /// The value held while the scope is open.
    type Guard: Send + 'static;

    /// Open the scope.
    fn enter(&self, event: &mut E) -> impl Future<Output = Result<Self::Guard, BoxError>> + Send;

    /// Release the scope.
    fn exit(
        &self,
        guard: Self::Guard,
        event: &mut E,
        in_flight: Option<&ErrorGroup>,
    ) -> impl Future<Output = Result<ExitAction, BoxError>> + Send;
}

/// A [`Scope`] built from two closures. See [`scope_fn`].
pub struct FnScope<E, Enter, Exit> {
    enter: Enter,
    exit: Exit,
    _event: PhantomData<fn(&mut E)>,
}

/// Build a synchronous scope from an `enter` and an `exit` closure.
///
/// ```rust,ignore
/// let timing = scope_fn(
///     |_: &mut MyEvent| Ok(Instant::now()),
///     |started, _, _| {
///         println!("took {:?}", started.elapsed());
///         Ok(ExitAction::Propagate)
///     },
/// );
/// ```
pub fn scope_fn<E, G, Enter, Exit>(enter: Enter, exit: Exit) -> FnScope<E, Enter, Exit>
where
    E: Event,
    G: Send + 'static,
    Enter: Fn(&mut E) -> Result<G, BoxError> + Send + Sync + 'static,
    Exit: Fn(G, &mut E, Option<&ErrorGroup>) -> Result<ExitAction, BoxError> + Send + Sync + 'static,
{
    FnScope {
        enter,
        exit,
        _event: PhantomData,
    }
}

impl<E, G, Enter, Exit> Scope<E> for FnScope<E, Enter, Exit>
where
    E: Event,
    G: Send + 'static,
    Enter: Fn(&mut E) -> Result<G, BoxError> + Send + Sync + 'static,
    Exit: Fn(G, &mut E, Option<&ErrorGroup>) -> Result<ExitAction, BoxError> + Send + Sync + 'static,
{
    type Guard = G;

    fn enter(&self, event: &mut E) -> Result<G, BoxError> {
        (self.enter)(event)
    }

    fn exit(
        &self,
        guard: G,
        event: &mut E,
        in_flight: Option<&ErrorGroup>,
    ) -> Result<ExitAction, BoxError> {
        (self.exit)(guard, event, in_flight)
    }
}
