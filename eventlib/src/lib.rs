//! # eventlib - In-Process Event Dispatch
//!
//! `eventlib` dispatches events to handlers registered against the event's
//! type or any of its supertypes. Event types form a DAG with multiple
//! supertypes allowed; a handler runs at most once per dispatch no matter how
//! many paths lead to it.
//!
//! Handlers come in four shapes:
//!
//! | Kind | Trait | `emit` | `emit_async` |
//! |------|-------|--------|--------------|
//! | plain | [`Handler`] | yes | yes |
//! | plain async | [`AsyncHandler`] | no | yes |
//! | scoped | [`Scope`] | yes | yes |
//! | scoped async | [`AsyncScope`] | no | yes |
//!
//! All of them are ordered by a single priority. A scope is entered at its
//! position in that order and released after everything behind it has run,
//! on every exit path.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eventlib::prelude::*;
//!
//! #[derive(Event)]
//! struct Chat {
//!     name: String,
//!     message: String,
//!     cancelled: bool,
//! }
//!
//! let system = EventSystem::new();
//! system.subscribe::<Chat>().handler(|chat: &mut Chat| {
//!     chat.cancelled = chat.message.starts_with("cancel");
//! })?;
//! system.subscribe::<Chat>().priority(100).handler(|chat: &mut Chat| {
//!     if !chat.cancelled {
//!         println!("{}: {}", chat.name, chat.message);
//!     }
//! })?;
//!
//! system.emit(&mut Chat { name: "Alice".into(), message: "Hello".into(), cancelled: false })?;
//! ```
//!
//! ## Failures
//!
//! A failing handler is logged and skipped, unless it was subscribed with
//! `.critical()`: then the rest of the plan is skipped, every open scope is
//! released in reverse order, and `emit` returns [`DispatchError::Aborted`]
//! unless a scope absorbed the failure.
//!
//! ## Features
//!
//! - `macros`: `#[derive(Event)]` and `#[subscribe]`
//! - `inventory`: `#[subscribe]` registrations are collected into the
//!   default event system

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use eventlib_core::{
    // Events
    AnyEvent,
    // Handlers
    AsyncHandler,
    AsyncScope,
    // Errors
    BoxError,
    Caster,
    DispatchError,
    ErrorGroup,
    Event,
    ExitAction,
    Extends,
    Failure,
    FnScope,
    Handler,
    HandlerKind,
    IntoOutcome,
    ProjectionError,
    RegistrationError,
    Scope,
    Stage,
    Supertype,
    TypeSpec,
    scope_fn,
};

pub use eventlib_std::{
    // Type graph
    Ancestor,
    // Cancellation
    CancellationToken,
    // Plans
    DispatchPlan,
    EventExt,
    // Systems
    EventSystem,
    EventSystemBuilder,
    EventType,
    HandlerId,
    Registry,
    Resolved,
    ResolvedSet,
    Subscriber,
    Subscription,
    SuppressedObserver,
    TypeGraph,
    // Default system
    default_system,
    emit,
    emit_async,
    resolve,
    subscribe,
};

#[cfg(feature = "inventory")]
pub use eventlib_std::Registration;

/// Testing utilities.
pub mod testing {
    pub use eventlib_std::testing::{Failing, Journal, Recorder, ScopeProbe, TestFailure};
}

/// Prelude module - common imports for eventlib.
///
/// # Usage
///
/// ```rust,ignore
/// use eventlib::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Handlers
        AsyncHandler,
        AsyncScope,
        // Errors
        BoxError,
        DispatchError,
        ErrorGroup,
        // Events
        Event,
        EventExt,
        // Systems
        EventSystem,
        ExitAction,
        Extends,
        Failure,
        Handler,
        Scope,
        Supertype,
        scope_fn,
        subscribe,
    };
}

#[cfg(feature = "macros")]
pub use eventlib_macros::{Event, subscribe};

#[cfg(feature = "inventory")]
pub use inventory;
