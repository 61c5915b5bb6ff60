//! # eventlib-core
//!
//! Core traits for the eventlib dispatch engine.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! libraries that define events or handlers without depending on the engine
//! in `eventlib-std`.
//!
//! # Vocabulary
//!
//! - [`Event`] - A dispatchable value whose type declares its supertypes
//! - [`Extends`] / [`Supertype`] - Projection of a subtype onto a supertype
//! - [`Handler`] / [`AsyncHandler`] - Plain handlers, invoked once per dispatch
//! - [`Scope`] / [`AsyncScope`] - Scoped handlers, entered before and
//!   released after the steps nested inside them
//!
//! # Error Types
//!
//! - [`DispatchError`] - What `emit` callers observe
//! - [`RegistrationError`] - Invalid event type hierarchies
//! - [`ErrorGroup`] / [`Failure`] - Aggregated failures of one dispatch

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod error;
mod event;
mod handler;
mod scope;

// Re-exports
pub use error::{
    BoxError, DispatchError, ErrorGroup, Failure, ProjectionError, RegistrationError, Stage,
};
pub use event::{AnyEvent, Caster, Event, Extends, Supertype, TypeSpec};
pub use handler::{AsyncHandler, Handler, HandlerKind, IntoOutcome};
pub use scope::{AsyncScope, ExitAction, FnScope, Scope, scope_fn};
