//! # eventlib-std
//!
//! The dispatch engine for eventlib.
//!
//! This crate provides:
//! - **Type graph**: [`TypeGraph`], cached C3 linearizations of event types
//! - **Registry**: [`Registry`], subscriptions keyed by exact event type
//! - **Resolution and planning**: [`resolve`], [`DispatchPlan`]
//! - **Event systems**: [`EventSystem`], with synchronous and asynchronous
//!   dispatch and snapshot-copy construction
//! - **Default system**: [`default_system`], [`subscribe`], [`emit`],
//!   [`emit_async`], [`EventExt`]
//! - **Testing utilities**: [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use eventlib_core;

mod engine;
mod erased;
mod global;
mod graph;
mod plan;
mod registry;
mod resolve;
mod system;
pub mod testing;

pub use engine::SuppressedObserver;
#[cfg(feature = "inventory")]
pub use global::Registration;
pub use global::{EventExt, default_system, emit, emit_async, subscribe};
pub use graph::{Ancestor, EventType, TypeGraph};
pub use plan::DispatchPlan;
pub use registry::{HandlerId, Registry, Subscription};
pub use resolve::{Resolved, ResolvedSet, resolve};
pub use system::{EventSystem, EventSystemBuilder, Subscriber};
pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "inventory")]
pub use inventory;
