//! # eventlib-macros
//!
//! Procedural macros for eventlib.
//!
//! This crate provides:
//! - `#[derive(Event)]` - Implements `Event` and `Extends` from parent fields
//! - `#[subscribe]` - Registers a function or handler type on the default
//!   event system
//!
//! Generated code refers to the `eventlib` facade crate.

use proc_macro::TokenStream;

mod event;
mod subscribe;

/// Derive macro for implementing the `Event` trait.
///
/// Fields marked `#[event(parent)]` become the direct supertypes of the
/// type, in field order, and the type `Extends` each of them.
///
/// ```rust,ignore
/// #[derive(Event, Default)]
/// struct Merged {
///     #[event(parent)]
///     left: Left,
///     #[event(parent)]
///     right: Right,
/// }
/// ```
///
/// Parent fields are owned, so `Merged` above holds one copy of every common
/// ancestor of `Left` and `Right` per path. Handlers of such an ancestor see
/// the copy inside `left`; handlers of `Right` see the one inside `right`.
/// Keep fields that every handler must share out of a diamond's root, or
/// build the system with `reject_split_ancestors` to refuse such types.
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    event::derive_event_impl(input)
}

/// Subscribe a function or a handler type on the default event system.
///
/// A function is left as written; the registered handler is a generated
/// unit type named after it, `on_chat` -> `OnChatHandler`.
///
/// See the crate documentation of `eventlib` for the accepted forms.
#[proc_macro_attribute]
pub fn subscribe(attr: TokenStream, item: TokenStream) -> TokenStream {
    subscribe::subscribe_impl(attr, item)
}
