//! The process-wide default event system.
//!
//! Free functions and the [`EventExt`] extension trait target a lazily built
//! default [`EventSystem`]. With the `inventory` feature, registrations
//! submitted by `#[subscribe]` are applied to it when it is first used, in
//! source order.

use crate::system::{EventSystem, Subscriber};
use eventlib_core::{DispatchError, Event};
use std::future::Future;
use std::sync::LazyLock;

static DEFAULT: LazyLock<EventSystem> = LazyLock::new(|| {
    let system = EventSystem::new();
    #[cfg(feature = "inventory")]
    registration::apply_all(&system);
    system
});

/// The default event system.
pub fn default_system() -> &'static EventSystem {
    &DEFAULT
}

/// Subscribe to `E` on the default system.
pub fn subscribe<E: Event>() -> Subscriber<'static, E> {
    default_system().subscribe()
}

/// Emit `event` on the default system.
pub fn emit<E: Event>(event: &mut E) -> Result<(), DispatchError> {
    default_system().emit(event)
}

/// Emit `event` asynchronously on the default system.
pub async fn emit_async<E: Event>(event: &mut E) -> Result<(), DispatchError> {
    default_system().emit_async(event).await
}

/// Default-system shortcuts available on every event type.
///
/// ```rust,ignore
/// Chat::subscribe().priority(100).handler(print_chat)?;
/// Chat::new("Alice", "Hello World").emit()?;
/// ```
pub trait EventExt: Event + Sized {
    /// Subscribe to exactly this type on the default system.
    fn subscribe() -> Subscriber<'static, Self> {
        default_system().subscribe()
    }

    /// Emit this event on the default system.
    fn emit(&mut self) -> Result<(), DispatchError> {
        default_system().emit(self)
    }

    /// Emit this event asynchronously on the default system.
    fn emit_async(&mut self) -> impl Future<Output = Result<(), DispatchError>> + Send {
        default_system().emit_async(self)
    }
}

impl<E: Event> EventExt for E {}

#[cfg(feature = "inventory")]
pub use registration::Registration;

#[cfg(feature = "inventory")]
mod registration {
    use crate::system::EventSystem;
    use eventlib_core::RegistrationError;

    /// A subscription submitted to the default system at compile time.
    ///
    /// Usually produced by `#[subscribe]`:
    ///
    /// ```rust,ignore
    /// inventory::submit! {
    ///     Registration::new("on_chat", file!(), line!(), |system| {
    ///         system.subscribe::<Chat>().name("on_chat").handler(on_chat).map(drop)
    ///     })
    /// }
    /// ```
    pub struct Registration {
        name: &'static str,
        file: &'static str,
        line: u32,
        apply: fn(&EventSystem) -> Result<(), RegistrationError>,
    }

    impl Registration {
        /// Describe a registration defined at `file:line`.
        pub const fn new(
            name: &'static str,
            file: &'static str,
            line: u32,
            apply: fn(&EventSystem) -> Result<(), RegistrationError>,
        ) -> Self {
            Self {
                name,
                file,
                line,
                apply,
            }
        }

        /// The registered handler's name.
        pub fn name(&self) -> &'static str {
            self.name
        }
    }

    inventory::collect!(Registration);

    pub(super) fn apply_all(system: &EventSystem) {
        let mut registrations: Vec<&Registration> =
            inventory::iter::<Registration>.into_iter().collect();
        registrations.sort_by_key(|registration| (registration.file, registration.line));

        for registration in registrations {
            if let Err(err) = (registration.apply)(system) {
                tracing::error!(
                    handler = registration.name,
                    file = registration.file,
                    line = registration.line,
                    error = %err,
                    "collected subscription rejected"
                );
            }
        }
    }
}
