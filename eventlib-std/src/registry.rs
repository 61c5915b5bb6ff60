//! Subscription registry.
//!
//! The registry maps each event type to the subscriptions registered directly
//! against it, in registration order. It knows nothing about supertypes; the
//! resolver walks the type graph and asks the registry one type at a time.

use crate::erased::Erased;
use eventlib_core::HandlerKind;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identity of a handler, used to run it at most once per dispatch.
///
/// Two subscriptions share an identity when they were registered with the
/// same `Arc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(usize);

impl HandlerId {
    /// The identity of the handler held by `handler`.
    pub fn of<H>(handler: &Arc<H>) -> Self {
        Self(Arc::as_ptr(handler) as *const () as usize)
    }
}

/// A handler bound to an exact event type.
#[derive(Clone)]
pub struct Subscription {
    pub(crate) id: HandlerId,
    pub(crate) name: &'static str,
    pub(crate) event_type: TypeId,
    pub(crate) event_name: &'static str,
    pub(crate) priority: i32,
    pub(crate) critical: bool,
    pub(crate) handler: Erased,
}

impl Subscription {
    /// The handler identity.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// The handler's type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The handler's shape.
    pub fn kind(&self) -> HandlerKind {
        self.handler.kind()
    }

    /// The exact event type this subscription was registered against.
    pub fn event_type(&self) -> TypeId {
        self.event_type
    }

    /// The name of [`Self::event_type`].
    pub fn event_name(&self) -> &'static str {
        self.event_name
    }

    /// Ordering key; lower runs earlier (and wraps later steps, for scopes).
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether a failure of this handler aborts the dispatch.
    pub fn critical(&self) -> bool {
        self.critical
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("handler", &self.name)
            .field("kind", &self.kind())
            .field("event", &self.event_name)
            .field("priority", &self.priority)
            .field("critical", &self.critical)
            .finish()
    }
}

/// Table of subscriptions keyed by exact event type.
///
/// Cloning copies the table; the subscriptions themselves are shared.
#[derive(Clone, Default)]
pub struct Registry {
    entries: HashMap<TypeId, Vec<Arc<Subscription>>>,
    len: usize,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a subscription under its event type.
    pub fn register(&mut self, subscription: Subscription) {
        self.entries
            .entry(subscription.event_type)
            .or_default()
            .push(Arc::new(subscription));
        self.len += 1;
    }

    /// Subscriptions registered directly against `event_type`, in
    /// registration order.
    pub fn entries_for(&self, event_type: TypeId) -> &[Arc<Subscription>] {
        self.entries
            .get(&event_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of subscriptions.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the registry holds no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.entries.len())
            .field("subscriptions", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventlib_core::Event;

    struct Ping;
    impl Event for Ping {}

    struct Pong;
    impl Event for Pong {}

    fn subscription<E: Event>(handler: &Arc<fn(&mut E)>, priority: i32) -> Subscription {
        Subscription {
            id: HandlerId::of(handler),
            name: "test",
            event_type: TypeId::of::<E>(),
            event_name: std::any::type_name::<E>(),
            priority,
            critical: false,
            handler: Erased::plain::<E, fn(&mut E)>(Arc::clone(handler)),
        }
    }

    #[test]
    fn test_entries_are_exact_and_ordered() {
        let first: Arc<fn(&mut Ping)> = Arc::new(|_| {});
        let second: Arc<fn(&mut Ping)> = Arc::new(|_| {});
        let other: Arc<fn(&mut Pong)> = Arc::new(|_| {});

        let mut registry = Registry::new();
        registry.register(subscription(&first, 5));
        registry.register(subscription(&other, 0));
        registry.register(subscription(&second, -5));

        let pings = registry.entries_for(TypeId::of::<Ping>());
        assert_eq!(pings.len(), 2);
        assert_eq!(pings[0].id(), HandlerId::of(&first));
        assert_eq!(pings[1].id(), HandlerId::of(&second));
        assert_eq!(registry.len(), 3);
        assert!(registry.entries_for(TypeId::of::<u8>()).is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let handler: Arc<fn(&mut Ping)> = Arc::new(|_| {});
        let mut parent = Registry::new();
        parent.register(subscription(&handler, 0));

        let mut child = parent.clone();
        child.register(subscription(&handler, 1));

        assert_eq!(parent.entries_for(TypeId::of::<Ping>()).len(), 1);
        assert_eq!(child.entries_for(TypeId::of::<Ping>()).len(), 2);
        assert!(Arc::ptr_eq(
            &parent.entries_for(TypeId::of::<Ping>())[0],
            &child.entries_for(TypeId::of::<Ping>())[0],
        ));
    }
}
