//! Handler resolution.
//!
//! Resolution walks an event type's linearization from the most general
//! ancestor toward the concrete type, collecting the subscriptions registered
//! against each type. A handler reachable through several ancestors (a
//! diamond, or the same `Arc` registered twice) keeps only its first
//! occurrence.

use crate::graph::{Ancestor, EventType};
use crate::registry::{HandlerId, Registry, Subscription};
use std::collections::HashSet;
use std::sync::Arc;

/// A subscription together with the projection from the emitted type onto
/// the type it was registered for.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub(crate) subscription: Arc<Subscription>,
    pub(crate) ancestor: Ancestor,
}

impl Resolved {
    /// The resolved subscription.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// The ancestor the subscription was registered against.
    pub fn ancestor(&self) -> &Ancestor {
        &self.ancestor
    }
}

/// The deduplicated subscriptions applicable to one event type, in
/// resolution order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    entries: Vec<Resolved>,
}

impl ResolvedSet {
    /// Number of resolved subscriptions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no subscription applies.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in resolution order.
    pub fn iter(&self) -> std::slice::Iter<'_, Resolved> {
        self.entries.iter()
    }

    pub(crate) fn into_vec(self) -> Vec<Resolved> {
        self.entries
    }
}

/// Collect the subscriptions of `registry` that apply to `event_type`.
pub fn resolve(event_type: &EventType, registry: &Registry) -> ResolvedSet {
    let mut seen = HashSet::<HandlerId>::new();
    let mut entries = Vec::new();

    for ancestor in event_type.linearization().iter().rev() {
        for subscription in registry.entries_for(ancestor.id()) {
            if seen.insert(subscription.id()) {
                entries.push(Resolved {
                    subscription: Arc::clone(subscription),
                    ancestor: ancestor.clone(),
                });
            }
        }
    }

    ResolvedSet { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erased::Erased;
    use crate::graph::TypeGraph;
    use eventlib_core::{Event, Extends, Supertype};
    use std::any::{TypeId, type_name};

    struct Base;
    impl Event for Base {}

    struct Left(Base);
    impl Event for Left {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::of::<Self, Base>()]
        }
    }
    impl Extends<Base> for Left {
        fn upcast_mut(&mut self) -> &mut Base {
            &mut self.0
        }
    }

    struct Right(Base);
    impl Event for Right {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::of::<Self, Base>()]
        }
    }
    impl Extends<Base> for Right {
        fn upcast_mut(&mut self) -> &mut Base {
            &mut self.0
        }
    }

    struct Merged(Left, Right);
    impl Event for Merged {
        fn supertypes() -> Vec<Supertype> {
            vec![
                Supertype::of::<Self, Left>(),
                Supertype::of::<Self, Right>(),
            ]
        }
    }
    impl Extends<Left> for Merged {
        fn upcast_mut(&mut self) -> &mut Left {
            &mut self.0
        }
    }
    impl Extends<Right> for Merged {
        fn upcast_mut(&mut self) -> &mut Right {
            &mut self.1
        }
    }

    fn register<E: Event>(registry: &mut Registry, name: &'static str, handler: &Arc<fn(&mut E)>) {
        registry.register(Subscription {
            id: HandlerId::of(handler),
            name,
            event_type: TypeId::of::<E>(),
            event_name: type_name::<E>(),
            priority: 0,
            critical: false,
            handler: Erased::plain::<E, fn(&mut E)>(Arc::clone(handler)),
        });
    }

    fn names(set: &ResolvedSet) -> Vec<&'static str> {
        set.iter().map(|resolved| resolved.subscription().name()).collect()
    }

    #[test]
    fn test_resolution_walks_most_general_first() {
        let mut registry = Registry::new();
        register::<Merged>(&mut registry, "merged", &Arc::new(|_| {}));
        register::<Left>(&mut registry, "left", &Arc::new(|_| {}));
        register::<Base>(&mut registry, "base", &Arc::new(|_| {}));
        register::<Right>(&mut registry, "right", &Arc::new(|_| {}));

        let graph = TypeGraph::new();
        let merged = graph.event_type::<Merged>().unwrap();
        let set = resolve(&merged, &registry);
        assert_eq!(names(&set), ["base", "right", "left", "merged"]);

        let left = graph.event_type::<Left>().unwrap();
        assert_eq!(names(&resolve(&left, &registry)), ["base", "left"]);
    }

    #[test]
    fn test_shared_handler_resolves_once() {
        let shared: Arc<fn(&mut Base)> = Arc::new(|_| {});
        let mut registry = Registry::new();
        register::<Base>(&mut registry, "first", &shared);
        register::<Base>(&mut registry, "again", &shared);

        let graph = TypeGraph::new();
        let set = resolve(&graph.event_type::<Merged>().unwrap(), &registry);
        assert_eq!(names(&set), ["first"]);
        assert_eq!(set.iter().next().unwrap().ancestor().id(), TypeId::of::<Base>());
    }
}
