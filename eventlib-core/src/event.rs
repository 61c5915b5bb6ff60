//! # Event Types
//!
//! An event type is any `Send + Sync + 'static` value that implements
//! [`Event`]. Event types form a directed acyclic graph: every type declares
//! its direct supertypes, in order, through [`Event::supertypes`].
//!
//! Rust has no inheritance, so a subtype *projects* onto each of its direct
//! supertypes through [`Extends`]. The usual shape is composition: the
//! subtype embeds its parent and hands out a mutable reference to it.
//!
//! ```rust,ignore
//! struct Base;
//! impl Event for Base {}
//!
//! struct Left { base: Base }
//! impl Event for Left {
//!     fn supertypes() -> Vec<Supertype> {
//!         vec![Supertype::of::<Self, Base>()]
//!     }
//! }
//! impl Extends<Base> for Left {
//!     fn upcast_mut(&mut self) -> &mut Base {
//!         &mut self.base
//!     }
//! }
//! ```
//!
//! # Diamonds
//!
//! In a diamond every path to the shared ancestor owns its own copy of it:
//! `Merged { left: Left, right: Right }` holds two `Base` values. Handlers
//! registered for `Base` see the copy on the left-most path; handlers for
//! `Right` see `right.base`. A field written by one is not seen by the other.
//!
//! Keep state that every handler must observe (a cancellation flag, say) on
//! the concrete type or on an ancestor that is only reached once, or leave
//! the diamond's root without fields. A stateful ancestor reached more than
//! once is logged when the type is first linearized, and systems built with
//! `reject_split_ancestors` refuse to dispatch such a type.

use std::any::{Any, TypeId, type_name};
use std::fmt;

/// A type-erased event, as seen by the dispatch engine.
pub type AnyEvent = dyn Any + Send;

/// Projects a type-erased event onto one of its direct supertypes.
///
/// Returns `None` when the input is not the subtype the caster was built for.
pub type Caster = fn(&mut AnyEvent) -> Option<&mut AnyEvent>;

/// An event that can be dispatched through an event system.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `Event`",
    label = "missing `Event` implementation",
    note = "Implement `Event` (or `#[derive(Event)]`) to subscribe to or emit `{Self}`."
)]
pub trait Event: Any + Send + Sync {
    /// The direct supertypes of this event type, in declaration order.
    ///
    /// The order matters: it decides the linearization of the type and with
    /// it the relative order of equal-priority handlers.
    fn supertypes() -> Vec<Supertype>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// Declares that `Self` is a direct subtype of `S`.
pub trait Extends<S: Event>: Event {
    /// Views this event as its supertype `S`.
    fn upcast_mut(&mut self) -> &mut S;
}

/// Identity of an event type together with the way to discover its parents.
#[derive(Clone, Copy)]
pub struct TypeSpec {
    id: TypeId,
    name: &'static str,
    stateless: bool,
    supertypes: fn() -> Vec<Supertype>,
}

impl TypeSpec {
    /// Describe the event type `E`.
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: type_name::<E>(),
            stateless: std::mem::size_of::<E>() == 0,
            supertypes: E::supertypes,
        }
    }

    /// The type identity.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the type is zero-sized, so copies of it cannot diverge.
    pub fn is_stateless(&self) -> bool {
        self.stateless
    }

    /// The direct supertypes of the described type.
    pub fn supertypes(&self) -> Vec<Supertype> {
        (self.supertypes)()
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeSpec").field(&self.name).finish()
    }
}

/// One edge of the type graph: a direct supertype and the projection onto it.
#[derive(Clone, Copy)]
pub struct Supertype {
    spec: TypeSpec,
    cast: Caster,
}

impl Supertype {
    /// The edge from `E` to its direct supertype `S`.
    pub fn of<E, S>() -> Self
    where
        E: Extends<S>,
        S: Event,
    {
        Self {
            spec: TypeSpec::of::<S>(),
            cast: cast_to::<E, S>,
        }
    }

    /// The supertype this edge points at.
    pub fn spec(&self) -> TypeSpec {
        self.spec
    }

    /// The projection from the subtype onto [`Self::spec`].
    pub fn caster(&self) -> Caster {
        self.cast
    }
}

impl fmt::Debug for Supertype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Supertype").field(&self.spec.name).finish()
    }
}

fn cast_to<E, S>(event: &mut AnyEvent) -> Option<&mut AnyEvent>
where
    E: Extends<S>,
    S: Event,
{
    event
        .downcast_mut::<E>()
        .map(|event| event.upcast_mut() as &mut AnyEvent)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Base {
        hits: u32,
    }
    impl Event for Base {}

    struct Child {
        base: Base,
    }
    impl Event for Child {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::of::<Self, Base>()]
        }
    }
    impl Extends<Base> for Child {
        fn upcast_mut(&mut self) -> &mut Base {
            &mut self.base
        }
    }

    #[test]
    fn test_supertype_cast_projects_onto_parent() {
        let mut child = Child {
            base: Base { hits: 0 },
        };
        let edge = Supertype::of::<Child, Base>();
        let erased: &mut AnyEvent = &mut child;
        let base = (edge.caster())(erased)
            .and_then(|any| any.downcast_mut::<Base>())
            .expect("projection");
        base.hits += 1;
        assert_eq!(child.base.hits, 1);
    }

    #[test]
    fn test_supertype_cast_rejects_other_types() {
        let mut base = Base { hits: 0 };
        let edge = Supertype::of::<Child, Base>();
        assert!((edge.caster())(&mut base).is_none());
    }

    #[test]
    fn test_type_spec_lists_declared_parents() {
        let spec = TypeSpec::of::<Child>();
        let parents = spec.supertypes();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].spec().id(), TypeId::of::<Base>());
        assert!(TypeSpec::of::<Base>().supertypes().is_empty());
    }
}
