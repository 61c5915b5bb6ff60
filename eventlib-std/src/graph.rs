//! Type graph and ancestor linearization.
//!
//! Every event type is linearized once, the first time it is subscribed to or
//! emitted, using C3 (the method resolution order of Python classes): a type
//! precedes its supertypes, and the declared left-to-right order among direct
//! supertypes is kept. The result is cached for the lifetime of the graph.
//!
//! Each entry of a linearization carries the cast path from the concrete type
//! to that ancestor. In a diamond the path through the left-most declared
//! supertype wins. Each path owns its own copy of the ancestor, so an entry
//! also counts its copies; a stateful ancestor with more than one copy is a
//! *split* ancestor and is logged once, when the type is linearized.

use eventlib_core::{AnyEvent, Caster, RegistrationError, Supertype, TypeSpec};
use std::any::TypeId;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

static GLOBAL: LazyLock<TypeGraph> = LazyLock::new(TypeGraph::new);

/// One ancestor of an event type, with the projection onto it.
#[derive(Clone)]
pub struct Ancestor {
    id: TypeId,
    name: &'static str,
    path: Arc<[Caster]>,
    copies: usize,
    stateless: bool,
}

impl Ancestor {
    /// The ancestor's type identity.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The ancestor's type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// How many copies of this ancestor the linearized type holds, one per
    /// distinct path through its declared supertypes.
    pub fn copies(&self) -> usize {
        self.copies
    }

    /// Whether handlers may see diverging copies of this ancestor.
    pub fn is_split(&self) -> bool {
        self.copies > 1 && !self.stateless
    }

    /// View an event of the linearized type as this ancestor.
    pub fn project<'a>(&self, event: &'a mut AnyEvent) -> Option<&'a mut AnyEvent> {
        self.path.iter().try_fold(event, |event, cast| cast(event))
    }
}

impl std::fmt::Debug for Ancestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ancestor")
            .field("name", &self.name)
            .field("depth", &self.path.len())
            .field("copies", &self.copies)
            .finish()
    }
}

/// A linearized event type.
#[derive(Debug)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
    linearization: Vec<Ancestor>,
}

impl EventType {
    /// The type identity.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type followed by all of its ancestors, most specific first.
    pub fn linearization(&self) -> &[Ancestor] {
        &self.linearization
    }

    /// The ancestor entry for `id`, if `id` is this type or one of its ancestors.
    pub fn ancestor(&self, id: TypeId) -> Option<&Ancestor> {
        self.linearization.iter().find(|ancestor| ancestor.id == id)
    }

    /// Whether `id` is this type or one of its ancestors.
    pub fn is_subtype_of(&self, id: TypeId) -> bool {
        self.ancestor(id).is_some()
    }

    /// Stateful ancestors the type holds more than one copy of.
    pub fn split_ancestors(&self) -> impl Iterator<Item = &Ancestor> {
        self.linearization.iter().filter(|ancestor| ancestor.is_split())
    }

    /// Fail if any ancestor is split.
    pub fn ensure_unsplit(&self) -> Result<(), RegistrationError> {
        match self.split_ancestors().next() {
            Some(ancestor) => Err(RegistrationError::SplitAncestor {
                event: self.name,
                ancestor: ancestor.name,
                copies: ancestor.copies,
            }),
            None => Ok(()),
        }
    }
}

/// Cache of linearized event types.
#[derive(Default)]
pub struct TypeGraph {
    nodes: RwLock<HashMap<TypeId, Arc<EventType>>>,
}

impl TypeGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide graph used by every event system.
    pub fn global() -> &'static TypeGraph {
        &GLOBAL
    }

    /// Linearize `E`, or return the cached linearization.
    pub fn event_type<E: eventlib_core::Event>(&self) -> Result<Arc<EventType>, RegistrationError> {
        self.resolve(TypeSpec::of::<E>())
    }

    /// Linearize the described type, or return the cached linearization.
    pub fn resolve(&self, spec: TypeSpec) -> Result<Arc<EventType>, RegistrationError> {
        if let Some(found) = self
            .nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&spec.id())
        {
            return Ok(Arc::clone(found));
        }

        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        build(&mut nodes, spec, &mut Vec::new())
    }

    /// Number of linearized types.
    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no type has been linearized yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn build(
    nodes: &mut HashMap<TypeId, Arc<EventType>>,
    spec: TypeSpec,
    visiting: &mut Vec<TypeId>,
) -> Result<Arc<EventType>, RegistrationError> {
    if let Some(found) = nodes.get(&spec.id()) {
        return Ok(Arc::clone(found));
    }
    if visiting.contains(&spec.id()) {
        return Err(RegistrationError::Cycle(spec.name()));
    }

    visiting.push(spec.id());
    let supertypes = spec.supertypes();
    let parents = supertypes
        .iter()
        .map(|edge| build(nodes, edge.spec(), visiting))
        .collect::<Result<Vec<_>, _>>()?;
    visiting.pop();

    let node = Arc::new(EventType {
        id: spec.id(),
        name: spec.name(),
        linearization: linearize(spec, &supertypes, &parents)?,
    });
    for ancestor in node.split_ancestors() {
        tracing::warn!(
            event = node.name,
            ancestor = ancestor.name,
            copies = ancestor.copies,
            "ancestor is held more than once; its handlers see the left-most copy"
        );
    }
    nodes.insert(spec.id(), Arc::clone(&node));
    Ok(node)
}

/// C3 merge of the parents' linearizations and the direct supertype list.
fn linearize(
    spec: TypeSpec,
    supertypes: &[Supertype],
    parents: &[Arc<EventType>],
) -> Result<Vec<Ancestor>, RegistrationError> {
    let mut result = vec![Ancestor {
        id: spec.id(),
        name: spec.name(),
        path: Arc::from([]),
        copies: 1,
        stateless: spec.is_stateless(),
    }];

    let mut sequences: Vec<VecDeque<TypeId>> = parents
        .iter()
        .map(|parent| parent.linearization.iter().map(Ancestor::id).collect())
        .collect();
    sequences.push(supertypes.iter().map(|edge| edge.spec().id()).collect());

    loop {
        sequences.retain(|sequence| !sequence.is_empty());
        if sequences.is_empty() {
            return Ok(result);
        }

        let head = sequences
            .iter()
            .map(|sequence| sequence[0])
            .find(|candidate| {
                sequences
                    .iter()
                    .all(|sequence| !sequence.iter().skip(1).any(|id| id == candidate))
            })
            .ok_or(RegistrationError::InconsistentHierarchy(spec.name()))?;

        let ancestor = via_leftmost(head, supertypes, parents)
            .ok_or(RegistrationError::InconsistentHierarchy(spec.name()))?;
        result.push(ancestor);
        for sequence in &mut sequences {
            if sequence.front() == Some(&head) {
                sequence.pop_front();
            }
        }
    }
}

fn via_leftmost(
    id: TypeId,
    supertypes: &[Supertype],
    parents: &[Arc<EventType>],
) -> Option<Ancestor> {
    let copies = parents
        .iter()
        .filter_map(|parent| parent.ancestor(id))
        .map(Ancestor::copies)
        .sum();
    supertypes
        .iter()
        .zip(parents)
        .find_map(|(edge, parent)| {
            parent.ancestor(id).map(|ancestor| {
                let path: Vec<Caster> = std::iter::once(edge.caster())
                    .chain(ancestor.path.iter().copied())
                    .collect();
                Ancestor {
                    id,
                    name: ancestor.name,
                    path: Arc::from(path),
                    copies,
                    stateless: ancestor.stateless,
                }
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventlib_core::{Event, Extends};

    struct Base {
        seen: Vec<&'static str>,
    }
    impl Event for Base {}

    struct Left {
        base: Base,
    }
    impl Event for Left {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::of::<Self, Base>()]
        }
    }
    impl Extends<Base> for Left {
        fn upcast_mut(&mut self) -> &mut Base {
            &mut self.base
        }
    }

    struct Right {
        base: Base,
    }
    impl Event for Right {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::of::<Self, Base>()]
        }
    }
    impl Extends<Base> for Right {
        fn upcast_mut(&mut self) -> &mut Base {
            &mut self.base
        }
    }

    struct Merged {
        left: Left,
        right: Right,
    }
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
            &mut self.left
        }
    }
    impl Extends<Right> for Merged {
        fn upcast_mut(&mut self) -> &mut Right {
            &mut self.right
        }
    }

    // Left before Right in one type, Right before Left in the other.
    struct Crossed {
        left: Left,
        right: Right,
    }
    impl Event for Crossed {
        fn supertypes() -> Vec<Supertype> {
            vec![
                Supertype::of::<Self, Right>(),
                Supertype::of::<Self, Left>(),
            ]
        }
    }
    impl Extends<Left> for Crossed {
        fn upcast_mut(&mut self) -> &mut Left {
            &mut self.left
        }
    }
    impl Extends<Right> for Crossed {
        fn upcast_mut(&mut self) -> &mut Right {
            &mut self.right
        }
    }

    struct Impossible {
        merged: Merged,
        crossed: Crossed,
    }
    impl Event for Impossible {
        fn supertypes() -> Vec<Supertype> {
            vec![
                Supertype::of::<Self, Merged>(),
                Supertype::of::<Self, Crossed>(),
            ]
        }
    }
    impl Extends<Merged> for Impossible {
        fn upcast_mut(&mut self) -> &mut Merged {
            &mut self.merged
        }
    }
    impl Extends<Crossed> for Impossible {
        fn upcast_mut(&mut self) -> &mut Crossed {
            &mut self.crossed
        }
    }

    struct Ouroboros;
    impl Event for Ouroboros {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::of::<Self, Ouroboros>()]
        }
    }
    impl Extends<Ouroboros> for Ouroboros {
        fn upcast_mut(&mut self) -> &mut Ouroboros {
            self
        }
    }

    // A diamond whose shared root carries no state.
    struct Tag;
    impl Event for Tag {}

    struct Red {
        tag: Tag,
        shade: u8,
    }
    impl Event for Red {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::of::<Self, Tag>()]
        }
    }
    impl Extends<Tag> for Red {
        fn upcast_mut(&mut self) -> &mut Tag {
            &mut self.tag
        }
    }

    struct Blue {
        tag: Tag,
    }
    impl Event for Blue {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::of::<Self, Tag>()]
        }
    }
    impl Extends<Tag> for Blue {
        fn upcast_mut(&mut self) -> &mut Tag {
            &mut self.tag
        }
    }

    struct Purple {
        red: Red,
        blue: Blue,
    }
    impl Event for Purple {
        fn supertypes() -> Vec<Supertype> {
            vec![
                Supertype::of::<Self, Red>(),
                Supertype::of::<Self, Blue>(),
            ]
        }
    }
    impl Extends<Red> for Purple {
        fn upcast_mut(&mut self) -> &mut Red {
            &mut self.red
        }
    }
    impl Extends<Blue> for Purple {
        fn upcast_mut(&mut self) -> &mut Blue {
            &mut self.blue
        }
    }

    fn names(event_type: &EventType) -> Vec<&'static str> {
        event_type
            .linearization()
            .iter()
            .map(|ancestor| ancestor.name().rsplit("::").next().unwrap_or_default())
            .collect()
    }

    fn merged() -> Merged {
        Merged {
            left: Left {
                base: Base { seen: vec![] },
            },
            right: Right {
                base: Base { seen: vec![] },
            },
        }
    }

    #[test]
    fn test_diamond_linearization() {
        let graph = TypeGraph::new();
        let merged = graph.event_type::<Merged>().unwrap();
        assert_eq!(names(&merged), ["Merged", "Left", "Right", "Base"]);
        assert!(merged.is_subtype_of(TypeId::of::<Base>()));
        assert!(!graph.event_type::<Left>().unwrap().is_subtype_of(TypeId::of::<Right>()));
    }

    #[test]
    fn test_linearization_is_cached() {
        let graph = TypeGraph::new();
        let first = graph.event_type::<Merged>().unwrap();
        let second = graph.event_type::<Merged>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_projection_follows_leftmost_path() {
        let graph = TypeGraph::new();
        let merged_type = graph.event_type::<Merged>().unwrap();
        let mut event = merged();

        let base = merged_type.ancestor(TypeId::of::<Base>()).unwrap();
        let view = base
            .project(&mut event)
            .and_then(|any| any.downcast_mut::<Base>())
            .unwrap();
        view.seen.push("via-left");

        assert_eq!(event.left.base.seen, ["via-left"]);
        assert!(event.right.base.seen.is_empty());
    }

    #[test]
    fn test_diamond_root_is_split() {
        let graph = TypeGraph::new();
        let merged = graph.event_type::<Merged>().unwrap();

        let split: Vec<_> = merged
            .split_ancestors()
            .map(|ancestor| (ancestor.id(), ancestor.copies()))
            .collect();
        assert_eq!(split, [(TypeId::of::<Base>(), 2)]);
        assert!(matches!(
            merged.ensure_unsplit(),
            Err(RegistrationError::SplitAncestor { copies: 2, .. })
        ));

        let left = graph.event_type::<Left>().unwrap();
        assert_eq!(left.split_ancestors().count(), 0);
        assert!(left.ensure_unsplit().is_ok());
    }

    #[test]
    fn test_stateless_diamond_root_is_not_split() {
        let graph = TypeGraph::new();
        let purple = graph.event_type::<Purple>().unwrap();
        let tag = purple.ancestor(TypeId::of::<Tag>()).unwrap();
        assert_eq!(tag.copies(), 2);
        assert!(!tag.is_split());
        assert!(purple.ensure_unsplit().is_ok());
    }

    #[test]
    fn test_inconsistent_hierarchy_is_rejected() {
        let graph = TypeGraph::new();
        let err = graph.event_type::<Impossible>().unwrap_err();
        assert!(matches!(err, RegistrationError::InconsistentHierarchy(_)));
        // The consistent parents stay usable.
        assert!(graph.event_type::<Crossed>().is_ok());
    }

    #[test]
    fn test_cycle_is_rejected() {
        let graph = TypeGraph::new();
        let err = graph.event_type::<Ouroboros>().unwrap_err();
        assert!(matches!(err, RegistrationError::Cycle(_)));
    }
}
