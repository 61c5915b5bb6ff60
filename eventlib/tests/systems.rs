//! Independent systems, copies and registration-time validation.

mod common;

use common::{Bar, Foo};
use eventlib::testing::Journal;
use eventlib::{
    DispatchError, Event, EventSystem, Extends, Failure, RegistrationError, Supertype,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[test]
fn test_systems_are_isolated() {
    let journal = Journal::new();
    let first = EventSystem::new();
    let second = EventSystem::new();
    first.subscribe::<Foo>().handler(journal.recorder("first")).unwrap();
    second.subscribe::<Foo>().handler(journal.recorder("second")).unwrap();

    first.emit(&mut Foo::default()).unwrap();
    assert_eq!(journal.take(), ["first"]);

    second.emit(&mut Foo::default()).unwrap();
    assert_eq!(journal.take(), ["second"]);
}

#[test]
fn test_copy_starts_with_parent_subscriptions() {
    let journal = Journal::new();
    let parent = EventSystem::new();
    parent.subscribe::<Foo>().handler(journal.recorder("foo")).unwrap();

    let child = EventSystem::from_parent(&parent);
    child.subscribe::<Bar>().handler(journal.recorder("bar")).unwrap();

    child.emit(&mut Foo::default()).unwrap();
    child.emit(&mut Bar::default()).unwrap();
    assert_eq!(journal.take(), ["foo", "bar"]);

    parent.emit(&mut Bar::default()).unwrap();
    assert!(journal.is_empty(), "the parent never sees the child's subscriptions");
}

#[test]
fn test_copies_diverge_in_both_directions() {
    let journal = Journal::new();
    let parent = EventSystem::new();
    parent.subscribe::<Foo>().handler(journal.recorder("shared")).unwrap();
    let child = EventSystem::from_parent(&parent);

    parent.subscribe::<Foo>().handler(journal.recorder("parent-only")).unwrap();
    child.subscribe::<Foo>().handler(journal.recorder("child-only")).unwrap();

    parent.emit(&mut Foo::default()).unwrap();
    assert_eq!(journal.take(), ["shared", "parent-only"]);

    child.emit(&mut Foo::default()).unwrap();
    assert_eq!(journal.take(), ["shared", "child-only"]);

    assert_eq!(parent.len(), 2);
    assert_eq!(child.len(), 2);
}

#[test]
fn test_clone_is_a_copy() {
    let journal = Journal::new();
    let original = EventSystem::new();
    original.subscribe::<Foo>().handler(journal.recorder("original")).unwrap();

    let cloned = original.clone();
    cloned.subscribe::<Foo>().handler(journal.recorder("clone")).unwrap();

    original.emit(&mut Foo::default()).unwrap();
    assert_eq!(journal.take(), ["original"]);
    cloned.emit(&mut Foo::default()).unwrap();
    assert_eq!(journal.take(), ["original", "clone"]);
}

#[test]
fn test_copy_inherits_suppressed_observer() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let parent = EventSystem::builder()
        .on_suppressed(move |_: &Failure| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let journal = Journal::new();
    parent.subscribe::<Foo>().handler(journal.failing("flaky")).unwrap();

    let child = EventSystem::from_parent(&parent);
    child.emit(&mut Foo::default()).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    let replaced = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&replaced);
    let overriding = EventSystem::builder()
        .on_suppressed(move |failure: &Failure| {
            sink.lock().unwrap().push(failure.handler());
        })
        .parent(&parent)
        .build();
    overriding.emit(&mut Foo::default()).unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(replaced.lock().unwrap().len(), 1);
}

#[test]
fn test_len_counts_subscriptions() {
    let system = EventSystem::default();
    assert!(system.is_empty());

    let journal = Journal::new();
    system.subscribe::<Foo>().handler(journal.recorder("a")).unwrap();
    system.subscribe::<Bar>().priority(-1).scope(journal.scope("b")).unwrap();

    assert_eq!(system.len(), 2);
    assert!(!system.is_empty());
}

struct Chicken {
    egg: Option<Box<Egg>>,
}

struct Egg {
    chicken: Option<Box<Chicken>>,
}

impl Event for Chicken {
    fn supertypes() -> Vec<Supertype> {
        vec![Supertype::of::<Self, Egg>()]
    }
}

impl Event for Egg {
    fn supertypes() -> Vec<Supertype> {
        vec![Supertype::of::<Self, Chicken>()]
    }
}

impl Extends<Egg> for Chicken {
    fn upcast_mut(&mut self) -> &mut Egg {
        self.egg.get_or_insert_with(|| Box::new(Egg { chicken: None }))
    }
}

impl Extends<Chicken> for Egg {
    fn upcast_mut(&mut self) -> &mut Chicken {
        self.chicken.get_or_insert_with(|| Box::new(Chicken { egg: None }))
    }
}

#[test]
fn test_cyclic_hierarchy_is_rejected_at_subscription() {
    let system = EventSystem::new();
    let err = system
        .subscribe::<Chicken>()
        .handler(|_: &mut Chicken| {})
        .err().unwrap();

    assert!(matches!(err, RegistrationError::Cycle(_)));
    assert!(system.is_empty());

    let err = system.emit(&mut Egg { chicken: None }).unwrap_err();
    assert!(matches!(err, DispatchError::Registration(RegistrationError::Cycle(_))));
}

#[test]
fn test_concurrent_dispatch_and_subscription() {
    let calls = Arc::new(AtomicUsize::new(0));
    let system = EventSystem::new();
    let counter = Arc::clone(&calls);
    system
        .subscribe::<Foo>()
        .handler(move |_: &mut Foo| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..25 {
                    system.emit(&mut Foo::default()).unwrap();
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..10 {
                system.subscribe::<Bar>().handler(|_: &mut Bar| {}).unwrap();
            }
        });
    });

    assert_eq!(calls.load(Ordering::SeqCst), 100);
    assert_eq!(system.len(), 11);
}
