//! The process-wide default system.
//!
//! Every test uses its own event type: the default system is shared by all
//! tests in this binary.

use eventlib::prelude::*;
use eventlib::testing::Journal;
use eventlib::{default_system, emit, emit_async};

#[derive(Debug, Default)]
struct Greeting {
    text: String,
}

impl Event for Greeting {}

#[derive(Debug, Default)]
struct Farewell;

impl Event for Farewell {}

#[derive(Debug, Default)]
struct Ping {
    count: u32,
}

impl Event for Ping {}

#[derive(Debug, Default)]
struct Copied;

impl Event for Copied {}

#[test]
fn test_event_ext_targets_default_system() {
    let journal = Journal::new();
    Greeting::subscribe().handler(journal.recorder("greeted")).unwrap();
    Greeting::subscribe()
        .priority(-1)
        .handler(|greeting: &mut Greeting| greeting.text.push_str(", world"))
        .unwrap();

    let mut greeting = Greeting {
        text: "hello".to_string(),
    };
    greeting.emit().unwrap();

    assert_eq!(greeting.text, "hello, world");
    assert_eq!(journal.entries(), ["greeted"]);
}

#[test]
fn test_free_functions_share_the_default_system() {
    let journal = Journal::new();
    eventlib::subscribe::<Farewell>().handler(journal.recorder("free")).unwrap();
    Farewell::subscribe().handler(journal.recorder("ext")).unwrap();

    emit(&mut Farewell).unwrap();
    default_system().emit(&mut Farewell).unwrap();

    assert_eq!(journal.entries(), ["free", "ext", "free", "ext"]);
}

#[tokio::test]
async fn test_async_shortcuts() {
    Ping::subscribe()
        .handler(|ping: &mut Ping| ping.count += 1)
        .unwrap();

    let mut ping = Ping::default();
    ping.emit_async().await.unwrap();
    emit_async(&mut ping).await.unwrap();

    assert_eq!(ping.count, 2);
}

#[test]
fn test_default_system_can_seed_a_copy() {
    let journal = Journal::new();
    Copied::subscribe().handler(journal.recorder("default")).unwrap();

    let local = EventSystem::from_parent(default_system());
    local.subscribe::<Copied>().handler(journal.recorder("local")).unwrap();

    local.emit(&mut Copied).unwrap();
    assert_eq!(journal.take(), ["default", "local"]);

    Copied.emit().unwrap();
    assert_eq!(journal.take(), ["default"]);
}
