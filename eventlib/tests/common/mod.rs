#![allow(dead_code)]

use eventlib::{Event, Extends, Supertype};
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Test Event Types
// ============================================================================
//
//        Base
//       /    \
//    Left    Right
//       \    /
//       Merged

#[derive(Debug, Default)]
pub struct Base {
    pub hits: Vec<&'static str>,
}

impl Event for Base {}

#[derive(Debug, Default)]
pub struct Left {
    pub base: Base,
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

#[derive(Debug, Default)]
pub struct Right {
    pub base: Base,
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

#[derive(Debug, Default)]
pub struct Merged {
    pub left: Left,
    pub right: Right,
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

#[derive(Debug, Clone, Default)]
pub struct Foo {
    pub value: String,
}

impl Event for Foo {}

#[derive(Debug, Clone, Default)]
pub struct Bar {
    pub value: String,
}

impl Event for Bar {}

/// A chat message that handlers may cancel.
#[derive(Debug, Default)]
pub struct Chat {
    pub name: String,
    pub message: String,
    pub cancelled: bool,
}

impl Chat {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
            cancelled: false,
        }
    }
}

impl Event for Chat {}

#[derive(Debug, thiserror::Error)]
#[error("message {0:?} starts with `fail`")]
pub struct ChatError(pub String);
