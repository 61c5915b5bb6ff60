//! A small chat: one handler cancels messages, one prints them, a critical
//! one rejects messages and a scope reports the rejections.
//!
//! Run with `cargo run --example chat --features macros`, then type messages.
//! An empty line or a message starting with `exit` ends the chat.

use eventlib::{
    BoxError, ErrorGroup, Event, EventExt, ExitAction, Failure, Scope, subscribe,
};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Event, Debug)]
struct ChatEvent {
    name: String,
    message: String,
    cancelled: bool,
}

impl ChatEvent {
    fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
            cancelled: false,
        }
    }
}

#[derive(Debug, Error)]
#[error("message {0:?} starts with word 'fail'")]
struct RejectedMessage(String);

/// Print the message, or that it was cancelled.
#[subscribe(priority = 100)]
fn on_chat_print(event: &ChatEvent) {
    if event.cancelled {
        println!("{}: cancelled the message.", event.name);
    } else {
        println!("{}: {}", event.name, event.message);
    }
}

/// Cancel messages starting with `cancel`.
#[subscribe]
fn cancel_message(event: &mut ChatEvent) {
    if event.message.starts_with("cancel") {
        event.cancelled = true;
    }
}

/// Reject messages starting with `fail`; this aborts the dispatch.
#[subscribe(critical)]
fn raise_error_with_critical(event: &ChatEvent) -> Result<(), RejectedMessage> {
    if event.message.starts_with("fail") {
        return Err(RejectedMessage(event.message.clone()));
    }
    Ok(())
}

/// Reports rejected messages instead of letting them reach the sender.
#[derive(Debug, Default)]
struct ChatErrors;

#[subscribe(priority = -100)]
impl Scope<ChatEvent> for ChatErrors {
    type Guard = ();

    fn enter(&self, _event: &mut ChatEvent) -> Result<(), BoxError> {
        Ok(())
    }

    fn exit(
        &self,
        _guard: (),
        event: &mut ChatEvent,
        in_flight: Option<&ErrorGroup>,
    ) -> Result<ExitAction, BoxError> {
        let Some(group) = in_flight else {
            return Ok(ExitAction::Propagate);
        };
        // Only absorb when every failure is a rejection.
        let rejected: Option<Vec<&RejectedMessage>> = group
            .iter()
            .map(Failure::downcast_ref::<RejectedMessage>)
            .collect();
        match rejected {
            Some(rejected) => {
                for err in rejected {
                    println!("{}: {err}", event.name);
                }
                Ok(ExitAction::Absorb)
            }
            None => Ok(ExitAction::Propagate),
        }
    }
}

fn main() -> Result<(), BoxError> {
    println!("Enter 'exit' to exit the chat.");
    ChatEvent::new("Alice", "Hello World").emit()?;
    ChatEvent::new("Bob", "fail this message").emit()?;
    ChatEvent::new("Alice", "cancel this message").emit()?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Enter a message: ");
        io::stdout().flush()?;
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        if line.is_empty() || line.starts_with("exit") {
            break;
        }
        ChatEvent::new("You", &line).emit()?;
    }
    Ok(())
}
