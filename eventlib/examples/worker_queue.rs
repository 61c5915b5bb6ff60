//! Workers pulling events off a queue and emitting them.
//!
//! One handler schedules more work onto the same queue, so the queue keeps
//! track of outstanding events and the example waits until it drains.
//!
//! Run with `cargo run --example worker_queue --features macros`.

use eventlib::{BoxError, CancellationToken, Event, EventExt, subscribe};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify, mpsc};

#[derive(Event, Debug)]
struct MoreWorkEvent {
    events: Vec<Work>,
}

#[derive(Event, Debug)]
struct PrintEvent {
    message: String,
}

/// Anything that can sit in the queue.
#[derive(Debug)]
enum Work {
    More(MoreWorkEvent),
    Print(PrintEvent),
}

impl Work {
    fn print(message: &str) -> Self {
        Work::Print(PrintEvent {
            message: message.to_string(),
        })
    }

    async fn emit(mut self) -> Result<(), BoxError> {
        match &mut self {
            Work::More(event) => event.emit_async().await?,
            Work::Print(event) => event.emit_async().await?,
        }
        Ok(())
    }
}

impl fmt::Display for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Work::More(event) => write!(f, "MoreWorkEvent({} events)", event.events.len()),
            Work::Print(event) => write!(f, "PrintEvent({:?})", event.message),
        }
    }
}

/// An unbounded queue that can be waited on until every item is done.
struct Queue {
    sender: mpsc::UnboundedSender<Work>,
    receiver: Mutex<mpsc::UnboundedReceiver<Work>>,
    pending: AtomicUsize,
    drained: Notify,
}

impl Queue {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            pending: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    fn put(&self, work: Work) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(work).is_err() {
            self.task_done();
        }
    }

    async fn get(&self) -> Option<Work> {
        self.receiver.lock().await.recv().await
    }

    fn task_done(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    async fn join(&self) {
        loop {
            let drained = self.drained.notified();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            drained.await;
        }
    }
}

static QUEUE: LazyLock<Queue> = LazyLock::new(Queue::new);

/// Schedule more events onto the queue.
#[subscribe]
async fn schedule_more(event: &mut MoreWorkEvent) {
    for work in event.events.drain(..) {
        QUEUE.put(work);
    }
}

/// Print the message of the event.
#[subscribe]
fn print_message(event: &PrintEvent) {
    println!("{}", event.message);
}

async fn worker(id: usize, shutdown: CancellationToken) {
    loop {
        let work = tokio::select! {
            _ = shutdown.cancelled() => return,
            work = QUEUE.get() => match work {
                Some(work) => work,
                None => return,
            },
        };
        let label = work.to_string();
        println!("Worker {id}: Working on {label}");
        if let Err(err) = work.emit().await {
            println!("Worker {id}: {label} failed: {err}");
        }
        println!("Worker {id}: Finished {label}");
        QUEUE.task_done();
    }
}

#[tokio::main]
async fn main() {
    QUEUE.put(Work::More(MoreWorkEvent {
        events: vec![Work::print("Hello"), Work::print("World")],
    }));
    QUEUE.put(Work::print("Goodbye"));

    let shutdown = CancellationToken::new();
    let workers: Vec<_> = (0..10)
        .map(|id| tokio::spawn(worker(id, shutdown.clone())))
        .collect();

    QUEUE.join().await;
    shutdown.cancel();
    for handle in workers {
        let _ = handle.await;
    }
}
