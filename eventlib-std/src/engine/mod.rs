//! Plan execution.
//!
//! Both engines walk a [`DispatchPlan`](crate::DispatchPlan) once, keeping a
//! LIFO stack of open scopes:
//!
//! - a plain handler is called; a non-critical failure is reported and the
//!   walk continues, a critical one stops the walk
//! - a scope is entered and pushed; a failed entry stops the walk
//! - once the walk ends, every open scope is released in reverse order, each
//!   seeing the failures in flight and free to absorb them
//!
//! Whatever is left in flight after the last release is returned to the
//! caller as [`DispatchError::Aborted`].

mod blocking;
mod cooperative;

pub(crate) use blocking::run_blocking;
pub(crate) use cooperative::run_cooperative;

use crate::erased::{DynAsyncScope, DynHandler, DynScope, Guard};
use crate::resolve::Resolved;
use eventlib_core::{
    AnyEvent, BoxError, DispatchError, ErrorGroup, ExitAction, Failure, ProjectionError, Stage,
};
use std::any::Any;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Side channel receiving every suppressed non-critical failure.
pub type SuppressedObserver = Arc<dyn Fn(&Failure) + Send + Sync>;

enum Open<'r> {
    Sync(&'r Arc<dyn DynScope>),
    Async(&'r Arc<dyn DynAsyncScope>),
}

struct OpenScope<'r> {
    step: &'r Resolved,
    scope: Open<'r>,
    guard: Guard,
}

/// State of one dispatch.
///
/// Dropping a run with scopes still open (a cancelled dispatch future)
/// releases the synchronous ones as if the dispatch had been cancelled.
struct Run<'r> {
    event: &'r mut AnyEvent,
    open: Vec<OpenScope<'r>>,
    in_flight: ErrorGroup,
    observer: Option<&'r SuppressedObserver>,
}

impl<'r> Run<'r> {
    fn new(event: &'r mut AnyEvent, observer: Option<&'r SuppressedObserver>) -> Self {
        Self {
            event,
            open: Vec::new(),
            in_flight: ErrorGroup::new(),
            observer,
        }
    }

    fn call(&mut self, step: &Resolved, handler: &Arc<dyn DynHandler>) -> ControlFlow<()> {
        let outcome = view(&mut *self.event, step, Stage::Call).and_then(|event| {
            settle(
                step,
                Stage::Call,
                panic::catch_unwind(AssertUnwindSafe(|| handler.call(event))),
            )
        });
        match outcome {
            Ok(()) => ControlFlow::Continue(()),
            Err(failure) => self.failed_call(step, failure),
        }
    }

    fn enter(&mut self, step: &'r Resolved, scope: &'r Arc<dyn DynScope>) -> ControlFlow<()> {
        let outcome = view(&mut *self.event, step, Stage::Enter).and_then(|event| {
            settle(
                step,
                Stage::Enter,
                panic::catch_unwind(AssertUnwindSafe(|| scope.enter(event))),
            )
        });
        match outcome {
            Ok(guard) => {
                self.open.push(OpenScope {
                    step,
                    scope: Open::Sync(scope),
                    guard,
                });
                ControlFlow::Continue(())
            }
            Err(failure) => self.abort(failure),
        }
    }

    fn exit(&mut self, step: &Resolved, scope: &Arc<dyn DynScope>, guard: Guard) {
        let in_flight = (!self.in_flight.is_empty()).then_some(&self.in_flight);
        let outcome = view(&mut *self.event, step, Stage::Exit).and_then(|event| {
            settle(
                step,
                Stage::Exit,
                panic::catch_unwind(AssertUnwindSafe(|| scope.exit(guard, event, in_flight))),
            )
        });
        self.exited(step, outcome);
    }

    /// Release every open scope without suspending. Async scopes cannot be
    /// released here; their guards are dropped.
    fn release_blocking(&mut self) {
        while let Some(OpenScope { step, scope, guard }) = self.open.pop() {
            match scope {
                Open::Sync(scope) => self.exit(step, scope, guard),
                Open::Async(_) => {
                    tracing::warn!(
                        handler = step.subscription.name(),
                        "async scope dropped without being released"
                    );
                    drop(guard);
                }
            }
        }
    }

    fn failed_call(&mut self, step: &Resolved, failure: Failure) -> ControlFlow<()> {
        if step.subscription.critical() {
            return self.abort(failure);
        }
        tracing::warn!(
            handler = step.subscription.name(),
            error = %failure,
            "handler failed, continuing dispatch"
        );
        if let Some(observer) = self.observer {
            observer(&failure);
        }
        ControlFlow::Continue(())
    }

    fn abort(&mut self, failure: Failure) -> ControlFlow<()> {
        self.in_flight.push(failure);
        ControlFlow::Break(())
    }

    fn cancelled(&mut self) -> ControlFlow<()> {
        tracing::debug!("dispatch cancelled");
        self.abort(Failure::Cancelled)
    }

    fn exited(&mut self, step: &Resolved, outcome: Result<ExitAction, Failure>) {
        match outcome {
            Ok(ExitAction::Propagate) => {}
            Ok(ExitAction::Absorb) => {
                if !self.in_flight.is_empty() {
                    tracing::debug!(
                        handler = step.subscription.name(),
                        absorbed = self.in_flight.len(),
                        "scope absorbed failures"
                    );
                    self.in_flight.clear();
                }
            }
            Err(failure) => self.in_flight.push(failure),
        }
    }

    fn finish(mut self) -> Result<(), DispatchError> {
        let failures = std::mem::take(&mut self.in_flight);
        if failures.is_empty() {
            return Ok(());
        }
        tracing::error!(error = %failures, "dispatch aborted");
        Err(DispatchError::Aborted(failures))
    }
}

impl Drop for Run<'_> {
    fn drop(&mut self) {
        if self.open.is_empty() {
            return;
        }
        tracing::debug!(open = self.open.len(), "dispatch dropped with open scopes");
        if !self.in_flight.is_cancelled() {
            self.in_flight.push(Failure::Cancelled);
        }
        self.release_blocking();
    }
}

/// Project the event onto the type `step` was registered for.
fn view<'e>(
    event: &'e mut AnyEvent,
    step: &Resolved,
    stage: Stage,
) -> Result<&'e mut AnyEvent, Failure> {
    step.ancestor.project(event).ok_or_else(|| Failure::Handler {
        handler: step.subscription.name(),
        stage,
        source: Box::new(ProjectionError {
            expected: step.ancestor.name(),
        }),
    })
}

/// Turn a step's result, or its panic, into a [`Failure`].
fn settle<T>(
    step: &Resolved,
    stage: Stage,
    outcome: std::thread::Result<Result<T, BoxError>>,
) -> Result<T, Failure> {
    let handler = step.subscription.name();
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(Failure::Handler {
            handler,
            stage,
            source,
        }),
        Err(payload) => Err(Failure::Panicked {
            handler,
            stage,
            message: panic_message(&*payload),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        let borrowed: Box<dyn Any + Send> = Box::new("static message");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        let opaque: Box<dyn Any + Send> = Box::new(42_u8);

        assert_eq!(panic_message(&*borrowed), "static message");
        assert_eq!(panic_message(&*owned), "owned message");
        assert_eq!(panic_message(&*opaque), "unknown panic");
    }
}
