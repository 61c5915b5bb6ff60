use super::{Open, OpenScope, Run, SuppressedObserver, settle, view};
use crate::erased::{DynAsyncHandler, DynAsyncScope, Erased, Guard};
use crate::plan::DispatchPlan;
use crate::resolve::Resolved;
use eventlib_core::{AnyEvent, DispatchError, Stage};
use futures::FutureExt;
use futures::future::{self, Either};
use std::future::Future;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::pin::pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Execute `plan`, awaiting asynchronous steps one at a time.
///
/// With a token, cancellation is checked before every step and raced against
/// every suspended handler or scope entry. Releases are never raced.
pub(crate) async fn run_cooperative(
    plan: &DispatchPlan,
    event: &mut AnyEvent,
    observer: Option<&SuppressedObserver>,
    cancel: Option<&CancellationToken>,
) -> Result<(), DispatchError> {
    let mut run = Run::new(event, observer);

    for step in plan {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            let _ = run.cancelled();
            break;
        }
        let flow = match &step.subscription.handler {
            Erased::Plain(handler) => run.call(step, handler),
            Erased::Scoped(scope) => run.enter(step, scope),
            Erased::PlainAsync(handler) => run.call_async(step, handler, cancel).await,
            Erased::ScopedAsync(scope) => run.enter_async(step, scope, cancel).await,
        };
        if flow.is_break() {
            break;
        }
    }

    run.release_cooperative().await;
    run.finish()
}

impl<'r> Run<'r> {
    async fn call_async(
        &mut self,
        step: &Resolved,
        handler: &Arc<dyn DynAsyncHandler>,
        cancel: Option<&CancellationToken>,
    ) -> ControlFlow<()> {
        let event = match view(&mut *self.event, step, Stage::Call) {
            Ok(event) => event,
            Err(failure) => return self.failed_call(step, failure),
        };
        let Some(outcome) = guarded(cancel, AssertUnwindSafe(handler.call(event)).catch_unwind()).await
        else {
            return self.cancelled();
        };
        match settle(step, Stage::Call, outcome) {
            Ok(()) => ControlFlow::Continue(()),
            Err(failure) => self.failed_call(step, failure),
        }
    }

    async fn enter_async(
        &mut self,
        step: &'r Resolved,
        scope: &'r Arc<dyn DynAsyncScope>,
        cancel: Option<&CancellationToken>,
    ) -> ControlFlow<()> {
        let event = match view(&mut *self.event, step, Stage::Enter) {
            Ok(event) => event,
            Err(failure) => return self.abort(failure),
        };
        let Some(outcome) = guarded(cancel, AssertUnwindSafe(scope.enter(event)).catch_unwind()).await
        else {
            return self.cancelled();
        };
        match settle(step, Stage::Enter, outcome) {
            Ok(guard) => {
                self.open.push(OpenScope {
                    step,
                    scope: Open::Async(scope),
                    guard,
                });
                ControlFlow::Continue(())
            }
            Err(failure) => self.abort(failure),
        }
    }

    async fn exit_async(&mut self, step: &Resolved, scope: &Arc<dyn DynAsyncScope>, guard: Guard) {
        let in_flight = (!self.in_flight.is_empty()).then_some(&self.in_flight);
        let outcome = match view(&mut *self.event, step, Stage::Exit) {
            Ok(event) => {
                let release = AssertUnwindSafe(scope.exit(guard, event, in_flight));
                settle(step, Stage::Exit, release.catch_unwind().await)
            }
            Err(failure) => Err(failure),
        };
        self.exited(step, outcome);
    }

    async fn release_cooperative(&mut self) {
        while let Some(OpenScope { step, scope, guard }) = self.open.pop() {
            match scope {
                Open::Sync(scope) => self.exit(step, scope, guard),
                Open::Async(scope) => self.exit_async(step, scope, guard).await,
            }
        }
    }
}

/// Drive `work` to completion, or return `None` once `cancel` fires.
async fn guarded<F: Future>(cancel: Option<&CancellationToken>, work: F) -> Option<F::Output> {
    let work = pin!(work);
    let Some(cancel) = cancel else {
        return Some(work.await);
    };
    let cancelled = pin!(cancel.cancelled());
    match future::select(work, cancelled).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(((), _)) => None,
    }
}
