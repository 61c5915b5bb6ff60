use super::{Run, SuppressedObserver};
use crate::plan::{DispatchPlan, SyncStep};
use eventlib_core::{AnyEvent, DispatchError};

/// Execute `plan` without an executor.
///
/// Fails with [`DispatchError::UnsupportedHandlerKind`] before running
/// anything if the plan contains an asynchronous step.
pub(crate) fn run_blocking(
    plan: &DispatchPlan,
    event: &mut AnyEvent,
    observer: Option<&SuppressedObserver>,
) -> Result<(), DispatchError> {
    let steps = plan.sync_steps()?;
    let mut run = Run::new(event, observer);

    for step in steps {
        let flow = match step {
            SyncStep::Call(step, handler) => run.call(step, handler),
            SyncStep::Enter(step, scope) => run.enter(step, scope),
        };
        if flow.is_break() {
            break;
        }
    }

    run.release_blocking();
    run.finish()
}
