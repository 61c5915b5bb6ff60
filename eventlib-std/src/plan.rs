//! Dispatch planning.
//!
//! A plan is the resolved set stably sorted by priority. It is one sequence:
//! scopes and plain handlers are not split into phases, so a step's priority
//! decides both when it runs and which scopes are already open around it.

use crate::erased::{DynHandler, DynScope, Erased};
use crate::resolve::{Resolved, ResolvedSet};
use eventlib_core::DispatchError;
use std::sync::Arc;

/// The ordered steps of one dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchPlan {
    steps: Vec<Resolved>,
}

/// A plan step runnable without an executor.
pub(crate) enum SyncStep<'p> {
    Call(&'p Resolved, &'p Arc<dyn DynHandler>),
    Enter(&'p Resolved, &'p Arc<dyn DynScope>),
}

impl DispatchPlan {
    /// Order a resolved set by priority, keeping resolution order for ties.
    pub fn from_resolved(resolved: ResolvedSet) -> Self {
        let mut steps = resolved.into_vec();
        steps.sort_by_key(|step| step.subscription.priority());
        tracing::trace!(steps = steps.len(), "dispatch plan built");
        Self { steps }
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterate over the steps in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, Resolved> {
        self.steps.iter()
    }

    /// The steps as synchronous operations.
    ///
    /// Fails on the first asynchronous step, before anything has run.
    pub(crate) fn sync_steps(&self) -> Result<Vec<SyncStep<'_>>, DispatchError> {
        self.steps
            .iter()
            .map(|step| match &step.subscription.handler {
                Erased::Plain(handler) => Ok(SyncStep::Call(step, handler)),
                Erased::Scoped(scope) => Ok(SyncStep::Enter(step, scope)),
                Erased::PlainAsync(_) | Erased::ScopedAsync(_) => {
                    Err(DispatchError::UnsupportedHandlerKind {
                        handler: step.subscription.name(),
                        kind: step.subscription.kind(),
                    })
                }
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a DispatchPlan {
    type Item = &'a Resolved;
    type IntoIter = std::slice::Iter<'a, Resolved>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
