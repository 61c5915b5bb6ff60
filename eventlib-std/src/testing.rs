//! Testing utilities for eventlib.
//!
//! This module provides small handlers that write to a shared log, so tests
//! can assert on the exact order in which a dispatch ran them.
//!
//! # Features
//!
//! - [`Journal`]: A shared, ordered log of entries
//! - [`Recorder`]: A plain handler (sync and async) that logs its label
//! - [`ScopeProbe`]: A scope (sync and async) that logs `enter:` and `exit:`
//! - [`Failing`]: A plain handler that logs its label and then fails

use eventlib_core::{
    AsyncHandler, AsyncScope, BoxError, ErrorGroup, Event, ExitAction, Handler, Scope,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

// ============================================================================
// Journal
// ============================================================================

/// A shared, ordered log.
///
/// Clones share the same log.
///
/// # Example
///
/// ```rust,ignore
/// let journal = Journal::new();
/// system.subscribe::<Ping>().priority(-1).scope(journal.scope("outer"))?;
/// system.subscribe::<Ping>().handler(journal.recorder("inner"))?;
///
/// system.emit(&mut Ping)?;
/// assert_eq!(journal.entries(), ["enter:outer", "inner", "exit:outer"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.lock().push(entry.into());
    }

    /// A copy of the entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Take the entries, leaving the journal empty.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A plain handler logging `label`.
    pub fn recorder(&self, label: &'static str) -> Recorder {
        Recorder {
            journal: self.clone(),
            label,
        }
    }

    /// A scope logging `enter:label` and `exit:label`.
    pub fn scope(&self, label: &'static str) -> ScopeProbe {
        ScopeProbe {
            journal: self.clone(),
            label,
            absorb: false,
        }
    }

    /// A plain handler logging `label` and failing with [`TestFailure`].
    pub fn failing(&self, label: &'static str) -> Failing {
        Failing {
            journal: self.clone(),
            label,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Recorder
// ============================================================================

/// A plain handler that logs its label, for any event type.
#[derive(Debug, Clone)]
pub struct Recorder {
    journal: Journal,
    label: &'static str,
}

impl<E: Event> Handler<E> for Recorder {
    fn handle(&self, _event: &mut E) -> Result<(), BoxError> {
        self.journal.push(self.label);
        Ok(())
    }
}

impl<E: Event> AsyncHandler<E> for Recorder {
    async fn handle(&self, _event: &mut E) -> Result<(), BoxError> {
        self.journal.push(self.label);
        Ok(())
    }
}

// ============================================================================
// Scope Probe
// ============================================================================

/// A scope that logs when it is entered and released.
///
/// On release it also logs `saw:label` if failures were in flight.
#[derive(Debug, Clone)]
pub struct ScopeProbe {
    journal: Journal,
    label: &'static str,
    absorb: bool,
}

impl ScopeProbe {
    /// Absorb any failures in flight when released.
    pub fn absorbing(mut self) -> Self {
        self.absorb = true;
        self
    }

    fn release(&self, in_flight: Option<&ErrorGroup>) -> ExitAction {
        self.journal.push(format!("exit:{}", self.label));
        match in_flight {
            Some(_) => {
                self.journal.push(format!("saw:{}", self.label));
                if self.absorb {
                    ExitAction::Absorb
                } else {
                    ExitAction::Propagate
                }
            }
            None => ExitAction::Propagate,
        }
    }
}

impl<E: Event> Scope<E> for ScopeProbe {
    type Guard = ();

    fn enter(&self, _event: &mut E) -> Result<(), BoxError> {
        self.journal.push(format!("enter:{}", self.label));
        Ok(())
    }

    fn exit(
        &self,
        _guard: (),
        _event: &mut E,
        in_flight: Option<&ErrorGroup>,
    ) -> Result<ExitAction, BoxError> {
        Ok(self.release(in_flight))
    }
}

impl<E: Event> AsyncScope<E> for ScopeProbe {
    type Guard = ();

    async fn enter(&self, _event: &mut E) -> Result<(), BoxError> {
        self.journal.push(format!("enter:{}", self.label));
        Ok(())
    }

    async fn exit(
        &self,
        _guard: (),
        _event: &mut E,
        in_flight: Option<&ErrorGroup>,
    ) -> Result<ExitAction, BoxError> {
        Ok(self.release(in_flight))
    }
}

// ============================================================================
// Failing Handler
// ============================================================================

/// The error returned by [`Failing`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{0}` failed")]
pub struct TestFailure(pub &'static str);

/// A plain handler that logs its label and then fails.
#[derive(Debug, Clone)]
pub struct Failing {
    journal: Journal,
    label: &'static str,
}

impl<E: Event> Handler<E> for Failing {
    fn handle(&self, _event: &mut E) -> Result<(), BoxError> {
        self.journal.push(self.label);
        Err(Box::new(TestFailure(self.label)))
    }
}

impl<E: Event> AsyncHandler<E> for Failing {
    async fn handle(&self, _event: &mut E) -> Result<(), BoxError> {
        self.journal.push(self.label);
        Err(Box::new(TestFailure(self.label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    impl Event for Ping {}

    #[test]
    fn test_probe_logs_and_absorbs() {
        let journal = Journal::new();
        let probe = journal.scope("s").absorbing();
        let mut ping = Ping;

        Scope::<Ping>::enter(&probe, &mut ping).unwrap();
        let group = ErrorGroup::from(eventlib_core::Failure::Cancelled);
        let action = Scope::<Ping>::exit(&probe, (), &mut ping, Some(&group)).unwrap();

        assert_eq!(action, ExitAction::Absorb);
        assert_eq!(journal.take(), ["enter:s", "exit:s", "saw:s"]);
        assert!(journal.is_empty());
    }

    #[test]
    fn test_failing_reports_its_label() {
        let journal = Journal::new();
        let err = Handler::<Ping>::handle(&journal.failing("f"), &mut Ping).unwrap_err();
        assert_eq!(err.downcast_ref::<TestFailure>(), Some(&TestFailure("f")));
        assert_eq!(journal.entries(), ["f"]);
    }
}
