//! Error types for eventlib.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`DispatchError`] - What `emit` / `emit_async` callers observe
//! - [`RegistrationError`] - Invalid event type hierarchies
//! - [`Failure`] - One failed handler step (or a cancellation)
//! - [`ErrorGroup`] - The ordered aggregate of failures raised after unwind

use crate::handler::HandlerKind;
use std::fmt;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while resolving an event type's supertypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The event type is reachable from its own supertypes.
    #[error("event type `{0}` is its own supertype")]
    Cycle(&'static str),

    /// No linearization preserves the declared supertype order.
    #[error("cannot linearize the supertypes of `{0}`")]
    InconsistentHierarchy(&'static str),

    /// A stateful ancestor is held more than once by the event type, so
    /// handlers would see diverging copies of it.
    #[error("`{event}` holds {copies} copies of its ancestor `{ancestor}`")]
    SplitAncestor {
        /// The event type being dispatched.
        event: &'static str,
        /// The ancestor reached through several supertypes.
        ancestor: &'static str,
        /// How many copies the event holds.
        copies: usize,
    },
}

/// An event could not be viewed as the type a handler was registered for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("event could not be viewed as `{expected}`")]
pub struct ProjectionError {
    /// The type the handler expected.
    pub expected: &'static str,
}

/// The step of a handler during which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// A scope was being entered.
    Enter,
    /// A plain handler was being called.
    Call,
    /// A scope was being released.
    Exit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Enter => "enter",
            Stage::Call => "call",
            Stage::Exit => "exit",
        })
    }
}

/// A single failure observed during a dispatch.
#[derive(Error, Debug)]
pub enum Failure {
    /// A handler returned an error.
    #[error("handler `{handler}` failed during {stage}: {source}")]
    Handler {
        /// The failing handler.
        handler: &'static str,
        /// The step it failed in.
        stage: Stage,
        /// The error it returned.
        #[source]
        source: BoxError,
    },

    /// A handler panicked.
    #[error("handler `{handler}` panicked during {stage}: {message}")]
    Panicked {
        /// The panicking handler.
        handler: &'static str,
        /// The step it panicked in.
        stage: Stage,
        /// The panic payload, when it was a string.
        message: String,
    },

    /// The dispatch was cancelled by its host.
    #[error("dispatch was cancelled")]
    Cancelled,
}

impl Failure {
    /// The handler this failure originates from, if any.
    pub fn handler(&self) -> Option<&'static str> {
        match self {
            Failure::Handler { handler, .. } | Failure::Panicked { handler, .. } => Some(*handler),
            Failure::Cancelled => None,
        }
    }

    /// The stage this failure occurred in, if it came from a handler.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Failure::Handler { stage, .. } | Failure::Panicked { stage, .. } => Some(*stage),
            Failure::Cancelled => None,
        }
    }

    /// The handler's error, if it is of type `T`.
    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&T> {
        match self {
            Failure::Handler { source, .. } => source.downcast_ref::<T>(),
            _ => None,
        }
    }
}

/// An ordered aggregate of failures.
///
/// This is what a scope sees as the in-flight error while it is released,
/// and what callers receive in [`DispatchError::Aborted`].
#[derive(Debug, Default)]
pub struct ErrorGroup {
    failures: Vec<Failure>,
}

impl ErrorGroup {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failure.
    pub fn push(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    /// Drop every collected failure.
    pub fn clear(&mut self) {
        self.failures.clear();
    }

    /// Whether the group holds no failures.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failures in the group.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Iterate over failures in the order they occurred.
    pub fn iter(&self) -> std::slice::Iter<'_, Failure> {
        self.failures.iter()
    }

    /// The first handler error of type `T`, if any.
    pub fn find<T: std::error::Error + 'static>(&self) -> Option<&T> {
        self.failures.iter().find_map(Failure::downcast_ref::<T>)
    }

    /// Whether any handler error is of type `T`.
    pub fn contains<T: std::error::Error + 'static>(&self) -> bool {
        self.find::<T>().is_some()
    }

    /// Whether the dispatch was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.failures
            .iter()
            .any(|failure| matches!(failure, Failure::Cancelled))
    }

    /// Consume the group, returning its failures.
    pub fn into_vec(self) -> Vec<Failure> {
        self.failures
    }
}

impl From<Failure> for ErrorGroup {
    fn from(failure: Failure) -> Self {
        Self {
            failures: vec![failure],
        }
    }
}

impl<'a> IntoIterator for &'a ErrorGroup {
    type Item = &'a Failure;
    type IntoIter = std::slice::Iter<'a, Failure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.iter()
    }
}

impl fmt::Display for ErrorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.len() {
            1 => write!(f, "1 failure: ")?,
            n => write!(f, "{n} failures: ")?,
        }
        for (index, failure) in self.failures.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorGroup {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|failure| failure as &(dyn std::error::Error + 'static))
    }
}

/// Errors returned by `emit` and `emit_async`.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A synchronous dispatch resolved an asynchronous handler.
    ///
    /// No handler runs when this is returned.
    #[error("handler `{handler}` is {kind} and cannot run in a synchronous dispatch")]
    UnsupportedHandlerKind {
        /// The offending handler.
        handler: &'static str,
        /// Its kind.
        kind: HandlerKind,
    },

    /// The event type has an invalid hierarchy.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A critical failure aborted the dispatch, or releasing a scope failed.
    ///
    /// Every opened scope was released before this was returned.
    #[error("dispatch aborted with {0}")]
    Aborted(ErrorGroup),
}

impl DispatchError {
    /// The aggregate of failures, for aborted dispatches.
    pub fn failures(&self) -> Option<&ErrorGroup> {
        match self {
            DispatchError::Aborted(group) => Some(group),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Error, Debug)]
    #[error("value error: {0}")]
    struct ValueError(&'static str);

    fn failed(handler: &'static str, source: BoxError) -> Failure {
        Failure::Handler {
            handler,
            stage: Stage::Call,
            source,
        }
    }

    #[test]
    fn test_group_finds_by_source_type() {
        let mut group = ErrorGroup::new();
        group.push(failed("first", "plain message".into()));
        group.push(failed("second", Box::new(ValueError("boom"))));

        assert_eq!(group.len(), 2);
        assert!(group.contains::<ValueError>());
        assert_eq!(group.find::<ValueError>().map(|e| e.0), Some("boom"));
        assert!(!group.is_cancelled());
    }

    #[test]
    fn test_group_display_lists_failures() {
        let mut group = ErrorGroup::from(failed("a", "x".into()));
        group.push(Failure::Cancelled);
        assert_eq!(
            group.to_string(),
            "2 failures: handler `a` failed during call: x; dispatch was cancelled"
        );
        assert!(group.is_cancelled());
    }

    #[test]
    fn test_failure_accessors() {
        let failure = Failure::Panicked {
            handler: "h",
            stage: Stage::Exit,
            message: "oops".into(),
        };
        assert_eq!(failure.handler(), Some("h"));
        assert_eq!(failure.stage(), Some(Stage::Exit));
        assert!(failure.downcast_ref::<ValueError>().is_none());
        assert_eq!(Failure::Cancelled.handler(), None);
    }
}
