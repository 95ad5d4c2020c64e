//! Error types for queue execution.

use thiserror::Error;

/// Fault raised when a step invokes its continuation more than once.
///
/// This is API misuse, not a step failure. It is never delivered to the
/// completion callback; the offending call panics with this message instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("continuation for step {step} invoked twice")]
pub struct ContinuationReused {
    /// Zero-based index of the step whose continuation fired again.
    pub step: usize,
}

/// Error returned by [`Queue::finish`](crate::Queue::finish).
#[derive(Error, Debug)]
pub enum FinishError<E> {
    /// A step reported an error; remaining steps were skipped.
    #[error("step failed: {0}")]
    Step(E),

    /// Every continuation of a pending step was dropped without firing.
    #[error("queue abandoned before completion")]
    Abandoned,
}

impl<E> FinishError<E> {
    /// Returns the step-reported error, if any.
    pub fn into_step_error(self) -> Option<E> {
        match self {
            Self::Step(e) => Some(e),
            Self::Abandoned => None,
        }
    }

    /// Returns true if the run was abandoned rather than failed.
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Self::Abandoned)
    }
}
