//! Async step trait.

use async_trait::async_trait;

/// A unit of async work that can be queued with [`Queue::step`](crate::Queue::step).
///
/// Returning `Ok(())` resumes the queue; returning `Err` stops it and hands
/// the error to the completion callback.
#[async_trait]
pub trait Step<S, E>: Send + Sync {
    /// The name of this step for logging.
    fn name(&self) -> &'static str;

    /// Execute the step with the queue scope.
    async fn execute(&self, scope: S) -> Result<(), E>;
}
