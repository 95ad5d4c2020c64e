//! One-shot continuation handed to every dispatched step.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::error;

use crate::error::ContinuationReused;
use crate::queue::Run;

/// Continuation bound to a single dispatch of a single step.
///
/// Calling [`done`](Next::done), [`fail`](Next::fail) or
/// [`resume`](Next::resume) hands control back to the queue. Clones share one
/// fired flag: across all clones the continuation may fire exactly once, and
/// a second invocation panics with [`ContinuationReused`].
pub struct Next<S, E> {
    run: Arc<Run<S, E>>,
    step: usize,
    fired: Arc<AtomicBool>,
}

impl<S, E> Next<S, E>
where
    S: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(run: Arc<Run<S, E>>, step: usize) -> Self {
        Self {
            run,
            step,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Index of the step this continuation belongs to.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Returns true once any clone of this continuation has fired.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Resume the queue with no error.
    pub fn done(self) {
        self.resume(None);
    }

    /// Stop the queue and deliver `err` to the completion callback.
    pub fn fail(self, err: E) {
        self.resume(Some(err));
    }

    /// Resume the queue, stopping it if `outcome` carries an error.
    ///
    /// # Panics
    ///
    /// Panics with [`ContinuationReused`] if this continuation, or any clone
    /// of it, already fired. The queue is not advanced in that case.
    pub fn resume(self, outcome: Option<E>) {
        if self.fired.swap(true, Ordering::AcqRel) {
            let fault = ContinuationReused { step: self.step };
            error!(queue = self.run.name(), step = self.step, "continuation invoked twice");
            panic!("{fault}");
        }
        self.run.advance(outcome);
    }
}

impl<S, E> Clone for Next<S, E> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
            step: self.step,
            fired: Arc::clone(&self.fired),
        }
    }
}

impl<S, E> fmt::Debug for Next<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("queue", &self.run.name())
            .field("step", &self.step)
            .field("fired", &self.fired.load(Ordering::Acquire))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::Queue;

    #[test]
    fn test_clones_share_fired_flag() {
        let seen = Arc::new(Mutex::new(None));
        let stash = seen.clone();

        Queue::<(), String>::new()
            .add(move |(), next: Next<(), String>| {
                *stash.lock().unwrap() = Some(next.clone());
                assert!(!next.has_fired());
                next.done();
            })
            .end(|_| {});

        let copy = seen.lock().unwrap().take().unwrap();
        assert!(copy.has_fired());
        assert_eq!(copy.step(), 0);
    }

    #[test]
    #[should_panic(expected = "continuation for step 0 invoked twice")]
    fn test_second_fire_through_clone_panics() {
        Queue::<(), String>::new()
            .add(|(), next: Next<(), String>| {
                let again = next.clone();
                next.done();
                again.done();
            })
            .end(|_| {});
    }

    #[test]
    fn test_debug_names_queue_and_step() {
        let rendered = Arc::new(Mutex::new(String::new()));
        let out = rendered.clone();

        Queue::<(), String>::new()
            .named("audit")
            .add(|(), next: Next<(), String>| next.done())
            .add(move |(), next: Next<(), String>| {
                *out.lock().unwrap() = format!("{next:?}");
                next.done();
            })
            .end(|_| {});

        let rendered = rendered.lock().unwrap();
        assert!(rendered.contains("audit"));
        assert!(rendered.contains("step: 1"));
        assert!(rendered.contains("fired: false"));
    }
}
