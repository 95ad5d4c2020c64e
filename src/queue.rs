//! Queue builder and sequential executor.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::FinishError;
use crate::next::Next;
use crate::step::Step;

/// A boxed step function.
///
/// Useful for registering closures of different types in one batch with
/// [`Queue::add_all`].
pub type BoxStep<S, E> = Box<dyn FnOnce(S, Next<S, E>) + Send>;

/// Type alias for the completion callback.
type Completion<S, E> = Box<dyn FnOnce(Result<S, E>) + Send>;

const DEFAULT_NAME: &str = "queue";

/// Ordered list of steps run one after another.
///
/// Every step receives a clone of the scope followed by a [`Next`]
/// continuation, and must fire that continuation exactly once. The queue is
/// consumed when it runs, so it can only be executed once and no steps can be
/// added after execution starts.
pub struct Queue<S, E> {
    name: &'static str,
    scope: S,
    steps: VecDeque<BoxStep<S, E>>,
}

impl<E> Queue<(), E>
where
    E: Send + 'static,
{
    /// Create a queue with an empty scope.
    pub fn new() -> Self {
        Self::with_scope(())
    }
}

impl<E> Default for Queue<(), E>
where
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, E> Queue<S, E>
where
    S: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// Create a queue whose steps and completion all receive `scope`.
    pub fn with_scope(scope: S) -> Self {
        Self {
            name: DEFAULT_NAME,
            scope,
            steps: VecDeque::new(),
        }
    }

    /// Set the name reported in log events.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Get the queue name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the scope handed to every step.
    pub fn scope(&self) -> &S {
        &self.scope
    }

    /// Number of registered steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no steps are registered.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Append a step.
    pub fn add<F>(mut self, step: F) -> Self
    where
        F: FnOnce(S, Next<S, E>) + Send + 'static,
    {
        self.steps.push_back(Box::new(step));
        self
    }

    /// Append every step from `steps`, keeping their order.
    pub fn add_all<I, F>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: FnOnce(S, Next<S, E>) + Send + 'static,
    {
        self.extend(steps);
        self
    }

    /// Append an async [`Step`].
    ///
    /// When dispatched, the step's future is spawned on the current tokio
    /// runtime and its result resumes the queue. Dispatching outside a
    /// runtime panics.
    pub fn step<T>(self, step: T) -> Self
    where
        T: Step<S, E> + 'static,
    {
        self.add(move |scope, next: Next<S, E>| {
            debug!(step = next.step(), name = step.name(), "spawning async step");
            tokio::spawn(async move {
                match step.execute(scope).await {
                    Ok(()) => next.done(),
                    Err(e) => next.fail(e),
                }
            });
        })
    }

    /// Run all steps in order, then invoke `completion`.
    ///
    /// `completion` receives `Ok(scope)` once every step has succeeded, or
    /// `Err(e)` as soon as a step fails with `e`. The first step is dispatched
    /// before this call returns.
    pub fn end<F>(self, completion: F)
    where
        F: FnOnce(Result<S, E>) + Send + 'static,
    {
        let run = Arc::new(Run {
            name: self.name,
            scope: self.scope,
            state: Mutex::new(RunState {
                steps: self.steps,
                completion: Some(Box::new(completion)),
                dispatched: 0,
                driving: false,
                pending: None,
            }),
        });
        run.advance(None);
    }

    /// Alias for [`end`](Queue::end).
    pub fn done<F>(self, completion: F)
    where
        F: FnOnce(Result<S, E>) + Send + 'static,
    {
        self.end(completion);
    }

    /// Run all steps and wait for the outcome.
    ///
    /// Resolves to [`FinishError::Abandoned`] if a step drops its
    /// continuation without firing it.
    pub async fn finish(self) -> Result<S, FinishError<E>> {
        let (tx, rx) = oneshot::channel();
        self.end(move |result| {
            let _ = tx.send(result);
        });

        match rx.await {
            Ok(result) => result.map_err(FinishError::Step),
            Err(_) => Err(FinishError::Abandoned),
        }
    }
}

impl<S, E, F> Extend<F> for Queue<S, E>
where
    F: FnOnce(S, Next<S, E>) + Send + 'static,
{
    fn extend<I: IntoIterator<Item = F>>(&mut self, steps: I) {
        for step in steps {
            self.steps.push_back(Box::new(step));
        }
    }
}

impl<S: fmt::Debug, E> fmt::Debug for Queue<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("steps", &self.steps.len())
            .finish()
    }
}

/// Shared state of one execution.
pub(crate) struct Run<S, E> {
    name: &'static str,
    scope: S,
    state: Mutex<RunState<S, E>>,
}

struct RunState<S, E> {
    steps: VecDeque<BoxStep<S, E>>,
    completion: Option<Completion<S, E>>,
    dispatched: usize,
    /// A frame is inside the advance loop.
    driving: bool,
    /// Outcome reported while the driver was still inside a step call.
    pending: Option<Option<E>>,
}

enum Action<S, E> {
    Dispatch {
        step: BoxStep<S, E>,
        index: usize,
        remaining: usize,
    },
    Finish(Result<S, E>),
}

impl<S, E> Run<S, E> {
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }
}

impl<S, E> Run<S, E>
where
    S: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    fn lock(&self) -> MutexGuard<'_, RunState<S, E>> {
        // User code never runs under this lock.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance past the step that just reported `outcome`.
    ///
    /// Continuations fired synchronously from within a step only park their
    /// outcome; the frame already driving picks it up, so a long chain of
    /// synchronous steps runs in a loop rather than recursing.
    pub(crate) fn advance(self: &Arc<Self>, outcome: Option<E>) {
        {
            let mut state = self.lock();
            if state.driving {
                state.pending = Some(outcome);
                return;
            }
            state.driving = true;
        }

        let mut outcome = outcome;
        loop {
            match self.next_action(outcome.take()) {
                Action::Dispatch {
                    step,
                    index,
                    remaining,
                } => {
                    debug!(queue = self.name, step = index, remaining, "dispatching step");
                    step(self.scope.clone(), Next::new(Arc::clone(self), index));

                    let mut state = self.lock();
                    match state.pending.take() {
                        Some(reported) => outcome = reported,
                        None => {
                            state.driving = false;
                            return;
                        }
                    }
                }
                Action::Finish(result) => {
                    let (completion, skipped, steps) = {
                        let mut state = self.lock();
                        state.driving = false;
                        let skipped = std::mem::take(&mut state.steps);
                        (state.completion.take(), skipped, state.dispatched)
                    };
                    match &result {
                        Ok(_) => debug!(queue = self.name, steps, "queue completed"),
                        Err(_) => warn!(
                            queue = self.name,
                            step = steps.saturating_sub(1),
                            skipped = skipped.len(),
                            "step failed, queue stopped"
                        ),
                    }
                    drop(skipped);

                    if let Some(completion) = completion {
                        completion(result);
                    }
                    return;
                }
            }
        }
    }

    fn next_action(&self, outcome: Option<E>) -> Action<S, E> {
        if let Some(err) = outcome {
            return Action::Finish(Err(err));
        }

        let mut state = self.lock();
        match state.steps.pop_front() {
            Some(step) => {
                let index = state.dispatched;
                state.dispatched += 1;
                Action::Dispatch {
                    step,
                    index,
                    remaining: state.steps.len(),
                }
            }
            None => Action::Finish(Ok(self.scope.clone())),
        }
    }
}
