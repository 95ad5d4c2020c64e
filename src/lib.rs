//! # Stepqueue
//!
//! Run steps one after another, each one handing control back through a
//! one-shot continuation.
//!
//! - **Strict ordering** - step N+1 never starts before step N fires its continuation
//! - **Short-circuit errors** - the first reported error skips every remaining step
//! - **Fixed scope** - every step and the completion callback see the same values
//! - **Misuse is loud** - firing a continuation twice panics instead of re-running steps
//!
//! ## Quick Start
//!
//! ```rust
//! use stepqueue::Queue;
//!
//! Queue::<_, String>::with_scope("ctx")
//!     .add(|scope, next| {
//!         assert_eq!(scope, "ctx");
//!         next.done();
//!     })
//!     .add(|_, next| next.fail("boom".to_string()))
//!     .end(|result| assert_eq!(result, Err("boom".to_string())));
//! ```
//!
//! ## Async steps
//!
//! Steps may fire their continuation later, from another thread or task.
//! Types implementing [`Step`] are spawned on the current tokio runtime:
//!
//! ```rust,ignore
//! let scope = Queue::with_scope(db)
//!     .step(Migrate)
//!     .step(Seed)
//!     .finish()
//!     .await?;
//! ```

pub mod error;
pub mod next;
pub mod queue;
pub mod step;

pub use error::{ContinuationReused, FinishError};
pub use next::Next;
pub use queue::{BoxStep, Queue};
pub use step::Step;
