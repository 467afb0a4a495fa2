//! Chainable promises with Promises/A+ resolution semantics.
//!
//! A [`Promise`] is a write-once container for the eventual outcome of an
//! asynchronous operation. Settlement always happens through a deferred
//! [`Scheduler`] task, never synchronously inside the call that triggered it.
//! Reactions registered with [`Promise::then`] run in registration order, and
//! a handler may hand back a plain value, another promise to adopt, or an
//! arbitrary [`Thenable`].
//!
//! # Examples
//!
//! ```
//! use promise_chain::{Promise, Resolution};
//! use futures::executor::block_on;
//!
//! let promise: Promise<i32, promise_chain::Error> = Promise::new(|settlement| {
//!     settlement.fulfill(40);
//!     Ok(())
//! });
//! let sum = promise.then_fulfilled(|n| Resolution::Value(n + 2));
//! assert_eq!(block_on(sum), Ok(42));
//! ```

mod combine;
pub mod promise;
pub mod resolution;
pub mod scheduler;

pub use promise::{Promise, Settlement};
pub use resolution::{Resolution, Thenable};
pub use scheduler::{default_scheduler, InlineScheduler, QueueScheduler, Scheduler, Task};

/// Failures raised by the promise machinery itself, as opposed to whatever
/// reason type user code rejects with. Reason types opt in with
/// `From<Error>`, which a `#[from]` variant in a `thiserror` enum provides.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A promise was asked to adopt its own resolution. Settling it would
    /// wait on itself forever, so the cycle is reported as a rejection.
    #[error("promise cannot adopt its own resolution")]
    SelfResolution,
}
