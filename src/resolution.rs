//! What a continuation hands back, and the duck-typed thenable contract.
//!
//! Promises/A+ probes a handler's return value at runtime to decide between
//! "plain value", "promise of the same family", and "foreign thenable". Here
//! that dispatch is an explicit tagged union. A fourth variant carries a
//! handler failure, the typed stand-in for a thrown exception.

use crate::promise::{Promise, Settlement};

/// What a handler (or an executor) resolves a promise with.
pub enum Resolution<T, E> {
    /// A plain value; the target promise fulfills with it.
    Value(T),
    /// Another promise; the target adopts its eventual outcome.
    Chain(Promise<T, E>),
    /// A foreign future-like object, unwrapped through
    /// [`Thenable::subscribe`].
    Thenable(Box<dyn Thenable<T, E>>),
    /// A failure; the target promise rejects with it.
    Error(E),
}

/// Interoperability contract for foreign future-like values.
///
/// `subscribe` receives the one-shot [`Settlement`] of the adopting promise.
/// The first `fulfill`/`reject` call on it wins and every later call is
/// ignored, so a misbehaving thenable that fires its continuation twice, or
/// fires it and then returns `Err`, cannot settle the promise a second time.
///
/// Any `FnOnce(Settlement<T, E>) -> Result<(), E>` closure is a `Thenable`.
///
/// # Examples
///
/// ```
/// use promise_chain::{Promise, Resolution, Settlement, Thenable};
/// use futures::executor::block_on;
///
/// struct Answer;
///
/// impl Thenable<i32, promise_chain::Error> for Answer {
///     fn subscribe(
///         self: Box<Self>,
///         settlement: Settlement<i32, promise_chain::Error>,
///     ) -> Result<(), promise_chain::Error> {
///         settlement.fulfill(42);
///         Ok(())
///     }
/// }
///
/// let promise: Promise<i32, promise_chain::Error> =
///     Promise::from_resolution(Resolution::Thenable(Box::new(Answer)));
/// assert_eq!(block_on(promise), Ok(42));
/// ```
pub trait Thenable<T, E>: Send {
    fn subscribe(self: Box<Self>, settlement: Settlement<T, E>) -> Result<(), E>;
}

impl<T, E, F> Thenable<T, E> for F
where
    F: FnOnce(Settlement<T, E>) -> Result<(), E> + Send,
{
    fn subscribe(self: Box<Self>, settlement: Settlement<T, E>) -> Result<(), E> {
        (self)(settlement)
    }
}

impl<T, E> From<Promise<T, E>> for Resolution<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Resolution::Chain(promise)
    }
}

impl<T, E> From<Result<T, E>> for Resolution<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Resolution::Value(value),
            Err(reason) => Resolution::Error(reason),
        }
    }
}
