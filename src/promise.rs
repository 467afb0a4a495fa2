//! The promise state machine and the resolution procedure.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crate::resolution::Resolution;
use crate::scheduler::{default_scheduler, Scheduler};
use crate::Error;

type Reaction<X> = Box<dyn FnOnce(X) + Send>;

enum State<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

/// Shared core of a promise. The reaction queues fill only while pending and
/// are drained exactly once, by the settlement that matches them.
struct Inner<T, E> {
    state: State<T, E>,
    on_fulfilled: Vec<Reaction<T>>,
    on_rejected: Vec<Reaction<E>>,
    wakers: Vec<Waker>,
}

impl<T, E> Inner<T, E> {
    fn new() -> Self {
        Self {
            state: State::Pending,
            on_fulfilled: Vec::new(),
            on_rejected: Vec::new(),
            wakers: Vec::new(),
        }
    }
}

/// A write-once container for the eventual outcome of an asynchronous
/// operation.
///
/// Cloning is shallow: every clone observes the same settlement. A settled
/// promise hands each consumer a clone of its value or reason, so `T` and
/// `E` must be `Clone`.
///
/// # Examples
///
/// ```
/// use promise_chain::Promise;
/// use futures::executor::block_on;
/// use std::thread;
///
/// let (promise, settlement) = Promise::<String, promise_chain::Error>::deferred();
/// let worker = thread::spawn(move || settlement.fulfill("ready".into()));
/// assert_eq!(block_on(promise), Ok("ready".into()));
/// worker.join().expect("The settling thread has panicked");
/// ```
pub struct Promise<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

/// Write-once capability for settling one promise.
///
/// The handle is cloneable and every clone shares one claim: the first
/// `resolve`/`fulfill`/`reject` call across all of them decides the outcome
/// and every later call is a silent no-op.
pub struct Settlement<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
    scheduler: Arc<dyn Scheduler>,
    claimed: Arc<AtomicBool>,
}

impl<T, E> Clone for Settlement<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            scheduler: self.scheduler.clone(),
            claimed: self.claimed.clone(),
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + From<Error> + 'static,
{
    /// Construct a promise and run `executor` synchronously with its
    /// settlement capability. An `Err` return is funneled into rejection;
    /// it never propagates to the caller.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Settlement<T, E>) -> Result<(), E>,
    {
        Self::new_in(default_scheduler(), executor)
    }

    /// Like [`Promise::new`] with an explicit scheduler. Promises derived
    /// through [`Promise::then`] inherit it.
    pub fn new_in<F>(scheduler: Arc<dyn Scheduler>, executor: F) -> Self
    where
        F: FnOnce(Settlement<T, E>) -> Result<(), E>,
    {
        let (promise, settlement) = Self::deferred_in(scheduler);
        let guard = settlement.clone();
        if let Err(reason) = executor(settlement) {
            guard.reject(reason);
        }
        promise
    }

    /// A pending promise plus the raw settlement capability, for callers
    /// (test harnesses included) that drive settlement without an executor
    /// closure.
    pub fn deferred() -> (Self, Settlement<T, E>) {
        Self::deferred_in(default_scheduler())
    }

    pub fn deferred_in(scheduler: Arc<dyn Scheduler>) -> (Self, Settlement<T, E>) {
        let inner = Arc::new(Mutex::new(Inner::new()));
        let promise = Self {
            inner: inner.clone(),
            scheduler: scheduler.clone(),
        };
        let settlement = Settlement {
            inner,
            scheduler,
            claimed: Arc::new(AtomicBool::new(false)),
        };
        (promise, settlement)
    }

    /// A promise fulfilling with `value`. Settlement is still deferred.
    pub fn resolved(value: T) -> Self {
        Self::new(move |settlement| {
            settlement.fulfill(value);
            Ok(())
        })
    }

    /// A promise rejecting with `reason`. Settlement is still deferred.
    pub fn rejected(reason: E) -> Self {
        Self::new(move |settlement| {
            settlement.reject(reason);
            Ok(())
        })
    }

    /// Fold an arbitrary [`Resolution`] into a promise. Handing in
    /// [`Resolution::Chain`] returns that promise itself, unchanged.
    pub fn from_resolution(resolution: Resolution<T, E>) -> Self {
        match resolution {
            Resolution::Chain(promise) => promise,
            other => {
                let (promise, settlement) = Self::deferred();
                settlement.resolve(other);
                promise
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.inner.lock().unwrap().state, State::Pending)
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self.inner.lock().unwrap().state, State::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.inner.lock().unwrap().state, State::Rejected(_))
    }

    /// Whether two handles observe the same settlement.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register a reaction for each outcome and return the derived promise
    /// immediately, whatever the current state.
    ///
    /// The chosen handler runs in a deferred turn with a clone of the
    /// settled value or reason, and whatever [`Resolution`] it returns is
    /// folded into the derived promise. Returning [`Resolution::Error`]
    /// rejects the derived promise without touching this one.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::{Promise, Resolution};
    /// use futures::executor::block_on;
    ///
    /// let promise: Promise<i32, promise_chain::Error> = Promise::resolved(2);
    /// let tripled = promise.then(
    ///     |n| Resolution::Value(n * 3),
    ///     |reason| Resolution::Error(reason),
    /// );
    /// assert_eq!(block_on(tripled), Ok(6));
    /// ```
    pub fn then<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Resolution<U, E> + Send + 'static,
        R: FnOnce(E) -> Resolution<U, E> + Send + 'static,
    {
        let (derived, settlement) = Promise::<U, E>::deferred_in(self.scheduler.clone());
        let rejecting = settlement.clone();
        self.register(
            Box::new(move |value| settlement.resolve(on_fulfilled(value))),
            Box::new(move |reason| rejecting.resolve(on_rejected(reason))),
        );
        derived
    }

    /// [`Promise::then`] with the default rejection handler: a rejection
    /// re-raises into the derived promise.
    pub fn then_fulfilled<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Resolution<U, E> + Send + 'static,
    {
        self.then(on_fulfilled, |reason| Resolution::Error(reason))
    }

    /// [`Promise::then`] with the default fulfillment handler: a value
    /// passes through unchanged.
    pub fn catch<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(E) -> Resolution<T, E> + Send + 'static,
    {
        self.then(|value| Resolution::Value(value), on_rejected)
    }

    /// Both default handlers: forward the outcome unchanged to a new link.
    pub fn forward(&self) -> Promise<T, E> {
        self.then(
            |value| Resolution::Value(value),
            |reason| Resolution::Error(reason),
        )
    }

    /// Dispatch on the current state: a settled promise defers the matching
    /// reaction with a clone of its outcome, a pending one queues both.
    fn register(&self, on_fulfilled: Reaction<T>, on_rejected: Reaction<E>) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            State::Pending => {
                inner.on_fulfilled.push(on_fulfilled);
                inner.on_rejected.push(on_rejected);
            }
            State::Fulfilled(ref value) => {
                let value = value.clone();
                drop(inner);
                self.scheduler.defer(Box::new(move || on_fulfilled(value)));
            }
            State::Rejected(ref reason) => {
                let reason = reason.clone();
                drop(inner);
                self.scheduler.defer(Box::new(move || on_rejected(reason)));
            }
        }
    }
}

impl<T, E> Settlement<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + From<Error> + 'static,
{
    /// Resolve with an arbitrary [`Resolution`]. The first call across this
    /// handle and its clones takes the write-once claim; later calls are
    /// no-ops.
    pub fn resolve(&self, resolution: Resolution<T, E>) {
        if self.claimed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.apply(resolution);
    }

    /// Fulfill with a plain value.
    pub fn fulfill(&self, value: T) {
        self.resolve(Resolution::Value(value));
    }

    /// Reject with a reason.
    pub fn reject(&self, reason: E) {
        self.resolve(Resolution::Error(reason));
    }

    /// The resolution procedure: fold `resolution` into this settlement's
    /// promise. Runs only after the write-once claim has been taken.
    fn apply(&self, resolution: Resolution<T, E>) {
        match resolution {
            Resolution::Value(value) => self.schedule(Outcome::Fulfilled(value)),
            Resolution::Error(reason) => self.schedule(Outcome::Rejected(reason)),
            Resolution::Chain(other) => {
                // Adopting itself would wait on this very settlement.
                if Arc::ptr_eq(&other.inner, &self.inner) {
                    self.schedule(Outcome::Rejected(E::from(Error::SelfResolution)));
                    return;
                }
                let fulfilling = self.clone();
                let rejecting = self.clone();
                other.register(
                    Box::new(move |value| fulfilling.apply(Resolution::Value(value))),
                    Box::new(move |reason| rejecting.schedule(Outcome::Rejected(reason))),
                );
            }
            Resolution::Thenable(thenable) => {
                // The thenable gets a fresh claim: whichever of its calls
                // comes first wins, and an Err return after a continuation
                // already fired is swallowed by the same latch.
                let settlement = Settlement {
                    inner: self.inner.clone(),
                    scheduler: self.scheduler.clone(),
                    claimed: Arc::new(AtomicBool::new(false)),
                };
                let on_failure = settlement.clone();
                if let Err(reason) = thenable.subscribe(settlement) {
                    on_failure.reject(reason);
                }
            }
        }
    }

    fn schedule(&self, outcome: Outcome<T, E>) {
        let inner = self.inner.clone();
        self.scheduler
            .defer(Box::new(move || settle(&inner, outcome)));
    }
}

enum Outcome<T, E> {
    Fulfilled(T),
    Rejected(E),
}

/// Commit a settlement: flip the state if still pending, drain the matching
/// reaction queue in FIFO order, discard the other, and wake parked tasks.
/// Reactions run with the lock released so they may register on this promise
/// again.
fn settle<T, E>(inner: &Arc<Mutex<Inner<T, E>>>, outcome: Outcome<T, E>)
where
    T: Clone,
    E: Clone,
{
    let mut guard = inner.lock().unwrap();
    if !matches!(guard.state, State::Pending) {
        return;
    }
    match outcome {
        Outcome::Fulfilled(value) => {
            guard.state = State::Fulfilled(value.clone());
            let reactions = std::mem::take(&mut guard.on_fulfilled);
            guard.on_rejected.clear();
            let wakers = std::mem::take(&mut guard.wakers);
            drop(guard);
            for reaction in reactions {
                reaction(value.clone());
            }
            for waker in wakers {
                waker.wake();
            }
        }
        Outcome::Rejected(reason) => {
            guard.state = State::Rejected(reason.clone());
            let reactions = std::mem::take(&mut guard.on_rejected);
            guard.on_fulfilled.clear();
            let wakers = std::mem::take(&mut guard.wakers);
            drop(guard);
            for reaction in reactions {
                reaction(reason.clone());
            }
            for waker in wakers {
                waker.wake();
            }
        }
    }
}

impl<T, E> Future for Promise<T, E>
where
    T: Clone,
    E: Clone,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            State::Pending => {
                // Polls may come from several tasks; park one waker apiece.
                if !inner.wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
                    inner.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
            State::Fulfilled(ref value) => Poll::Ready(Ok(value.clone())),
            State::Rejected(ref reason) => Poll::Ready(Err(reason.clone())),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock().unwrap();
        let state = match guard.state {
            State::Pending => "pending",
            State::Fulfilled(_) => "fulfilled",
            State::Rejected(_) => "rejected",
        };
        write!(f, "Promise({state})")
    }
}

impl<T, E> fmt::Debug for Settlement<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Settlement(claimed: {})", self.claimed.load(Ordering::SeqCst))
    }
}
