//! Fan-in over a fixed collection of promises.

use std::sync::{Arc, Mutex};

use crate::promise::Promise;
use crate::resolution::Resolution;
use crate::scheduler::default_scheduler;
use crate::Error;

struct Slots<T> {
    values: Vec<Option<T>>,
    filled: usize,
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + From<Error> + 'static,
{
    /// Wait for every input to fulfill and produce their values in input
    /// order, regardless of the order they settle in. The first input to
    /// reject rejects the output immediately; later rejections are no-ops.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    /// use futures::executor::block_on;
    ///
    /// let inputs = vec![
    ///     Promise::<i32, promise_chain::Error>::resolved(1),
    ///     Promise::resolved(2),
    ///     Promise::resolved(3),
    /// ];
    /// assert_eq!(block_on(Promise::all(inputs)), Ok(vec![1, 2, 3]));
    /// ```
    pub fn all(promises: Vec<Promise<T, E>>) -> Promise<Vec<T>, E> {
        let scheduler = promises
            .first()
            .map(|promise| promise.scheduler.clone())
            .unwrap_or_else(default_scheduler);
        let (joined, settlement) = Promise::<Vec<T>, E>::deferred_in(scheduler);
        let count = promises.len();
        // An empty input has no reaction to trip the counter; settle now.
        if count == 0 {
            settlement.fulfill(Vec::new());
            return joined;
        }
        let slots = Arc::new(Mutex::new(Slots {
            values: vec![None; count],
            filled: 0,
        }));
        for (index, promise) in promises.iter().enumerate() {
            let slots = slots.clone();
            let fulfilling = settlement.clone();
            let rejecting = settlement.clone();
            // The derived promise is discarded; only the reactions matter.
            promise.then(
                move |value| {
                    let mut slots = slots.lock().unwrap();
                    slots.values[index] = Some(value);
                    slots.filled += 1;
                    if slots.filled == count {
                        // Every slot is occupied once the counter reaches
                        // the input length.
                        let values = slots
                            .values
                            .iter_mut()
                            .map(|slot| slot.take().unwrap())
                            .collect();
                        drop(slots);
                        fulfilling.fulfill(values);
                    }
                    Resolution::Value(())
                },
                move |reason| {
                    rejecting.reject(reason.clone());
                    Resolution::Error(reason)
                },
            );
        }
        joined
    }
}
