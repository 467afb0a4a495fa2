#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use promise_chain::{Promise, Resolution, Settlement, Thenable};
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
    enum TestError {
        #[error("boom")]
        Boom,
        #[error(transparent)]
        Promise(#[from] promise_chain::Error),
    }

    #[test]
    fn settlement_is_write_once() {
        let (promise, settlement) = Promise::<i32, TestError>::deferred();
        settlement.fulfill(1);
        settlement.fulfill(2);
        settlement.reject(TestError::Boom);
        assert_eq!(block_on(promise), Ok(1));
    }

    #[test]
    fn handlers_run_in_a_deferred_turn() {
        let promise = Promise::<i32, TestError>::resolved(5);
        let seen: Promise<thread::ThreadId, TestError> =
            promise.then_fulfilled(|_| Resolution::Value(thread::current().id()));
        let handler_thread = block_on(seen).unwrap();
        assert_ne!(handler_thread, thread::current().id());
    }

    #[test]
    fn reactions_fire_in_registration_order() {
        let (promise, settlement) = Promise::<i32, TestError>::deferred();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = log.clone();
        let a = promise.then_fulfilled(move |n| {
            first.lock().unwrap().push(1);
            Resolution::Value(n)
        });
        let second = log.clone();
        let b = promise.then_fulfilled(move |n| {
            second.lock().unwrap().push(2);
            Resolution::Value(n)
        });
        assert!(log.lock().unwrap().is_empty());
        settlement.fulfill(0);
        assert_eq!(block_on(a), Ok(0));
        assert_eq!(block_on(b), Ok(0));
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn resolving_a_promise_with_itself_rejects() {
        let (promise, settlement) = Promise::<i32, TestError>::deferred();
        let stash: Arc<Mutex<Option<Promise<i32, TestError>>>> = Arc::new(Mutex::new(None));
        let stashed = stash.clone();
        let derived = promise.then_fulfilled(move |_| {
            let itself = stashed.lock().unwrap().take().unwrap();
            Resolution::Chain(itself)
        });
        *stash.lock().unwrap() = Some(derived.clone());
        settlement.fulfill(1);
        assert_eq!(
            block_on(derived),
            Err(TestError::Promise(promise_chain::Error::SelfResolution))
        );
    }

    #[test]
    fn adoption_unwraps_a_chain_settled_from_another_thread() {
        let (inner, inner_settle) = Promise::<i32, TestError>::deferred();
        let (outer, outer_settle) = Promise::<i32, TestError>::deferred();
        outer_settle.resolve(Resolution::Chain(inner));
        let worker = thread::spawn(move || inner_settle.fulfill(11));
        assert_eq!(block_on(outer), Ok(11));
        worker.join().expect("The settling thread has panicked");
    }

    #[test]
    fn adoption_unwraps_nested_promises_to_the_innermost_value() {
        let innermost = Promise::<i32, TestError>::resolved(7);
        let middle = Promise::new(move |s| {
            s.resolve(Resolution::Chain(innermost));
            Ok(())
        });
        let outer = Promise::new(move |s| {
            s.resolve(Resolution::Chain(middle));
            Ok(())
        });
        assert_eq!(block_on(outer), Ok(7));
    }

    struct Eager(i32);

    impl Thenable<i32, TestError> for Eager {
        fn subscribe(
            self: Box<Self>,
            settlement: Settlement<i32, TestError>,
        ) -> Result<(), TestError> {
            // Fires twice; only the first call may count.
            settlement.fulfill(self.0);
            settlement.fulfill(self.0 + 1);
            Ok(())
        }
    }

    #[test]
    fn thenable_interop_takes_the_first_call_only() {
        let promise: Promise<i32, TestError> =
            Promise::from_resolution(Resolution::Thenable(Box::new(Eager(42))));
        assert_eq!(block_on(promise), Ok(42));
    }

    #[test]
    fn thenable_may_resolve_with_another_promise() {
        let target = Promise::<i32, TestError>::resolved(6);
        let promise: Promise<i32, TestError> = Promise::from_resolution(Resolution::Thenable(
            Box::new(move |s: Settlement<i32, TestError>| {
                s.resolve(Resolution::Chain(target));
                Ok(())
            }),
        ));
        assert_eq!(block_on(promise), Ok(6));
    }

    #[test]
    fn default_handlers_pass_the_outcome_through() {
        let fulfilled = Promise::<i32, TestError>::resolved(4).forward();
        assert_eq!(block_on(fulfilled), Ok(4));
        let rejected = Promise::<i32, TestError>::rejected(TestError::Boom).forward();
        assert_eq!(block_on(rejected), Err(TestError::Boom));
    }

    #[test]
    fn chains_compose_left_to_right() {
        let promise = Promise::<i32, TestError>::resolved(1);
        let sum = promise
            .then_fulfilled(|n| Resolution::Value(n + 1))
            .then_fulfilled(|n| Resolution::Value(n * 10));
        assert_eq!(block_on(sum), Ok(20));
    }

    #[test]
    fn a_handler_failure_skips_to_the_next_rejection_handler() {
        let promise = Promise::<i32, TestError>::resolved(1);
        let recovered = promise
            .then_fulfilled(|_| Resolution::Error(TestError::Boom))
            .then_fulfilled(|n: i32| Resolution::Value(n + 1))
            .catch(|_| Resolution::Value(0));
        assert_eq!(block_on(recovered), Ok(0));
    }

    #[test]
    fn all_collects_values_in_input_order() {
        let (p1, s1) = Promise::<i32, TestError>::deferred();
        let (p2, s2) = Promise::<i32, TestError>::deferred();
        let (p3, s3) = Promise::<i32, TestError>::deferred();
        let joined = Promise::all(vec![p1, p2, p3]);
        s3.fulfill(3);
        s1.fulfill(1);
        s2.fulfill(2);
        assert_eq!(block_on(joined), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn all_rejects_without_waiting_for_pending_inputs() {
        let (pending, _keep) = Promise::<i32, TestError>::deferred();
        let joined = Promise::all(vec![pending, Promise::rejected(TestError::Boom)]);
        assert_eq!(block_on(joined), Err(TestError::Boom));
    }

    #[test]
    fn all_of_an_empty_collection_fulfills_immediately() {
        let joined = Promise::<i32, TestError>::all(Vec::new());
        assert_eq!(block_on(joined), Ok(Vec::new()));
    }
}
