//! Deferred execution for promise settlement.
//!
//! A promise never leaves its pending state synchronously; every transition
//! is pushed through a [`Scheduler`]. The default is a process-wide
//! [`QueueScheduler`] whose single worker drains tasks in FIFO order, which
//! is what keeps reactions firing in the order they were registered.

use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send>;

/// Capability for running a task strictly after the current call stack
/// unwinds. Tasks handed in from one thread must run in the order they were
/// handed in.
pub trait Scheduler: Send + Sync {
    fn defer(&self, task: Task);
}

/// Runs tasks on a dedicated worker thread fed by an `mpsc` channel, so the
/// queue drains in submission order.
#[derive(Debug)]
pub struct QueueScheduler {
    sender: Mutex<Sender<Task>>,
}

impl QueueScheduler {
    pub fn new() -> Self {
        let (sender, receiver) = channel::<Task>();
        thread::spawn(move || {
            while let Ok(task) = receiver.recv() {
                task();
            }
        });
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl Default for QueueScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for QueueScheduler {
    fn defer(&self, task: Task) {
        // The worker only exits once every sender is gone, so a failed send
        // means the process is tearing down and the task can be dropped.
        let _ = self.sender.lock().unwrap().send(task);
    }
}

/// Runs tasks immediately on the calling thread. Settlement stops being
/// deferred, which makes single-threaded tests deterministic without an
/// executor.
#[derive(Debug, Default)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn defer(&self, task: Task) {
        task();
    }
}

/// The scheduler used by promises constructed without an explicit one:
/// a single [`QueueScheduler`] shared by the whole process.
pub fn default_scheduler() -> Arc<dyn Scheduler> {
    static GLOBAL: OnceLock<Arc<QueueScheduler>> = OnceLock::new();
    GLOBAL.get_or_init(|| Arc::new(QueueScheduler::new())).clone()
}
