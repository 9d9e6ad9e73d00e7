use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use tracing::{debug, error};

use crate::error::{MessengerError, Result};

/// A unit of work submitted to a [`TaskQueue`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A named serial execution context.
///
/// Each queue owns one worker thread; tasks run one at a time in submission
/// order. Cloning is cheap and every clone feeds the same worker. The worker
/// exits once the last handle is dropped and the backlog has drained.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    sender: mpsc::Sender<Task>,
    worker: ThreadId,
}

impl TaskQueue {
    /// Start a new serial queue with its own worker thread.
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Task>();
        let worker_name = name.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_worker(&worker_name, receiver))
            .map_err(|source| MessengerError::Spawn {
                name: name.clone(),
                source,
            })?;

        debug!(queue = %name, "task queue started");

        Ok(Self {
            inner: Arc::new(Inner {
                worker: handle.thread().id(),
                name,
                sender,
            }),
        })
    }

    /// Queue name, also used as the worker thread name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Submit a task to run after everything already queued.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> Result<()> {
        self.inner
            .sender
            .send(Box::new(task))
            .map_err(|_| MessengerError::QueueClosed(self.inner.name.clone()))
    }

    /// Whether the calling thread is this queue's worker.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.worker
    }

    /// Whether two handles feed the same worker.
    pub fn same_queue(&self, other: &TaskQueue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.inner.name)
            .finish()
    }
}

fn run_worker(name: &str, receiver: mpsc::Receiver<Task>) {
    for task in receiver {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(task)) {
            error!(
                queue = %name,
                panic = %describe_panic(panic.as_ref()),
                "task panicked; queue keeps running"
            );
        }
    }
    debug!(queue = %name, "task queue stopped");
}

/// Best-effort text of a panic payload.
pub fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn tasks_run_in_submission_order() {
        let queue = TaskQueue::spawn("test.order").expect("queue should spawn");
        let (tx, rx) = mpsc::channel();
        for i in 0..50 {
            let tx = tx.clone();
            queue.submit(move || tx.send(i).unwrap()).unwrap();
        }
        let seen: Vec<i32> = (0..50)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn tasks_run_on_worker_thread() {
        let queue = TaskQueue::spawn("test.worker").expect("queue should spawn");
        assert!(!queue.is_current());
        let (tx, rx) = mpsc::channel();
        let this_queue = queue.clone();
        queue
            .submit(move || {
                tx.send((this_queue.is_current(), thread::current().name().map(str::to_string)))
                    .unwrap()
            })
            .unwrap();
        let (current, name) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(current);
        assert_eq!(name.as_deref(), Some("test.worker"));
    }

    #[test]
    fn panicking_task_does_not_stop_queue() {
        let queue = TaskQueue::spawn("test.panic").expect("queue should spawn");
        queue.submit(|| panic!("boom")).unwrap();
        let (tx, rx) = mpsc::channel();
        queue.submit(move || tx.send(()).unwrap()).unwrap();
        rx.recv_timeout(Duration::from_secs(2))
            .expect("queue should survive a panicking task");
    }

    #[test]
    fn describe_panic_reads_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(describe_panic(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(describe_panic(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(describe_panic(payload.as_ref()), "non-string panic payload");
    }
}
