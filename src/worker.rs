//! Worker pool members.
//!
//! Each worker owns one dedicated tag-source connection and pulls tasks
//! from the shared queue until it receives an end-of-work marker. The
//! worker does not decide when to stop; the bridge owns the queue and
//! enqueues one marker per worker during shutdown.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::broker::Broker;
use crate::error::{Outcome, Problem};
use crate::queue::{QueueItem, Task, TaskQueue};
use crate::source::{TagReader, TagSource};

/// Thread-bound executor capability.
///
/// `request_stop` only signals intent; delivering the end-of-work marker
/// is the queue owner's job, since only it knows how many markers are
/// needed and in what order.
pub trait Worker: Send {
    /// Spawn the worker's thread. Starting a started worker fails.
    fn start(&mut self) -> Outcome<()>;

    /// Signal intent to stop. Performs no queue action.
    fn request_stop(&self);

    /// Block until the worker's thread has fully exited, connection
    /// released included. Joining a never-started worker returns
    /// immediately.
    fn join(&mut self);

    /// The problem that terminated this worker early, if any.
    fn failure(&self) -> Option<Problem> {
        None
    }
}

/// Worker that reads tags over its own [`TagSource`] connection and
/// forwards readings to the shared broker.
pub struct PollWorker {
    id: usize,
    queue: TaskQueue,
    source: Arc<dyn TagSource>,
    broker: Arc<dyn Broker>,
    handle: Option<JoinHandle<()>>,
    failure: Arc<Mutex<Option<Problem>>>,
}

impl PollWorker {
    /// Create a worker. The id is assigned by the pool owner and is used
    /// only for log correlation.
    pub fn new(
        id: usize,
        queue: TaskQueue,
        source: Arc<dyn TagSource>,
        broker: Arc<dyn Broker>,
    ) -> Self {
        debug!(worker = id, "worker created");
        Self {
            id,
            queue,
            source,
            broker,
            handle: None,
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// This worker's id.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Worker for PollWorker {
    fn start(&mut self) -> Outcome<()> {
        if self.handle.is_some() {
            return Err(Problem::new("worker already started")
                .with_detail("worker", self.id.to_string()));
        }

        // A fresh lifecycle must not report a failure from the last one.
        *self.failure.lock() = None;

        let id = self.id;
        let queue = self.queue.clone();
        let source = Arc::clone(&self.source);
        let broker = Arc::clone(&self.broker);
        let failure = Arc::clone(&self.failure);

        let handle = thread::Builder::new()
            .name(format!("poll-worker-{}", id))
            .spawn(move || run(id, &queue, source.as_ref(), broker.as_ref(), &failure))
            .map_err(|e| {
                Problem::from_error("failed to spawn worker thread", e)
                    .with_detail("worker", id.to_string())
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    fn request_stop(&self) {
        debug!(worker = self.id, "stop requested");
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(worker = self.id, "joining worker thread");
            let _ = handle.join();
            debug!(worker = self.id, "worker thread joined");
        }
    }

    fn failure(&self) -> Option<Problem> {
        self.failure.lock().clone()
    }
}

/// Worker thread body: connect once, drain the queue until the marker,
/// release the connection on every exit path.
fn run(
    id: usize,
    queue: &TaskQueue,
    source: &dyn TagSource,
    broker: &dyn Broker,
    failure: &Mutex<Option<Problem>>,
) {
    debug!(worker = id, "connecting to tag source");
    let mut reader = match source.connect() {
        Ok(reader) => reader,
        Err(problem) => {
            // Fatal to this worker only; the bridge surfaces it at stop.
            error!(worker = id, %problem, "tag source connection failed");
            *failure.lock() = Some(problem);
            return;
        }
    };

    debug!(worker = id, "entering task loop");
    loop {
        match queue.get() {
            QueueItem::Shutdown => {
                debug!(worker = id, "received end-of-work marker");
                break;
            }
            QueueItem::Read(task) => execute(id, reader.as_mut(), broker, &task),
        }
    }

    reader.close();
    debug!(worker = id, "worker loop finished");
}

/// Execute one task, converting any failure into a logged problem.
///
/// This is the boundary that keeps the worker alive: read and publish
/// errors come back as problems, and a panic out of adapter code is
/// caught and converted here as well.
fn execute(id: usize, reader: &mut dyn TagReader, broker: &dyn Broker, task: &Task) {
    let outcome = catch_unwind(AssertUnwindSafe(|| -> Outcome<_> {
        let value = reader.read(task.path())?;
        broker.publish(task.topic(), &value.to_string())?;
        Ok(value)
    }))
    .unwrap_or_else(|_| {
        Err(Problem::new("task execution panicked").with_detail("tag", task.path().as_str()))
    });

    match outcome {
        Ok(value) => {
            debug!(worker = id, tag = %task.path(), %value, "published reading");
        }
        Err(problem) => {
            warn!(worker = id, tag = %task.path(), %problem, "task failed");
        }
    }
}
