//! The shared work queue between the scheduler and the worker pool.
//!
//! A cycle enqueues one [`Task`] per configured tag; idle workers race to
//! dequeue them. Shutdown is signalled in-band: the bridge enqueues one
//! [`QueueItem::Shutdown`] marker per worker, and each marker terminates
//! exactly one consumer.

use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};

use crate::domain::TagPath;

/// One scheduled tag read, bound to the topic its reading publishes under.
///
/// Tasks share their path and topic text; a poll cycle allocates nothing
/// beyond the task values themselves, so steady-state memory stays flat
/// over long runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    path: TagPath,
    topic: Arc<str>,
}

impl Task {
    /// Create a read task for one tag.
    pub fn new(path: TagPath, topic: Arc<str>) -> Self {
        Self { path, topic }
    }

    /// The tag to read.
    pub fn path(&self) -> &TagPath {
        &self.path
    }

    /// The topic the reading publishes under.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// An item delivered to a worker: either work or the end-of-work marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    /// Read a tag and publish the result.
    Read(Task),
    /// Terminate the receiving worker's loop.
    Shutdown,
}

/// Thread-safe FIFO queue with blocking consumers.
///
/// Cloning yields another handle onto the same queue. Producers never
/// block; consumers block in [`TaskQueue::get`] until an item arrives.
/// Items are delivered in FIFO order and each item goes to exactly one
/// consumer.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: Sender<QueueItem>,
    rx: Receiver<QueueItem>,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    /// Append an item to the back of the queue. Never blocks.
    pub fn put(&self, item: QueueItem) {
        // Cannot fail: every handle holds both ends, so the channel stays
        // open for as long as any handle exists.
        let _ = self.tx.send(item);
    }

    /// Block until an item is available and return it.
    pub fn get(&self) -> QueueItem {
        // recv only errs once every sender is gone, which a live handle
        // rules out; treat that terminal state as a shutdown signal anyway.
        self.rx.recv().unwrap_or(QueueItem::Shutdown)
    }

    /// Pop the front item immediately, without blocking.
    pub fn try_get(&self) -> Option<QueueItem> {
        self.rx.try_recv().ok()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
