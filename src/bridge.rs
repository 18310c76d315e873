//! Bridge orchestration: ties the queue, worker pool, timer, and broker
//! together behind a start/stop lifecycle.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::broker::Broker;
use crate::domain::{Milliseconds, TagPath};
use crate::error::{Outcome, Problem};
use crate::queue::{QueueItem, Task, TaskQueue};
use crate::source::TagSource;
use crate::timer::CycleTimer;
use crate::worker::{PollWorker, Worker};

/// Lifecycle state of a [`Bridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Constructed or fully stopped.
    Idle,
    /// Timer firing, workers draining the queue, broker connected.
    Running,
    /// Shutdown in progress: timer cancelled, markers being drained.
    Stopping,
}

/// Orchestrator owning the task queue, the worker pool, the cycle timer,
/// and the broker.
///
/// The pool is fixed at construction and never resized. `start` connects
/// the broker, starts every worker, and begins firing poll cycles; `stop`
/// cancels the timer first (no new tasks), delivers one end-of-work marker
/// per worker, joins the pool, and disconnects the broker.
pub struct Bridge {
    queue: TaskQueue,
    workers: Vec<Box<dyn Worker>>,
    timer: CycleTimer,
    broker: Arc<dyn Broker>,
    state: BridgeState,
}

impl Bridge {
    /// Assemble a bridge from externally constructed parts.
    pub fn new(
        queue: TaskQueue,
        workers: Vec<Box<dyn Worker>>,
        timer: CycleTimer,
        broker: Arc<dyn Broker>,
    ) -> Self {
        Self {
            queue,
            workers,
            timer,
            broker,
            state: BridgeState::Idle,
        }
    }

    /// Build a bridge with a pool of `worker_count` [`PollWorker`]s over
    /// one tag source. Worker ids are assigned here, by pool position.
    pub fn with_pool(
        source: Arc<dyn TagSource>,
        broker: Arc<dyn Broker>,
        worker_count: usize,
    ) -> Self {
        let queue = TaskQueue::new();
        let workers = (0..worker_count)
            .map(|id| {
                Box::new(PollWorker::new(
                    id,
                    queue.clone(),
                    Arc::clone(&source),
                    Arc::clone(&broker),
                )) as Box<dyn Worker>
            })
            .collect();
        Self::new(queue, workers, CycleTimer::new(), broker)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Whether the bridge is running.
    pub fn is_running(&self) -> bool {
        self.state == BridgeState::Running
    }

    /// Connect the broker, start the worker pool, and begin firing one
    /// read task per tag path every `interval`.
    ///
    /// Valid only from [`BridgeState::Idle`]. A broker connection failure
    /// is fatal to the start: the problem propagates and the bridge stays
    /// idle. A zero interval is rejected rather than busy-looping the
    /// scheduler.
    pub fn start(
        &mut self,
        tag_paths: &[TagPath],
        interval: Milliseconds,
        topic: &str,
    ) -> Outcome<()> {
        if self.state != BridgeState::Idle {
            return Err(Problem::new("bridge already running"));
        }
        if interval.is_zero() {
            return Err(Problem::new("poll interval must be greater than zero"));
        }
        if tag_paths.is_empty() {
            warn!("starting with no tag paths; cycles will be empty");
        }

        self.broker.connect()?;

        let mut started = 0;
        let mut start_failure = None;
        for worker in &mut self.workers {
            match worker.start() {
                Ok(()) => started += 1,
                Err(problem) => {
                    start_failure = Some(problem);
                    break;
                }
            }
        }
        if let Some(problem) = start_failure {
            error!(%problem, "failed to start worker");
            // Unwind only what already started before reporting.
            self.shut_down_pool(started);
            let _ = self.broker.disconnect();
            return Err(problem);
        }

        // Built once per start; each tick clones shared handles only, so
        // steady-state allocations do not grow with cycle count.
        let paths: Arc<[TagPath]> = tag_paths.into();
        let topic: Arc<str> = Arc::from(topic);
        let queue = self.queue.clone();
        let on_tick = move || {
            for path in paths.iter() {
                queue.put(QueueItem::Read(Task::new(path.clone(), Arc::clone(&topic))));
            }
            debug!(tasks = paths.len(), "cycle enqueued");
        };

        if let Err(problem) = self.timer.start(interval, on_tick) {
            error!(%problem, "failed to start cycle timer");
            self.shut_down_pool(self.workers.len());
            let _ = self.broker.disconnect();
            return Err(problem);
        }

        self.state = BridgeState::Running;
        info!(
            tags = tag_paths.len(),
            workers = self.workers.len(),
            %interval,
            "bridge started"
        );
        Ok(())
    }

    /// Stop the timer, drain the pool, and disconnect the broker.
    ///
    /// Valid from [`BridgeState::Running`]; calling it while idle is a
    /// logged no-op that succeeds. Blocks until every worker thread has
    /// been joined. In-flight tasks run to completion; the markers simply
    /// queue behind them.
    pub fn stop(&mut self) -> Outcome<()> {
        if self.state != BridgeState::Running {
            warn!("stop called on a bridge that is not running");
            return Ok(());
        }

        self.state = BridgeState::Stopping;
        info!("stopping bridge");

        // No new tasks after this returns.
        self.timer.stop();

        self.shut_down_pool(self.workers.len());

        let disconnect = self.broker.disconnect();
        if let Err(problem) = &disconnect {
            error!(%problem, "broker disconnect failed");
        }

        self.state = BridgeState::Idle;
        info!("bridge stopped");
        disconnect.map(|_| ())
    }

    /// Deliver one end-of-work marker per running worker and join them.
    ///
    /// Only the first `started` pool members ever picked up a thread, so
    /// only they receive markers. Anything still queued afterwards (unread
    /// tasks, markers a dead worker never consumed) is drained so the next
    /// start begins with an empty queue.
    fn shut_down_pool(&mut self, started: usize) {
        let running = &mut self.workers[..started];
        for worker in running.iter() {
            worker.request_stop();
        }
        for _ in 0..started {
            self.queue.put(QueueItem::Shutdown);
        }
        for worker in running.iter_mut() {
            worker.join();
            if let Some(problem) = worker.failure() {
                error!(%problem, "worker terminated early");
            }
        }

        let mut drained = 0;
        while self.queue.try_get().is_some() {
            drained += 1;
        }
        if drained > 0 {
            debug!(drained, "queue drained after pool shutdown");
        }
    }
}
