//! Fixed-period cycle scheduler.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};
use tracing::debug;

use crate::domain::Milliseconds;
use crate::error::{Outcome, Problem};

/// Fires a callback on a fixed period from a dedicated thread.
///
/// At most one timer runs per instance. Ticks are delivered sequentially
/// and the handler runs inline on the timer thread, so a slow handler
/// delays later ticks rather than stacking invocations; handlers are
/// expected to do no more than enqueue work. [`CycleTimer::stop`] joins
/// the thread, so once it returns no further tick will fire.
#[derive(Debug, Default)]
pub struct CycleTimer {
    running: Option<(Sender<()>, JoinHandle<()>)>,
}

impl CycleTimer {
    /// Create a stopped timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin firing `on_tick` every `interval`.
    ///
    /// Fails if the timer is already running or the interval is zero.
    pub fn start<F>(&mut self, interval: Milliseconds, on_tick: F) -> Outcome<()>
    where
        F: Fn() + Send + 'static,
    {
        if self.running.is_some() {
            return Err(Problem::new("timer already running"));
        }
        if interval.is_zero() {
            return Err(Problem::new("timer interval must be greater than zero"));
        }

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let period = interval.as_duration();
        let handle = thread::Builder::new()
            .name("cycle-timer".to_string())
            .spawn(move || {
                let ticker = channel::tick(period);
                loop {
                    crossbeam::select! {
                        recv(ticker) -> _ => on_tick(),
                        recv(stop_rx) -> _ => break,
                    }
                }
                debug!("timer thread exiting");
            })
            .map_err(|e| Problem::from_error("failed to spawn timer thread", e))?;

        self.running = Some((stop_tx, handle));
        Ok(())
    }

    /// Cancel future ticks and wait for the timer thread to exit.
    ///
    /// Stopping a stopped timer is a no-op.
    pub fn stop(&mut self) {
        if let Some((stop_tx, handle)) = self.running.take() {
            let _ = stop_tx.send(());
            let _ = handle.join();
        }
    }

    /// Whether the timer is currently running.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

impl Drop for CycleTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn fires_repeatedly_at_the_configured_period() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut timer = CycleTimer::new();
        {
            let ticks = Arc::clone(&ticks);
            timer
                .start(Milliseconds::new(5), move || {
                    ticks.fetch_add(1, Ordering::SeqCst);
                })
                .expect("timer start failed");
        }

        thread::sleep(Duration::from_millis(200));
        timer.stop();

        assert!(
            ticks.load(Ordering::SeqCst) >= 10,
            "expected at least 10 ticks, got {}",
            ticks.load(Ordering::SeqCst)
        );
    }

    #[test]
    fn no_tick_fires_after_stop_returns() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut timer = CycleTimer::new();
        {
            let ticks = Arc::clone(&ticks);
            timer
                .start(Milliseconds::new(5), move || {
                    ticks.fetch_add(1, Ordering::SeqCst);
                })
                .expect("timer start failed");
        }

        thread::sleep(Duration::from_millis(50));
        timer.stop();
        let at_stop = ticks.load(Ordering::SeqCst);

        thread::sleep(Duration::from_millis(100));
        assert_eq!(ticks.load(Ordering::SeqCst), at_stop);
    }

    #[test]
    fn second_start_is_rejected_while_running() {
        let mut timer = CycleTimer::new();
        timer
            .start(Milliseconds::new(50), || {})
            .expect("timer start failed");
        let problem = timer.start(Milliseconds::new(50), || {}).unwrap_err();
        assert_eq!(problem.message(), "timer already running");
        timer.stop();
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut timer = CycleTimer::new();
        assert!(timer.start(Milliseconds::new(0), || {}).is_err());
        assert!(!timer.is_running());
    }

    #[test]
    fn timer_can_be_restarted_after_stop() {
        let mut timer = CycleTimer::new();
        timer
            .start(Milliseconds::new(10), || {})
            .expect("timer start failed");
        timer.stop();
        assert!(!timer.is_running());
        timer
            .start(Milliseconds::new(10), || {})
            .expect("timer restart failed");
        timer.stop();
    }

    #[test]
    fn stop_on_a_stopped_timer_is_a_no_op() {
        let mut timer = CycleTimer::new();
        timer.stop();
        timer.stop();
    }
}
