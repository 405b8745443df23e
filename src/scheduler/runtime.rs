//! Shared scheduler handle and the threaded tick loop.
//!
//! The tick thread and the order-submission surface share one
//! [`FleetScheduler`] behind a single mutex. Every operation takes the lock
//! for its whole duration, so a submission never interleaves with a tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error};

use super::FleetScheduler;
use crate::error::SchedulerError;
use crate::models::{OrderReceipt, OrderRequest};

/// Cloneable, thread-safe handle to a scheduler.
#[derive(Debug, Clone)]
pub struct SharedScheduler {
    inner: Arc<Mutex<FleetScheduler>>,
}

impl SharedScheduler {
    pub fn new(scheduler: FleetScheduler) -> Self {
        Self {
            inner: Arc::new(Mutex::new(scheduler)),
        }
    }

    /// Submits an order request.
    pub fn submit(&self, request: &OrderRequest) -> Vec<OrderReceipt> {
        self.inner.lock().submit_request(request)
    }

    /// Advances one tick.
    pub fn step(&self) {
        self.inner.lock().step();
    }

    pub fn reset(&self) -> Result<(), SchedulerError> {
        self.inner.lock().reset()
    }

    pub fn set_paused(&self, paused: bool) {
        self.inner.lock().set_paused(paused);
    }

    /// Runs `f` against the scheduler under the lock.
    pub fn read<T>(&self, f: impl FnOnce(&FleetScheduler) -> T) -> T {
        let guard = self.inner.lock();
        f(&*guard)
    }

    /// Configured tick period.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.inner.lock().config().tick_period_ms)
    }
}

/// Background thread calling [`SharedScheduler::step`] at a fixed period.
///
/// The loop stops when [`TickLoop::stop`] is called or the handle is dropped.
pub struct TickLoop {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TickLoop {
    /// Starts ticking at the scheduler's configured period.
    pub fn spawn(shared: SharedScheduler) -> Self {
        let period = shared.tick_period();
        Self::spawn_with_period(shared, period)
    }

    /// Starts ticking every `period`.
    pub fn spawn_with_period(shared: SharedScheduler, period: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            debug!(period_ms = period.as_millis() as u64, "tick loop started");
            while !flag.load(Ordering::Acquire) {
                shared.step();
                thread::sleep(period);
            }
            debug!("tick loop stopped");
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the loop and waits for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("tick loop thread panicked");
            }
        }
    }
}

impl Drop for TickLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
