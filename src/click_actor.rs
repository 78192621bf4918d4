//! Click Actor: the periodic loop that turns the trigger into clicks.
//!
//! Each iteration samples the newest trigger and delay values, clicks once if
//! the trigger is on, then sleeps for the delay. A delay of zero skips the
//! sleep entirely: the loop spins at full speed, which is the lowest-latency
//! (and highest-CPU) setting and is kept that way on purpose.

use crate::clicker::Clicker;
use crate::error::{ClickerError, Result};
use crate::signal::{DelayReceiver, TriggerReceiver};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Counters published by the click loop.
#[derive(Debug, Default)]
pub struct ClickStats {
    iterations: AtomicU64,
    clicks: AtomicU64,
    failures: AtomicU64,
    active: AtomicBool,
    delay_ms: AtomicU64,
}

impl ClickStats {
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::SeqCst)
    }

    pub fn clicks(&self) -> u64 {
        self.clicks.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Trigger value the loop acted on in its latest iteration.
    pub fn active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Delay the loop slept (or will sleep) after its latest iteration.
    pub fn delay_ms(&self) -> u64 {
        self.delay_ms.load(Ordering::SeqCst)
    }
}

/// Handle to the click thread.
pub struct ClickActor {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<ClickStats>,
}

impl ClickActor {
    /// Spawn the click thread.
    ///
    /// `make_clicker` runs on the new thread so back-ends that are tied to
    /// their creating thread work. Its error, if any, is returned from here.
    /// Waits for the thread to report in, so call it from synchronous code.
    pub fn spawn<C, F>(
        trigger: TriggerReceiver,
        delay: DelayReceiver,
        make_clicker: F,
    ) -> Result<Self>
    where
        C: Clicker,
        F: FnOnce() -> Result<C> + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(ClickStats::default());
        let (ready_tx, ready_rx) = oneshot::channel();

        let handle = {
            let shutdown = shutdown.clone();
            let stats = stats.clone();
            thread::Builder::new()
                .name("autoclicker-click".to_string())
                .spawn(move || {
                    let clicker = match make_clicker() {
                        Ok(clicker) => {
                            let _ = ready_tx.send(Ok(()));
                            clicker
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    Self::run_loop(trigger, delay, clicker, &shutdown, &stats);
                })?
        };

        ready_rx
            .blocking_recv()
            .map_err(|_| ClickerError::click("click thread exited during startup"))??;

        Ok(Self {
            handle: Some(handle),
            shutdown,
            stats,
        })
    }

    pub fn stats(&self) -> Arc<ClickStats> {
        self.stats.clone()
    }

    /// Ask the loop to exit after its current iteration.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Shut down and wait for the thread. Blocks for up to one delay period.
    #[cfg(test)]
    fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn run_loop<C: Clicker>(
        mut trigger: TriggerReceiver,
        mut delay: DelayReceiver,
        mut clicker: C,
        shutdown: &AtomicBool,
        stats: &ClickStats,
    ) {
        info!("click loop started");

        while !shutdown.load(Ordering::Relaxed) {
            let active = trigger.latest();
            let delay_ms = delay.latest();

            if stats.active.swap(active, Ordering::SeqCst) != active {
                debug!(active, "trigger changed");
            }
            if stats.delay_ms.swap(delay_ms, Ordering::SeqCst) != delay_ms {
                debug!(delay_ms, "delay changed");
            }

            if active {
                match clicker.click() {
                    Ok(()) => {
                        stats.clicks.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        // Warn once, the loop may be spinning.
                        if stats.failures.fetch_add(1, Ordering::SeqCst) == 0 {
                            warn!("click failed: {e}");
                        } else {
                            debug!("click failed: {e}");
                        }
                    }
                }
            }
            stats.iterations.fetch_add(1, Ordering::SeqCst);

            if delay_ms != 0 {
                thread::sleep(Duration::from_millis(delay_ms));
            }
        }

        info!(clicks = stats.clicks(), "click loop stopped");
    }
}

impl Drop for ClickActor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
