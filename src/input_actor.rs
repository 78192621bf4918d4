//! Input Actor: translates key events into trigger updates.
//!
//! In [`TriggerMode::Hold`] a key-down offers `on` and a key-up publishes
//! `off` (guaranteed). The `on` is best-effort only while the newest queued
//! value is already `on`; after a key-up it is sent guaranteed, otherwise a
//! quick release and re-press could leave the loop idle with the key held. In
//! [`TriggerMode::Toggle`] only key-down is registered and each press flips
//! the [`ToggleCell`]. A flip is not idempotent, so it is forwarded with the
//! guaranteed send whichever way it goes.
//!
//! Not every hook back-end delivers key-up reliably. For those, hold mode
//! can auto-release: with `release_after` set, a watchdog publishes `off`
//! once no key-down has been seen for that long. OS key repeat keeps a held
//! key alive as long as the repeat interval is shorter than the timeout.

use crate::config::TriggerMode;
use crate::error::Result;
use crate::hook::{HookSession, KeyEdge, KeyEventSource, KeyHandler};
use crate::keybind::Keybind;
use crate::signal::{ToggleCell, TriggerSender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Bridges a [`KeyEventSource`] to the trigger channel.
pub struct InputEventActor {
    source: Arc<dyn KeyEventSource>,
    trigger: TriggerSender,
    toggle: Arc<ToggleCell>,
    release_after: Option<Duration>,
}

impl InputEventActor {
    pub fn new(
        source: Arc<dyn KeyEventSource>,
        trigger: TriggerSender,
        toggle: Arc<ToggleCell>,
    ) -> Self {
        Self {
            source,
            trigger,
            toggle,
            release_after: None,
        }
    }

    /// Enable hold-mode auto-release. Ignored in toggle mode.
    pub fn with_release_after(mut self, release_after: Option<Duration>) -> Self {
        self.release_after = release_after;
        self
    }

    /// Register handlers for `key` and start the source, without blocking.
    pub fn register(&self, key: Keybind, mode: TriggerMode) -> Result<InputSession> {
        info!(%key, %mode, "registering key events");

        let publishes = Arc::new(AtomicU64::new(0));
        let hold = SharedHold::default();

        match mode {
            TriggerMode::Hold => {
                let down = hold_down_handler(self.trigger.clone(), publishes.clone(), hold.clone());
                self.source.register(key, KeyEdge::Down, down)?;
                let up = hold_up_handler(self.trigger.clone(), publishes.clone(), hold.clone());
                self.source.register(key, KeyEdge::Up, up)?;
            }
            TriggerMode::Toggle => {
                let down =
                    toggle_handler(self.trigger.clone(), self.toggle.clone(), publishes.clone());
                self.source.register(key, KeyEdge::Down, down)?;
            }
        }

        let session = self.source.start()?;

        let watchdog = match (mode, self.release_after) {
            (TriggerMode::Hold, Some(timeout)) => Some(Watchdog {
                trigger: self.trigger.clone(),
                hold,
                timeout,
            }),
            _ => None,
        };

        Ok(InputSession {
            source: self.source.clone(),
            session,
            publishes,
            watchdog,
        })
    }

    /// Register and then block until the source is ended.
    pub fn start(&self, key: Keybind, mode: TriggerMode) -> Result<()> {
        self.register(key, mode)?.process()
    }
}

/// A registered, running set of handlers.
pub struct InputSession {
    source: Arc<dyn KeyEventSource>,
    session: HookSession,
    publishes: Arc<AtomicU64>,
    watchdog: Option<Watchdog>,
}

impl InputSession {
    /// Number of trigger values this session's handlers have queued so far.
    pub fn publish_counter(&self) -> Arc<AtomicU64> {
        self.publishes.clone()
    }

    /// Block until the source is ended.
    pub fn process(self) -> Result<()> {
        let stop = Arc::new(AtomicBool::new(false));
        let watchdog = match self.watchdog {
            Some(watchdog) => {
                let stop = stop.clone();
                Some(
                    thread::Builder::new()
                        .name("autoclicker-release".to_string())
                        .spawn(move || watchdog.run(&stop))?,
                )
            }
            None => None,
        };

        let result = self.source.process(self.session);

        stop.store(true, Ordering::SeqCst);
        if let Some(handle) = watchdog {
            let _ = handle.join();
        }
        result
    }
}

/// Hold-mode state shared by the down, up and auto-release paths. Every
/// trigger send in hold mode happens under this lock.
#[derive(Debug, Default)]
struct HoldState {
    held_since: Option<Instant>,
    /// Polarity of the newest value this session queued.
    last_on: bool,
}

type SharedHold = Arc<Mutex<HoldState>>;

fn hold_down_handler(
    trigger: TriggerSender,
    publishes: Arc<AtomicU64>,
    hold: SharedHold,
) -> KeyHandler {
    Box::new(move || {
        let mut hold = hold.lock().unwrap_or_else(PoisonError::into_inner);
        hold.held_since = Some(Instant::now());

        let queued = match trigger.offer_on() {
            Ok(true) => Ok(true),
            // Coalescing is only safe when `on` is already the newest value.
            Ok(false) if hold.last_on => Ok(false),
            Ok(false) => trigger.publish_guaranteed(true).map(|()| true),
            Err(e) => Err(e),
        };
        match queued {
            Ok(true) => {
                hold.last_on = true;
                publishes.fetch_add(1, Ordering::SeqCst);
                debug!("trigger on");
            }
            Ok(false) => {}
            Err(e) => warn!("failed to publish trigger: {e}"),
        }
    })
}

fn hold_up_handler(
    trigger: TriggerSender,
    publishes: Arc<AtomicU64>,
    hold: SharedHold,
) -> KeyHandler {
    Box::new(move || {
        let mut hold = hold.lock().unwrap_or_else(PoisonError::into_inner);
        hold.held_since = None;
        match trigger.publish_off() {
            Ok(()) => {
                hold.last_on = false;
                publishes.fetch_add(1, Ordering::SeqCst);
                debug!("trigger off");
            }
            Err(e) => warn!("failed to publish trigger: {e}"),
        }
    })
}

fn toggle_handler(
    trigger: TriggerSender,
    toggle: Arc<ToggleCell>,
    publishes: Arc<AtomicU64>,
) -> KeyHandler {
    Box::new(move || {
        match toggle.flip_and_forward(|next| trigger.publish_guaranteed(next)) {
            Ok(next) => {
                publishes.fetch_add(1, Ordering::SeqCst);
                info!(active = next, "trigger toggled");
            }
            Err(e) => warn!("failed to publish toggle: {e}"),
        }
    })
}

struct Watchdog {
    trigger: TriggerSender,
    hold: SharedHold,
    timeout: Duration,
}

impl Watchdog {
    fn run(self, stop: &AtomicBool) {
        let tick = (self.timeout / 4).max(Duration::from_millis(5));
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);

        while !stop.load(Ordering::SeqCst) {
            thread::sleep(tick);

            let mut hold = self.hold.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(since) = hold.held_since else {
                continue;
            };
            if since.elapsed() < self.timeout {
                continue;
            }

            hold.held_since = None;
            match self.trigger.publish_off() {
                Ok(()) => {
                    hold.last_on = false;
                    info!(timeout_ms, "no key-down seen, auto-released trigger");
                }
                Err(e) => warn!("failed to auto-release trigger: {e}"),
            }
        }
    }
}
