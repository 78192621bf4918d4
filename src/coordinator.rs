//! Coordinator: owns the signals and wires the actors together.
//!
//! The coordinator is driven by the settings surface, one callback at a time.
//! It owns the trigger and delay channels, the toggle cell and the click
//! actor, and hands each input session only the send-side handles it needs.
//!
//! ```text
//!  settings ──▶ Coordinator ──delay──────────────────────┐
//!                  │                                      ▼
//!                  └─start/stop─▶ InputEventActor ─trigger─▶ ClickActor ──▶ click()
//! ```
//!
//! Stopping publishes a guaranteed `off` and then ends the key source. If a
//! key handler managed to queue a value between those two steps, a second
//! `off` follows, so the click loop always settles on `off`.
//!
//! Callbacks that publish use blocking sends and must run on a synchronous
//! thread, never inside an async task.

use crate::click_actor::{ClickActor, ClickStats};
use crate::clicker::Clicker;
use crate::config::TriggerMode;
use crate::error::Result;
use crate::hook::KeyEventSource;
use crate::input_actor::InputEventActor;
use crate::keybind::Keybind;
use crate::signal::{delay_channel, trigger_channel, DelaySender, ToggleCell, TriggerSender};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Whether key handlers are currently registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookLifecycle {
    Registered,
    Unregistered,
}

impl fmt::Display for HookLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => f.write_str("On"),
            Self::Unregistered => f.write_str("Off"),
        }
    }
}

/// Startup values for a [`Coordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinatorOptions {
    pub keybind: Keybind,
    pub mode: TriggerMode,
    pub delay_ms: u64,
    pub release_after: Option<Duration>,
}

pub struct Coordinator {
    keybind: Keybind,
    mode: TriggerMode,
    staged_delay_ms: u64,
    release_after: Option<Duration>,
    lifecycle: HookLifecycle,
    session_publishes: Option<Arc<AtomicU64>>,
    source: Arc<dyn KeyEventSource>,
    trigger: TriggerSender,
    delay: DelaySender,
    toggle: Arc<ToggleCell>,
    click_actor: ClickActor,
    runtime: Handle,
}

impl Coordinator {
    /// Create the signals and start the click loop. Key hooks stay
    /// unregistered until [`on_start_requested`](Self::on_start_requested).
    ///
    /// `runtime` runs the blocking key-source loop of each session.
    pub fn new<C, F>(
        options: CoordinatorOptions,
        source: Arc<dyn KeyEventSource>,
        runtime: Handle,
        make_clicker: F,
    ) -> Result<Self>
    where
        C: Clicker,
        F: FnOnce() -> Result<C> + Send + 'static,
    {
        let (trigger, trigger_rx) = trigger_channel(false);
        let (delay, delay_rx) = delay_channel(options.delay_ms);
        let click_actor = ClickActor::spawn(trigger_rx, delay_rx, make_clicker)?;

        info!(
            keybind = %options.keybind,
            mode = %options.mode,
            delay_ms = options.delay_ms,
            "coordinator ready"
        );

        Ok(Self {
            keybind: options.keybind,
            mode: options.mode,
            staged_delay_ms: options.delay_ms,
            release_after: options.release_after,
            lifecycle: HookLifecycle::Unregistered,
            session_publishes: None,
            source,
            trigger,
            delay,
            toggle: Arc::new(ToggleCell::new(false)),
            click_actor,
            runtime,
        })
    }

    /// Register key handlers for the current keybind and mode. Returns
    /// `Ok(false)` when hooks were already on.
    pub fn on_start_requested(&mut self) -> Result<bool> {
        if self.lifecycle == HookLifecycle::Registered {
            info!("hooks already enabled");
            return Ok(false);
        }

        let actor = InputEventActor::new(
            self.source.clone(),
            self.trigger.clone(),
            self.toggle.clone(),
        )
        .with_release_after(self.release_after);
        let session = match actor.register(self.keybind, self.mode) {
            Ok(session) => session,
            Err(e) => {
                // Drop whatever half of the registration did succeed.
                self.source.end();
                return Err(e);
            }
        };

        self.session_publishes = Some(session.publish_counter());
        self.runtime.spawn_blocking(move || {
            if let Err(e) = session.process() {
                warn!("key event loop failed: {e}");
            }
            debug!("key event loop exited");
        });

        self.lifecycle = HookLifecycle::Registered;
        info!(keybind = %self.keybind, mode = %self.mode, "hooks enabled");
        Ok(true)
    }

    /// Force the trigger off and unregister the key handlers. Returns
    /// `Ok(false)` when hooks were already off.
    pub fn on_stop_requested(&mut self) -> Result<bool> {
        if self.lifecycle == HookLifecycle::Unregistered {
            info!("hooks already disabled");
            return Ok(false);
        }

        let publishes = self.session_publishes.take();
        let before = publishes.as_ref().map(|count| count.load(Ordering::SeqCst));

        let published = self.trigger.publish_off();
        self.source.end();
        self.toggle.reset(false);
        self.lifecycle = HookLifecycle::Unregistered;
        published?;

        let after = publishes.as_ref().map(|count| count.load(Ordering::SeqCst));
        if after != before {
            debug!("key handler raced the stop, publishing off again");
            self.trigger.publish_off()?;
        }

        info!("hooks disabled");
        Ok(true)
    }

    /// Replace the keybind if `text` is on the allow-list; anything else is
    /// ignored. Takes effect on the next start.
    pub fn on_keybind_edited(&mut self, text: &str) -> bool {
        match Keybind::parse(text) {
            Some(keybind) => {
                self.keybind = keybind;
                info!(%keybind, "keybind updated");
                true
            }
            None => {
                debug!(text, "ignoring keybind edit");
                false
            }
        }
    }

    /// Stage a delay in milliseconds. Unparsable text keeps the previously
    /// staged value. Nothing is sent until the edit is committed.
    pub fn on_delay_edited(&mut self, text: &str) -> bool {
        match text.parse::<u64>() {
            Ok(delay_ms) => {
                self.staged_delay_ms = delay_ms;
                debug!(delay_ms, "delay staged");
                true
            }
            Err(_) => {
                debug!(text, "ignoring delay edit");
                false
            }
        }
    }

    /// Offer the staged delay to the click loop. `Ok(false)` means the delay
    /// channel was full and the update was dropped.
    pub fn on_delay_commit_requested(&self) -> Result<bool> {
        let sent = self.delay.offer(self.staged_delay_ms)?;
        if sent {
            info!(delay_ms = self.staged_delay_ms, "delay updated");
        }
        Ok(sent)
    }

    /// Select the trigger mode. Takes effect on the next start.
    pub fn on_mode_selected(&mut self, mode: TriggerMode) {
        self.mode = mode;
        info!(%mode, "trigger mode updated");
    }

    pub fn status(&self) -> HookLifecycle {
        self.lifecycle
    }

    pub fn keybind(&self) -> Keybind {
        self.keybind
    }

    pub fn mode(&self) -> TriggerMode {
        self.mode
    }

    pub fn staged_delay_ms(&self) -> u64 {
        self.staged_delay_ms
    }

    pub fn click_stats(&self) -> Arc<ClickStats> {
        self.click_actor.stats()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if self.lifecycle == HookLifecycle::Registered {
            self.source.end();
        }
        self.click_actor.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clicker::CountingClicker;
    use crate::hook::{KeyEdge, VirtualKeySource};
    use std::thread;
    use std::time::Instant;
    use tokio::runtime::Runtime;

    fn key(text: &str) -> Keybind {
        Keybind::parse(text).unwrap()
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    fn coordinator(runtime: &Runtime, mode: TriggerMode) -> (Coordinator, Arc<VirtualKeySource>) {
        let source = Arc::new(VirtualKeySource::new());
        let options = CoordinatorOptions {
            mode,
            delay_ms: 1,
            ..CoordinatorOptions::default()
        };
        let coordinator = Coordinator::new(
            options,
            source.clone(),
            runtime.handle().clone(),
            || Ok(CountingClicker::new()),
        )
        .unwrap();
        (coordinator, source)
    }

    #[test]
    fn test_status_label() {
        assert_eq!(HookLifecycle::Registered.to_string(), "On");
        assert_eq!(HookLifecycle::Unregistered.to_string(), "Off");
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let runtime = Runtime::new().unwrap();
        let (mut coordinator, source) = coordinator(&runtime, TriggerMode::Hold);
        assert_eq!(coordinator.status(), HookLifecycle::Unregistered);

        assert!(!coordinator.on_stop_requested().unwrap());

        assert!(coordinator.on_start_requested().unwrap());
        assert!(!coordinator.on_start_requested().unwrap());
        assert_eq!(coordinator.status(), HookLifecycle::Registered);
        assert_eq!(source.handler_count(key("p"), KeyEdge::Down), 1);
        assert_eq!(source.handler_count(key("p"), KeyEdge::Up), 1);

        assert!(coordinator.on_stop_requested().unwrap());
        assert!(!coordinator.on_stop_requested().unwrap());
        assert_eq!(coordinator.status(), HookLifecycle::Unregistered);
        assert_eq!(source.handler_count(key("p"), KeyEdge::Down), 0);
    }

    #[test]
    fn test_keybind_allow_list() {
        let runtime = Runtime::new().unwrap();
        let (mut coordinator, _source) = coordinator(&runtime, TriggerMode::Toggle);

        assert!(!coordinator.on_keybind_edited("§"));
        assert_eq!(coordinator.keybind().as_str(), "p");

        assert!(coordinator.on_keybind_edited("k"));
        assert_eq!(coordinator.keybind().as_str(), "k");

        assert!(!coordinator.on_keybind_edited(""));
        assert_eq!(coordinator.keybind().as_str(), "k");
    }

    #[test]
    fn test_keybind_edit_applies_on_next_start() {
        let runtime = Runtime::new().unwrap();
        let (mut coordinator, source) = coordinator(&runtime, TriggerMode::Toggle);

        coordinator.on_start_requested().unwrap();
        coordinator.on_keybind_edited("k");
        assert_eq!(source.handler_count(key("p"), KeyEdge::Down), 1);
        assert_eq!(source.handler_count(key("k"), KeyEdge::Down), 0);

        coordinator.on_stop_requested().unwrap();
        coordinator.on_start_requested().unwrap();
        assert_eq!(source.handler_count(key("p"), KeyEdge::Down), 0);
        assert_eq!(source.handler_count(key("k"), KeyEdge::Down), 1);
    }

    #[test]
    fn test_delay_edit_coercion() {
        let runtime = Runtime::new().unwrap();
        let (mut coordinator, _source) = coordinator(&runtime, TriggerMode::Toggle);
        coordinator.on_delay_edited("0");

        assert!(!coordinator.on_delay_edited("abc"));
        assert_eq!(coordinator.staged_delay_ms(), 0);

        assert!(coordinator.on_delay_edited("250"));
        assert!(!coordinator.on_delay_edited("-5"));
        assert!(!coordinator.on_delay_edited("12.5"));
        assert_eq!(coordinator.staged_delay_ms(), 250);

        // Staged, not sent.
        let stats = coordinator.click_stats();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(stats.delay_ms(), 1);

        assert!(coordinator.on_delay_commit_requested().unwrap());
        assert!(wait_until(Duration::from_secs(1), || stats.delay_ms() == 250));
    }

    #[test]
    fn test_stop_forces_trigger_off() {
        let runtime = Runtime::new().unwrap();
        let (mut coordinator, source) = coordinator(&runtime, TriggerMode::Hold);
        let stats = coordinator.click_stats();

        coordinator.on_start_requested().unwrap();
        source.press(key("p"));
        assert!(wait_until(Duration::from_secs(1), || stats.active()));

        // No key-up: only the stop can turn clicking off.
        coordinator.on_stop_requested().unwrap();
        assert!(wait_until(Duration::from_secs(1), || !stats.active()));
        let settled = stats.clicks();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(stats.clicks(), settled);
    }

    #[test]
    fn test_stop_resets_toggle() {
        let runtime = Runtime::new().unwrap();
        let (mut coordinator, source) = coordinator(&runtime, TriggerMode::Toggle);
        let stats = coordinator.click_stats();

        coordinator.on_start_requested().unwrap();
        source.press(key("p"));
        assert!(wait_until(Duration::from_secs(1), || stats.active()));
        coordinator.on_stop_requested().unwrap();
        assert!(wait_until(Duration::from_secs(1), || !stats.active()));

        // First press after a restart turns clicking on again.
        coordinator.on_start_requested().unwrap();
        source.press(key("p"));
        assert!(wait_until(Duration::from_secs(1), || stats.active()));
    }

    #[test]
    fn test_mode_change_applies_on_next_start() {
        let runtime = Runtime::new().unwrap();
        let (mut coordinator, source) = coordinator(&runtime, TriggerMode::Toggle);

        coordinator.on_mode_selected(TriggerMode::Hold);
        assert_eq!(coordinator.mode(), TriggerMode::Hold);
        coordinator.on_start_requested().unwrap();
        assert_eq!(source.handler_count(key("p"), KeyEdge::Up), 1);
    }
}
