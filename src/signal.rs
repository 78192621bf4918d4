//! Bounded signals shared between the input, click and settings actors.
//!
//! Every cross-thread value in the autoclicker travels through one of three
//! primitives:
//!
//! - the **trigger** channel, "should the click loop be clicking",
//! - the **delay** channel, the pause between clicks in milliseconds,
//! - the **toggle** cell, the press-to-flip state used in toggle mode.
//!
//! Both channels hold at most [`SIGNAL_CAPACITY`] pending values and expose a
//! two-tier send contract. A best-effort send (`offer_*`) silently gives up
//! when the channel is full; a guaranteed send (`publish_*`) blocks the caller
//! until the value is queued. An `off` trigger always goes through the
//! guaranteed tier: dropping it would leave the click loop running forever.
//!
//! Receivers are sampling, not event driven: [`TriggerReceiver::latest`] and
//! [`DelayReceiver::latest`] drain whatever is pending and return the newest
//! value, or the previously held one when nothing arrived.
//!
//! Guaranteed sends use `blocking_send` and must not be called from inside an
//! async task.

use crate::error::{ClickerError, Result};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Pending values each signal channel can hold before senders see backpressure.
pub const SIGNAL_CAPACITY: usize = 2;

/// Create the trigger channel. The receiver starts out holding `initial`.
pub fn trigger_channel(initial: bool) -> (TriggerSender, TriggerReceiver) {
    let (tx, rx) = mpsc::channel(SIGNAL_CAPACITY);
    (TriggerSender { tx }, TriggerReceiver { rx, held: initial })
}

/// Create the delay channel. The receiver starts out holding `initial_ms`.
pub fn delay_channel(initial_ms: u64) -> (DelaySender, DelayReceiver) {
    let (tx, rx) = mpsc::channel(SIGNAL_CAPACITY);
    (
        DelaySender { tx },
        DelayReceiver {
            rx,
            held: initial_ms,
        },
    )
}

/// Write half of the trigger channel.
#[derive(Debug, Clone)]
pub struct TriggerSender {
    tx: mpsc::Sender<bool>,
}

impl TriggerSender {
    /// Best-effort `on`. Returns `Ok(false)` when the value was coalesced
    /// because the channel is full.
    pub fn offer_on(&self) -> Result<bool> {
        match self.tx.try_send(true) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                debug!("trigger channel full, coalescing on signal");
                Ok(false)
            }
            Err(TrySendError::Closed(_)) => Err(ClickerError::ChannelClosed("trigger")),
        }
    }

    /// Guaranteed `off`.
    pub fn publish_off(&self) -> Result<()> {
        self.publish_guaranteed(false)
    }

    /// Queue `active`, blocking until there is room.
    pub fn publish_guaranteed(&self, active: bool) -> Result<()> {
        self.tx
            .blocking_send(active)
            .map_err(|_| ClickerError::ChannelClosed("trigger"))
    }
}

/// Read half of the trigger channel.
#[derive(Debug)]
pub struct TriggerReceiver {
    rx: mpsc::Receiver<bool>,
    held: bool,
}

impl TriggerReceiver {
    /// Drain pending trigger values without blocking and return the newest.
    pub fn latest(&mut self) -> bool {
        while let Ok(active) = self.rx.try_recv() {
            self.held = active;
        }
        self.held
    }
}

/// Write half of the delay channel.
#[derive(Debug, Clone)]
pub struct DelaySender {
    tx: mpsc::Sender<u64>,
}

impl DelaySender {
    /// Best-effort delay update. Returns `Ok(false)` when the channel is full;
    /// the next commit will land instead.
    pub fn offer(&self, delay_ms: u64) -> Result<bool> {
        match self.tx.try_send(delay_ms) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                debug!(delay_ms, "delay channel full, dropping update");
                Ok(false)
            }
            Err(TrySendError::Closed(_)) => Err(ClickerError::ChannelClosed("delay")),
        }
    }
}

/// Read half of the delay channel.
#[derive(Debug)]
pub struct DelayReceiver {
    rx: mpsc::Receiver<u64>,
    held: u64,
}

impl DelayReceiver {
    /// Drain pending delay values without blocking and return the newest.
    pub fn latest(&mut self) -> u64 {
        while let Ok(delay_ms) = self.rx.try_recv() {
            self.held = delay_ms;
        }
        self.held
    }
}

/// One-slot cell holding the toggle-mode flip state.
///
/// [`ToggleCell::flip_and_forward`] keeps the slot locked across the whole
/// read, negate, forward and write sequence, so two presses can never both
/// flip from the same value.
#[derive(Debug, Default)]
pub struct ToggleCell {
    slot: Mutex<bool>,
}

impl ToggleCell {
    pub fn new(initial: bool) -> Self {
        Self {
            slot: Mutex::new(initial),
        }
    }

    /// Negate the flag and hand the new value to `forward`. The flag is only
    /// written once `forward` succeeds, so it never disagrees with what was
    /// forwarded.
    pub fn flip_and_forward<F>(&self, forward: F) -> Result<bool>
    where
        F: FnOnce(bool) -> Result<()>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let next = !*slot;
        forward(next)?;
        *slot = next;
        Ok(next)
    }

    pub fn get(&self) -> bool {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self, value: bool) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}
