//! Click injection back-ends.

use crate::error::{ClickerError, Result};
use enigo::{Button, Direction, Enigo, Mouse, Settings};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One simulated left click at the current pointer position.
pub trait Clicker {
    fn click(&mut self) -> Result<()>;
}

/// Clicks through the OS input-simulation layer.
///
/// `Enigo` is not `Send` on every platform, so build this on the thread that
/// will click (see [`ClickActor::spawn`](crate::ClickActor::spawn)).
pub struct EnigoClicker {
    enigo: Enigo,
}

impl EnigoClicker {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| ClickerError::click(format!("failed to initialize: {e}")))?;

        debug!("mouse simulator initialized");

        Ok(Self { enigo })
    }
}

impl Clicker for EnigoClicker {
    fn click(&mut self) -> Result<()> {
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| ClickerError::click(e.to_string()))
    }
}

/// Counts clicks instead of performing them. Backs `--dry-run`.
#[derive(Debug, Clone, Default)]
pub struct CountingClicker {
    clicks: Arc<AtomicU64>,
}

impl CountingClicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clicks(&self) -> u64 {
        self.clicks.load(Ordering::SeqCst)
    }
}

impl Clicker for CountingClicker {
    fn click(&mut self) -> Result<()> {
        let total = self.clicks.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(total, "dry-run click");
        Ok(())
    }
}
