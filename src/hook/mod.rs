//! Key-event sources.
//!
//! A [`KeyEventSource`] is the capability the input actor uses to hear about
//! the bound key. It follows a small state machine:
//!
//! ```text
//!  register(key, edge, handler)*      start()            end()
//!  ───────────────────────────▶ Unregistered ─▶ Registered ─▶ Unregistered
//!                                                   │
//!                                          process(session) blocks here
//! ```
//!
//! Handlers run on whatever thread the source dispatches from. `end()` waits
//! for handlers that are already running and then drops every registration,
//! so no handler fires once `end()` has returned.

mod global;
mod registry;
mod virtual_keys;

pub use global::GlobalHotkeySource;
pub use registry::HandlerRegistry;
pub use virtual_keys::VirtualKeySource;

use crate::error::Result;
use crate::keybind::Keybind;

/// Which edge of a key press a handler listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEdge {
    Down,
    Up,
}

/// Callback invoked for a registered key edge.
pub type KeyHandler = Box<dyn Fn() + Send + Sync + 'static>;

/// Token identifying one `start()`..`end()` span of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookSession {
    epoch: u64,
}

/// The key-hook capability consumed by the input actor.
pub trait KeyEventSource: Send + Sync {
    /// Attach `handler` to `edge` of `key`.
    fn register(&self, key: Keybind, edge: KeyEdge, handler: KeyHandler) -> Result<()>;

    /// Begin delivering events to the registered handlers.
    fn start(&self) -> Result<HookSession>;

    /// Block until `end()` closes `session`.
    fn process(&self, session: HookSession) -> Result<()>;

    /// Stop delivering events, drop every handler and unblock `process`.
    fn end(&self);
}
