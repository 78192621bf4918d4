//! # Autoclicker
//!
//! Fires repeated left clicks while a hotkey trigger is active.
//!
//! ## Features
//!
//! - Hold mode (click while the key is down) and toggle mode (each press
//!   flips clicking on or off)
//! - Configurable delay between clicks, including a zero-delay full-speed mode
//! - Start/stop of the key hook at runtime from a settings console
//! - Optional auto-release for hook back-ends that lose key-up events
//! - JSON configuration file support
//!
//! ## Architecture
//!
//! Three actors share nothing but two bounded channels and a toggle cell:
//! the [`InputEventActor`] turns key events into trigger updates, the
//! [`ClickActor`] samples trigger and delay and clicks, and the
//! [`Coordinator`] owns the signals and applies settings edits.
//!
//! ## Example
//!
//! ```no_run
//! use autoclicker::{Coordinator, CoordinatorOptions, CountingClicker, VirtualKeySource};
//! use std::sync::Arc;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let keys = Arc::new(VirtualKeySource::new());
//! let mut coordinator = Coordinator::new(
//!     CoordinatorOptions::default(),
//!     keys.clone(),
//!     runtime.handle().clone(),
//!     || Ok(CountingClicker::new()),
//! )
//! .unwrap();
//!
//! coordinator.on_start_requested().unwrap();
//! keys.press(coordinator.keybind()); // toggle mode: clicking starts
//! ```

pub mod click_actor;
pub mod clicker;
pub mod config;
pub mod console;
pub mod coordinator;
pub mod error;
pub mod hook;
pub mod input_actor;
pub mod keybind;
pub mod logging;
pub mod signal;

pub use click_actor::{ClickActor, ClickStats};
pub use clicker::{Clicker, CountingClicker, EnigoClicker};
pub use config::{Config, TriggerMode};
pub use console::Console;
pub use coordinator::{Coordinator, CoordinatorOptions, HookLifecycle};
pub use error::{ClickerError, Result};
pub use hook::{GlobalHotkeySource, KeyEventSource, VirtualKeySource};
pub use input_actor::InputEventActor;
pub use keybind::Keybind;
