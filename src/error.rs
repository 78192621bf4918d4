//! Custom error types for the autoclicker.
//!
//! This module provides structured error types using `thiserror` for the
//! library half of the crate. The binary wraps them in `anyhow` at the edge.

use std::io;
use thiserror::Error;

/// Main error type for autoclicker operations.
#[derive(Error, Debug)]
pub enum ClickerError {
    /// The key is not on the keybind allow-list.
    #[error("invalid keybind '{key}': {reason}")]
    InvalidKeybind { key: String, reason: String },

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error parsing duration string.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// Error registering or handling a key hook.
    #[error("hotkey error: {0}")]
    Hotkey(String),

    /// The click back-end failed to initialise or to click.
    #[error("click injection failed: {0}")]
    Click(String),

    /// The receiving side of a signal channel is gone.
    #[error("{0} channel closed")]
    ChannelClosed(&'static str),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for autoclicker operations.
pub type Result<T> = std::result::Result<T, ClickerError>;

impl ClickerError {
    /// Create a new InvalidKeybind error.
    pub fn invalid_keybind(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKeybind {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ConfigValidation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    /// Create a new ConfigLoad error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidDuration error.
    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new Hotkey error.
    pub fn hotkey(message: impl Into<String>) -> Self {
        Self::Hotkey(message.into())
    }

    /// Create a new Click error.
    pub fn click(message: impl Into<String>) -> Self {
        Self::Click(message.into())
    }
}
