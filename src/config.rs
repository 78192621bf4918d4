//! Startup configuration.
//!
//! Settings come from an optional JSON file and are then overridden by
//! command-line flags. They are read once at launch; nothing is written back.
//!
//! ```json
//! {
//!   "keybind": "p",
//!   "mode": "hold",
//!   "delay": "250ms",
//!   "release_after": "600ms"
//! }
//! ```

use crate::coordinator::CoordinatorOptions;
use crate::error::{ClickerError, Result};
use crate::keybind::Keybind;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::fs;
use std::time::Duration;

/// How key events drive the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Click while the key is held down.
    Hold,
    /// Each key press flips clicking on or off.
    #[default]
    Toggle,
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hold => f.write_str("hold"),
            Self::Toggle => f.write_str("toggle"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default = "default_keybind")]
    pub keybind: String,

    #[serde(default)]
    pub mode: TriggerMode,

    /// Pause between clicks. Zero clicks as fast as the loop can spin.
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub delay: Duration,

    /// Hold mode only: release the trigger when no key-down has been seen
    /// for this long. For hook back-ends that lose key-up events.
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub release_after: Option<Duration>,

    #[serde(default = "default_true")]
    pub autostart: bool,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub virtual_keys: bool,

    #[serde(default)]
    pub verbose: bool,
}

fn default_keybind() -> String {
    Keybind::default().to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keybind: default_keybind(),
            mode: TriggerMode::default(),
            delay: Duration::ZERO,
            release_after: None,
            autostart: true,
            dry_run: false,
            virtual_keys: false,
            verbose: false,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| ClickerError::config_load(path, e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ClickerError::config_load(path, e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.keybind.parse::<Keybind>()?;

        if u64::try_from(self.delay.as_millis()).is_err() {
            return Err(ClickerError::config_validation("delay is too large"));
        }

        match self.release_after {
            Some(timeout) if timeout.is_zero() => {
                return Err(ClickerError::config_validation(
                    "release_after must be greater than zero",
                ));
            }
            Some(_) if self.mode == TriggerMode::Toggle => {
                return Err(ClickerError::config_validation(
                    "release_after only applies to hold mode",
                ));
            }
            _ => {}
        }

        Ok(())
    }

    /// Validate and convert into the coordinator's startup options.
    pub fn coordinator_options(&self) -> Result<CoordinatorOptions> {
        self.validate()?;

        Ok(CoordinatorOptions {
            keybind: self.keybind.parse()?,
            mode: self.mode,
            delay_ms: u64::try_from(self.delay.as_millis())
                .map_err(|_| ClickerError::config_validation("delay is too large"))?,
            release_after: self.release_after,
        })
    }
}

/// Parse `"250ms"`, `"2s"`, `"1m"` or a bare millisecond count like `"250"`.
///
/// Case-insensitive and whitespace-tolerant. Negative values and unknown units
/// are rejected.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ClickerError::invalid_duration(value, "empty duration"));
    }

    let split = normalized
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(normalized.len());
    let (digits, unit) = normalized.split_at(split);

    if digits.is_empty() {
        return Err(ClickerError::invalid_duration(
            value,
            "expected a non-negative number",
        ));
    }
    let amount: u64 = digits
        .parse()
        .map_err(|_| ClickerError::invalid_duration(value, "number out of range"))?;

    let duration = match unit.trim() {
        "" | "ms" => Duration::from_millis(amount),
        "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount.saturating_mul(60)),
        other => {
            return Err(ClickerError::invalid_duration(
                value,
                format!("unknown unit '{other}'"),
            ))
        }
    };

    Ok(duration)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationRepr {
    Millis(u64),
    Text(String),
}

impl DurationRepr {
    fn into_duration(self) -> Result<Duration> {
        match self {
            Self::Millis(ms) => Ok(Duration::from_millis(ms)),
            Self::Text(text) => parse_duration(&text),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    DurationRepr::deserialize(deserializer)?
        .into_duration()
        .map_err(serde::de::Error::custom)
}

fn deserialize_optional_duration<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<DurationRepr>::deserialize(deserializer)?
        .map(DurationRepr::into_duration)
        .transpose()
        .map_err(serde::de::Error::custom)
}
