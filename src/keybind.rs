//! The fixed set of keys a trigger can be bound to.

use crate::error::{ClickerError, Result};
use std::fmt;
use std::str::FromStr;

/// Every key symbol the trigger may be bound to, in keyboard order.
pub const ALLOWED_KEYS: [&str; 44] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "0", //
    "q", "w", "e", "r", "t", "y", "u", "i", "o", "p", "[", "]", //
    "a", "s", "d", "f", "g", "h", "j", "k", "l", ";", //
    "z", "x", "c", "v", "b", "n", "m", ",", ".", "/", "-", "=",
];

/// A key symbol drawn from [`ALLOWED_KEYS`].
///
/// Holding a `Keybind` proves the symbol passed the allow-list, so hook
/// back-ends can map it without a fallible lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keybind(&'static str);

impl Keybind {
    /// Look `text` up in the allow-list. Matching is exact: no trimming and no
    /// case folding, so `"P"` is rejected just like `"§"`.
    pub fn parse(text: &str) -> Option<Self> {
        ALLOWED_KEYS
            .iter()
            .copied()
            .find(|key| *key == text)
            .map(Self)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Default for Keybind {
    fn default() -> Self {
        Self("p")
    }
}

impl fmt::Display for Keybind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl FromStr for Keybind {
    type Err = ClickerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            ClickerError::invalid_keybind(
                s,
                "expected a digit, lowercase letter or one of [ ] ; , . / - =",
            )
        })
    }
}
