//! Line-based settings console.
//!
//! Each input line is one settings-panel interaction. Invalid keybind and
//! delay edits are ignored without comment, the same as typing into a field
//! the panel does not accept.

use crate::config::TriggerMode;
use crate::coordinator::{Coordinator, HookLifecycle};
use crate::error::Result;
use crate::hook::VirtualKeySource;
use crate::keybind::Keybind;
use colored::Colorize;
use std::io::{BufRead, Write};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Key(String),
    Mode(TriggerMode),
    Delay(String),
    Update,
    Status,
    Press(Option<String>),
    Release(Option<String>),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, arg) = match line.split_once(char::is_whitespace) {
            Some((word, arg)) => (word, Some(arg.trim())),
            None => (line, None),
        };

        match (word.to_lowercase().as_str(), arg) {
            ("", _) => Self::Empty,
            ("start", None) => Self::Start,
            ("stop", None) => Self::Stop,
            ("key", arg) => Self::Key(arg.unwrap_or_default().to_string()),
            ("mode", Some("hold")) => Self::Mode(TriggerMode::Hold),
            ("mode", Some("toggle")) => Self::Mode(TriggerMode::Toggle),
            ("delay", arg) => Self::Delay(arg.unwrap_or_default().to_string()),
            ("update", None) => Self::Update,
            ("status", None) => Self::Status,
            ("press", arg) => Self::Press(arg.map(str::to_string)),
            ("release", arg) => Self::Release(arg.map(str::to_string)),
            ("help" | "?", None) => Self::Help,
            ("quit" | "exit", None) => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

pub struct Console<W: Write> {
    coordinator: Coordinator,
    keys: Option<Arc<VirtualKeySource>>,
    out: W,
}

impl<W: Write> Console<W> {
    /// `keys` enables the `press`/`release` commands.
    pub fn new(coordinator: Coordinator, keys: Option<Arc<VirtualKeySource>>, out: W) -> Self {
        Self {
            coordinator,
            keys,
            out,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut Coordinator {
        &mut self.coordinator
    }

    /// Read commands until `quit` or end of input.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<()> {
        self.print_status()?;
        for line in input.lines() {
            if !self.execute(Command::parse(&line?))? {
                break;
            }
        }
        Ok(())
    }

    /// Apply one command. Returns `false` when the console should close.
    pub fn execute(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Start => {
                match self.coordinator.on_start_requested() {
                    Ok(true) => self.print_status()?,
                    Ok(false) => writeln!(self.out, "Autoclicker already enabled")?,
                    Err(e) => writeln!(self.out, "{} {e}", "Failed to start:".red().bold())?,
                }
            }
            Command::Stop => {
                match self.coordinator.on_stop_requested() {
                    Ok(true) => self.print_status()?,
                    Ok(false) => writeln!(self.out, "Autoclicker already disabled")?,
                    Err(e) => writeln!(self.out, "{} {e}", "Failed to stop:".red().bold())?,
                }
            }
            Command::Key(text) => {
                if self.coordinator.on_keybind_edited(&text) {
                    writeln!(self.out, "Button to auto-click: {}", text.cyan())?;
                }
            }
            Command::Mode(mode) => {
                self.coordinator.on_mode_selected(mode);
                writeln!(
                    self.out,
                    "Trigger mode: {} (applies on next start)",
                    mode.to_string().cyan()
                )?;
            }
            Command::Delay(text) => {
                self.coordinator.on_delay_edited(&text);
            }
            Command::Update => match self.coordinator.on_delay_commit_requested() {
                Ok(true) => writeln!(
                    self.out,
                    "Click delay: {} ms",
                    self.coordinator.staged_delay_ms().to_string().cyan()
                )?,
                Ok(false) => writeln!(self.out, "Click loop busy, press update again")?,
                Err(e) => writeln!(self.out, "{} {e}", "Failed to update delay:".red().bold())?,
            },
            Command::Status => self.print_status()?,
            Command::Press(key) => self.send_virtual(key, true)?,
            Command::Release(key) => self.send_virtual(key, false)?,
            Command::Help => self.print_help()?,
            Command::Quit => return Ok(false),
            Command::Empty => {}
            Command::Unknown(line) => {
                writeln!(self.out, "Unknown command '{line}', type {} for a list", "help".bold())?;
            }
        }
        self.out.flush()?;
        Ok(true)
    }

    fn send_virtual(&mut self, key: Option<String>, down: bool) -> Result<()> {
        let Some(keys) = &self.keys else {
            writeln!(self.out, "Virtual keys are disabled, restart with --virtual-keys")?;
            return Ok(());
        };
        let key = match key {
            Some(text) => match Keybind::parse(&text) {
                Some(key) => key,
                None => {
                    writeln!(self.out, "Unknown key '{text}'")?;
                    return Ok(());
                }
            },
            None => self.coordinator.keybind(),
        };

        if down {
            keys.press(key);
        } else {
            keys.release(key);
        }
        Ok(())
    }

    fn print_status(&mut self) -> Result<()> {
        let status = match self.coordinator.status() {
            HookLifecycle::Registered => HookLifecycle::Registered.to_string().green().bold(),
            HookLifecycle::Unregistered => HookLifecycle::Unregistered.to_string().red().bold(),
        };
        let stats = self.coordinator.click_stats();
        let clicking = if stats.active() { "clicking" } else { "idle" };

        writeln!(self.out, "Status: {status}")?;
        writeln!(
            self.out,
            "  key {} | mode {} | delay {} ms (staged {} ms) | {clicking} | {} clicks",
            self.coordinator.keybind().as_str().cyan(),
            self.coordinator.mode(),
            stats.delay_ms(),
            self.coordinator.staged_delay_ms(),
            stats.clicks(),
        )?;
        Ok(())
    }

    fn print_help(&mut self) -> Result<()> {
        writeln!(self.out, "{}", "Commands:".bold())?;
        writeln!(self.out, "  start              register the key hook")?;
        writeln!(self.out, "  stop               stop clicking and unregister the hook")?;
        writeln!(
            self.out,
            "  key <k>            button to auto-click (digit, a-z, [ ] ; , . / - =)"
        )?;
        writeln!(self.out, "  mode <hold|toggle> trigger mode for the next start")?;
        writeln!(self.out, "  delay <ms>         stage a click delay in milliseconds")?;
        writeln!(self.out, "  update             apply the staged delay")?;
        writeln!(self.out, "  status             show current settings")?;
        if self.keys.is_some() {
            writeln!(self.out, "  press [k]          simulate a key-down")?;
            writeln!(self.out, "  release [k]        simulate a key-up")?;
        }
        writeln!(self.out, "  quit               exit")?;
        Ok(())
    }
}
