//! System-wide key source backed by the `global-hotkey` crate.
//!
//! Known limitation: on Windows and macOS `global-hotkey` only reports events
//! while the thread that created the manager pumps a native event loop.

use super::{HandlerRegistry, HookSession, KeyEdge, KeyEventSource, KeyHandler};
use crate::error::{ClickerError, Result};
use crate::keybind::Keybind;
use global_hotkey::hotkey::{Code, HotKey};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long `process` sleeps between polls of the hotkey event queue.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct GlobalHotkeySource {
    manager: Mutex<GlobalHotKeyManager>,
    bound: Mutex<HashMap<u32, (Keybind, HotKey)>>,
    registry: HandlerRegistry,
}

impl GlobalHotkeySource {
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new().map_err(|e| {
            ClickerError::hotkey(format!("failed to create GlobalHotKeyManager: {e}"))
        })?;

        Ok(Self {
            manager: Mutex::new(manager),
            bound: Mutex::new(HashMap::new()),
            registry: HandlerRegistry::new(),
        })
    }

    fn key_for(&self, id: u32) -> Option<Keybind> {
        self.bound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|(key, _)| *key)
    }
}

impl KeyEventSource for GlobalHotkeySource {
    fn register(&self, key: Keybind, edge: KeyEdge, handler: KeyHandler) -> Result<()> {
        let hotkey = hotkey_for(key)?;
        let mut bound = self.bound.lock().unwrap_or_else(PoisonError::into_inner);

        if !bound.contains_key(&hotkey.id()) {
            self.manager
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .register(hotkey)
                .map_err(|e| {
                    ClickerError::hotkey(format!("failed to register hotkey '{key}': {e}"))
                })?;
            bound.insert(hotkey.id(), (key, hotkey));
            info!(%key, "global hotkey registered");
        }

        self.registry.add(key, edge, handler);
        Ok(())
    }

    fn start(&self) -> Result<HookSession> {
        Ok(self.registry.begin())
    }

    fn process(&self, session: HookSession) -> Result<()> {
        let receiver = GlobalHotKeyEvent::receiver();

        while self.registry.is_live(session) {
            while let Ok(event) = receiver.try_recv() {
                let Some(key) = self.key_for(event.id) else {
                    continue;
                };
                let edge = match event.state {
                    HotKeyState::Pressed => KeyEdge::Down,
                    HotKeyState::Released => KeyEdge::Up,
                };
                debug!(%key, ?edge, "hotkey event");
                self.registry.dispatch(key, edge);
            }

            std::thread::sleep(POLL_INTERVAL);
        }

        Ok(())
    }

    fn end(&self) {
        let manager = self.manager.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, (key, hotkey)) in self
            .bound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
        {
            if let Err(e) = manager.unregister(hotkey) {
                warn!(%key, "failed to unregister hotkey: {e}");
            }
        }
        drop(manager);

        self.registry.end();
    }
}

/// Map an allow-listed key to the unmodified hotkey for its physical key.
fn hotkey_for(key: Keybind) -> Result<HotKey> {
    Ok(HotKey::new(None, key_code(key)?))
}

fn key_code(key: Keybind) -> Result<Code> {
    let code = match key.as_str() {
        // Numbers
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,

        // Letters
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,

        // Punctuation
        "[" => Code::BracketLeft,
        "]" => Code::BracketRight,
        ";" => Code::Semicolon,
        "," => Code::Comma,
        "." => Code::Period,
        "/" => Code::Slash,
        "-" => Code::Minus,
        "=" => Code::Equal,

        other => return Err(ClickerError::invalid_keybind(other, "no physical key mapping")),
    };

    Ok(code)
}
