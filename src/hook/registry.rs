use super::{HookSession, KeyEdge, KeyHandler};
use crate::keybind::Keybind;
use std::collections::HashMap;
use std::sync::{Condvar, Mutex, PoisonError, RwLock};
#[cfg(test)]
use std::time::Duration;

type HandlerMap = HashMap<(Keybind, KeyEdge), Vec<KeyHandler>>;

#[derive(Debug, Default)]
struct Lifecycle {
    epoch: u64,
    running: bool,
}

/// Handler table plus session bookkeeping shared by the key-event sources.
///
/// Dispatch holds the table's read lock while handlers run; `end()` takes the
/// write lock, which is what makes it wait for in-flight handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HandlerMap>,
    lifecycle: Mutex<Lifecycle>,
    ended: Condvar,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, key: Keybind, edge: KeyEdge, handler: KeyHandler) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((key, edge))
            .or_default()
            .push(handler);
    }

    pub fn handler_count(&self, key: Keybind, edge: KeyEdge) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(key, edge))
            .map_or(0, Vec::len)
    }

    /// Run every handler registered for `key`/`edge`; returns how many ran.
    pub fn dispatch(&self, key: Keybind, edge: KeyEdge) -> usize {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = handlers.get(&(key, edge)) else {
            return 0;
        };
        for handler in list {
            handler();
        }
        list.len()
    }

    pub fn begin(&self) -> HookSession {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        lifecycle.epoch += 1;
        lifecycle.running = true;
        HookSession {
            epoch: lifecycle.epoch,
        }
    }

    pub fn is_live(&self, session: HookSession) -> bool {
        let lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        Self::live(&lifecycle, session)
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running
    }

    /// Block until `session` is no longer live.
    pub fn wait_ended(&self, session: HookSession) {
        let lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        let _ended = self
            .ended
            .wait_while(lifecycle, |lifecycle| Self::live(lifecycle, session))
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Like [`wait_ended`](Self::wait_ended) but gives up after `timeout`.
    /// Returns whether the session ended.
    #[cfg(test)]
    fn wait_ended_timeout(&self, session: HookSession, timeout: Duration) -> bool {
        let lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        let (lifecycle, _) = self
            .ended
            .wait_timeout_while(lifecycle, timeout, |lifecycle| Self::live(lifecycle, session))
            .unwrap_or_else(PoisonError::into_inner);
        !Self::live(&lifecycle, session)
    }

    pub fn end(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        lifecycle.running = false;
        self.ended.notify_all();
    }

    fn live(lifecycle: &Lifecycle, session: HookSession) -> bool {
        lifecycle.running && lifecycle.epoch == session.epoch
    }
}
