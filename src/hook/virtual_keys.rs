//! In-process key source.
//!
//! Key events come from [`VirtualKeySource::press`] and
//! [`VirtualKeySource::release`] instead of the keyboard. The console drives
//! it with `press`/`release` commands when `--virtual-keys` is set, which lets
//! the autoclicker run without grabbing a system-wide hotkey.

use super::{HandlerRegistry, HookSession, KeyEdge, KeyEventSource, KeyHandler};
use crate::error::Result;
use crate::keybind::Keybind;
use tracing::debug;

#[derive(Default)]
pub struct VirtualKeySource {
    registry: HandlerRegistry,
}

impl VirtualKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a key-down for `key` on the calling thread. Returns the number
    /// of handlers that ran.
    pub fn press(&self, key: Keybind) -> usize {
        debug!(%key, "virtual key down");
        self.registry.dispatch(key, KeyEdge::Down)
    }

    /// Deliver a key-up for `key` on the calling thread.
    pub fn release(&self, key: Keybind) -> usize {
        debug!(%key, "virtual key up");
        self.registry.dispatch(key, KeyEdge::Up)
    }

    pub fn handler_count(&self, key: Keybind, edge: KeyEdge) -> usize {
        self.registry.handler_count(key, edge)
    }

    pub fn is_running(&self) -> bool {
        self.registry.is_running()
    }
}

impl KeyEventSource for VirtualKeySource {
    fn register(&self, key: Keybind, edge: KeyEdge, handler: KeyHandler) -> Result<()> {
        self.registry.add(key, edge, handler);
        Ok(())
    }

    fn start(&self) -> Result<HookSession> {
        Ok(self.registry.begin())
    }

    fn process(&self, session: HookSession) -> Result<()> {
        self.registry.wait_ended(session);
        Ok(())
    }

    fn end(&self) {
        self.registry.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_process_blocks_until_end() {
        let source = Arc::new(VirtualKeySource::new());
        let presses = Arc::new(AtomicUsize::new(0));
        let key = Keybind::parse("p").unwrap();

        {
            let presses = presses.clone();
            source
                .register(
                    key,
                    KeyEdge::Down,
                    Box::new(move || {
                        presses.fetch_add(1, Ordering::SeqCst);
                    }),
                )
                .unwrap();
        }
        let session = source.start().unwrap();
        assert!(source.is_running());

        let processor = {
            let source = source.clone();
            thread::spawn(move || source.process(session))
        };

        assert_eq!(source.press(key), 1);
        assert_eq!(source.release(key), 0);
        thread::sleep(Duration::from_millis(20));
        assert!(!processor.is_finished());

        source.end();
        processor.join().unwrap().unwrap();
        assert!(!source.is_running());
        assert_eq!(source.press(key), 0);
        assert_eq!(presses.load(Ordering::SeqCst), 1);
    }
}
