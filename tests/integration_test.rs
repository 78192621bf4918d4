use anyhow::Result;
use autoclicker::config::{parse_duration, Config};
use autoclicker::hook::KeyEdge;
use autoclicker::{
    ClickerError, Clicker, Coordinator, CoordinatorOptions, CountingClicker, HookLifecycle,
    Keybind, TriggerMode, VirtualKeySource,
};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio::runtime::Runtime;

fn key(text: &str) -> Keybind {
    Keybind::parse(text).unwrap()
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Records when each click happened.
#[derive(Clone, Default)]
struct RecordingClicker {
    clicks: Arc<Mutex<Vec<Instant>>>,
}

impl RecordingClicker {
    fn count(&self) -> usize {
        self.clicks.lock().unwrap().len()
    }

    fn since(&self, start: Instant) -> Vec<Instant> {
        self.clicks
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|at| *at >= start)
            .collect()
    }
}

impl Clicker for RecordingClicker {
    fn click(&mut self) -> autoclicker::Result<()> {
        self.clicks.lock().unwrap().push(Instant::now());
        Ok(())
    }
}

fn coordinator_with(
    runtime: &Runtime,
    mode: TriggerMode,
    delay_ms: u64,
) -> (Coordinator, Arc<VirtualKeySource>, RecordingClicker) {
    let keys = Arc::new(VirtualKeySource::new());
    let clicker = RecordingClicker::default();
    let moved = clicker.clone();
    let options = CoordinatorOptions {
        keybind: key("p"),
        mode,
        delay_ms,
        release_after: None,
    };
    let coordinator =
        Coordinator::new(options, keys.clone(), runtime.handle().clone(), move || Ok(moved))
            .unwrap();
    (coordinator, keys, clicker)
}

#[test]
fn test_hold_mode_end_to_end() {
    let runtime = Runtime::new().unwrap();
    let (mut coordinator, keys, clicker) = coordinator_with(&runtime, TriggerMode::Hold, 2);

    coordinator.on_start_requested().unwrap();
    assert_eq!(clicker.count(), 0);

    keys.press(key("p"));
    assert!(wait_until(Duration::from_secs(1), || clicker.count() >= 5));

    keys.release(key("p"));
    let stats = coordinator.click_stats();
    assert!(wait_until(Duration::from_secs(1), || !stats.active()));
    let settled = clicker.count();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(clicker.count(), settled, "clicks continued after key-up");
}

#[test]
fn test_hold_mode_tap_then_hold_keeps_clicking() {
    let runtime = Runtime::new().unwrap();
    let (mut coordinator, keys, _clicker) = coordinator_with(&runtime, TriggerMode::Hold, 300);
    coordinator.on_start_requested().unwrap();
    let stats = coordinator.click_stats();

    // All three land while the loop sleeps between drains.
    keys.press(key("p"));
    keys.release(key("p"));
    keys.press(key("p"));

    thread::sleep(Duration::from_millis(800));
    assert!(stats.active(), "key is held after a tap, clicking should be on");

    keys.release(key("p"));
    assert!(wait_until(Duration::from_secs(1), || !stats.active()));
}

#[test]
fn test_toggle_mode_end_to_end() {
    let runtime = Runtime::new().unwrap();
    let (mut coordinator, keys, clicker) = coordinator_with(&runtime, TriggerMode::Toggle, 2);
    coordinator.on_start_requested().unwrap();

    keys.press(key("p"));
    keys.release(key("p"));
    assert!(wait_until(Duration::from_secs(1), || clicker.count() >= 3));

    // Keeps clicking with no further input.
    let before = clicker.count();
    thread::sleep(Duration::from_millis(50));
    assert!(clicker.count() > before);

    keys.press(key("p"));
    let stats = coordinator.click_stats();
    assert!(wait_until(Duration::from_secs(1), || !stats.active()));
    let settled = clicker.count();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(clicker.count(), settled);
}

#[test]
fn test_rapid_concurrent_toggles() {
    let runtime = Runtime::new().unwrap();
    let (mut coordinator, keys, _clicker) = coordinator_with(&runtime, TriggerMode::Toggle, 0);
    coordinator.on_start_requested().unwrap();
    let stats = coordinator.click_stats();

    for presses in [4usize, 9] {
        let handles: Vec<_> = (0..presses)
            .map(|_| {
                let keys = keys.clone();
                thread::spawn(move || {
                    keys.press(key("p"));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        // Every flip is queued by now; give the zero-delay loop time to drain.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(stats.active(), presses % 2 == 1, "after {presses} presses");
    }
}

#[test]
fn test_double_start_fires_one_handler_per_event() {
    let runtime = Runtime::new().unwrap();
    let (mut coordinator, keys, _clicker) = coordinator_with(&runtime, TriggerMode::Toggle, 1);

    assert!(coordinator.on_start_requested().unwrap());
    assert!(!coordinator.on_start_requested().unwrap());

    assert_eq!(keys.handler_count(key("p"), KeyEdge::Down), 1);
    assert_eq!(keys.press(key("p")), 1);

    // One press flipped once, so clicking is on rather than cancelled out.
    let stats = coordinator.click_stats();
    assert!(wait_until(Duration::from_secs(1), || stats.active()));
}

#[test]
fn test_stop_always_settles_off() {
    let runtime = Runtime::new().unwrap();
    let (mut coordinator, keys, clicker) = coordinator_with(&runtime, TriggerMode::Hold, 0);
    let stats = coordinator.click_stats();

    for _ in 0..5 {
        coordinator.on_start_requested().unwrap();

        let presser = {
            let keys = keys.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    keys.press(key("p"));
                }
            })
        };
        thread::sleep(Duration::from_millis(1));
        coordinator.on_stop_requested().unwrap();
        presser.join().unwrap();

        assert_eq!(coordinator.status(), HookLifecycle::Unregistered);
        assert!(wait_until(Duration::from_secs(1), || !stats.active()));
        let settled = clicker.count();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(clicker.count(), settled);
    }
}

#[test]
fn test_committed_delay_spaces_clicks() {
    let runtime = Runtime::new().unwrap();
    let (mut coordinator, keys, clicker) = coordinator_with(&runtime, TriggerMode::Toggle, 0);
    let stats = coordinator.click_stats();

    assert!(!coordinator.on_delay_edited("abc"));
    assert_eq!(coordinator.staged_delay_ms(), 0);
    assert!(coordinator.on_delay_edited("250"));
    assert!(coordinator.on_delay_commit_requested().unwrap());
    assert!(wait_until(Duration::from_secs(1), || stats.delay_ms() == 250));

    coordinator.on_start_requested().unwrap();
    let start = Instant::now();
    keys.press(key("p"));
    thread::sleep(Duration::from_millis(1_200));

    let clicks = clicker.since(start);
    assert!(
        (3..=6).contains(&clicks.len()),
        "expected about 5 clicks in 1.2s, got {}",
        clicks.len()
    );
    for pair in clicks.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= Duration::from_millis(240), "gap {gap:?} too short");
        assert!(gap <= Duration::from_millis(500), "gap {gap:?} too long");
    }
}

#[test]
fn test_dry_run_clicker_counts() {
    let runtime = Runtime::new().unwrap();
    let keys = Arc::new(VirtualKeySource::new());
    let clicker = CountingClicker::new();
    let observer = clicker.clone();
    let mut coordinator = Coordinator::new(
        CoordinatorOptions {
            delay_ms: 1,
            ..CoordinatorOptions::default()
        },
        keys.clone(),
        runtime.handle().clone(),
        move || Ok(clicker),
    )
    .unwrap();

    coordinator.on_start_requested().unwrap();
    keys.press(coordinator.keybind());
    assert!(wait_until(Duration::from_secs(1), || observer.clicks() > 0));
    coordinator.on_stop_requested().unwrap();
}

#[test]
fn test_clicker_failure_fails_construction() {
    let runtime = Runtime::new().unwrap();
    let keys = Arc::new(VirtualKeySource::new());
    let result = Coordinator::new(
        CoordinatorOptions::default(),
        keys,
        runtime.handle().clone(),
        || Err::<CountingClicker, _>(ClickerError::click("no display")),
    );
    assert!(result.is_err());
}

#[test]
fn test_config_file_drives_coordinator() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(
        br#"{
            "keybind": "k",
            "mode": "hold",
            "delay": "50ms",
            "release_after": "2s",
            "autostart": false
        }"#,
    )?;

    let config = Config::from_file(file.path().to_str().unwrap())?;
    assert_eq!(config.keybind, "k");
    assert!(!config.autostart);

    let options = config.coordinator_options()?;
    assert_eq!(options.keybind, key("k"));
    assert_eq!(options.mode, TriggerMode::Hold);
    assert_eq!(options.delay_ms, 50);
    assert_eq!(options.release_after, Some(Duration::from_secs(2)));

    let runtime = Runtime::new()?;
    let keys = Arc::new(VirtualKeySource::new());
    let mut coordinator = Coordinator::new(
        options,
        keys.clone(),
        runtime.handle().clone(),
        || Ok(CountingClicker::new()),
    )?;
    coordinator.on_start_requested()?;
    assert_eq!(keys.handler_count(key("k"), KeyEdge::Up), 1);

    Ok(())
}

#[test]
fn test_config_file_errors() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(r#"{ "keybind": "§" }"#.as_bytes())?;
    let config = Config::from_file(file.path().to_str().unwrap())?;
    assert!(config.coordinator_options().is_err());

    let missing = Config::from_file("/nonexistent/autoclicker.json");
    assert!(matches!(missing, Err(ClickerError::ConfigLoad { .. })));

    assert_eq!(parse_duration("250ms")?, Duration::from_millis(250));
    Ok(())
}
