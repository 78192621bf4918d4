use anyhow::{Context, Result};
use autoclicker::config::parse_duration;
use autoclicker::logging::init_logging;
use autoclicker::{
    Config, Console, Coordinator, CountingClicker, EnigoClicker, GlobalHotkeySource,
    KeyEventSource, TriggerMode, VirtualKeySource,
};
use clap::Parser;
use colored::Colorize;
use std::io;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "autoclicker", version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Button to auto-click (digit, a-z, [ ] ; , . / - =)
    #[arg(short, long)]
    key: Option<String>,

    /// Trigger mode
    #[arg(short, long, value_enum)]
    mode: Option<TriggerMode>,

    /// Delay between clicks, e.g. 250ms, 1s or a bare millisecond count
    #[arg(short, long)]
    delay: Option<String>,

    /// Hold mode: release the trigger after this long without a key-down
    #[arg(long)]
    release_after: Option<String>,

    /// Do not register the key hook at launch
    #[arg(long)]
    no_autostart: bool,

    /// Count clicks instead of performing them
    #[arg(long)]
    dry_run: bool,

    /// Take key events from console press/release commands instead of the keyboard
    #[arg(long)]
    virtual_keys: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.verbose);
    config.validate()?;

    println!(
        "{} {} (type {} for commands)",
        "Autoclicker".bold(),
        env!("CARGO_PKG_VERSION"),
        "help".bold()
    );

    let runtime = Handle::current();
    let console = tokio::task::spawn_blocking(move || run_console(&config, runtime));

    tokio::select! {
        result = console => result??,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("interrupted, exiting");
            // The console thread is blocked on stdin; abandon it.
            std::process::exit(0);
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(key) = &cli.key {
        config.keybind = key.clone();
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(delay) = &cli.delay {
        config.delay = parse_duration(delay)?;
    }
    if let Some(release_after) = &cli.release_after {
        config.release_after = Some(parse_duration(release_after)?);
    }
    config.autostart &= !cli.no_autostart;
    config.dry_run |= cli.dry_run;
    config.virtual_keys |= cli.virtual_keys;
    config.verbose |= cli.verbose;

    Ok(config)
}

fn run_console(config: &Config, runtime: Handle) -> Result<()> {
    let keys = config
        .virtual_keys
        .then(|| Arc::new(VirtualKeySource::new()));
    let source: Arc<dyn KeyEventSource> = match &keys {
        Some(keys) => keys.clone(),
        None => Arc::new(
            GlobalHotkeySource::new()
                .context("global hotkeys unavailable, try --virtual-keys")?,
        ),
    };

    let coordinator = build_coordinator(config, source, runtime)?;
    let mut console = Console::new(coordinator, keys, io::stdout());

    if config.autostart {
        if let Err(e) = console.coordinator_mut().on_start_requested() {
            warn!("failed to enable hooks at launch: {e}");
        }
    }

    console.run(io::stdin().lock())?;
    Ok(())
}

fn build_coordinator(
    config: &Config,
    source: Arc<dyn KeyEventSource>,
    runtime: Handle,
) -> Result<Coordinator> {
    let options = config.coordinator_options()?;
    let coordinator = if config.dry_run {
        info!("dry run, clicks are counted but not performed");
        Coordinator::new(options, source, runtime, || Ok(CountingClicker::new()))?
    } else {
        Coordinator::new(options, source, runtime, EnigoClicker::new)?
    };
    Ok(coordinator)
}
