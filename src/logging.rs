use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging with tracing.
///
/// `RUST_LOG` wins when set. Otherwise the crate logs at `info`, or `debug`
/// with `verbose`, and everything else at `warn`.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "autoclicker=debug,warn"
    } else {
        "autoclicker=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
