use std::sync::Once;

use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt};

static TRACING_INIT: Once = Once::new();

/// Crate log level used when `RUST_LOG` does not say otherwise.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "finplan=debug" } else { "finplan=warn" }
}

/// Initializes the global tracing subscriber, writing to stderr so that
/// command output on stdout stays machine-readable.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(
                default_directive(verbose)
                    .parse()
                    .unwrap_or_else(|_| LevelFilter::WARN.into()),
            )
            .from_env_lossy();

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    });
}
