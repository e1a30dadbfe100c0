//! Tracing subscriber setup.
//!
//! Log lines go to stderr so command output on stdout stays clean for
//! piping. `RUST_LOG` overrides the per-command default filter.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter for the long-running web server.
pub const SERVE_FILTER: &str = "support_kb=info,tower_http=info";

/// Default filter for one-shot CLI commands.
pub const CLI_FILTER: &str = "warn";

/// Install the global subscriber. Calling this twice is harmless.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .try_init();
}
