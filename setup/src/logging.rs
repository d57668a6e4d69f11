//! Stderr diagnostics for `setup`, filtered by `RUST_LOG`.
//!
//! Step progress and the final summary are printed by `io::reporter` on
//! stdout and never pass through here. This subscriber only carries spawn,
//! exit, timeout, and skip events for whoever is debugging a run.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber: compact lines on stderr, `warn` unless
/// `RUST_LOG` says otherwise (e.g. `RUST_LOG=setup=debug setup --root .`).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
