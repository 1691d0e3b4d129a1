//! Log setup for the `prodspec` binary. Library code only emits `tracing` events and
//! spans; installing a subscriber is left to whoever embeds the view-model.

use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`
/// (normally `PRODSPEC_LOG`).
///
/// Events go to stderr: stdout carries the product table or `--json` output.
/// Fails if a subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}
