//! Logging configuration using the tracing ecosystem.
//!
//! Structured logging to stderr with environment-based level configuration.
//! Embedding applications that install their own subscriber can skip this
//! entirely; the client only ever emits through the `tracing` macros.

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Default log filter if RUST_LOG is not set.
const DEFAULT_LOG_FILTER: &str = "trackwire=info,warn";

/// Initialize the logging system.
///
/// Configure levels via the `RUST_LOG` environment variable, e.g.
/// `RUST_LOG=trackwire=debug` for verbose client output.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "trackwire starting up");
    Ok(())
}

/// Log a clean shutdown message.
pub fn shutdown() {
    tracing::info!("trackwire shutting down");
}
