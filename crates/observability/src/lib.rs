// crates/observability/src/lib.rs
//! Tracing subscriber set-up for the jobwatch binaries.
//!
//! Filter comes from `RUST_LOG` when set, otherwise [`DEFAULT_FILTER`].
//! Output is compact human-readable lines on stderr, or one JSON object
//! per event for log shippers.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Quiet dependencies, informative jobwatch crates.
pub const DEFAULT_FILTER: &str = "warn,jobwatch=info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// `RUST_LOG` if present and valid, else `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), TryInitError> {
    let filter = env_filter(DEFAULT_FILTER);
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
}
