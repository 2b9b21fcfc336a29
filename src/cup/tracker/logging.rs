use tracing_subscriber::{EnvFilter, fmt};

use crate::cup::tracker::error::{Result, TrackerError};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber, writing to stderr so command output on
/// stdout stays machine-readable. `RUST_LOG` overrides [`DEFAULT_FILTER`].
pub fn init_logging() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| TrackerError::Logging(err.to_string()))
}
