//! Logging setup for the `sprig` binary.

use crate::error::{ClientError, ClientResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter directives.
pub const LOG_ENV_VAR: &str = "SPRIG_LOG";

const DEFAULT_FILTER: &str = "info";

/// Install a stderr `fmt` subscriber filtered by `SPRIG_LOG` (default `info`).
pub fn init_logging() -> ClientResult<()> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| ClientError::Logging(e.to_string()))?;

    tracing::debug!(filter_env = LOG_ENV_VAR, "logging initialized");
    Ok(())
}
