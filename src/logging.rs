//! Logging configuration using tracing.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{BackupError, BackupResult};

/// Initialize logging with the specified level
///
/// `RUST_LOG` takes precedence over `level`. Output goes to stderr so
/// command output on stdout stays clean.
pub fn init(level: &str) -> BackupResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| BackupError::Config(format!("Failed to initialize logging: {}", e)))
}
