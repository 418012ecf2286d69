//! Process-wide logging setup.
//!
//! Library code logs through the `log` facade and opens `tracing` spans
//! around CPU-bound work. `init_tracing` installs a `tracing-subscriber`
//! fmt layer and bridges `log` records into it.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::ScanshelfError;

/// Installs the global subscriber. `RUST_LOG` overrides `config.level`.
///
/// Returns `ScanshelfError::Telemetry` when a global subscriber or logger
/// is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ScanshelfError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ScanshelfError::Telemetry(format!("invalid log filter: {}", e)))?;

    let fmt_layer = if config.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let subscriber = tracing_subscriber::registry().with(fmt_layer).with(filter);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ScanshelfError::Telemetry(e.to_string()))?;
    tracing_log::LogTracer::init().map_err(|e| ScanshelfError::Telemetry(e.to_string()))?;

    tracing::info!(json = config.json, level = %config.level, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_init_twice_reports_error() {
        let config = LoggingConfig::default();
        init_tracing(&config).unwrap();

        let second = init_tracing(&config);
        assert!(matches!(second, Err(ScanshelfError::Telemetry(_))));

        log::info!("log records are bridged after init");
    }
}
