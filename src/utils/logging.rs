use crate::config::LoggingConfig;
use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the tracing system with the given configuration
///
/// Only the first call installs a subscriber; later calls are ignored. `RUST_LOG`
/// takes precedence over the configured level when set.
///
/// # Example
/// ```
/// use msnp_wire::config::LoggingConfig;
/// use msnp_wire::utils::logging::init_logging;
/// use tracing::Level;
///
/// let config = LoggingConfig {
///     app_name: "ns-client".to_string(),
///     log_level: Level::DEBUG,
///     ..Default::default()
/// };
///
/// init_logging(&config);
/// ```
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{app_name}={level},msnp_wire={level}",
                app_name = config.app_name,
                level = config.log_level
            ))
        });

        let registry = registry().with(filter);

        let installed = if config.json_format {
            registry
                .with(fmt::layer().json().with_writer(std::io::stdout))
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_writer(std::io::stdout).with_ansi(true))
                .try_init()
        };

        match installed {
            Ok(()) => tracing::info!("Logging initialized at {} level", config.log_level),
            Err(e) => eprintln!("Logging already initialized elsewhere: {e}"),
        }
    });
}

/// Setup default logging configuration for quick startup
pub fn setup_default_logging() {
    init_logging(&LoggingConfig::default());
}
