use std::sync::Once;

use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Logging configuration options
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level, used when `RUST_LOG` is unset
    pub level: Level,
    /// Whether to include source code locations
    pub source_location: bool,
    /// Whether to include the event target
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            source_location: false,
            target: true,
        }
    }
}

impl LogConfig {
    /// Settings for one run; `--debug` raises the level and adds locations.
    pub fn for_run(debug: bool) -> Self {
        if debug {
            Self {
                level: Level::DEBUG,
                source_location: true,
                ..Default::default()
            }
        } else {
            Self::default()
        }
    }
}

/// Initialize logging system. Only the first call per process installs a subscriber.
pub fn setup_logging(config: LogConfig) -> Result<(), String> {
    let mut result = Ok(());

    INIT.call_once(|| {
        result = setup_logging_internal(config);
    });

    result
}

fn setup_logging_internal(config: LogConfig) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(config.level.into()));

    // stdout carries results and diagnostics only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.target)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| format!("Failed to set global subscriber: {}", e))
}
