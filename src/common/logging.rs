//! Console and log file output.
//!
//! Every event goes to the console and, when configured, to an append-only
//! log file. Each line carries a local timestamp in the configured format
//! and the severity level.

use std::fs::OpenOptions;
use std::sync::Mutex;

use chrono::format::{Item, StrftimeItems};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::types::{LoggingConfig, DEFAULT_TIMESTAMP_FORMAT};

/// Returns true if `format` is a strftime string chrono can render.
pub fn is_valid_timestamp_format(format: &str) -> bool {
    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the level is `debug` in debug
/// mode and `info` otherwise.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = if config.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let format = if is_valid_timestamp_format(&config.timestamp_format) {
        config.timestamp_format.clone()
    } else {
        DEFAULT_TIMESTAMP_FORMAT.to_string()
    };

    let console = fmt::layer().with_timer(ChronoLocal::new(format.clone()));

    // The mutex serializes concurrent writers to the file.
    let file_layer = match config.file.as_deref().filter(|path| !path.is_empty()) {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_timer(ChronoLocal::new(format))
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timestamp_format_is_valid() {
        assert!(is_valid_timestamp_format(DEFAULT_TIMESTAMP_FORMAT));
        assert!(is_valid_timestamp_format("%H:%M:%S"));
    }

    #[test]
    fn test_broken_timestamp_format_is_rejected() {
        assert!(!is_valid_timestamp_format(""));
        assert!(!is_valid_timestamp_format("%Q %H"));
    }
}
