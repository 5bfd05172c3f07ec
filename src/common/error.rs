//! Error types for the application.

use thiserror::Error;
use tracing::error;

/// Top-level application error.
#[derive(Debug, Error)]
#[allow(dead_code)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Game server error: {0}")]
    Game(#[from] GameError),

    #[error("Discord error: {0}")]
    Discord(#[from] DiscordError),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file '{path}' does not exist")]
    NotFound { path: String },

    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("Failed to load item table '{path}': {message}")]
    ItemTable { path: String, message: String },
}

/// Errors talking to the game host (REST API or host link).
#[derive(Debug, Error)]
pub enum GameError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from game server: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Game server returned status {status}: {message}")]
    Status { status: String, message: String },

    #[error("No game host is connected")]
    NotConnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discord-related errors.
#[derive(Debug, Error)]
#[allow(dead_code)]
pub enum DiscordError {
    #[error("Failed to connect to Discord: {message}")]
    ConnectionFailed { message: String },

    #[error("Relay channel is not available")]
    ChannelUnavailable,

    #[error("Serenity error: {0}")]
    Serenity(#[from] serenity::Error),
}

/// Result type alias for game host operations.
pub type GameResult<T> = std::result::Result<T, GameError>;

/// Result type alias for Discord operations.
pub type DiscordResult<T> = std::result::Result<T, DiscordError>;

/// Process exit status used when the abort policy fires.
pub const EXIT_FAILURE: i32 = 1;

/// Global error policy.
///
/// A single `abort_on_error` flag decides whether a caught error terminates
/// the process or is only logged. It applies uniformly to every error site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorPolicy {
    abort_on_error: bool,
}

impl ErrorPolicy {
    pub fn new(abort_on_error: bool) -> Self {
        Self { abort_on_error }
    }

    pub fn aborts(&self) -> bool {
        self.abort_on_error
    }

    /// Log an error and exit the process if the policy says so.
    pub fn fatal(&self, message: impl std::fmt::Display) {
        error!("{}", message);
        if self.aborts() {
            error!("abort_on_error is set, terminating");
            std::process::exit(EXIT_FAILURE);
        }
    }
}
