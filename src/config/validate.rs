//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use std::net::SocketAddr;

use crate::common::error::ConfigError;
use crate::common::logging::is_valid_timestamp_format;
use crate::config::types::{Config, PLACEHOLDER_TOKEN};

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Discord
    if config.discord.token.is_empty() {
        errors.push("discord.token is required".to_string());
    }
    if config.discord.token == PLACEHOLDER_TOKEN {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }
    if config.discord.channel_id == 0 {
        errors.push("discord.channel_id must be non-zero".to_string());
    }
    if config.discord.command_prefix.trim().is_empty() {
        errors.push("discord.command_prefix must not be empty".to_string());
    }

    // Game host
    if !config.game.rest_url.starts_with("http://") && !config.game.rest_url.starts_with("https://")
    {
        errors.push(format!(
            "game.rest_url '{}' must start with http:// or https://",
            config.game.rest_url
        ));
    }
    if config.game.link_address.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "game.link_address '{}' is not a valid socket address",
            config.game.link_address
        ));
    }
    for (i, specifier) in config.game.command_specifiers.iter().enumerate() {
        if specifier.is_empty() {
            errors.push(format!("game.command_specifiers[{}] must not be empty", i));
        }
    }

    // Emoticons
    for (i, mapping) in config.emoticons.iter().enumerate() {
        if mapping.emoticon.is_empty() {
            errors.push(format!("emoticons[{}].emoticon must not be empty", i));
        }
        if mapping.emoji.is_empty() {
            errors.push(format!("emoticons[{}].emoji must not be empty", i));
        }
    }

    // Logging
    if !is_valid_timestamp_format(&config.logging.timestamp_format) {
        errors.push(format!(
            "logging.timestamp_format '{}' is not a valid strftime format",
            config.logging.timestamp_format
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
