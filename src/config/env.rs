//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `TERRALINK_DISCORD_TOKEN` - Discord bot token
//! - `TERRALINK_CHANNEL_ID` - Relay channel ID
//! - `TERRALINK_REST_TOKEN` - TShock REST token
//! - `TERRALINK_REST_URL` - TShock REST base URL

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "TERRALINK";

/// Apply environment variable overrides to a config.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = token;
    }

    if let Ok(channel_id) = env::var(format!("{}_CHANNEL_ID", ENV_PREFIX)) {
        if let Ok(id) = channel_id.parse() {
            config.discord.channel_id = id;
        }
    }

    if let Ok(token) = env::var(format!("{}_REST_TOKEN", ENV_PREFIX)) {
        config.game.rest_token = token;
    }
    if let Ok(url) = env::var(format!("{}_REST_URL", ENV_PREFIX)) {
        config.game.rest_url = url;
    }

    config
}

/// Names of override variables that are set but empty.
pub fn check_empty_env_vars() -> Vec<String> {
    let vars = [
        format!("{}_DISCORD_TOKEN", ENV_PREFIX),
        format!("{}_REST_TOKEN", ENV_PREFIX),
    ];

    vars.into_iter()
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}

/// Get the config file path from environment or use default.
///
/// Checks `TERRALINK_CONFIG`, otherwise returns "terralink.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "terralink.conf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "TERRALINK");
    }

    #[test]
    fn test_get_config_path_default() {
        env::remove_var("TERRALINK_CONFIG");
        assert_eq!(get_config_path(), "terralink.conf");
    }

    #[test]
    fn test_apply_env_overrides() {
        env::remove_var("TERRALINK_DISCORD_TOKEN");
        env::remove_var("TERRALINK_REST_URL");
        env::set_var("TERRALINK_CHANNEL_ID", "424242");
        env::set_var("TERRALINK_REST_TOKEN", "secret");

        let result = apply_env_overrides(Config::for_tests());

        env::remove_var("TERRALINK_CHANNEL_ID");
        env::remove_var("TERRALINK_REST_TOKEN");

        assert_eq!(result.discord.token, "test_token_0123456789");
        assert_eq!(result.discord.channel_id, 424242);
        assert_eq!(result.game.rest_token, "secret");
        assert_eq!(result.game.rest_url, "http://127.0.0.1:7878");
    }
}
