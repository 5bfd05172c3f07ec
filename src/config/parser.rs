//! Configuration file parsing (HOCON format).

use std::path::Path;

use hocon::HoconLoader;
use tracing::{info, warn};

use crate::common::error::ConfigError;
use crate::config::env::apply_env_overrides;
use crate::config::types::Config;
use crate::config::validate::validate_config;

/// Default configuration written when no config file exists.
pub const DEFAULT_CONFIG: &str = r#"# terralink configuration
#
# Templates accept these placeholders:
#   $player_name $group_name $message   (game events)
#   $user_name $message                 (Discord -> game)
#   $player_count $player_slots $server_name $uptime $current_time (topic)

discord {
  # Discord bot token
  token = "YOUR_DISCORD_TOKEN_HERE"
  # Relay channel ID
  channel_id = 123
  # Bot owner ID, may run any game command
  owner_id = 123
  # Bot command prefix
  command_prefix = "!"
  # Role names allowed to run game commands
  authorized_roles = ["Admin"]
  # "Playing" status
  bot_game = "Terraria"
  # Topic update interval in seconds (0 disables)
  topic_interval = 300
  # Relay command messages to the game as chat
  relay_commands = true
  # Do not relay Discord chat to the game
  ignore_chat = false
}

game {
  # TShock REST API
  rest_url = "http://127.0.0.1:7878"
  rest_token = ""
  # Address the host link listens on for hook events
  link_address = "127.0.0.1:7879"
  # In-game broadcast color in RGB
  broadcast_color { red = 255, green = 215, blue = 0 }
  # Game command characters, never relayed as chat
  command_specifiers = ["/", "."]
  # Toggle broadcasts displayed in Discord
  silence_broadcasts = false
  # Toggle game chat displayed in Discord
  silence_chat = false
  # Toggle world saves displayed in Discord
  silence_saves = false
}

messages {
  join = "**:heavy_plus_sign: $player_name has joined the server.**"
  leave = "**:heavy_minus_sign: $player_name has left the server.**"
  chat = "**<$player_name>** $message"
  broadcast = "**:mega: Broadcast:** $message"
  chat_to_game = "<$user_name@Discord> $message"
  available = "**:white_check_mark: Relay available.**"
  unavailable = "**:octagonal_sign: Relay shutting down.**"
  topic = "$player_count/$player_slots players online | $server_name | Server online for $uptime | Last update: $current_time"
  offline_topic = "Relay offline"
  # Maximum length of messages relayed to the game (0 is unlimited)
  max_length = 0
  # Convert emoticons to emoji and back
  convert_emoticons = true
  # Optional JSON file with extra item names
  # items_file = "items.json"
}

# Applied in order
emoticons = [
  { emoticon = ":)", emoji = "🙂" }
  { emoticon = ":D", emoji = "😀" }
  { emoticon = ":(", emoji = "🙁" }
  { emoticon = ";)", emoji = "😉" }
  { emoticon = ":P", emoji = "😛" }
  { emoticon = "XD", emoji = "😆" }
  { emoticon = ":o", emoji = "😮" }
  { emoticon = ":|", emoji = "😐" }
  { emoticon = "<3", emoji = "❤️" }
]

logging {
  # Append-only log file
  file = "terralink.log"
  # Log all chat messages
  log_chat = true
  # Debug mode
  debug = false
  # Timestamp format (chrono strftime)
  timestamp_format = "%m/%d/%Y %H:%M:%S %:z"
}

# Terminate when an error is encountered
abort_on_error = false
"#;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.display().to_string(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    load_config_str(&content)
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load a config file, apply environment overrides, and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let config = apply_env_overrides(load_config(path)?);
    validate_config(&config)?;
    Ok(config)
}

/// Write the default configuration to `path`.
///
/// Refuses to overwrite an existing file.
pub fn generate_default(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    info!(
        "Attempting to generate {} since the file did not exist...",
        path.display()
    );

    let io_error = |source| ConfigError::IoError {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .and_then(|mut file| std::io::Write::write_all(&mut file, DEFAULT_CONFIG.as_bytes()))
        .map_err(io_error)?;

    info!("{} created successfully.", path.display());
    warn!("Please configure your bot token and channel ID before starting the bridge.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::PLACEHOLDER_TOKEN;

    #[test]
    fn test_default_config_parses() {
        let config = load_config_str(DEFAULT_CONFIG).unwrap();

        assert_eq!(config.discord.token, PLACEHOLDER_TOKEN);
        assert_eq!(config.discord.channel_id, 123);
        assert_eq!(config.discord.owner_id, 123);
        assert_eq!(config.discord.command_prefix, "!");
        assert_eq!(config.discord.authorized_roles, vec!["Admin".to_string()]);
        assert!(config.discord.relay_commands);
        assert!(!config.discord.ignore_chat);
        assert_eq!(config.discord.topic_interval, 300);
        assert_eq!(config.game.broadcast_color.as_array(), [255, 215, 0]);
        assert!(!config.game.silence_saves);
        assert_eq!(config.messages.chat, "**<$player_name>** $message");
        assert_eq!(config.messages.max_length, 0);
        assert_eq!(config.emoticons.len(), 9);
        assert_eq!(config.emoticons[0].emoticon, ":)");
        assert!(config.logging.log_chat);
        assert!(!config.abort_on_error);
    }

    #[test]
    fn test_default_config_matches_serde_defaults() {
        let minimal = load_config_str(
            r#"discord { token = "abc", channel_id = 42 }"#,
        )
        .unwrap();
        let full = load_config_str(DEFAULT_CONFIG).unwrap();

        assert_eq!(minimal.messages.topic, full.messages.topic);
        assert_eq!(minimal.messages.chat_to_game, full.messages.chat_to_game);
        assert_eq!(minimal.game.command_specifiers, full.game.command_specifiers);
        assert_eq!(minimal.emoticons, full.emoticons);
        assert_eq!(minimal.logging.timestamp_format, full.logging.timestamp_format);
    }

    #[test]
    fn test_missing_discord_section_fails() {
        let result = load_config_str("game { rest_url = \"http://localhost\" }");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_missing_file_reports_not_found() {
        let result = load_config("/nonexistent/terralink.conf");
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_generate_default_writes_parseable_file() {
        let dir = std::env::temp_dir().join(format!("terralink-gen-{}", std::process::id()));
        let path = dir.join("terralink.conf");
        std::fs::remove_dir_all(&dir).ok();

        generate_default(&path).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.discord.token, PLACEHOLDER_TOKEN);

        // A second generation must not clobber the existing file.
        assert!(generate_default(&path).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_generated_default_fails_validation() {
        let config = load_config_str(DEFAULT_CONFIG).unwrap();
        assert!(validate_config(&config).is_err());
    }
}
