//! Configuration type definitions.

use serde::Deserialize;

use crate::common::types::Rgb;

/// Placeholder token written into generated configs.
pub const PLACEHOLDER_TOKEN: &str = "YOUR_DISCORD_TOKEN_HERE";

/// Default chrono format for log and topic timestamps.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S %:z";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    /// Emoticon to emoji pairs, applied in declaration order.
    #[serde(default = "default_emoticons")]
    pub emoticons: Vec<EmoticonMapping>,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Terminate the process on any caught error instead of only logging it.
    #[serde(default)]
    pub abort_on_error: bool,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    /// Relay channel.
    pub channel_id: u64,
    /// User allowed to run any game command.
    #[serde(default)]
    pub owner_id: u64,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Role names whose members may run game commands.
    #[serde(default)]
    pub authorized_roles: Vec<String>,
    /// "Playing" status.
    #[serde(default = "default_bot_game")]
    pub bot_game: String,
    /// Seconds between topic updates; 0 disables them.
    #[serde(default = "default_topic_interval")]
    pub topic_interval: u64,
    /// Also relay command messages to the game as chat.
    #[serde(default = "default_true")]
    pub relay_commands: bool,
    /// Do not relay Discord chat to the game (commands still work).
    #[serde(default)]
    pub ignore_chat: bool,
}

/// Game host configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// Base URL of the TShock REST API.
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    #[serde(default)]
    pub rest_token: String,
    /// Address the host link listens on for hook events.
    #[serde(default = "default_link_address")]
    pub link_address: String,
    #[serde(default = "default_broadcast_color")]
    pub broadcast_color: Rgb,
    /// Leading characters marking a game command (never relayed as chat).
    #[serde(default = "default_command_specifiers")]
    pub command_specifiers: Vec<String>,
    #[serde(default)]
    pub silence_broadcasts: bool,
    #[serde(default)]
    pub silence_chat: bool,
    #[serde(default)]
    pub silence_saves: bool,
}

/// Message templates and text handling.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_join")]
    pub join: String,
    #[serde(default = "default_leave")]
    pub leave: String,
    #[serde(default = "default_chat")]
    pub chat: String,
    #[serde(default = "default_broadcast")]
    pub broadcast: String,
    #[serde(default = "default_chat_to_game")]
    pub chat_to_game: String,
    #[serde(default = "default_available")]
    pub available: String,
    #[serde(default = "default_unavailable")]
    pub unavailable: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_offline_topic")]
    pub offline_topic: String,
    /// Maximum length of a message relayed to the game; 0 means unlimited.
    #[serde(default)]
    pub max_length: usize,
    #[serde(default = "default_true")]
    pub convert_emoticons: bool,
    /// Optional JSON file with extra item and prefix names.
    #[serde(default)]
    pub items_file: Option<String>,
}

/// A single emoticon to emoji mapping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmoticonMapping {
    pub emoticon: String,
    /// Unicode emoji or a `:shortcode:`.
    pub emoji: String,
}

impl EmoticonMapping {
    pub fn new(emoticon: impl Into<String>, emoji: impl Into<String>) -> Self {
        Self {
            emoticon: emoticon.into(),
            emoji: emoji.into(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Append-only log file; empty disables file logging.
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    /// Log every relayed chat line.
    #[serde(default = "default_true")]
    pub log_chat: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rest_url: default_rest_url(),
            rest_token: String::new(),
            link_address: default_link_address(),
            broadcast_color: default_broadcast_color(),
            command_specifiers: default_command_specifiers(),
            silence_broadcasts: false,
            silence_chat: false,
            silence_saves: false,
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            join: default_join(),
            leave: default_leave(),
            chat: default_chat(),
            broadcast: default_broadcast(),
            chat_to_game: default_chat_to_game(),
            available: default_available(),
            unavailable: default_unavailable(),
            topic: default_topic(),
            offline_topic: default_offline_topic(),
            max_length: 0,
            convert_emoticons: true,
            items_file: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            log_chat: true,
            debug: false,
            timestamp_format: default_timestamp_format(),
        }
    }
}

impl Config {
    /// Mask the token for display.
    pub fn masked_token(&self) -> String {
        let token = &self.discord.token;
        if token.chars().count() <= 8 {
            "****".to_string()
        } else {
            format!("{}****", token.chars().take(4).collect::<String>())
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_bot_game() -> String {
    "Terraria".to_string()
}

fn default_topic_interval() -> u64 {
    300
}

fn default_rest_url() -> String {
    "http://127.0.0.1:7878".to_string()
}

fn default_link_address() -> String {
    "127.0.0.1:7879".to_string()
}

fn default_broadcast_color() -> Rgb {
    Rgb {
        red: 255,
        green: 215,
        blue: 0,
    }
}

fn default_command_specifiers() -> Vec<String> {
    vec!["/".to_string(), ".".to_string()]
}

fn default_join() -> String {
    "**:heavy_plus_sign: $player_name has joined the server.**".to_string()
}

fn default_leave() -> String {
    "**:heavy_minus_sign: $player_name has left the server.**".to_string()
}

fn default_chat() -> String {
    "**<$player_name>** $message".to_string()
}

fn default_broadcast() -> String {
    "**:mega: Broadcast:** $message".to_string()
}

fn default_chat_to_game() -> String {
    "<$user_name@Discord> $message".to_string()
}

fn default_available() -> String {
    "**:white_check_mark: Relay available.**".to_string()
}

fn default_unavailable() -> String {
    "**:octagonal_sign: Relay shutting down.**".to_string()
}

fn default_topic() -> String {
    "$player_count/$player_slots players online | $server_name | Server online for $uptime | Last update: $current_time"
        .to_string()
}

fn default_offline_topic() -> String {
    "Relay offline".to_string()
}

fn default_log_file() -> Option<String> {
    Some("terralink.log".to_string())
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

pub(crate) fn default_emoticons() -> Vec<EmoticonMapping> {
    [
        (":)", "🙂"),
        (":D", "😀"),
        (":(", "🙁"),
        (";)", "😉"),
        (":P", "😛"),
        ("XD", "😆"),
        (":o", "😮"),
        (":|", "😐"),
        ("<3", "❤️"),
    ]
    .into_iter()
    .map(|(emoticon, emoji)| EmoticonMapping::new(emoticon, emoji))
    .collect()
}

#[cfg(test)]
impl Config {
    /// A valid configuration with every default applied.
    pub(crate) fn for_tests() -> Self {
        Self {
            discord: DiscordConfig {
                token: "test_token_0123456789".to_string(),
                channel_id: 1000,
                owner_id: 1,
                command_prefix: default_command_prefix(),
                authorized_roles: vec!["Admin".to_string()],
                bot_game: default_bot_game(),
                topic_interval: default_topic_interval(),
                relay_commands: true,
                ignore_chat: false,
            },
            game: GameConfig::default(),
            messages: MessagesConfig::default(),
            emoticons: default_emoticons(),
            logging: LoggingConfig::default(),
            abort_on_error: false,
        }
    }
}
