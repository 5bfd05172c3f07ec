//! Shared types used across the application.

use serde::Deserialize;

/// First-attachment metadata surfaced when relaying to the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    pub filename: String,
    pub url: String,
}

/// Live server statistics as reported by the game host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStatus {
    pub name: String,
    pub version: String,
    pub player_count: u32,
    pub max_players: u32,
    pub players: Vec<String>,
}

/// Output captured while executing a command as the elevated actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the dispatcher accepted and ran the command.
    pub success: bool,
    /// Lines the command wrote to its actor, in order.
    pub lines: Vec<String>,
}

/// RGB colour used for in-game broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub fn as_array(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }
}
