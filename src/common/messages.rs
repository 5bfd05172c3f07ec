//! Canonical message types for bridge communication.
//!
//! This module defines the single source of truth for the events that
//! flow between the game host and Discord.

use serde::{Deserialize, Serialize};

use crate::common::types::AttachmentInfo;

/// Hook event pushed by the game host over the host link.
///
/// Wire format is one JSON object per line, tagged by `event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum GameEvent {
    Join {
        player: String,
    },
    Leave {
        player: String,
    },
    Chat {
        player: String,
        #[serde(default)]
        group: String,
        text: String,
    },
    Broadcast {
        text: String,
    },
}

/// Frame sent from the bridge to the game host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum HostFrame {
    /// Broadcast a line to every player in the given RGB colour.
    Broadcast { text: String, color: [u8; 3] },
}

/// Message received in a Discord channel, reduced to what the relay needs.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub channel_id: u64,
    pub author_id: u64,
    /// Name shown to players (account username).
    pub author_name: String,
    /// Names of the roles the author holds in the guild.
    pub author_roles: Vec<String>,
    pub content: String,
    pub attachments: Vec<AttachmentInfo>,
}

/// A command typed in the relay channel (prefix already stripped).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandInvocation {
    pub author_id: u64,
    pub author_name: String,
    pub author_roles: Vec<String>,
    /// Command line without the prefix, e.g. `kick Bob`.
    pub command: String,
}

impl CommandInvocation {
    /// The whole command, trimmed and lowercased. Built-ins only match
    /// when nothing follows their name.
    pub fn normalized(&self) -> String {
        self.command.trim().to_lowercase()
    }
}

/// Any discrete occurrence the bridge reacts to.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    PlayerJoined { player: String },
    PlayerLeft { player: String },
    PlayerChat { player: String, group: String, text: String },
    ServerBroadcast { text: String },
    /// Message posted in Discord.
    InboundChannelMessage(InboundMessage),
    /// Command typed in the relay channel.
    CommandInvocation(CommandInvocation),
}

impl From<GameEvent> for RelayEvent {
    fn from(event: GameEvent) -> Self {
        match event {
            GameEvent::Join { player } => RelayEvent::PlayerJoined { player },
            GameEvent::Leave { player } => RelayEvent::PlayerLeft { player },
            GameEvent::Chat {
                player,
                group,
                text,
            } => RelayEvent::PlayerChat {
                player,
                group,
                text,
            },
            GameEvent::Broadcast { text } => RelayEvent::ServerBroadcast { text },
        }
    }
}

/// Tone of a command reply, mapped to an embed colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyTone {
    Info,
    Success,
    Failure,
}

/// Rich reply (title + body) sent back for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub title: String,
    pub description: String,
    pub tone: ReplyTone,
}

impl CommandReply {
    pub fn new(title: impl Into<String>, description: impl Into<String>, tone: ReplyTone) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            tone,
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, ReplyTone::Info)
    }
}
