//! Discord -> game relay.
//!
//! Decides what to do with a message posted in Discord: ignore it, hand a
//! command to the command handler, relay it into the game as chat, or both.

use std::sync::Arc;

use tracing::info;

use crate::common::messages::{CommandInvocation, InboundMessage};
use crate::config::types::Config;
use crate::discord::resolver::{MentionDirectory, MentionResolver};
use crate::game::formatter::{FormatContext, MessageFormatter};
use crate::game::transform::{annotate_attachment, emoji_to_emoticons, fix_multiline, truncate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Posted outside the relay channel.
    OtherChannel,
    /// Posted by the bridge itself.
    OwnMessage,
    /// No text and no attachments.
    Empty,
}

/// Outcome of processing one Discord message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Ignored(IgnoreReason),
    Handled {
        command: Option<CommandInvocation>,
        /// Line to broadcast into the game.
        chat: Option<String>,
    },
}

pub struct InboundRelay {
    config: Arc<Config>,
    resolver: MentionResolver,
    chat_to_game: MessageFormatter,
}

impl InboundRelay {
    pub fn new(config: Arc<Config>) -> Self {
        let chat_to_game = MessageFormatter::new(&config.messages.chat_to_game);
        Self {
            config,
            resolver: MentionResolver::new(),
            chat_to_game,
        }
    }

    pub fn process(
        &self,
        message: &InboundMessage,
        directory: &MentionDirectory,
        bot_id: u64,
    ) -> Inbound {
        if message.channel_id != self.config.discord.channel_id {
            return Inbound::Ignored(IgnoreReason::OtherChannel);
        }
        if message.author_id == bot_id {
            return Inbound::Ignored(IgnoreReason::OwnMessage);
        }
        if message.content.trim().is_empty() && message.attachments.is_empty() {
            return Inbound::Ignored(IgnoreReason::Empty);
        }

        let command = self.parse_command(message);

        let relay_chat = !self.config.discord.ignore_chat
            && (command.is_none() || self.config.discord.relay_commands);
        let chat = relay_chat.then(|| self.render_chat(message, directory));

        Inbound::Handled { command, chat }
    }

    fn parse_command(&self, message: &InboundMessage) -> Option<CommandInvocation> {
        let prefix = &self.config.discord.command_prefix;
        let command = message.content.strip_prefix(prefix.as_str())?.trim();
        if command.is_empty() {
            return None;
        }

        Some(CommandInvocation {
            author_id: message.author_id,
            author_name: message.author_name.clone(),
            author_roles: message.author_roles.clone(),
            command: command.to_string(),
        })
    }

    fn render_chat(&self, message: &InboundMessage, directory: &MentionDirectory) -> String {
        let config = &self.config;

        let text = self.resolver.to_names(&message.content, directory);
        let text = self.resolver.simplify_emotes(&text);
        let text = if config.messages.convert_emoticons {
            emoji_to_emoticons(&text, &config.emoticons)
        } else {
            text
        };
        let text = fix_multiline(&text);
        let text = annotate_attachment(&text, &message.attachments);
        let text = truncate(&text, config.messages.max_length);

        if config.logging.log_chat {
            info!("{}@Discord said: {}", message.author_name, text);
        }

        let ctx = FormatContext::user(&message.author_name, text);
        self.chat_to_game.format(&ctx)
    }
}
