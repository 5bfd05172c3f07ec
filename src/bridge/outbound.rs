//! Game -> Discord relay.
//!
//! Each game event renders to at most one channel message. Rendering is
//! stateless apart from the config snapshot the relay was built with.

use std::sync::Arc;

use tracing::{debug, info};

use crate::bridge::filter::EchoFilter;
use crate::common::messages::RelayEvent;
use crate::common::resources::ItemTable;
use crate::config::types::Config;
use crate::discord::resolver::{MentionDirectory, MentionResolver};
use crate::game::formatter::{FormatContext, MessageFormatter};
use crate::game::transform::{convert_emoticons, TextTransform};

pub struct OutboundRelay {
    config: Arc<Config>,
    items: Arc<ItemTable>,
    transform: TextTransform,
    resolver: MentionResolver,
    echo: EchoFilter,
    join: MessageFormatter,
    leave: MessageFormatter,
    chat: MessageFormatter,
    broadcast: MessageFormatter,
}

impl OutboundRelay {
    pub fn new(config: Arc<Config>, items: Arc<ItemTable>) -> Self {
        let messages = &config.messages;
        let join = MessageFormatter::new(&messages.join);
        let leave = MessageFormatter::new(&messages.leave);
        let chat = MessageFormatter::new(&messages.chat);
        let broadcast = MessageFormatter::new(&messages.broadcast);
        let echo = EchoFilter::new(&config);
        Self {
            config,
            items,
            transform: TextTransform::new(),
            resolver: MentionResolver::new(),
            echo,
            join,
            leave,
            chat,
            broadcast,
        }
    }

    /// Render a game event as channel text, or `None` if it is not relayed.
    pub fn render(&self, event: &RelayEvent, directory: &MentionDirectory) -> Option<String> {
        match event {
            RelayEvent::PlayerJoined { player } => {
                info!("{} has joined the server.", player);
                Some(self.join.format(&FormatContext::player(player)))
            }
            RelayEvent::PlayerLeft { player } => {
                info!("{} has left the server.", player);
                Some(self.leave.format(&FormatContext::player(player)))
            }
            RelayEvent::PlayerChat {
                player,
                group,
                text,
            } => self.render_chat(player, group, text, directory),
            RelayEvent::ServerBroadcast { text } => self.render_broadcast(text),
            RelayEvent::InboundChannelMessage(_) | RelayEvent::CommandInvocation(_) => None,
        }
    }

    fn render_chat(
        &self,
        player: &str,
        group: &str,
        text: &str,
        directory: &MentionDirectory,
    ) -> Option<String> {
        if self.config.game.silence_chat {
            debug!("Chat from {} not relayed (silenced)", player);
            return None;
        }
        if self
            .config
            .game
            .command_specifiers
            .iter()
            .any(|s| !s.is_empty() && text.starts_with(s.as_str()))
        {
            debug!("Command from {} not relayed", player);
            return None;
        }

        if self.config.logging.log_chat {
            info!("{} said: {}", player, text);
        }

        let message = self.resolver.to_mentions(text, directory);
        let message = self.transform.convert_items(&message, self.items.as_ref());
        let message = if self.config.messages.convert_emoticons {
            convert_emoticons(&message, &self.config.emoticons)
        } else {
            message
        };

        let ctx = FormatContext::player(player)
            .with_group(group)
            .with_message(message);
        Some(self.chat.format(&ctx))
    }

    fn render_broadcast(&self, text: &str) -> Option<String> {
        if self.config.game.silence_broadcasts {
            debug!("Broadcast not relayed (silenced): {}", text);
            return None;
        }
        if self.config.game.silence_saves && self.echo.is_world_save(text) {
            debug!("World save notice not relayed: {}", text);
            return None;
        }
        if self.echo.is_echo(text) {
            debug!("Ignoring echoed broadcast: {}", text);
            return None;
        }

        info!("Server broadcast: {}", text);

        let message = self.transform.convert_items(text, self.items.as_ref());
        let ctx = FormatContext::new().with_message(message);
        Some(self.broadcast.format(&ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::resolver::NamedUser;

    fn relay(config: Config) -> OutboundRelay {
        let items = ItemTable::from_entries([(189, "Mana Potion".to_string())], []);
        OutboundRelay::new(Arc::new(config), Arc::new(items))
    }

    fn chat(player: &str, text: &str) -> RelayEvent {
        RelayEvent::PlayerChat {
            player: player.to_string(),
            group: "default".to_string(),
            text: text.to_string(),
        }
    }

    fn broadcast(text: &str) -> RelayEvent {
        RelayEvent::ServerBroadcast {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_join_and_leave() {
        let relay = relay(Config::for_tests());
        let directory = MentionDirectory::default();

        assert_eq!(
            relay
                .render(
                    &RelayEvent::PlayerJoined {
                        player: "Alice".to_string()
                    },
                    &directory
                )
                .unwrap(),
            "**:heavy_plus_sign: Alice has joined the server.**"
        );
        assert_eq!(
            relay
                .render(
                    &RelayEvent::PlayerLeft {
                        player: "Alice".to_string()
                    },
                    &directory
                )
                .unwrap(),
            "**:heavy_minus_sign: Alice has left the server.**"
        );
    }

    #[test]
    fn test_chat_is_transformed() {
        let relay = relay(Config::for_tests());
        let directory = MentionDirectory {
            users: vec![NamedUser {
                id: 7,
                display_name: "Bob".to_string(),
                username: "bob".to_string(),
            }],
            ..Default::default()
        };

        assert_eq!(
            relay.render(&chat("Alice", "hello"), &directory).unwrap(),
            "**<Alice>** hello"
        );
        assert_eq!(
            relay
                .render(&chat("Alice", "@Bob have [i:189] :)"), &directory)
                .unwrap(),
            "**<Alice>** <@7> have **[Mana Potion]** 🙂"
        );
    }

    #[test]
    fn test_chat_commands_and_silence() {
        let directory = MentionDirectory::default();
        let relay_default = relay(Config::for_tests());
        assert!(relay_default.render(&chat("Alice", "/who"), &directory).is_none());
        assert!(relay_default.render(&chat("Alice", ".spawn"), &directory).is_none());

        let mut config = Config::for_tests();
        config.game.silence_chat = true;
        assert!(relay(config).render(&chat("Alice", "hi"), &directory).is_none());
    }

    #[test]
    fn test_emoticons_can_be_disabled() {
        let mut config = Config::for_tests();
        config.messages.convert_emoticons = false;

        let rendered = relay(config)
            .render(&chat("Alice", "hi :)"), &MentionDirectory::default())
            .unwrap();
        assert_eq!(rendered, "**<Alice>** hi :)");
    }

    #[test]
    fn test_broadcasts() {
        let directory = MentionDirectory::default();
        let relay_default = relay(Config::for_tests());

        assert_eq!(
            relay_default
                .render(&broadcast("Blood Moon is rising..."), &directory)
                .unwrap(),
            "**:mega: Broadcast:** Blood Moon is rising..."
        );
        assert!(relay_default
            .render(&broadcast("<Bob@Discord> hi"), &directory)
            .is_none());
        assert!(relay_default
            .render(&broadcast("Saving world..."), &directory)
            .is_some());

        let mut config = Config::for_tests();
        config.game.silence_saves = true;
        assert!(relay(config)
            .render(&broadcast("Saving world..."), &directory)
            .is_none());

        let mut config = Config::for_tests();
        config.game.silence_broadcasts = true;
        assert!(relay(config)
            .render(&broadcast("Blood Moon is rising..."), &directory)
            .is_none());
    }
}
