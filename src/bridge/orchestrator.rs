//! Bridge orchestrator that ties the game host and Discord together.
//!
//! Holds one config snapshot and the relays built from it. A reload builds
//! a fresh `Bridge` from the new snapshot.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bridge::inbound::{Inbound, InboundRelay};
use crate::bridge::outbound::OutboundRelay;
use crate::common::messages::{CommandInvocation, RelayEvent};
use crate::common::resources::ItemTable;
use crate::config::types::Config;
use crate::discord::resolver::MentionDirectory;
use crate::game::formatter::{FormatContext, MessageFormatter};

/// What the Discord side should do about a relay event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Post text to the relay channel.
    Post(String),
    /// Broadcast a line to every player.
    Broadcast(String),
    /// Answer a command in the relay channel.
    Run(CommandInvocation),
}

/// The main bridge that orchestrates message flow.
pub struct Bridge {
    config: Arc<Config>,
    outbound: OutboundRelay,
    inbound: InboundRelay,
}

impl Bridge {
    /// Create a new bridge from a config snapshot.
    pub fn new(config: Arc<Config>) -> Self {
        let items = Arc::new(load_items(&config));
        Self {
            outbound: OutboundRelay::new(config.clone(), items),
            inbound: InboundRelay::new(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Decide what to do about `event`, in order.
    ///
    /// Game events render to at most one channel post. A Discord message
    /// may become a game broadcast, a command, or both (broadcast first).
    pub fn dispatch(
        &self,
        event: RelayEvent,
        directory: &MentionDirectory,
        bot_id: u64,
    ) -> Vec<Action> {
        match event {
            RelayEvent::InboundChannelMessage(message) => {
                match self.inbound.process(&message, directory, bot_id) {
                    Inbound::Ignored(reason) => {
                        debug!(
                            "Ignoring Discord message from {}: {:?}",
                            message.author_name, reason
                        );
                        Vec::new()
                    }
                    Inbound::Handled { command, chat } => {
                        let mut actions: Vec<Action> =
                            chat.into_iter().map(Action::Broadcast).collect();
                        if let Some(command) = command {
                            actions.extend(self.dispatch(
                                RelayEvent::CommandInvocation(command),
                                directory,
                                bot_id,
                            ));
                        }
                        actions
                    }
                }
            }
            RelayEvent::CommandInvocation(command) => vec![Action::Run(command)],
            event => self
                .outbound
                .render(&event, directory)
                .map(Action::Post)
                .into_iter()
                .collect(),
        }
    }

    /// The "relay available" or "relay shutting down" announcement.
    pub fn availability_message(&self, available: bool) -> String {
        let template = if available {
            &self.config.messages.available
        } else {
            &self.config.messages.unavailable
        };
        MessageFormatter::new(template).format(&FormatContext::new())
    }
}

/// Built-in item names, extended by the configured items file.
///
/// A broken items file is logged and the built-in table is used.
fn load_items(config: &Config) -> ItemTable {
    match config.messages.items_file.as_deref() {
        Some(path) => match ItemTable::load(path) {
            Ok(table) => {
                info!("Loaded {} item names from {}", table.len(), path);
                table
            }
            Err(e) => {
                warn!("{}, using built-in item names", e);
                ItemTable::builtin()
            }
        },
        None => ItemTable::builtin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::messages::InboundMessage;

    fn discord_message(content: &str) -> RelayEvent {
        RelayEvent::InboundChannelMessage(InboundMessage {
            channel_id: 1000,
            author_id: 5,
            author_name: "Bob".to_string(),
            content: content.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_availability_messages() {
        let bridge = Bridge::new(Arc::new(Config::for_tests()));
        assert_eq!(
            bridge.availability_message(true),
            "**:white_check_mark: Relay available.**"
        );
        assert_eq!(
            bridge.availability_message(false),
            "**:octagonal_sign: Relay shutting down.**"
        );
    }

    #[test]
    fn test_missing_items_file_falls_back() {
        let mut config = Config::for_tests();
        config.messages.items_file = Some("/nonexistent/items.json".to_string());
        let bridge = Bridge::new(Arc::new(config));

        let actions = bridge.dispatch(
            RelayEvent::PlayerChat {
                player: "Alice".to_string(),
                group: String::new(),
                text: "[i:189]".to_string(),
            },
            &MentionDirectory::default(),
            999,
        );
        assert_eq!(
            actions,
            vec![Action::Post("**<Alice>** **[Mana Potion]**".to_string())]
        );
    }

    #[test]
    fn test_routes_discord_messages() {
        let bridge = Bridge::new(Arc::new(Config::for_tests()));
        let directory = MentionDirectory::default();

        assert_eq!(
            bridge.dispatch(discord_message("hi"), &directory, 999),
            vec![Action::Broadcast("<Bob@Discord> hi".to_string())]
        );
        assert!(bridge
            .dispatch(discord_message("   "), &directory, 999)
            .is_empty());
    }

    #[test]
    fn test_relayed_command_broadcasts_then_runs() {
        let bridge = Bridge::new(Arc::new(Config::for_tests()));

        let actions = bridge.dispatch(discord_message("!uptime"), &MentionDirectory::default(), 999);
        assert_eq!(
            actions,
            vec![
                Action::Broadcast("<Bob@Discord> !uptime".to_string()),
                Action::Run(CommandInvocation {
                    author_id: 5,
                    author_name: "Bob".to_string(),
                    author_roles: Vec::new(),
                    command: "uptime".to_string(),
                }),
            ]
        );
    }

    #[test]
    fn test_silenced_event_has_no_action() {
        let mut config = Config::for_tests();
        config.game.silence_broadcasts = true;
        let bridge = Bridge::new(Arc::new(config));

        let actions = bridge.dispatch(
            RelayEvent::ServerBroadcast {
                text: "Blood Moon is rising".to_string(),
            },
            &MentionDirectory::default(),
            999,
        );
        assert!(actions.is_empty());
    }
}
