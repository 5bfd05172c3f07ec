//! Discord event handling.
//!
//! Connects the serenity events forwarded by the client loop to the bridge:
//! relay channel messages go to the game (and the command handler), game
//! events go to the relay channel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serenity::all::{ActivityData, ChannelId, Context, Message, Ready};
use serenity::cache::Cache;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::bridge::{Action, Bridge};
use crate::common::error::{DiscordError, ErrorPolicy};
use crate::common::messages::{GameEvent, InboundMessage, RelayEvent};
use crate::common::types::AttachmentInfo;
use crate::config::types::Config;
use crate::discord::commands::CommandHandler;
use crate::discord::resolver::MentionDirectory;
use crate::discord::sink::{ChannelSink, HttpSink};
use crate::discord::topic::TopicUpdater;
use crate::game::link::GameBroadcaster;
use crate::game::rest::GameServer;

/// Grace period after the shutdown announcement.
pub const OFFLINE_GRACE: Duration = Duration::from_millis(1500);

/// Discord event handler.
pub struct BridgeHandler {
    config_rx: watch::Receiver<Arc<Config>>,
    /// Relays built from the latest config snapshot.
    bridge: Bridge,
    commands: Arc<CommandHandler>,
    game: Arc<dyn GameServer>,
    broadcaster: GameBroadcaster,
    topic: TopicUpdater,
    /// Relay channel, set once the bot is ready.
    sink: Option<Arc<dyn ChannelSink>>,
    started_at: Instant,
    shutdown_rx: watch::Receiver<bool>,
}

impl BridgeHandler {
    pub fn new(
        mut config_rx: watch::Receiver<Arc<Config>>,
        commands: Arc<CommandHandler>,
        game: Arc<dyn GameServer>,
        broadcaster: GameBroadcaster,
        started_at: Instant,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let bridge = Bridge::new(config_rx.borrow_and_update().clone());
        Self {
            config_rx,
            bridge,
            commands,
            game,
            broadcaster,
            topic: TopicUpdater::new(),
            sink: None,
            started_at,
            shutdown_rx,
        }
    }

    /// Rebuild the relays if the config was reloaded.
    fn refresh(&mut self) {
        if self.config_rx.has_changed().unwrap_or(false) {
            let config = self.config_rx.borrow_and_update().clone();
            self.bridge = Bridge::new(config);
            info!("Relay rebuilt from reloaded configuration");
        }
    }

    pub async fn handle_ready(&mut self, ctx: &Context, ready: &Ready) {
        self.refresh();
        let config = self.bridge.config().clone();
        let policy = ErrorPolicy::new(config.abort_on_error);

        info!("Discord bot connected as {}", ready.user.name);
        info!("{} game host(s) connected", self.broadcaster.connected());
        ctx.set_activity(Some(ActivityData::playing(config.discord.bot_game.as_str())));

        if config.discord.channel_id == 0 {
            policy.fatal(DiscordError::ChannelUnavailable);
            return;
        }
        let channel_id = ChannelId::new(config.discord.channel_id);
        self.attach(Arc::new(HttpSink::new(ctx.http.clone(), channel_id)));
    }

    /// Use `sink` as the relay channel: start topic updates and announce
    /// that the relay is available.
    pub fn attach(&mut self, sink: Arc<dyn ChannelSink>) -> JoinHandle<()> {
        self.sink = Some(sink.clone());

        if self.topic.start(
            self.config_rx.clone(),
            self.game.clone(),
            sink.clone(),
            self.started_at,
            self.shutdown_rx.clone(),
        ) {
            info!(
                "Updating the channel topic every {}s",
                self.bridge.config().discord.topic_interval
            );
        }

        let available = self.bridge.availability_message(true);
        // Best-effort: a failed announcement is logged, never retried.
        tokio::spawn(async move {
            if let Err(e) = sink.say(&available).await {
                error!("Failed to announce relay availability: {}", e);
            }
        })
    }

    pub async fn handle_message(&mut self, ctx: &Context, message: Message) {
        self.refresh();

        if message.channel_id.get() != self.bridge.config().discord.channel_id {
            return;
        }

        let inbound = InboundMessage {
            channel_id: message.channel_id.get(),
            author_id: message.author.id.get(),
            author_name: message.author.name.clone(),
            author_roles: author_roles(&ctx.cache, &message),
            content: message.content.clone(),
            attachments: message
                .attachments
                .iter()
                .map(|a| AttachmentInfo {
                    filename: a.filename.clone(),
                    url: a.url.clone(),
                })
                .collect(),
        };
        let directory = MentionDirectory::from_cache(&ctx.cache, message.channel_id, &message.mentions);
        let bot_id = ctx.cache.current_user().id.get();

        self.relay(RelayEvent::InboundChannelMessage(inbound), &directory, bot_id);
    }

    pub async fn handle_game_event(&mut self, ctx: &Context, event: GameEvent) {
        self.refresh();

        let directory = match self.bridge.config().discord.channel_id {
            0 => MentionDirectory::default(),
            id => MentionDirectory::from_cache(&ctx.cache, ChannelId::new(id), &[]),
        };
        self.relay(RelayEvent::from(event), &directory, 0);
    }

    /// Carry out the bridge's actions for `event`.
    ///
    /// Channel posts and command replies run as background tasks; their
    /// handles are returned. Without a relay channel they are dropped.
    pub fn relay(
        &self,
        event: RelayEvent,
        directory: &MentionDirectory,
        bot_id: u64,
    ) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();

        for action in self.bridge.dispatch(event, directory, bot_id) {
            match action {
                Action::Broadcast(line) => {
                    let color = self.bridge.config().game.broadcast_color;
                    match self.broadcaster.broadcast(line, color) {
                        Ok(hosts) => debug!("Relayed Discord message to {} host(s)", hosts),
                        Err(e) => warn!("Failed to relay Discord message to the game: {}", e),
                    }
                }
                Action::Post(text) => {
                    let Some(sink) = self.sink.clone() else {
                        debug!("Dropping game event - relay channel not ready");
                        continue;
                    };
                    // Best-effort: a failed send is logged, never retried.
                    tasks.push(tokio::spawn(async move {
                        if let Err(e) = sink.say(&text).await {
                            error!("Failed to send to relay channel: {}", e);
                        }
                    }));
                }
                Action::Run(command) => {
                    let Some(sink) = self.sink.clone() else {
                        warn!("Dropping command '{}': relay channel not ready", command.command);
                        continue;
                    };
                    let commands = self.commands.clone();
                    tasks.push(tokio::spawn(async move {
                        commands.run(sink.as_ref(), &command).await;
                    }));
                }
            }
        }

        tasks
    }

    /// Set the offline topic and announce the shutdown.
    pub async fn go_offline(&self) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        info!("Announcing relay shutdown");
        if let Err(e) = sink.set_topic(&self.bridge.config().messages.offline_topic).await {
            warn!("Failed to set offline topic: {}", e);
        }
        if let Err(e) = sink.say(&self.bridge.availability_message(false)).await {
            warn!("Failed to announce relay shutdown: {}", e);
        }
        sleep(OFFLINE_GRACE).await;
    }
}

/// Names of the author's roles in the message's guild.
fn author_roles(cache: &Cache, message: &Message) -> Vec<String> {
    let (Some(guild_id), Some(member)) = (message.guild_id, message.member.as_ref()) else {
        return Vec::new();
    };
    let Some(guild) = cache.guild(guild_id) else {
        return Vec::new();
    };

    member
        .roles
        .iter()
        .filter_map(|id| guild.roles.get(id).map(|role| role.name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use serenity::async_trait;
    use tokio::sync::mpsc;
    use tokio_test::{assert_ok, block_on};

    use super::*;
    use crate::common::error::{GameError, GameResult};
    use crate::common::messages::{CommandReply, ReplyTone};
    use crate::common::types::{CommandOutput, ServerStatus};
    use crate::discord::commands::REPLY_DELAY;
    use crate::discord::sink::testing::{RecordingSink, SinkCall};
    use crate::game::hooks::HookRegistry;
    use crate::game::link::HostLink;
    use crate::game::rest::CommandExecutor;

    /// Game server that is never reachable.
    struct Unreachable;

    #[async_trait]
    impl GameServer for Unreachable {
        async fn status(&self) -> GameResult<ServerStatus> {
            Err(GameError::NotConnected)
        }
    }

    #[async_trait]
    impl CommandExecutor for Unreachable {
        async fn execute(&self, _command: &str) -> GameResult<CommandOutput> {
            Err(GameError::NotConnected)
        }
    }

    fn bridge_handler() -> BridgeHandler {
        let mut config = Config::for_tests();
        config.discord.topic_interval = 0;
        let (_config_tx, config_rx) = watch::channel(Arc::new(config));
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (reload_tx, _reload_rx) = mpsc::unbounded_channel();
        let server = Arc::new(Unreachable);

        let commands = Arc::new(CommandHandler::new(
            config_rx.clone(),
            server.clone(),
            server.clone(),
            Instant::now(),
            reload_tx,
        ));
        let broadcaster = HostLink::new(HookRegistry::new()).broadcaster();

        BridgeHandler::new(
            config_rx,
            commands,
            server,
            broadcaster,
            Instant::now(),
            shutdown_rx,
        )
    }

    fn joined(player: &str) -> RelayEvent {
        RelayEvent::PlayerJoined {
            player: player.to_string(),
        }
    }

    fn from_discord(content: &str) -> RelayEvent {
        RelayEvent::InboundChannelMessage(InboundMessage {
            channel_id: 1000,
            author_id: 5,
            author_name: "Bob".to_string(),
            content: content.to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_game_event_before_ready_is_dropped() {
        let mut handler = bridge_handler();
        let directory = MentionDirectory::default();

        assert!(handler.relay(joined("Alice"), &directory, 999).is_empty());

        let sink = Arc::new(RecordingSink::default());
        assert_ok!(handler.attach(sink.clone()).await);
        for task in handler.relay(joined("Carol"), &directory, 999) {
            assert_ok!(task.await);
        }

        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::Say("**:white_check_mark: Relay available.**".to_string()),
                SinkCall::Say("**:heavy_plus_sign: Carol has joined the server.**".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_reply_is_posted_to_channel() {
        let mut handler = bridge_handler();
        let sink = Arc::new(RecordingSink::default());
        assert_ok!(handler.attach(sink.clone()).await);

        let tasks = handler.relay(from_discord("!ban Alice"), &MentionDirectory::default(), 999);
        assert_eq!(tasks.len(), 1);

        let started = tokio::time::Instant::now();
        for task in tasks {
            assert_ok!(task.await);
        }

        assert!(started.elapsed() >= REPLY_DELAY);
        assert_eq!(
            sink.calls()[1..],
            [
                SinkCall::Typing,
                SinkCall::Embed(CommandReply::new(
                    "Command Status",
                    "Access denied for: ban Alice",
                    ReplyTone::Failure
                )),
            ]
        );
    }

    #[tokio::test]
    async fn test_command_before_ready_is_dropped() {
        let handler = bridge_handler();
        let tasks = handler.relay(from_discord("!uptime"), &MentionDirectory::default(), 999);
        assert!(tasks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_go_offline_sets_topic_then_announces() {
        let mut handler = bridge_handler();
        let sink = Arc::new(RecordingSink::default());
        assert_ok!(handler.attach(sink.clone()).await);

        let started = tokio::time::Instant::now();
        handler.go_offline().await;

        assert!(started.elapsed() >= OFFLINE_GRACE);
        assert_eq!(
            sink.calls()[1..],
            [
                SinkCall::Topic("Relay offline".to_string()),
                SinkCall::Say("**:octagonal_sign: Relay shutting down.**".to_string()),
            ]
        );
    }

    #[test]
    fn test_go_offline_without_channel_returns_at_once() {
        let handler = bridge_handler();
        let started = std::time::Instant::now();
        block_on(handler.go_offline());
        assert!(started.elapsed() < OFFLINE_GRACE);
    }
}
