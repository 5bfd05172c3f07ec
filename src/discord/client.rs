//! Discord bot client abstraction.
//!
//! Provides a high-level interface for creating and running the Discord bot,
//! hiding serenity implementation details from the rest of the application.

use std::sync::Arc;
use std::time::{Duration, Instant};

use backon::BackoffBuilder;
use serenity::all::{Context, EventHandler, GatewayIntents, Message, Ready};
use serenity::async_trait;
use serenity::http::HttpBuilder;
use serenity::Client;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::common::error::{DiscordError, DiscordResult, ErrorPolicy};
use crate::common::messages::GameEvent;
use crate::config::types::Config;
use crate::discord::commands::CommandHandler;
use crate::discord::handler::BridgeHandler;
use crate::game::link::GameBroadcaster;
use crate::game::rest::RestClient;

/// Longest wait between reconnect attempts.
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub enum DiscordBotEvent {
    /// Bot connected and ready.
    Ready { context: Context, ready: Ready },
    /// Message received.
    Message { context: Context, message: Message },
    Disconnected,
}

struct DiscordBotEvents {
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
}

impl DiscordBotEvents {
    fn new(discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>) -> Self {
        Self { discord_events_tx }
    }
}

#[async_trait]
impl EventHandler for DiscordBotEvents {
    async fn ready(&self, context: Context, ready: Ready) {
        if let Err(error) = self
            .discord_events_tx
            .send(DiscordBotEvent::Ready { context, ready })
        {
            warn!("Failed to process discord event: {}", error);
        }
    }

    async fn message(&self, context: Context, message: Message) {
        if let Err(error) = self
            .discord_events_tx
            .send(DiscordBotEvent::Message { context, message })
        {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

/// Channels for Discord bot communication.
pub struct DiscordChannels {
    /// Receiver for game events (game -> Discord).
    pub event_rx: mpsc::UnboundedReceiver<GameEvent>,
    /// Sender for reload requests from the `reload` command.
    pub reload_tx: mpsc::UnboundedSender<()>,
    /// Receiver for shutdown signal.
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Builder for creating the Discord bot.
pub struct DiscordBotBuilder {
    config_rx: watch::Receiver<Arc<Config>>,
    channels: DiscordChannels,
    rest: Arc<RestClient>,
    broadcaster: GameBroadcaster,
    started_at: Instant,
}

impl DiscordBotBuilder {
    /// Create a new Discord bot builder.
    pub fn new(
        config_rx: watch::Receiver<Arc<Config>>,
        channels: DiscordChannels,
        rest: Arc<RestClient>,
        broadcaster: GameBroadcaster,
        started_at: Instant,
    ) -> Self {
        Self {
            config_rx,
            channels,
            rest,
            broadcaster,
            started_at,
        }
    }

    /// Build the Discord bot.
    pub async fn build(self) -> DiscordResult<DiscordBot> {
        let (discord_events_tx, discord_events_rx) = mpsc::unbounded_channel::<DiscordBotEvent>();

        let token = self.config_rx.borrow().discord.token.clone();
        let client = build_client(&token, discord_events_tx.clone()).await?;

        let commands = Arc::new(CommandHandler::new(
            self.config_rx.clone(),
            self.rest.clone(),
            self.rest.clone(),
            self.started_at,
            self.channels.reload_tx,
        ));

        let handler = BridgeHandler::new(
            self.config_rx.clone(),
            commands,
            self.rest,
            self.broadcaster,
            self.started_at,
            self.channels.shutdown_rx.clone(),
        );

        Ok(DiscordBot {
            client: Some(client),
            config_rx: self.config_rx,
            handler,
            discord_events_rx,
            discord_events_tx,
            event_rx: self.channels.event_rx,
            shutdown_rx: self.channels.shutdown_rx,
        })
    }
}

async fn build_client(
    token: &str,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
) -> DiscordResult<Client> {
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS;

    // Build a custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| DiscordError::ConnectionFailed {
            message: e.to_string(),
        })?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let events = DiscordBotEvents::new(discord_events_tx);
    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(events)
        .await?;
    Ok(client)
}

pub struct DiscordBot {
    client: Option<Client>,
    config_rx: watch::Receiver<Arc<Config>>,
    handler: BridgeHandler,
    discord_events_rx: mpsc::UnboundedReceiver<DiscordBotEvent>,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
    event_rx: mpsc::UnboundedReceiver<GameEvent>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBot {
    pub async fn run(mut self) {
        // Extract shard manager before we move client into run_connection
        let shard_manager = self.client.as_ref().map(|c| c.shard_manager.clone());
        let client = &mut self.client;
        let discord_events_rx = &mut self.discord_events_rx;
        let handler = &mut self.handler;
        let event_rx = &mut self.event_rx;

        tokio::select! {
            _ = Self::run_connection(client, &self.config_rx, &self.discord_events_tx) => {},
            _ = Self::process_events(discord_events_rx, handler, event_rx, &mut self.shutdown_rx) => {},
        }

        // Gracefully shutdown Discord gateway
        if let Some(manager) = shard_manager {
            info!("Initiating graceful Discord shutdown...");
            manager.shutdown_all().await;
            info!("Discord shutdown complete");
        }
        info!("Discord task ended");
    }

    async fn run_connection(
        client: &mut Option<Client>,
        config_rx: &watch::Receiver<Arc<Config>>,
        discord_events_tx: &mpsc::UnboundedSender<DiscordBotEvent>,
    ) {
        /// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
        fn discord_backoff() -> impl Iterator<Item = Duration> {
            backon::ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(5))
                .with_max_delay(MAX_RECONNECT_DELAY)
                .with_factor(1.1)
                .with_jitter()
                .without_max_times()
                .build()
        }

        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let mut client = match client.take() {
                Some(client) => client,
                None => {
                    // serenity mostly handles reconnections itself.
                    let token = config_rx.borrow().discord.token.clone();
                    match build_client(&token, discord_events_tx.clone()).await {
                        Ok(client) => {
                            backoff = discord_backoff();
                            client
                        }
                        Err(e) => {
                            error!("Failed to rebuild Discord client: {}", e);
                            let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                            warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                            sleep(delay).await;
                            continue;
                        }
                    }
                }
            };

            match client.start().await {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                        warn!("Failed to process discord event: {}", error);
                    }
                    break;
                }
                Err(e) => {
                    ErrorPolicy::new(config_rx.borrow().abort_on_error)
                        .fatal(format!("Discord client error: {}", e));
                    let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64(),
                    );
                    if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                        warn!("Failed to process discord event: {}", error);
                    }
                    sleep(delay).await;
                }
            }
        }
    }

    async fn process_events(
        discord_events_rx: &mut mpsc::UnboundedReceiver<DiscordBotEvent>,
        handler: &mut BridgeHandler,
        event_rx: &mut mpsc::UnboundedReceiver<GameEvent>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) {
        let mut discord_connection = None;

        loop {
            tokio::select! {
                // Discord events
                event = discord_events_rx.recv() => {
                    match event {
                        Some(DiscordBotEvent::Ready { context, ready }) => {
                            handler.handle_ready(&context, &ready).await;
                            discord_connection = Some(context);
                        }
                        Some(DiscordBotEvent::Message { context, message }) => {
                            handler.handle_message(&context, message).await;
                        }
                        Some(DiscordBotEvent::Disconnected) => {
                            discord_connection = None;
                        }
                        None => {
                            debug!("Discord events channel closed.");
                            break;
                        }
                    }
                }

                // Game -> Discord events (drop if not connected)
                event = event_rx.recv() => {
                    match event {
                        Some(event) => {
                            if let Some(ref context) = discord_connection {
                                handler.handle_game_event(context, event).await;
                            } else {
                                debug!("Dropping game event - Discord not connected");
                            }
                        }
                        None => {
                            warn!("Game event channel closed");
                            break;
                        }
                    }
                }

                // Shutdown signal
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping event processing");
                        if discord_connection.is_some() {
                            handler.go_offline().await;
                        }
                        break;
                    }
                }
            }
        }
    }
}
