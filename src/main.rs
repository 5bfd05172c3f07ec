//! terralink - Discord-Terraria chat bridge for TShock servers
//!
//! Relays chat, joins, leaves and broadcasts from a TShock server to a
//! Discord channel, and Discord messages and commands back into the game.

mod bridge;
mod common;
mod config;
mod discord;
mod game;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use bridge::ChannelBundle;
use common::error::{ConfigError, ErrorPolicy};
use common::logging;
use config::env::{check_empty_env_vars, get_config_path};
use config::{generate_default, load_and_validate, ConfigReloader, LoggingConfig};
use discord::{DiscordBotBuilder, DiscordChannels};
use game::{HookRegistry, HostLink, RestClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = get_config_path();

    let config = match load_and_validate(&config_path) {
        Ok(config) => config,
        Err(ConfigError::NotFound { .. }) => {
            logging::init(&LoggingConfig::default())?;
            warn!("Configuration file {} not found", config_path);
            generate_default(&config_path).map_err(|e| {
                error!("Failed to generate default configuration: {}", e);
                e
            })?;
            return Ok(());
        }
        Err(e) => {
            logging::init(&LoggingConfig::default())?;
            error!("Failed to load configuration: {}", e);
            error!("Please ensure {} is properly formatted.", config_path);
            return Err(e.into());
        }
    };

    logging::init(&config.logging)?;

    info!("terralink v{} starting...", env!("CARGO_PKG_VERSION"));
    for name in check_empty_env_vars() {
        warn!("Environment variable {} is set but empty, ignoring it", name);
    }

    info!("Configuration loaded from {}", config_path);
    debug!("  Discord token: {}", config.masked_token());
    info!("  Relay channel: {}", config.discord.channel_id);
    info!("  REST endpoint: {}", config.game.rest_url);
    info!("  Host link: {}", config.game.link_address);

    let policy = ErrorPolicy::new(config.abort_on_error);
    let started_at = Instant::now();
    let link_address = config.game.link_address.clone();

    // ============================================================
    // Shared state and channels
    // ============================================================
    let (config_tx, config_rx) = watch::channel(Arc::new(config));
    let channels = ChannelBundle::new();
    let event_tx = channels.game.event_tx;
    let shutdown_tx = channels.control.shutdown_tx;
    let shutdown_rx = channels.control.shutdown_rx;

    let hooks = HookRegistry::new();
    let hook_handles = hooks.register_all(&event_tx);
    info!("Registered {} game hooks", hook_handles.len());

    // ============================================================
    // Game host: host link and REST client
    // ============================================================
    let link = HostLink::new(hooks.clone());
    let broadcaster = link.broadcaster();

    let mut link_task = match HostLink::bind(&link_address).await {
        Ok(listener) => tokio::spawn(link.serve(listener, shutdown_rx.clone())),
        Err(e) => {
            policy.fatal(format!("Failed to bind host link on {}: {}", link_address, e));
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
        }
    };

    let rest = Arc::new(RestClient::new(config_rx.clone()).map_err(|e| {
        error!("Failed to create REST client: {}", e);
        e
    })?);

    // ============================================================
    // Config reloader
    // ============================================================
    let reloader = ConfigReloader::new(config_path, config_tx);
    let reload_task = tokio::spawn(reloader.run(channels.control.reload_rx, shutdown_rx.clone()));

    // ============================================================
    // Discord bot
    // ============================================================
    let discord_channels = DiscordChannels {
        event_rx: channels.discord.event_rx,
        reload_tx: channels.discord.reload_tx,
        shutdown_rx: shutdown_rx.clone(),
    };

    let discord_bot = match DiscordBotBuilder::new(
        config_rx.clone(),
        discord_channels,
        rest,
        broadcaster,
        started_at,
    )
    .build()
    .await
    {
        Ok(bot) => bot,
        Err(e) => {
            policy.fatal(format!("Failed to create Discord client: {}", e));
            return Err(e.into());
        }
    };

    info!("Starting Discord bot...");
    let mut discord_task = tokio::spawn(discord_bot.run());

    // ============================================================
    // Run until a signal or a task exits
    // ============================================================
    let discord_done = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - shutting down relay...");
            false
        }
        _ = &mut discord_task => {
            warn!("Discord task ended");
            true
        }
        _ = &mut link_task => {
            warn!("Host link task ended");
            false
        }
    };

    if let Err(e) = shutdown_tx.send(true) {
        debug!("Shutdown channel closed (tasks already exited): {}", e);
    }

    if !discord_done {
        let timeout = Duration::from_secs(5);
        match tokio::time::timeout(timeout, discord_task).await {
            Ok(Ok(())) => info!("Discord bot stopped gracefully"),
            Ok(Err(e)) => warn!("Discord task panicked: {}", e),
            Err(_) => warn!("Discord shutdown timed out"),
        }
    }
    if let Err(e) = reload_task.await {
        warn!("Config reloader task panicked: {}", e);
    }

    drop(hook_handles);
    if hooks.is_empty() {
        info!("Game hooks deregistered");
    } else {
        warn!("{} game hooks still registered", hooks.len());
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
