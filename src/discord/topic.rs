//! Periodic channel topic updates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::common::types::ServerStatus;
use crate::config::types::Config;
use crate::discord::sink::ChannelSink;
use crate::game::formatter::{current_time, format_uptime, FormatContext, MessageFormatter};
use crate::game::rest::GameServer;

/// Fill the topic template from a status snapshot.
pub fn render_topic(config: &Config, status: &ServerStatus, uptime: Duration) -> String {
    let ctx = FormatContext::new()
        .with("player_count", status.player_count.to_string())
        .with("player_slots", status.max_players.to_string())
        .with("server_name", status.name.as_str())
        .with("uptime", format_uptime(uptime))
        .with(
            "current_time",
            current_time(&config.logging.timestamp_format),
        );
    MessageFormatter::new(&config.messages.topic).format(&ctx)
}

/// Keeps at most one topic task alive across reconnects.
#[derive(Debug, Clone, Default)]
pub struct TopicUpdater {
    running: Arc<AtomicBool>,
}

impl TopicUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the update loop unless it is disabled or already running.
    ///
    /// Returns true if a new task was started.
    pub fn start(
        &self,
        config_rx: watch::Receiver<Arc<Config>>,
        game: Arc<dyn GameServer>,
        sink: Arc<dyn ChannelSink>,
        started_at: Instant,
        shutdown_rx: watch::Receiver<bool>,
    ) -> bool {
        if config_rx.borrow().discord.topic_interval == 0 {
            debug!("Topic updates disabled");
            return false;
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Topic updater already running");
            return false;
        }

        let running = self.running.clone();
        tokio::spawn(async move {
            run(config_rx, game, sink, started_at, shutdown_rx).await;
            running.store(false, Ordering::SeqCst);
        });
        true
    }
}

async fn run(
    config_rx: watch::Receiver<Arc<Config>>,
    game: Arc<dyn GameServer>,
    sink: Arc<dyn ChannelSink>,
    started_at: Instant,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!("Topic updater started");

    loop {
        let config = config_rx.borrow().clone();
        let interval = config.discord.topic_interval;
        if interval == 0 {
            info!("Topic updates disabled by configuration");
            break;
        }

        match game.status().await {
            Ok(status) => {
                let topic = render_topic(&config, &status, started_at.elapsed());
                debug!("Updating channel topic: {}", topic);
                if let Err(e) = sink.set_topic(&topic).await {
                    error!("Failed to update channel topic: {}", e);
                }
            }
            Err(e) => warn!("Skipping topic update, server status unavailable: {}", e),
        }

        tokio::select! {
            _ = sleep(Duration::from_secs(interval)) => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    info!("Topic updater stopped");
}
