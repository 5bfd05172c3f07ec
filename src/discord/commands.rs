//! Relay channel commands (!playerlist, !uptime, remote game commands).
//!
//! Built-ins are answered by the bridge itself. Anything else is run on the
//! game server through the [`CommandExecutor`] when the author is
//! authorized.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::common::messages::{CommandInvocation, CommandReply, ReplyTone};
use crate::config::types::Config;
use crate::discord::sink::ChannelSink;
use crate::game::formatter::format_uptime;
use crate::game::rest::{CommandExecutor, GameServer};

/// Pause between the typing indicator and a reply.
pub const REPLY_DELAY: Duration = Duration::from_millis(1500);

/// Title of each reply carrying a captured output line.
pub const OUTPUT_TITLE: &str = "Command Output";

/// Title of access, success and failure replies for remote commands.
pub const STATUS_TITLE: &str = "Command Status";

pub struct CommandHandler {
    config_rx: watch::Receiver<Arc<Config>>,
    game: Arc<dyn GameServer>,
    executor: Arc<dyn CommandExecutor>,
    started_at: Instant,
    reload_tx: mpsc::UnboundedSender<()>,
}

impl CommandHandler {
    pub fn new(
        config_rx: watch::Receiver<Arc<Config>>,
        game: Arc<dyn GameServer>,
        executor: Arc<dyn CommandExecutor>,
        started_at: Instant,
        reload_tx: mpsc::UnboundedSender<()>,
    ) -> Self {
        Self {
            config_rx,
            game,
            executor,
            started_at,
            reload_tx,
        }
    }

    /// Run a command and post every reply to `sink`.
    pub async fn run(&self, sink: &dyn ChannelSink, invocation: &CommandInvocation) {
        for reply in self.handle(invocation).await {
            respond(sink, &reply).await;
        }
    }

    /// Replies for a command, in the order they should be posted.
    pub async fn handle(&self, invocation: &CommandInvocation) -> Vec<CommandReply> {
        let config = self.config_rx.borrow().clone();
        let name = invocation.normalized();

        debug!(
            "Processing command '{}' from {}",
            invocation.command, invocation.author_name
        );

        match name.as_str() {
            "help" => vec![help_reply(&config.discord.command_prefix)],
            "playerlist" => vec![self.player_list().await],
            "serverinfo" => vec![self.server_info().await],
            "uptime" => vec![CommandReply::info(
                "Uptime",
                format_uptime(self.started_at.elapsed()),
            )],
            _ if !is_authorized(&config, invocation) => {
                info!(
                    "Access denied for {} ({}): {}",
                    invocation.author_name, invocation.author_id, invocation.command
                );
                vec![command_status("Access denied for", invocation, ReplyTone::Failure)]
            }
            "reload" => vec![self.reload(invocation)],
            _ => self.execute(invocation).await,
        }
    }

    async fn player_list(&self) -> CommandReply {
        match self.game.status().await {
            Ok(status) => {
                let mut description = format!("{}/{}", status.player_count, status.max_players);
                if status.players.is_empty() {
                    description.push_str("\nNo players online.");
                } else {
                    description.push('\n');
                    description.push_str(&status.players.join(", "));
                }
                CommandReply::info("Player List", description)
            }
            Err(e) => status_failure(e),
        }
    }

    async fn server_info(&self) -> CommandReply {
        match self.game.status().await {
            Ok(status) => CommandReply::info(
                "Server Info",
                format!(
                    "Name: {}\nPlayers: {}/{}\nTShock version: {}",
                    status.name, status.player_count, status.max_players, status.version
                ),
            ),
            Err(e) => status_failure(e),
        }
    }

    fn reload(&self, invocation: &CommandInvocation) -> CommandReply {
        info!("Configuration reload requested by {}", invocation.author_name);
        if self.reload_tx.send(()).is_err() {
            error!("Configuration reloader is not running");
            return command_status("Failed to execute", invocation, ReplyTone::Failure);
        }
        CommandReply::new(
            "Reload requested",
            "Configuration will be reloaded.",
            ReplyTone::Success,
        )
    }

    async fn execute(&self, invocation: &CommandInvocation) -> Vec<CommandReply> {
        info!(
            "{} executed remote command: {}",
            invocation.author_name, invocation.command
        );

        match self.executor.execute(&invocation.command).await {
            Ok(output) if output.success => {
                if output.lines.is_empty() {
                    vec![command_status("Remotely executed", invocation, ReplyTone::Success)]
                } else {
                    output
                        .lines
                        .into_iter()
                        .map(|line| CommandReply::info(OUTPUT_TITLE, line))
                        .collect()
                }
            }
            Ok(output) => {
                warn!(
                    "Command '{}' failed: {}",
                    invocation.command,
                    output.lines.join(" ")
                );
                vec![command_status("Failed to execute", invocation, ReplyTone::Failure)]
            }
            Err(e) => {
                error!("Failed to execute '{}': {}", invocation.command, e);
                vec![command_status("Failed to execute", invocation, ReplyTone::Failure)]
            }
        }
    }
}

/// The author is the owner or holds one of the authorized roles.
pub fn is_authorized(config: &Config, invocation: &CommandInvocation) -> bool {
    if config.discord.owner_id != 0 && invocation.author_id == config.discord.owner_id {
        return true;
    }

    invocation.author_roles.iter().any(|role| {
        config
            .discord
            .authorized_roles
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(role))
    })
}

/// Show typing, wait, then post the reply. Failures are logged only.
pub async fn respond(sink: &dyn ChannelSink, reply: &CommandReply) {
    if let Err(e) = sink.typing().await {
        debug!("Failed to trigger typing: {}", e);
    }
    sleep(REPLY_DELAY).await;
    if let Err(e) = sink.embed(reply).await {
        error!("Failed to send command reply '{}': {}", reply.title, e);
    }
}

fn help_reply(prefix: &str) -> CommandReply {
    let lines = [
        ("help", "Show this list"),
        ("playerlist", "List online players"),
        ("serverinfo", "Show server name, players and version"),
        ("uptime", "Show how long the relay has been running"),
        ("reload", "Reload the configuration (authorized users)"),
        ("<command>", "Run a game command (authorized users)"),
    ];

    let description = lines
        .iter()
        .map(|(command, text)| format!("`{}{}` - {}", prefix, command, text))
        .collect::<Vec<_>>()
        .join("\n");

    CommandReply::info("Available Commands", description)
}

/// `Command Status` reply such as `Remotely executed: save`.
fn command_status(verdict: &str, invocation: &CommandInvocation, tone: ReplyTone) -> CommandReply {
    CommandReply::new(
        STATUS_TITLE,
        format!("{}: {}", verdict, invocation.command),
        tone,
    )
}

fn status_failure(e: impl std::fmt::Display) -> CommandReply {
    warn!("Failed to query server status: {}", e);
    CommandReply::new("Server unavailable", e.to_string(), ReplyTone::Failure)
}
