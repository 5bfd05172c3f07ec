//! TShock REST API client.
//!
//! The REST user is the elevated actor remote commands run as; whatever
//! the command writes to that user comes back in the response body.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use serenity::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::common::error::{GameError, GameResult};
use crate::common::types::{CommandOutput, ServerStatus};
use crate::config::types::Config;

/// Live server statistics.
#[async_trait]
pub trait GameServer: Send + Sync {
    async fn status(&self) -> GameResult<ServerStatus>;
}

/// Runs a command line as the elevated actor and captures its output.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &str) -> GameResult<CommandOutput>;
}

/// REST client. Endpoint and token are read from the current config
/// snapshot on every request.
pub struct RestClient {
    http: reqwest::Client,
    config_rx: watch::Receiver<Arc<Config>>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    serverversion: String,
    #[serde(default)]
    tshockversion: String,
    #[serde(default)]
    playercount: u32,
    #[serde(default)]
    maxplayers: u32,
    #[serde(default)]
    players: Players,
}

/// `players` is a list of objects with `players=true`, or a comma
/// separated string on older servers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Players {
    Detailed(Vec<PlayerEntry>),
    Names(String),
}

impl Default for Players {
    fn default() -> Self {
        Players::Names(String::new())
    }
}

#[derive(Debug, Deserialize)]
struct PlayerEntry {
    nickname: String,
}

#[derive(Debug, Deserialize)]
struct RawCommandResponse {
    status: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    response: Vec<String>,
}

impl RestClient {
    pub fn new(config_rx: watch::Receiver<Arc<Config>>) -> GameResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self { http, config_rx })
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> GameResult<String> {
        let (base, token) = {
            let config = self.config_rx.borrow();
            (
                config.game.rest_url.trim_end_matches('/').to_string(),
                config.game.rest_token.clone(),
            )
        };

        let url = format!("{}{}", base, path);
        debug!("REST request: {}", url);

        let body = self
            .http
            .get(&url)
            .query(query)
            .query(&[("token", token.as_str())])
            .send()
            .await?
            .text()
            .await?;

        Ok(body)
    }

    fn command_line(&self, command: &str) -> String {
        let config = self.config_rx.borrow();
        with_specifier(command, &config.game.command_specifiers)
    }
}

#[async_trait]
impl GameServer for RestClient {
    async fn status(&self) -> GameResult<ServerStatus> {
        let body = self
            .get("/v2/server/status", &[("players", "true")])
            .await?;
        parse_status(&body)
    }
}

#[async_trait]
impl CommandExecutor for RestClient {
    async fn execute(&self, command: &str) -> GameResult<CommandOutput> {
        let command = self.command_line(command);
        let body = self.get("/v3/server/rawcmd", &[("cmd", command.as_str())]).await?;
        parse_raw_command(&body)
    }
}

/// Prefix `command` with the first command specifier unless it already
/// starts with one.
fn with_specifier(command: &str, specifiers: &[String]) -> String {
    let command = command.trim();
    let has_specifier = specifiers
        .iter()
        .any(|s| !s.is_empty() && command.starts_with(s.as_str()));

    match specifiers.first() {
        Some(first) if !has_specifier => format!("{}{}", first, command),
        _ => command.to_string(),
    }
}

fn status_code(status: &Value) -> String {
    match status {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_status(body: &str) -> GameResult<ServerStatus> {
    let response: StatusResponse = serde_json::from_str(body)?;
    let status = status_code(&response.status);
    if status != "200" {
        return Err(GameError::Status {
            status,
            message: response.error.unwrap_or_default(),
        });
    }

    let players = match response.players {
        Players::Detailed(entries) => entries.into_iter().map(|p| p.nickname).collect(),
        Players::Names(names) => names
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect(),
    };

    let version = if response.tshockversion.is_empty() {
        response.serverversion
    } else {
        response.tshockversion
    };

    Ok(ServerStatus {
        name: response.name,
        version,
        player_count: response.playercount,
        max_players: response.maxplayers,
        players,
    })
}

fn parse_raw_command(body: &str) -> GameResult<CommandOutput> {
    let response: RawCommandResponse = serde_json::from_str(body)?;
    let status = status_code(&response.status);

    if status == "200" {
        Ok(CommandOutput {
            success: true,
            lines: response.response,
        })
    } else {
        debug!(
            "Raw command rejected with status {}: {}",
            status,
            response.error.as_deref().unwrap_or("")
        );
        Ok(CommandOutput {
            success: false,
            lines: response.error.into_iter().collect(),
        })
    }
}
