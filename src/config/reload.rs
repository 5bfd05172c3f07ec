//! Configuration reload.
//!
//! A reload reparses the config file and publishes a whole new snapshot on
//! the watch channel. Readers holding the previous `Arc<Config>` finish with
//! it; the next `borrow()` sees the new one. A failed reload keeps the
//! current snapshot.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::common::error::{ConfigError, ErrorPolicy};
use crate::config::parser::load_and_validate;
use crate::config::types::Config;

pub struct ConfigReloader {
    path: String,
    config_tx: watch::Sender<Arc<Config>>,
}

impl ConfigReloader {
    pub fn new(path: impl Into<String>, config_tx: watch::Sender<Arc<Config>>) -> Self {
        Self {
            path: path.into(),
            config_tx,
        }
    }

    /// Reparse the file and publish the result.
    pub fn reload(&self) -> Result<Arc<Config>, ConfigError> {
        let config = Arc::new(load_and_validate(&self.path)?);
        self.config_tx.send_replace(config.clone());
        Ok(config)
    }

    /// Reload on SIGHUP or on request until shutdown.
    pub async fn run(
        self,
        mut reload_rx: mpsc::UnboundedReceiver<()>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        #[cfg(unix)]
        let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
            Ok(signal) => Some(signal),
            Err(e) => {
                warn!("Failed to install SIGHUP handler: {}", e);
                None
            }
        };

        loop {
            #[cfg(unix)]
            let sighup = async {
                match hangup.as_mut() {
                    Some(signal) => {
                        signal.recv().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };
            #[cfg(not(unix))]
            let sighup = std::future::pending::<()>();

            tokio::select! {
                _ = sighup => info!("Received SIGHUP"),
                request = reload_rx.recv() => {
                    if request.is_none() {
                        break;
                    }
                    info!("Reload requested");
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match self.reload() {
                Ok(config) => info!(
                    "Configuration reloaded from {} (debug: {})",
                    self.path, config.logging.debug
                ),
                Err(e) => {
                    let policy = ErrorPolicy::new(self.config_tx.borrow().abort_on_error);
                    policy.fatal(format!(
                        "Failed to reload configuration, keeping the current one: {}",
                        e
                    ));
                }
            }
        }

        info!("Config reload task ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("terralink-{}-{}.conf", name, std::process::id()))
    }

    #[test]
    fn test_reload_publishes_new_snapshot() {
        let path = temp_path("reload-ok");
        std::fs::write(
            &path,
            r#"discord { token = "abcdefghijklmnop", channel_id = 7, bot_game = "Calamity" }"#,
        )
        .unwrap();

        let (tx, rx) = watch::channel(Arc::new(Config::for_tests()));
        let reloader = ConfigReloader::new(path.display().to_string(), tx);

        reloader.reload().unwrap();
        std::fs::remove_file(&path).ok();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow().discord.bot_game, "Calamity");
    }

    #[test]
    fn test_failed_reload_keeps_snapshot() {
        let path = temp_path("reload-bad");
        std::fs::write(&path, r#"discord { token = "", channel_id = 0 }"#).unwrap();

        let (tx, rx) = watch::channel(Arc::new(Config::for_tests()));
        let reloader = ConfigReloader::new(path.display().to_string(), tx);

        assert!(reloader.reload().is_err());
        std::fs::remove_file(&path).ok();

        assert!(!rx.has_changed().unwrap());
        assert_eq!(rx.borrow().discord.bot_game, "Terraria");
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (tx, _rx) = watch::channel(Arc::new(Config::for_tests()));
        let (_reload_tx, reload_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(ConfigReloader::new("unused.conf", tx).run(reload_rx, shutdown_rx));
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
