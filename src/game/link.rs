//! Host link: newline-delimited JSON between the bridge and the game host.
//!
//! A forwarder running next to the game server connects here, pushes one
//! [`GameEvent`] per line, and receives [`HostFrame`]s to execute (coloured
//! broadcasts). Several forwarders may be connected; frames go to all.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

use crate::common::error::{GameError, GameResult};
use crate::common::messages::{GameEvent, HostFrame};
use crate::common::types::Rgb;
use crate::game::hooks::HookRegistry;

/// Longest accepted line. Longer lines are discarded.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Frames buffered per connection before a slow host starts losing them.
const FRAME_BUFFER: usize = 256;

/// Host link server.
pub struct HostLink {
    hooks: HookRegistry,
    frames_tx: broadcast::Sender<HostFrame>,
}

/// Sends broadcast frames to every connected host.
#[derive(Clone)]
pub struct GameBroadcaster {
    frames_tx: broadcast::Sender<HostFrame>,
}

impl GameBroadcaster {
    /// Broadcast `text` to all players in `color`.
    pub fn broadcast(&self, text: impl Into<String>, color: Rgb) -> GameResult<usize> {
        let frame = HostFrame::Broadcast {
            text: text.into(),
            color: color.as_array(),
        };
        self.frames_tx
            .send(frame)
            .map_err(|_| GameError::NotConnected)
    }

    /// Number of connected hosts.
    pub fn connected(&self) -> usize {
        self.frames_tx.receiver_count()
    }
}

impl HostLink {
    pub fn new(hooks: HookRegistry) -> Self {
        let (frames_tx, _) = broadcast::channel(FRAME_BUFFER);
        Self { hooks, frames_tx }
    }

    pub fn broadcaster(&self) -> GameBroadcaster {
        GameBroadcaster {
            frames_tx: self.frames_tx.clone(),
        }
    }

    pub async fn bind(address: &str) -> GameResult<TcpListener> {
        let listener = TcpListener::bind(address).await?;
        info!("Host link listening on {}", address);
        Ok(listener)
    }

    /// Accept host connections until shutdown.
    pub async fn serve(self, listener: TcpListener, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            info!("Game host connected from {}", peer);
                            let hooks = self.hooks.clone();
                            let frames_rx = self.frames_tx.subscribe();
                            let shutdown_rx = shutdown_rx.clone();
                            tokio::spawn(async move {
                                match run_connection(stream, hooks, frames_rx, shutdown_rx).await {
                                    Ok(()) => info!("Game host {} disconnected", peer),
                                    Err(e) => error!("Game host {} connection error: {}", peer, e),
                                }
                            });
                        }
                        Err(e) => error!("Failed to accept host link connection: {}", e),
                    }
                }

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, closing host link");
                        break;
                    }
                }
            }
        }
    }
}

/// Serve one host connection.
pub async fn run_connection<S>(
    stream: S,
    hooks: HookRegistry,
    mut frames_rx: broadcast::Receiver<HostFrame>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> GameResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut connection = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

    loop {
        tokio::select! {
            line = connection.next() => {
                match line {
                    Some(Ok(line)) => handle_line(&hooks, &line),
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        warn!("Discarding host link line longer than {} bytes", MAX_LINE_LENGTH);
                    }
                    Some(Err(LinesCodecError::Io(e))) => return Err(e.into()),
                    None => return Ok(()),
                }
            }

            frame = frames_rx.recv() => {
                match frame {
                    Ok(frame) => {
                        let line = serde_json::to_string(&frame)?;
                        connection.send(line).await.map_err(|e| match e {
                            LinesCodecError::Io(e) => GameError::Io(e),
                            other => GameError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, other)),
                        })?;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Game host fell behind, {} frames dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                }
            }

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    return Ok(());
                }
            }
        }
    }
}

fn handle_line(hooks: &HookRegistry, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match serde_json::from_str::<GameEvent>(line) {
        Ok(event) => {
            let delivered = hooks.dispatch(event);
            if delivered == 0 {
                debug!("No hook registered for host event: {}", line);
            }
        }
        Err(e) => warn!("Skipping malformed host link line ({}): {}", e, line),
    }
}
