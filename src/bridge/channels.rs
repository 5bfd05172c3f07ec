//! Bridge channel management.
//!
//! Groups the channels that connect the game host side, the Discord side
//! and the control tasks.

use tokio::sync::{mpsc, watch};

use crate::common::messages::GameEvent;

/// Channels for the game host side.
pub struct GameChannels {
    /// Sender registered with the hook registry (game -> Discord).
    pub event_tx: mpsc::UnboundedSender<GameEvent>,
}

/// Channels for the Discord handler.
pub struct DiscordSideChannels {
    /// Receiver for game events.
    pub event_rx: mpsc::UnboundedReceiver<GameEvent>,
    /// Sender for reload requests from the `reload` command.
    pub reload_tx: mpsc::UnboundedSender<()>,
}

/// Control channels for reload and shutdown coordination.
pub struct ControlChannels {
    /// Sender to trigger shutdown.
    pub shutdown_tx: watch::Sender<bool>,
    /// Receiver cloned into every task that must stop on shutdown.
    pub shutdown_rx: watch::Receiver<bool>,
    /// Receiver for reload requests (config reloader listens).
    pub reload_rx: mpsc::UnboundedReceiver<()>,
}

/// Bundle of all channels created by the bridge.
pub struct ChannelBundle {
    pub game: GameChannels,
    pub discord: DiscordSideChannels,
    pub control: ControlChannels,
}

impl ChannelBundle {
    /// Create a new set of bridge channels.
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            game: GameChannels { event_tx },
            discord: DiscordSideChannels {
                event_rx,
                reload_tx,
            },
            control: ControlChannels {
                shutdown_tx,
                shutdown_rx,
                reload_rx,
            },
        }
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_is_wired() {
        let mut channels = ChannelBundle::new();

        channels
            .game
            .event_tx
            .send(GameEvent::Broadcast {
                text: "hi".to_string(),
            })
            .unwrap();
        assert!(channels.discord.event_rx.try_recv().is_ok());

        channels.discord.reload_tx.send(()).unwrap();
        assert!(channels.control.reload_rx.try_recv().is_ok());

        channels.control.shutdown_tx.send(true).unwrap();
        assert!(*channels.control.shutdown_rx.borrow());
    }
}
