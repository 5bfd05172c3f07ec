//! Hook subscriptions for game events.
//!
//! Each subscriber registers for one kind of game event and gets back a
//! [`HookHandle`]. Dropping the handle removes the subscription, so tearing
//! the bridge down releases every hook without a separate deregister step.

use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::common::messages::GameEvent;

/// Kinds of game events that can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Join,
    Leave,
    Chat,
    Broadcast,
}

impl HookKind {
    pub fn of(event: &GameEvent) -> Self {
        match event {
            GameEvent::Join { .. } => HookKind::Join,
            GameEvent::Leave { .. } => HookKind::Leave,
            GameEvent::Chat { .. } => HookKind::Chat,
            GameEvent::Broadcast { .. } => HookKind::Broadcast,
        }
    }

    pub const ALL: [HookKind; 4] = [
        HookKind::Join,
        HookKind::Leave,
        HookKind::Chat,
        HookKind::Broadcast,
    ];
}

struct Subscription {
    id: u64,
    kind: HookKind,
    tx: mpsc::UnboundedSender<GameEvent>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

/// Registry of game event subscriptions.
#[derive(Clone, Default)]
pub struct HookRegistry {
    inner: Arc<Mutex<Inner>>,
}

/// Live subscription. Deregisters on drop.
pub struct HookHandle {
    id: u64,
    kind: HookKind,
    registry: Weak<Mutex<Inner>>,
}

impl HookHandle {
    #[cfg(test)]
    pub fn kind(&self) -> HookKind {
        self.kind
    }
}

impl Drop for HookHandle {
    fn drop(&mut self) {
        let Some(inner) = self.registry.upgrade() else {
            return;
        };
        let result = inner.lock();
        match result {
            Ok(mut guard) => {
                guard.subscriptions.retain(|s| s.id != self.id);
                debug!("Deregistered {:?} hook #{}", self.kind, self.id);
            }
            Err(e) => warn!("Hook registry lock poisoned: {}", e),
        };
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `tx` to events of `kind`.
    pub fn register(&self, kind: HookKind, tx: mpsc::UnboundedSender<GameEvent>) -> HookHandle {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscriptions.push(Subscription { id, kind, tx });

        HookHandle {
            id,
            kind,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Subscribe `tx` to every kind of event.
    pub fn register_all(&self, tx: &mpsc::UnboundedSender<GameEvent>) -> Vec<HookHandle> {
        HookKind::ALL
            .into_iter()
            .map(|kind| self.register(kind, tx.clone()))
            .collect()
    }

    /// Deliver an event to its subscribers. Returns how many received it.
    pub fn dispatch(&self, event: GameEvent) -> usize {
        let kind = HookKind::of(&event);
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        inner
            .subscriptions
            .iter()
            .filter(|s| s.kind == kind)
            .filter(|s| s.tx.send(event.clone()).is_ok())
            .count()
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.subscriptions.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(player: &str) -> GameEvent {
        GameEvent::Join {
            player: player.to_string(),
        }
    }

    #[test]
    fn test_dispatch_reaches_matching_kind_only() {
        let registry = HookRegistry::new();
        let (join_tx, mut join_rx) = mpsc::unbounded_channel();
        let (chat_tx, mut chat_rx) = mpsc::unbounded_channel();
        let _join = registry.register(HookKind::Join, join_tx);
        let _chat = registry.register(HookKind::Chat, chat_tx);

        assert_eq!(registry.dispatch(join("Alice")), 1);
        assert_eq!(join_rx.try_recv().unwrap(), join("Alice"));
        assert!(chat_rx.try_recv().is_err());
    }

    #[test]
    fn test_handle_drop_deregisters() {
        let registry = HookRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let handles = registry.register_all(&tx);
        assert_eq!(registry.len(), 4);

        let join_handle = registry.register(HookKind::Join, tx.clone());
        assert_eq!(join_handle.kind(), HookKind::Join);
        assert_eq!(registry.dispatch(join("Bob")), 2);

        drop(join_handle);
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.dispatch(join("Bob")), 1);

        drop(handles);
        assert!(registry.is_empty());
        assert_eq!(registry.dispatch(join("Bob")), 0);
    }

    #[test]
    fn test_handle_outliving_registry() {
        let registry = HookRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = registry.register(HookKind::Leave, tx);

        drop(registry);
        drop(handle);
    }
}
