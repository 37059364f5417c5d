//! Live-connection registry for best-effort push.
//!
//! Each connected client gets a bounded `mpsc` queue. Pushing never waits: a
//! full queue drops the event for that connection, a closed queue is pruned.
//! The persisted notification stays the system of record.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use toma5_types::notification::LiveEvent;
use tracing::debug;
use uuid::Uuid;

struct Connection {
    id: u64,
    sender: mpsc::Sender<LiveEvent>,
}

/// Registry of live connections keyed by user id.
pub struct LiveRegistry {
    connections: DashMap<Uuid, Vec<Connection>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl LiveRegistry {
    /// Create a registry whose per-connection queues hold `buffer` events.
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Register a new connection for `user_id`.
    pub fn connect(self: &Arc<Self>, user_id: Uuid) -> LiveSubscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections
            .entry(user_id)
            .or_default()
            .push(Connection { id, sender });
        debug!(%user_id, connection = id, "live connection registered");

        LiveSubscription {
            user_id,
            id,
            receiver,
            registry: Arc::clone(self),
        }
    }

    /// Push to every connection of one user. Returns how many accepted it.
    pub fn push_to_user(&self, user_id: &Uuid, event: &LiveEvent) -> usize {
        let Some(mut conns) = self.connections.get_mut(user_id) else {
            return 0;
        };
        let delivered = push_all(&mut conns, event);
        let empty = conns.is_empty();
        drop(conns);
        if empty {
            self.connections.remove_if(user_id, |_, c| c.is_empty());
        }
        delivered
    }

    /// Push to every connection of every user.
    pub fn broadcast(&self, event: &LiveEvent) -> usize {
        let mut delivered = 0;
        for mut entry in self.connections.iter_mut() {
            delivered += push_all(entry.value_mut(), event);
        }
        self.connections.retain(|_, c| !c.is_empty());
        delivered
    }

    pub fn is_connected(&self, user_id: &Uuid) -> bool {
        self.connections
            .get(user_id)
            .is_some_and(|conns| !conns.is_empty())
    }

    /// Total open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.iter().map(|e| e.value().len()).sum()
    }

    fn disconnect(&self, user_id: &Uuid, id: u64) {
        if let Some(mut conns) = self.connections.get_mut(user_id) {
            conns.retain(|c| c.id != id);
        }
        self.connections.remove_if(user_id, |_, c| c.is_empty());
        debug!(%user_id, connection = id, "live connection closed");
    }
}

fn push_all(conns: &mut Vec<Connection>, event: &LiveEvent) -> usize {
    let mut delivered = 0;
    conns.retain(|conn| match conn.sender.try_send(event.clone()) {
        Ok(()) => {
            delivered += 1;
            true
        }
        Err(mpsc::error::TrySendError::Full(_)) => {
            debug!(connection = conn.id, event = %event.event, "live queue full, event dropped");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    });
    delivered
}

/// Receiving end of one live connection. Unregisters itself on drop.
pub struct LiveSubscription {
    user_id: Uuid,
    id: u64,
    receiver: mpsc::Receiver<LiveEvent>,
    registry: Arc<LiveRegistry>,
}

impl LiveSubscription {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Next pushed event; `None` once the registry is gone.
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<LiveEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.registry.disconnect(&self.user_id, self.id);
    }
}
