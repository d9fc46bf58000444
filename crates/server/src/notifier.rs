//! Change notification bus.
//!
//! Every live listener (one per WebSocket connection) owns an unbounded
//! channel registered here. Publishing fans an event out to all of them
//! without waiting; a listener whose receiving half is gone is pruned on
//! the next publish.

use crate::metrics::{EVENTS_PUBLISHED, LISTENERS_CONNECTED};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Identifier of a registered listener.
pub type ConnectionId = u64;

/// A domain change broadcast to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// Rows or columns of a site table changed.
    TableAltered { table_id: String, site_id: i64 },
    /// The set of tables owned by a site changed.
    SiteAltered { site_id: i64 },
    /// A user's permissions changed.
    UserPermissionsAltered { user_id: String },
}

impl ChangeEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TableAltered { .. } => "table_altered",
            Self::SiteAltered { .. } => "site_altered",
            Self::UserPermissionsAltered { .. } => "user_permissions_altered",
        }
    }
}

struct Listener {
    user_id: Option<String>,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

/// Registry of connected listeners.
pub struct ChangeNotifier {
    listeners: DashMap<ConnectionId, Listener>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener and return its id and event stream.
    pub fn register(
        &self,
        user_id: Option<String>,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(
            id,
            Listener {
                user_id: user_id.clone(),
                tx,
            },
        );
        LISTENERS_CONNECTED.set(self.listeners.len() as i64);
        tracing::debug!(connection_id = id, user_id = ?user_id, "listener registered");
        (id, rx)
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unregister(&self, id: ConnectionId) {
        if self.listeners.remove(&id).is_some() {
            LISTENERS_CONNECTED.set(self.listeners.len() as i64);
            tracing::debug!(connection_id = id, "listener unregistered");
        }
    }

    /// Broadcast an event to every listener.
    ///
    /// Returns the number of listeners the event was handed to.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.listeners.iter() {
            if entry.value().tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*entry.key());
            }
        }

        // Removal must happen after iteration releases the shard locks.
        for id in closed {
            self.unregister(id);
        }

        EVENTS_PUBLISHED.with_label_values(&[event.name()]).inc();
        tracing::debug!(event = event.name(), delivered, "change event published");
        delivered
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Connections registered under a user id.
    pub fn connections_for_user(&self, user_id: &str) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .listeners
            .iter()
            .filter(|entry| entry.value().user_id.as_deref() == Some(user_id))
            .map(|entry| *entry.key())
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
