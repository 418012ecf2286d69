//! Catalog change notifications.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::catalog::CatalogEntry;

/// What changed in the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogChange {
    Inserted {
        entry: CatalogEntry,
    },
    Renamed {
        entry: CatalogEntry,
        previous_name: String,
    },
    Duplicated {
        source_id: Uuid,
        entry: CatalogEntry,
    },
    Deleted {
        id: Uuid,
    },
    Cleared {
        removed: usize,
    },
    /// Entries dropped because their file no longer exists.
    Healed {
        ids: Vec<Uuid>,
    },
    ActiveChanged {
        location: Option<PathBuf>,
    },
}

/// A committed catalog change. Sent only after the new state is persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEvent {
    pub change: CatalogChange,
    /// Number of entries after the change.
    pub entry_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl CatalogEvent {
    pub fn new(change: CatalogChange, entry_count: usize) -> Self {
        Self {
            change,
            entry_count,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcasts catalog events to any number of subscribers.
#[derive(Clone)]
pub struct CatalogBroadcaster {
    sender: Arc<broadcast::Sender<CatalogEvent>>,
}

impl CatalogBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: CatalogEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for CatalogBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}
