//! Domain event system: observe conversation activity without coupling.
//!
//! Stores and collaborators publish events when something interesting
//! happens. Front-ends subscribe to render progress or collect stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::turn::StoreId;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// An assistant turn was recomputed and is fresh again
    TurnRecomputed {
        store_id: StoreId,
        index: usize,
        chars: usize,
        timestamp: DateTime<Utc>,
    },

    /// A run finished with every stale turn recomputed
    RunCompleted {
        store_id: StoreId,
        recomputed: Vec<usize>,
        timestamp: DateTime<Utc>,
    },

    /// A run stopped at a failing turn
    RunFailed {
        store_id: StoreId,
        index: usize,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The directive was replaced and all assistant turns invalidated
    DirectiveChanged {
        store_id: StoreId,
        invalidated: usize,
        timestamp: DateTime<Utc>,
    },

    /// A capability was attached
    CapabilityAdded {
        store_id: StoreId,
        name: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed on behalf of the model
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
