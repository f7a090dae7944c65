//! In-memory event publisher for development and tests.

use crate::forwarding::{EventPublisher, ForwardedEvent, MessageId, PublishError};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use tracing::debug;
use uuid::Uuid;

/// Records published events in memory
///
/// Clones share the same record. [`set_failing`](Self::set_failing) makes
/// every publish fail with [`PublishError::Unavailable`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    events: Arc<Mutex<Vec<ForwardedEvent>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch failure injection on or off
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of all events published so far
    pub fn published(&self) -> Vec<ForwardedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of events published so far
    pub fn published_count(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &ForwardedEvent) -> Result<MessageId, PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Unavailable {
                message: "in-memory publisher set to fail".to_string(),
            });
        }

        let mut events = self.events.lock().map_err(|_| PublishError::Unavailable {
            message: "in-memory publisher lock poisoned".to_string(),
        })?;
        events.push(event.clone());

        let id = MessageId::new(Uuid::new_v4().to_string());
        debug!(message_id = %id, source = %event.source, "Recorded event in memory");
        Ok(id)
    }
}
