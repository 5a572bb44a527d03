//! Arrival notifications for annotation UIs.
//!
//! A mirror that loads a snapshot announces the merged annotations on the
//! [`EventBus`] as [`SyncEvent::AnnotationsArrived`], so a highlighter can
//! render them without polling the mirror. Persists and completed void
//! reconciliations go out on the same bus.

use tokio::sync::broadcast;

use super::SyncEvent;

/// Broadcast bus for [`SyncEvent`]s.
///
/// Subscribers only see events published after they subscribe. A UI that
/// falls more than `capacity` events behind gets
/// [`broadcast::error::RecvError::Lagged`] and should reload its mirror.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: SyncEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
