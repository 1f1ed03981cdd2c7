//! Typed notification channel between the orchestrator and listing views.

use tokio::sync::broadcast;

use crate::models::ApprovedCommunity;

/// Channel capacity. Slow receivers that fall this far behind lose the
/// oldest events, which is acceptable: every event is a hint, and the next
/// refresher pass re-reads all sources anyway.
const EVENT_CAPACITY: usize = 64;

/// A notification fanned out after a review action.
///
/// `Approved`/`RefreshRequested` mean "something changed, go re-fetch";
/// `Record` carries the exact denormalized record for immediate rendering
/// without a round-trip. Consumers must preserve that distinction.
#[derive(Debug, Clone)]
pub enum CommunityEvent {
    /// A submission was approved; carries only the id.
    Approved { id: String },
    /// The full approved record, for rendering without a re-fetch.
    Record(ApprovedCommunity),
    /// A merge pass should run now.
    RefreshRequested { timestamp: String },
}

/// Broadcast bus for community events. Cheap to clone; all clones share the
/// same underlying channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CommunityEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publish an event. A send with no live subscribers is not an error.
    pub fn publish(&self, event: CommunityEvent) {
        if let Err(err) = self.sender.send(event) {
            tracing::debug!("No event subscribers: {}", err);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CommunityEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
