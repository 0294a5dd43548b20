use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::domain::{SubscriberId, VehicleId};

/// Identifier assigned to every published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

/// Immutable lifecycle fact, published exactly once per causing state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: EventId,
    pub occurred_at: DateTime<Utc>,
    pub payload: DomainEventPayload,
}

impl DomainEvent {
    pub fn record(payload: DomainEventPayload) -> Self {
        Self {
            id: EventId(Uuid::new_v4()),
            occurred_at: Utc::now(),
            payload,
        }
    }
}

/// Closed set of lifecycle facts; consumers match on the variant they care
/// about and ignore the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEventPayload {
    SubscriberCreated {
        subscriber_id: SubscriberId,
        email: String,
    },
    KybVerified {
        subscriber_id: SubscriberId,
    },
    KybRejected {
        subscriber_id: SubscriberId,
    },
    VehicleAssigned {
        vehicle_id: VehicleId,
        subscriber_id: SubscriberId,
    },
    SubscriberDeactivated {
        subscriber_id: SubscriberId,
    },
}

/// In-process broadcast channel for domain events, owned by the application
/// root. Publishing never blocks the state change that produced the event,
/// and a slow or failing consumer cannot roll it back; events from one
/// aggregate arrive at each consumer in publication order.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Fire-and-forget publication. A send error only means nobody is
    /// subscribed right now, which is a legal state of the bus.
    pub fn publish(&self, payload: DomainEventPayload) {
        let event = DomainEvent::record(payload);
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::trace!(receivers, "domain event published");
            }
            Err(_) => {
                tracing::trace!("domain event dropped, no subscribers registered");
            }
        }
    }

    /// Live, non-restartable event feed; every subscriber receives every
    /// event published after its registration (broadcast, not work-queue).
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
