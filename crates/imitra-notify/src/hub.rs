//! In-process pub/sub for WebSocket push.
//!
//! One broadcast channel carries every event together with the rooms it is
//! addressed to; each subscription keeps only what matches its memberships.

use std::sync::Arc;

use imitra_core::{PushEvent, Room};
use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Envelope {
    pub rooms: Vec<Room>,
    pub event: PushEvent,
}

impl Envelope {
    pub fn is_for(&self, memberships: &[Room]) -> bool {
        self.rooms.iter().any(|r| memberships.contains(r))
    }
}

#[derive(Clone)]
pub struct Hub {
    tx: broadcast::Sender<Arc<Envelope>>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Fire-and-forget. Returns the number of live subscriptions that saw it.
    pub fn publish(&self, rooms: Vec<Room>, event: PushEvent) -> usize {
        let name = event.name();
        let envelope = Arc::new(Envelope { rooms, event });
        match self.tx.send(envelope) {
            Ok(n) => {
                debug!(event = name, subscribers = n, "published");
                n
            }
            Err(_) => {
                debug!(event = name, "no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self, memberships: Vec<Room>) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            memberships,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub struct Subscription {
    rx: broadcast::Receiver<Arc<Envelope>>,
    memberships: Vec<Room>,
}

impl Subscription {
    pub fn memberships(&self) -> &[Room] {
        &self.memberships
    }

    /// Next event addressed to one of this subscription's rooms, or `None`
    /// once the hub is gone. Lagged events are dropped.
    pub async fn next(&mut self) -> Option<PushEvent> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if envelope.is_for(&self.memberships) => {
                    return Some(envelope.event.clone());
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "push subscriber lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
