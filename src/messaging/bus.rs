use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
/// Event bus for fan-out delivery
///
/// Lets several consumers (overlay, alerts, logging) each drain their own
/// queue of the same match events.
use std::sync::Arc;

use super::events::MatchEvent;
use super::sink::EventSink;

/// Broadcasts every match event to all subscribers. Clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Sender<MatchEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each subscriber gets its own unbounded queue; dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> Receiver<MatchEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.write().push(tx);
        rx
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: MatchEvent) {
        for subscriber in self.subscribers.read().iter() {
            // If send fails, subscriber channel is closed - that's ok
            let _ = subscriber.try_send(event);
        }
    }
}

impl EventSink for EventBus {
    fn deliver(&self, event: MatchEvent) {
        self.publish(event);
    }
}
