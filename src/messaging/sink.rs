/// Consumer side of the match loop.
use crossbeam_channel::{unbounded, Receiver, Sender};

use super::events::MatchEvent;

/// Receives match events from the worker thread.
///
/// `deliver` runs on the worker, so implementations must hand the event off
/// without blocking (queue it, set a flag) and do the real work elsewhere.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: MatchEvent);
}

impl EventSink for Sender<MatchEvent> {
    fn deliver(&self, event: MatchEvent) {
        // If send fails, the receiver is gone - that's ok
        let _ = self.try_send(event);
    }
}

/// Single-consumer queue: the engine gets the sender, the UI drains the receiver.
pub fn channel_sink() -> (Sender<MatchEvent>, Receiver<MatchEvent>) {
    unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LogicalRect;
    use crate::messaging::MatchEventKind;

    #[test]
    fn test_channel_sink_preserves_order() {
        let (tx, rx) = channel_sink();
        for kind in [
            MatchEventKind::Acquired,
            MatchEventKind::Updated,
            MatchEventKind::Lost,
        ] {
            tx.deliver(MatchEvent::new(kind, LogicalRect::default(), 0.9));
        }

        let kinds: Vec<_> = rx.try_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MatchEventKind::Acquired,
                MatchEventKind::Updated,
                MatchEventKind::Lost
            ]
        );
    }

    #[test]
    fn test_deliver_after_receiver_dropped() {
        let (tx, rx) = channel_sink();
        drop(rx);
        tx.deliver(MatchEvent::new(
            MatchEventKind::Updated,
            LogicalRect::default(),
            0.9,
        ));
    }
}
