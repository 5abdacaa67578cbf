/// Messaging module for match event delivery
///
/// The worker thread is the only producer. Consumers never run on the worker:
/// the engine hands each event to an [`EventSink`], which queues it for the
/// consumer's own thread.
///
/// ## Architecture
///
/// ```text
/// ┌──────────────┐   MatchEvent   ┌───────────┐            ┌──────────────┐
/// │ Match worker │ ─────────────> │ EventSink │ ─────────> │  Consumers   │
/// │   (thread)   │    deliver()   │ (channel  │  recv()    │ (overlay,    │
/// └──────────────┘                │  or bus)  │            │  alerts)     │
///                                 └───────────┘            └──────────────┘
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// // Single consumer
/// let (tx, rx) = channel_sink();
/// let engine = MatchEngine::new(source, Arc::new(tx));
///
/// // Several consumers
/// let bus = EventBus::new();
/// let overlay_rx = bus.subscribe();
/// let alerts_rx = bus.subscribe();
/// let engine = MatchEngine::new(source, Arc::new(bus.clone()));
/// ```

pub mod bus;
pub mod events;
pub mod sink;

// Re-export commonly used types
pub use bus::EventBus;
pub use events::{MatchEvent, MatchEventKind};
pub use sink::{channel_sink, EventSink};
