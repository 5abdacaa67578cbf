//! Overlay Watch
//!
//! Watches the primary screen for a target image and reports where it
//! appears, in logical coordinates ready for drawing a highlight frame.
//!
//! The [`MatchEngine`] runs one background worker that captures, matches and
//! classifies each tick into [`MatchEvent`]s delivered through an
//! [`EventSink`]. Consumers fold those events into alerts and an
//! [`OverlayPlacement`] via the [`AlertDispatcher`].

pub mod alerts;
pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod matching;
pub mod messaging;
pub mod overlay;
pub mod state;
pub mod utils;

pub use alerts::{Alert, AlertDispatcher, LogAlert, Notification};
pub use capture::{Frame, FrameSource};
pub use config::{AppConfig, EngineConfig};
pub use engine::MatchEngine;
pub use error::{AlertError, CaptureError, ConfigError, EngineError, EngineResult};
pub use geometry::{to_logical_rect, LogicalRect};
pub use matching::{MatchResult, TargetImage, TemplateMatcher};
pub use messaging::{channel_sink, EventBus, EventSink, MatchEvent, MatchEventKind};
pub use overlay::OverlayPlacement;
pub use state::{LoopState, MatchState};

#[cfg(feature = "capture")]
pub use capture::ScreenCapture;
