/// Match events published by the engine
///
/// Events represent things that have happened (past tense).
/// They are delivered in tick order.
use crate::geometry::LogicalRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchEventKind {
    /// Target appeared (first tick at or above threshold)
    Acquired,
    /// Target still on screen, position refreshed
    Updated,
    /// Target dropped below threshold
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchEvent {
    pub kind: MatchEventKind,
    /// Overlay placement in logical pixels, border included
    pub rect: LogicalRect,
    pub confidence: f64,
}

impl MatchEvent {
    pub fn new(kind: MatchEventKind, rect: LogicalRect, confidence: f64) -> Self {
        Self {
            kind,
            rect,
            confidence,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        let LogicalRect {
            x,
            y,
            width,
            height,
        } = self.rect;
        let percent = self.confidence * 100.0;
        match self.kind {
            MatchEventKind::Acquired => {
                format!("Match found at ({x}, {y}) {width}x{height}, {percent:.1}%")
            }
            MatchEventKind::Updated => {
                format!("Match at ({x}, {y}) {width}x{height}, {percent:.1}%")
            }
            MatchEventKind::Lost => format!("Match lost ({percent:.1}%)"),
        }
    }
}
