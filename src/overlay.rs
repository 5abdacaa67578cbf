/// Overlay placement model
///
/// Tracks where the highlight frame should be drawn. Painting is left to the
/// host UI; this only folds match events into a rectangle and a visibility flag.
use crate::geometry::LogicalRect;
use crate::messaging::{MatchEvent, MatchEventKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayPlacement {
    rect: Option<LogicalRect>,
    visible: bool,
    confidence: f64,
}

impl OverlayPlacement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event in. Returns true when the window needs to move or
    /// change visibility.
    pub fn apply(&mut self, event: &MatchEvent) -> bool {
        let before = (self.rect, self.visible);
        match event.kind {
            MatchEventKind::Acquired | MatchEventKind::Updated => {
                self.rect = Some(event.rect);
                self.visible = true;
                self.confidence = event.confidence;
            }
            MatchEventKind::Lost => {
                // Keep the last rect so a re-acquisition nearby doesn't jump from the origin
                self.visible = false;
                self.confidence = event.confidence;
            }
        }
        before != (self.rect, self.visible)
    }

    pub fn rect(&self) -> Option<LogicalRect> {
        self.rect
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: MatchEventKind, x: i32) -> MatchEvent {
        MatchEvent::new(kind, LogicalRect::new(x, 10, 50, 40), 0.9)
    }

    #[test]
    fn test_acquire_shows_overlay() {
        let mut overlay = OverlayPlacement::new();
        assert!(!overlay.is_visible());

        assert!(overlay.apply(&event(MatchEventKind::Acquired, 5)));
        assert!(overlay.is_visible());
        assert_eq!(overlay.rect(), Some(LogicalRect::new(5, 10, 50, 40)));
    }

    #[test]
    fn test_update_in_place_is_not_a_change() {
        let mut overlay = OverlayPlacement::new();
        overlay.apply(&event(MatchEventKind::Acquired, 5));

        assert!(!overlay.apply(&event(MatchEventKind::Updated, 5)));
        assert!(overlay.apply(&event(MatchEventKind::Updated, 7)));
        assert_eq!(overlay.rect().map(|r| r.x), Some(7));
    }

    #[test]
    fn test_lost_hides_but_keeps_rect() {
        let mut overlay = OverlayPlacement::new();
        overlay.apply(&event(MatchEventKind::Acquired, 5));

        assert!(overlay.apply(&event(MatchEventKind::Lost, 5)));
        assert!(!overlay.is_visible());
        assert_eq!(overlay.rect().map(|r| r.x), Some(5));
    }
}
