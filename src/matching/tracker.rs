/// Edge detection over the per-tick match decision.

/// What changed on one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    /// Not matched last tick, matched now
    pub entered_match: bool,
    /// Matched last tick, not matched now
    pub exited_match: bool,
}

/// Turns a level signal (score above threshold) into edges.
///
/// One tracker lives per engine session. It is reset whenever the target
/// changes so a match at the same spot still counts as a fresh acquisition.
#[derive(Debug, Default)]
pub struct TransitionTracker {
    was_matched: bool,
}

impl TransitionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, confidence: f64, threshold: f64) -> Transition {
        let matched = confidence >= threshold;
        let transition = Transition {
            entered_match: matched && !self.was_matched,
            exited_match: !matched && self.was_matched,
        };
        self.was_matched = matched;
        transition
    }

    pub fn is_matched(&self) -> bool {
        self.was_matched
    }

    pub fn reset(&mut self) {
        self.was_matched = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_fire_once_per_change() {
        let mut tracker = TransitionTracker::new();
        let edges: Vec<Transition> = [0.9, 0.9, 0.9, 0.5, 0.9]
            .iter()
            .map(|&c| tracker.observe(c, 0.8))
            .collect();

        let entered = edges.iter().filter(|t| t.entered_match).count();
        let exited = edges.iter().filter(|t| t.exited_match).count();
        assert_eq!(entered, 2);
        assert_eq!(exited, 1);
        assert!(edges[0].entered_match);
        assert!(edges[3].exited_match);
        assert!(edges[4].entered_match);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut tracker = TransitionTracker::new();
        assert!(tracker.observe(0.8, 0.8).entered_match);
        assert!(tracker.is_matched());
    }

    #[test]
    fn test_no_edges_while_searching() {
        let mut tracker = TransitionTracker::new();
        for _ in 0..5 {
            assert_eq!(tracker.observe(0.2, 0.8), Transition::default());
        }
    }

    #[test]
    fn test_reset_rearms_acquisition() {
        let mut tracker = TransitionTracker::new();
        assert!(tracker.observe(0.95, 0.8).entered_match);
        assert!(!tracker.observe(0.95, 0.8).entered_match);

        tracker.reset();
        assert!(!tracker.is_matched());
        assert!(tracker.observe(0.95, 0.8).entered_match);
    }
}
