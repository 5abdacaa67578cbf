/// Whether the target is currently on screen
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum MatchState {
    /// No target loaded
    #[default]
    Idle,

    /// Target loaded, not above threshold on the latest tick
    Searching,

    /// Latest tick scored at or above threshold
    Matched,
}

impl MatchState {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchState::Matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(MatchState::default(), MatchState::Idle);
        assert!(!MatchState::Searching.is_matched());
        assert!(MatchState::Matched.is_matched());
    }
}
