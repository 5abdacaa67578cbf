/// State management module
///
/// Explicit state enums for the match loop lifecycle and the match status.

pub mod loop_state;
pub mod match_state;

// Re-export commonly used types
pub use loop_state::{LoopState, LoopStateMachine, TransitionError};
pub use match_state::MatchState;
