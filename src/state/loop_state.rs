/// Match loop lifecycle state machine
///
/// Represents the lifecycle of the background worker with explicit transitions.

use std::time::Instant;

/// Lifecycle of the match loop worker
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LoopState {
    /// No worker thread exists
    #[default]
    NotRunning,

    /// Worker is ticking
    Running { since: Instant },

    /// Stop was signalled, waiting for the worker to exit (transitional state)
    StopRequested,
}

impl LoopState {
    pub fn is_running(&self) -> bool {
        matches!(self, LoopState::Running { .. })
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, LoopState::NotRunning)
    }

    /// Get the time since the loop started (if running)
    pub fn running_duration(&self) -> Option<std::time::Duration> {
        match self {
            LoopState::Running { since } => Some(since.elapsed()),
            _ => None,
        }
    }
}

/// State transition results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Cannot start when already running
    AlreadyRunning,

    /// Cannot stop when already stopped
    AlreadyStopped,

    /// Cannot perform this action during a transition
    InTransition,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::AlreadyRunning => write!(f, "Match loop is already running"),
            TransitionError::AlreadyStopped => write!(f, "Match loop is already stopped"),
            TransitionError::InTransition => {
                write!(f, "Cannot perform action during state transition")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

/// State machine for loop transitions
#[derive(Debug, Default)]
pub struct LoopStateMachine {
    state: LoopState,
}

impl LoopStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// NotRunning -> Running
    pub fn start(&mut self) -> Result<(), TransitionError> {
        match self.state {
            LoopState::NotRunning => {
                self.state = LoopState::Running {
                    since: Instant::now(),
                };
                Ok(())
            }
            LoopState::Running { .. } => Err(TransitionError::AlreadyRunning),
            LoopState::StopRequested => Err(TransitionError::InTransition),
        }
    }

    /// Running -> StopRequested
    pub fn request_stop(&mut self) -> Result<(), TransitionError> {
        match self.state {
            LoopState::Running { .. } => {
                self.state = LoopState::StopRequested;
                Ok(())
            }
            LoopState::NotRunning => Err(TransitionError::AlreadyStopped),
            LoopState::StopRequested => Err(TransitionError::InTransition),
        }
    }

    /// StopRequested -> NotRunning, once the worker has been joined
    pub fn mark_stopped(&mut self) -> Result<(), TransitionError> {
        match self.state {
            LoopState::StopRequested => {
                self.state = LoopState::NotRunning;
                Ok(())
            }
            _ => Err(TransitionError::InTransition),
        }
    }

    /// Force stop (for error recovery)
    pub fn force_stop(&mut self) {
        self.state = LoopState::NotRunning;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_state_predicates() {
        let stopped = LoopState::NotRunning;
        assert!(stopped.is_stopped());
        assert!(!stopped.is_running());
        assert!(stopped.running_duration().is_none());

        let running = LoopState::Running {
            since: Instant::now(),
        };
        assert!(!running.is_stopped());
        assert!(running.is_running());
        assert!(running.running_duration().is_some());

        let stopping = LoopState::StopRequested;
        assert!(!stopping.is_stopped());
        assert!(!stopping.is_running());
        assert!(stopping.running_duration().is_none());
    }

    #[test]
    fn test_state_machine_transitions() {
        let mut sm = LoopStateMachine::new();
        assert_eq!(sm.state(), LoopState::NotRunning);

        assert!(sm.start().is_ok());
        assert!(sm.state().is_running());

        // Cannot start while running
        assert_eq!(sm.start(), Err(TransitionError::AlreadyRunning));

        assert!(sm.request_stop().is_ok());
        assert_eq!(sm.state(), LoopState::StopRequested);

        // Cannot start while stopping
        assert_eq!(sm.start(), Err(TransitionError::InTransition));

        assert!(sm.mark_stopped().is_ok());
        assert_eq!(sm.state(), LoopState::NotRunning);
    }

    #[test]
    fn test_running_duration_only_while_running() {
        let mut sm = LoopStateMachine::new();
        sm.start().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let ran_for = sm.state().running_duration().unwrap();
        assert!(ran_for >= std::time::Duration::from_millis(5));

        sm.request_stop().unwrap();
        assert!(sm.state().running_duration().is_none());
    }

    #[test]
    fn test_stop_when_stopped() {
        let mut sm = LoopStateMachine::new();
        assert_eq!(sm.request_stop(), Err(TransitionError::AlreadyStopped));
        assert_eq!(sm.mark_stopped(), Err(TransitionError::InTransition));
    }

    #[test]
    fn test_force_stop() {
        let mut sm = LoopStateMachine::new();
        sm.start().unwrap();
        sm.request_stop().unwrap();

        sm.force_stop();
        assert_eq!(sm.state(), LoopState::NotRunning);
    }
}
