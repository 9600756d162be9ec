//! Trigger runtime state, held by the store between operations. Never
//! mutated directly by a worker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerState {
    Waiting,
    Acquired,
    Executing,
    Complete,
    Paused,
    PausedBlocked,
    Blocked,
    Error,
    /// Not present in the store at all.
    None,
}

impl TriggerState {
    pub fn is_paused_variant(self) -> bool {
        matches!(self, TriggerState::Paused | TriggerState::PausedBlocked)
    }

    pub fn is_blocked_variant(self) -> bool {
        matches!(self, TriggerState::Blocked | TriggerState::PausedBlocked)
    }

    /// Pausing: `WAITING -> PAUSED`, `BLOCKED -> PAUSED_BLOCKED`. Any other
    /// state is unaffected by a pause request.
    pub fn paused(self) -> TriggerState {
        match self {
            TriggerState::Waiting => TriggerState::Paused,
            TriggerState::Blocked => TriggerState::PausedBlocked,
            other => other,
        }
    }

    /// Resuming reverses pausing.
    pub fn resumed(self) -> TriggerState {
        match self {
            TriggerState::Paused => TriggerState::Waiting,
            TriggerState::PausedBlocked => TriggerState::Blocked,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_then_resume_then_pause_is_paused() {
        let mut s = TriggerState::Waiting;
        s = s.paused();
        s = s.resumed();
        s = s.paused();
        assert_eq!(s, TriggerState::Paused);
    }

    #[test]
    fn blocked_pauses_into_paused_blocked() {
        assert_eq!(TriggerState::Blocked.paused(), TriggerState::PausedBlocked);
        assert_eq!(TriggerState::PausedBlocked.resumed(), TriggerState::Blocked);
    }
}
