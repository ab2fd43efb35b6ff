//! Request state machine
//!
//! Transitions are one-way; no state is ever re-entered. Terminal states are
//! `Done`, `Cancelled` and `Failed`.

use crate::error::{Error, Result};
use tracing::debug;

/// Phases of a refinement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Request accepted, nothing classified yet
    Init,
    /// Classifier verdict available
    Classified,
    /// Single-agent shortcut in flight
    ShortcutRunning,
    /// Specialist fan-out in flight
    FanoutRunning,
    /// All specialists completed or failed
    FanoutComplete,
    /// Moderation pass in flight
    Moderating,
    /// Assembling and committing the entry
    Finalizing,
    /// Entry committed
    Done,
    /// Caller-induced cancellation
    Cancelled,
    /// Fatal failure
    Failed,
}

impl Phase {
    /// Whether the run is finished.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Cancelled | Phase::Failed)
    }

    /// Whether `next` is a legal successor of this phase.
    #[must_use]
    pub fn can_advance_to(self, next: Phase) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Phase::Cancelled | Phase::Failed => true,
            Phase::Classified => self == Phase::Init,
            Phase::ShortcutRunning | Phase::FanoutRunning => self == Phase::Classified,
            Phase::FanoutComplete => self == Phase::FanoutRunning,
            Phase::Moderating => self == Phase::FanoutComplete,
            Phase::Finalizing => {
                matches!(self, Phase::ShortcutRunning | Phase::Moderating)
            }
            Phase::Done => self == Phase::Finalizing,
            Phase::Init => false,
        }
    }
}

/// Tracks the current phase and enforces one-way transitions.
pub(crate) struct PhaseTracker {
    current: Phase,
}

impl PhaseTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: Phase::Init,
        }
    }

    pub(crate) fn advance(&mut self, next: Phase) -> Result<()> {
        if !self.current.can_advance_to(next) {
            return Err(Error::Internal(format!(
                "illegal phase transition {:?} -> {next:?}",
                self.current
            )));
        }
        debug!(from = ?self.current, to = ?next, "Phase transition");
        self.current = next;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> Phase {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_pipeline_path() {
        let mut tracker = PhaseTracker::new();
        for phase in [
            Phase::Classified,
            Phase::FanoutRunning,
            Phase::FanoutComplete,
            Phase::Moderating,
            Phase::Finalizing,
            Phase::Done,
        ] {
            tracker.advance(phase).unwrap();
        }
        assert_eq!(tracker.current(), Phase::Done);
    }

    #[test]
    fn test_shortcut_path() {
        let mut tracker = PhaseTracker::new();
        tracker.advance(Phase::Classified).unwrap();
        tracker.advance(Phase::ShortcutRunning).unwrap();
        tracker.advance(Phase::Finalizing).unwrap();
        tracker.advance(Phase::Done).unwrap();
    }

    #[test]
    fn test_no_reentry() {
        assert!(!Phase::Classified.can_advance_to(Phase::Init));
        assert!(!Phase::Moderating.can_advance_to(Phase::FanoutRunning));
        assert!(!Phase::Done.can_advance_to(Phase::Finalizing));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [Phase::Done, Phase::Cancelled, Phase::Failed] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_advance_to(Phase::Classified));
            assert!(!terminal.can_advance_to(Phase::Cancelled));
        }
    }

    #[test]
    fn test_any_active_phase_can_cancel_or_fail() {
        for phase in [
            Phase::Init,
            Phase::Classified,
            Phase::ShortcutRunning,
            Phase::FanoutRunning,
            Phase::FanoutComplete,
            Phase::Moderating,
            Phase::Finalizing,
        ] {
            assert!(phase.can_advance_to(Phase::Cancelled));
            assert!(phase.can_advance_to(Phase::Failed));
        }
    }

    #[test]
    fn test_illegal_transition_is_an_error() {
        let mut tracker = PhaseTracker::new();
        assert!(tracker.advance(Phase::Moderating).is_err());
    }

    #[test]
    fn test_skipping_barrier_is_illegal() {
        assert!(!Phase::FanoutRunning.can_advance_to(Phase::Moderating));
        assert!(!Phase::FanoutRunning.can_advance_to(Phase::Finalizing));
    }
}
