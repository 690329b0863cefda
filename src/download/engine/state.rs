//! Lifecycle states of a single transfer run.

use std::fmt;

use tracing::debug;

/// Where a transfer run currently is.
///
/// `Init → Probing → Transferring → Finalizing → Completed`, with `Failed`
/// reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Opening the destination.
    Init,
    /// Waiting for the size probe.
    Probing,
    /// Fetching and committing ranges.
    Transferring,
    /// Emitting the terminal sample and closing the destination.
    Finalizing,
    /// All bytes committed and the destination closed.
    Completed,
    /// The run stopped with an error.
    Failed,
}

impl TransferState {
    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Probing)
                | (Self::Probing, Self::Transferring)
                | (Self::Transferring, Self::Finalizing)
                | (Self::Finalizing, Self::Completed)
        ) || (!self.is_terminal() && next == Self::Failed)
    }

    /// Moves to `next`, logging the transition.
    ///
    /// Terminal states never change and out-of-order transitions are ignored.
    pub fn advance(&mut self, next: Self) {
        if !self.can_advance_to(next) {
            debug!(from = %self, to = %next, "ignoring invalid state transition");
            return;
        }
        debug!(from = %self, to = %next, "transfer state");
        *self = next;
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Init => "init",
            Self::Probing => "probing",
            Self::Transferring => "transferring",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = TransferState::Init;
        for next in [
            TransferState::Probing,
            TransferState::Transferring,
            TransferState::Finalizing,
            TransferState::Completed,
        ] {
            state.advance(next);
            assert_eq!(state, next);
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut state = TransferState::Failed;
        state.advance(TransferState::Probing);
        assert_eq!(state, TransferState::Failed);

        let mut state = TransferState::Completed;
        state.advance(TransferState::Failed);
        assert_eq!(state, TransferState::Completed);
    }

    #[test]
    fn test_any_live_state_can_fail() {
        for start in [
            TransferState::Init,
            TransferState::Probing,
            TransferState::Transferring,
            TransferState::Finalizing,
        ] {
            let mut state = start;
            state.advance(TransferState::Failed);
            assert_eq!(state, TransferState::Failed);
        }
    }

    #[test]
    fn test_skipping_states_is_ignored() {
        let mut state = TransferState::Init;
        state.advance(TransferState::Transferring);
        assert_eq!(state, TransferState::Init);
    }
}
