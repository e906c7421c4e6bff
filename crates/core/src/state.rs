use serde::{Deserialize, Serialize};

use crate::model::SubmissionResult;

/// What caused a session to enter `Submitting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionTrigger {
    UserConfirmed,
    TimeExpired,
}

/// Terminal classification of a failed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionErrorKind {
    /// Credentials were rejected or missing. The session cannot continue.
    Authorization,
    /// The grading service refused the payload.
    Validation,
    /// Transport failure, server error, or an unreadable response.
    Network,
}

impl SubmissionErrorKind {
    /// Whether a user-initiated retry may resubmit the same payload.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        !matches!(self, SubmissionErrorKind::Authorization)
    }
}

/// Lifecycle of one exam session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    NotStarted,
    InProgress {
        current_index: usize,
        time_remaining_secs: u32,
    },
    AwaitingConfirmation {
        current_index: usize,
        time_remaining_secs: u32,
    },
    Submitting,
    Completed {
        result: SubmissionResult,
    },
    Failed {
        kind: SubmissionErrorKind,
    },
}

impl SessionState {
    /// `InProgress` or `AwaitingConfirmation`.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SessionState::InProgress { .. } | SessionState::AwaitingConfirmation { .. }
        )
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed { .. } | SessionState::Failed { .. }
        )
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::NotStarted => "not_started",
            SessionState::InProgress { .. } => "in_progress",
            SessionState::AwaitingConfirmation { .. } => "awaiting_confirmation",
            SessionState::Submitting => "submitting",
            SessionState::Completed { .. } => "completed",
            SessionState::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_and_terminal_are_disjoint() {
        let states = [
            SessionState::NotStarted,
            SessionState::InProgress {
                current_index: 0,
                time_remaining_secs: 1,
            },
            SessionState::AwaitingConfirmation {
                current_index: 0,
                time_remaining_secs: 1,
            },
            SessionState::Submitting,
            SessionState::Failed {
                kind: SubmissionErrorKind::Network,
            },
        ];
        for state in &states {
            assert!(!(state.is_live() && state.is_terminal()), "{}", state.name());
        }
        assert!(states[1].is_live() && states[2].is_live());
        assert!(states[4].is_terminal());
    }

    #[test]
    fn only_authorization_failures_block_retry() {
        assert!(!SubmissionErrorKind::Authorization.is_retryable());
        assert!(SubmissionErrorKind::Validation.is_retryable());
        assert!(SubmissionErrorKind::Network.is_retryable());
    }
}
