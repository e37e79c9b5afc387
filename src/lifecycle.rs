//! Complaint lifecycle rules: the status state machine and submission
//! validation. The service facade is the only caller; nothing here touches
//! storage or authorization.
//!
//! pending → in_progress | resolved | closed
//! in_progress → resolved | closed
//! resolved → closed | in_progress (reopen)
//! closed → nothing; a closed complaint's category may still be corrected
//! for model feedback, but its status is terminal.

use crate::error::{AppError, AppResult};
use crate::model::Status;

pub fn status_transition_allowed(from: Status, to: Status) -> bool {
    use Status::*;
    matches!(
        (from, to),
        (Pending, InProgress)
            | (Pending, Resolved)
            | (Pending, Closed)
            | (InProgress, Resolved)
            | (InProgress, Closed)
            | (Resolved, Closed)
            | (Resolved, InProgress)
    )
}

/// Validate a requested status change. Restating the current status is a
/// no-op, not a transition, and is accepted even on a closed complaint.
pub fn check_status_transition(from: Status, to: Status) -> AppResult<()> {
    if from == to {
        return Ok(());
    }
    if status_transition_allowed(from, to) {
        Ok(())
    } else {
        Err(AppError::invalid_transition(
            "bad_status_transition",
            format!("cannot move a complaint from '{}' to '{}'", from.as_str(), to.as_str()),
        ))
    }
}

/// Complaint text must be non-empty after trimming; returns the trimmed text.
pub fn validate_text(text: &str) -> AppResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("empty_text", "complaint text is required"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use Status::*;

    #[test]
    fn closed_is_terminal() {
        for to in [Pending, InProgress, Resolved] {
            assert!(!status_transition_allowed(Closed, to));
            assert!(check_status_transition(Closed, to).is_err());
        }
        // restating closed is a no-op, not a transition
        assert!(check_status_transition(Closed, Closed).is_ok());
    }

    #[test]
    fn forward_paths_and_reopen() {
        assert!(status_transition_allowed(Pending, InProgress));
        assert!(status_transition_allowed(Pending, Resolved));
        assert!(status_transition_allowed(Pending, Closed));
        assert!(status_transition_allowed(InProgress, Resolved));
        assert!(status_transition_allowed(InProgress, Closed));
        assert!(status_transition_allowed(Resolved, Closed));
        assert!(status_transition_allowed(Resolved, InProgress));
        // no path back to pending, ever
        for from in [InProgress, Resolved, Closed] {
            assert!(!status_transition_allowed(from, Pending));
        }
        // self-transitions are not in the table; they are no-ops upstream
        assert!(!status_transition_allowed(InProgress, InProgress));
    }

    #[test]
    fn text_is_trimmed_and_must_be_non_empty() {
        assert_eq!(validate_text("  late delivery \n").unwrap(), "late delivery");
        assert!(validate_text("").is_err());
        assert!(validate_text("   \t ").is_err());
    }
}
