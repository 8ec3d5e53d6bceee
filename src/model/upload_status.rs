//! Lifecycle state machine for queued uploads
//!
//! This module provides a state machine representation for the upload
//! lifecycle, preventing invalid states from being representable.

use std::fmt;

/// Represents the lifecycle state of a queued upload.
///
/// Using an enum instead of separate boolean/option fields ensures
/// only valid state combinations are possible at compile time.
///
/// Legal transitions:
/// Pending -> Starting -> Progress -> Complete | Error | Aborted,
/// Pending -> Cancelled (never executed), Complete -> Deleted
/// (explicit follow-up removal). Everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStatus {
    /// Waiting in queue, not yet picked by the driver
    Pending,
    /// Picked by the driver, transfer initiated but no bytes reported yet
    Starting,
    /// Transfer running, byte counts arriving
    Progress,
    /// Transfer finished successfully
    Complete,
    /// Transfer was aborted, either mid-flight or after completion
    /// when a cancellation was pending
    Aborted,
    /// Transfer failed with a backend error
    Error,
    /// Removed from the queue before the transfer ever started
    Cancelled,
    /// Completed upload whose remote artifact was removed afterwards
    Deleted,
}

impl Default for UploadStatus {
    fn default() -> Self {
        UploadStatus::Pending
    }
}

impl UploadStatus {
    /// Returns true if the upload is waiting for the driver
    pub fn is_pending(&self) -> bool {
        matches!(self, UploadStatus::Pending)
    }

    /// Returns true if a transfer is in flight for this upload
    pub fn is_in_flight(&self) -> bool {
        matches!(self, UploadStatus::Starting | UploadStatus::Progress)
    }

    /// Returns true if the upload finished successfully
    pub fn is_complete(&self) -> bool {
        matches!(self, UploadStatus::Complete)
    }

    /// Returns true if no further transitions are possible,
    /// except Complete which may still become Deleted
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Complete
                | UploadStatus::Error
                | UploadStatus::Aborted
                | UploadStatus::Cancelled
                | UploadStatus::Deleted
        )
    }

    /// Returns true if `next` is a legal transition from this state
    pub fn can_transition_to(&self, next: UploadStatus) -> bool {
        use UploadStatus::*;
        matches!(
            (self, next),
            (Pending, Starting)
                | (Pending, Cancelled)
                | (Starting, Progress)
                | (Starting, Complete)
                | (Starting, Error)
                | (Starting, Aborted)
                | (Progress, Progress)
                | (Progress, Complete)
                | (Progress, Error)
                | (Progress, Aborted)
                | (Complete, Deleted)
        )
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Starting => "starting",
            UploadStatus::Progress => "progress",
            UploadStatus::Complete => "complete",
            UploadStatus::Aborted => "aborted",
            UploadStatus::Error => "error",
            UploadStatus::Cancelled => "cancelled",
            UploadStatus::Deleted => "deleted",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pending() {
        assert_eq!(UploadStatus::default(), UploadStatus::Pending);
    }

    #[test]
    fn test_in_flight_states() {
        assert!(UploadStatus::Starting.is_in_flight());
        assert!(UploadStatus::Progress.is_in_flight());
        assert!(!UploadStatus::Pending.is_in_flight());
        assert!(!UploadStatus::Complete.is_in_flight());
    }

    #[test]
    fn test_terminal_states() {
        for status in [
            UploadStatus::Complete,
            UploadStatus::Error,
            UploadStatus::Aborted,
            UploadStatus::Cancelled,
            UploadStatus::Deleted,
        ] {
            assert!(status.is_terminal(), "{} should be terminal", status);
        }
        for status in [
            UploadStatus::Pending,
            UploadStatus::Starting,
            UploadStatus::Progress,
        ] {
            assert!(!status.is_terminal(), "{} should not be terminal", status);
        }
    }

    #[test]
    fn test_complete_may_become_deleted() {
        assert!(UploadStatus::Complete.can_transition_to(UploadStatus::Deleted));
        assert!(!UploadStatus::Error.can_transition_to(UploadStatus::Deleted));
        assert!(!UploadStatus::Deleted.can_transition_to(UploadStatus::Complete));
    }

    #[test]
    fn test_cancel_only_from_pending() {
        assert!(UploadStatus::Pending.can_transition_to(UploadStatus::Cancelled));
        assert!(!UploadStatus::Progress.can_transition_to(UploadStatus::Cancelled));
        assert!(!UploadStatus::Starting.can_transition_to(UploadStatus::Cancelled));
    }
}
