//! Lifecycle events published by the upload queue manager.
//!
//! Every status transition produces one event on the aggregate stream
//! and the same event on its status-specific stream, so observers can
//! subscribe to either granularity.

use crate::model::error::TransferError;
use crate::model::upload_item::{UploadData, UploadItem};
use crate::model::upload_status::UploadStatus;

/// A single lifecycle notification.
///
/// Each variant carries a snapshot of the item taken at emission time,
/// plus the counters the original consumers display (totals at the
/// moment of the event, not live values).
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// The driver picked the item and initiated its transfer
    Starting { item: UploadItem },
    /// The backend reported new byte counts
    Progress { item: UploadItem },
    /// The transfer was aborted, mid-flight or via cancel-after-complete
    Aborted { item: UploadItem, total_aborted: u64 },
    /// A pending item was removed before its transfer started
    Cancelled { item: UploadItem },
    /// The backend reported a failure
    Error {
        item: UploadItem,
        error: TransferError,
        total_errors: u64,
    },
    /// The transfer finished and the upload counts as complete
    Complete {
        item: UploadItem,
        data: UploadData,
        total_complete: u64,
        total_aborted: u64,
    },
    /// A completed upload's remote artifact was removed afterwards
    Deleted { item: UploadItem, total_complete: u64 },
}

impl UploadEvent {
    /// Status the item was moved to by this event
    pub fn status(&self) -> UploadStatus {
        match self {
            UploadEvent::Starting { .. } => UploadStatus::Starting,
            UploadEvent::Progress { .. } => UploadStatus::Progress,
            UploadEvent::Aborted { .. } => UploadStatus::Aborted,
            UploadEvent::Cancelled { .. } => UploadStatus::Cancelled,
            UploadEvent::Error { .. } => UploadStatus::Error,
            UploadEvent::Complete { .. } => UploadStatus::Complete,
            UploadEvent::Deleted { .. } => UploadStatus::Deleted,
        }
    }

    /// Snapshot of the item this event refers to
    pub fn item(&self) -> &UploadItem {
        match self {
            UploadEvent::Starting { item }
            | UploadEvent::Progress { item }
            | UploadEvent::Aborted { item, .. }
            | UploadEvent::Cancelled { item }
            | UploadEvent::Error { item, .. }
            | UploadEvent::Complete { item, .. }
            | UploadEvent::Deleted { item, .. } => item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::upload_item::{ItemId, UploadRequest};

    fn item() -> UploadItem {
        UploadItem::from_request(ItemId::from(1), UploadRequest::new("a.txt", 10))
    }

    #[test]
    fn test_event_status_matches_variant() {
        let event = UploadEvent::Starting { item: item() };
        assert_eq!(event.status(), UploadStatus::Starting);

        let event = UploadEvent::Complete {
            item: item(),
            data: UploadData::new("node-1"),
            total_complete: 1,
            total_aborted: 0,
        };
        assert_eq!(event.status(), UploadStatus::Complete);
    }

    #[test]
    fn test_event_exposes_item_snapshot() {
        let event = UploadEvent::Cancelled { item: item() };
        assert_eq!(event.item().name, "a.txt");
    }
}
