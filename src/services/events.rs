//! Broadcast hub for queue notifications.
//!
//! Observers can subscribe to the aggregate stream, to a single
//! status-specific stream, to queue snapshots, or to the opt-in
//! rejection stream. Emission never blocks and never fails: events for
//! streams without subscribers are dropped.

use tokio::sync::broadcast;

use crate::model::event::UploadEvent;
use crate::model::upload_item::{UploadItem, UploadRequest};
use crate::model::upload_status::UploadStatus;

/// Buffered events per subscriber before the oldest are dropped
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One sender per stream the queue manager exposes
pub struct UploadEvents {
    queue_changed: broadcast::Sender<Vec<UploadItem>>,
    rejected: broadcast::Sender<UploadRequest>,
    all: broadcast::Sender<UploadEvent>,
    starting: broadcast::Sender<UploadEvent>,
    progress: broadcast::Sender<UploadEvent>,
    aborted: broadcast::Sender<UploadEvent>,
    cancelled: broadcast::Sender<UploadEvent>,
    error: broadcast::Sender<UploadEvent>,
    complete: broadcast::Sender<UploadEvent>,
    deleted: broadcast::Sender<UploadEvent>,
}

impl UploadEvents {
    pub fn new() -> Self {
        let channel = || broadcast::channel(EVENT_CHANNEL_CAPACITY).0;
        UploadEvents {
            queue_changed: broadcast::channel(EVENT_CHANNEL_CAPACITY).0,
            rejected: broadcast::channel(EVENT_CHANNEL_CAPACITY).0,
            all: channel(),
            starting: channel(),
            progress: channel(),
            aborted: channel(),
            cancelled: channel(),
            error: channel(),
            complete: channel(),
            deleted: channel(),
        }
    }

    /// Publishes an event on the aggregate stream and on its
    /// status-specific stream
    pub fn emit(&self, event: UploadEvent) {
        let specific = match event.status() {
            UploadStatus::Starting => &self.starting,
            UploadStatus::Progress => &self.progress,
            UploadStatus::Aborted => &self.aborted,
            UploadStatus::Cancelled => &self.cancelled,
            UploadStatus::Error => &self.error,
            UploadStatus::Complete => &self.complete,
            UploadStatus::Deleted => &self.deleted,
            // Events are transitions; nothing emits Pending
            UploadStatus::Pending => return,
        };
        let _ = self.all.send(event.clone());
        let _ = specific.send(event);
    }

    pub fn emit_queue_changed(&self, snapshot: Vec<UploadItem>) {
        let _ = self.queue_changed.send(snapshot);
    }

    pub fn emit_rejected(&self, request: UploadRequest) {
        let _ = self.rejected.send(request);
    }

    /// Full queue snapshot after every admission
    pub fn subscribe_queue_changed(&self) -> broadcast::Receiver<Vec<UploadItem>> {
        self.queue_changed.subscribe()
    }

    /// Requests dropped at admission time (only fires when
    /// rejection notification is enabled in the queue config)
    pub fn subscribe_rejected(&self) -> broadcast::Receiver<UploadRequest> {
        self.rejected.subscribe()
    }

    /// Every lifecycle event regardless of kind
    pub fn subscribe_all(&self) -> broadcast::Receiver<UploadEvent> {
        self.all.subscribe()
    }

    pub fn subscribe_starting(&self) -> broadcast::Receiver<UploadEvent> {
        self.starting.subscribe()
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<UploadEvent> {
        self.progress.subscribe()
    }

    pub fn subscribe_aborted(&self) -> broadcast::Receiver<UploadEvent> {
        self.aborted.subscribe()
    }

    pub fn subscribe_cancelled(&self) -> broadcast::Receiver<UploadEvent> {
        self.cancelled.subscribe()
    }

    pub fn subscribe_error(&self) -> broadcast::Receiver<UploadEvent> {
        self.error.subscribe()
    }

    pub fn subscribe_complete(&self) -> broadcast::Receiver<UploadEvent> {
        self.complete.subscribe()
    }

    pub fn subscribe_deleted(&self) -> broadcast::Receiver<UploadEvent> {
        self.deleted.subscribe()
    }
}

impl Default for UploadEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::upload_item::{ItemId, UploadItem, UploadRequest};

    fn starting_event() -> UploadEvent {
        let item = UploadItem::from_request(ItemId::from(1), UploadRequest::new("a.txt", 10));
        UploadEvent::Starting { item }
    }

    #[tokio::test]
    async fn test_event_reaches_aggregate_and_specific_stream() {
        let events = UploadEvents::new();
        let mut all = events.subscribe_all();
        let mut starting = events.subscribe_starting();
        let mut progress = events.subscribe_progress();

        events.emit(starting_event());

        assert!(matches!(all.recv().await, Ok(UploadEvent::Starting { .. })));
        assert!(matches!(
            starting.recv().await,
            Ok(UploadEvent::Starting { .. })
        ));
        assert!(progress.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_fine() {
        let events = UploadEvents::new();
        events.emit(starting_event());
        events.emit_queue_changed(vec![]);
    }
}
