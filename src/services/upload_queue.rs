//! Upload Queue Manager
//!
//! Provides centralized management for file uploads with:
//! - Queue admission with glob-based exclusion filtering
//! - Single-flight execution (one in-flight transfer system-wide)
//! - Cancellation with a size/progress safe-abort heuristic
//! - Lifecycle event streams for UI observers
//!
//! The queue owns items while they are pending or active; terminal
//! items pass to whoever drains the queue.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::model::error::TransferError;
use crate::model::event::UploadEvent;
use crate::model::upload_item::{ItemId, UploadItem, UploadRequest};
use crate::model::upload_status::UploadStatus;
use crate::services::admission::ExclusionFilter;
use crate::services::events::UploadEvents;
use crate::services::transfer_backend::{
    RemoteDelete, TransferBackend, TransferHandle, TransferOptions, TransferSignal,
};
use crate::services::transfer_registry::{ActiveEntry, TransferRegistry};
use crate::settings::filter_config::FilterPolicySource;

/// Transfers at or below this size are always hard-aborted on cancel
const MIN_CANCELLABLE_SIZE: u64 = 1_000_000;

/// Transfers at or beyond this progress run to completion on cancel,
/// with the finished artifact removed afterwards
const MAX_CANCELLABLE_PERCENT: f64 = 50.0;

/// Default pause before the driver re-arms after a settlement
const DEFAULT_REARM_DELAY: Duration = Duration::from_millis(100);

/// Tunables for the queue manager
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Delay between a settlement and the next driver pass; keeps the
    /// driver from re-entering itself synchronously
    pub rearm_delay: Duration,
    /// Upper bound on the gap between backend signals; None disables
    /// stall detection and a hung backend stalls the queue
    pub stall_timeout: Option<Duration>,
    /// Publish requests dropped at admission time on the rejected
    /// stream instead of dropping them silently
    pub notify_rejected: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            rearm_delay: DEFAULT_REARM_DELAY,
            stall_timeout: None,
            notify_rejected: false,
        }
    }
}

/// Queue structure, counters and the live-handle registry; everything
/// behind one lock so transitions and their events stay causally ordered
struct QueueState {
    queue: Vec<UploadItem>,
    registry: TransferRegistry,
    /// Id of the single in-flight item, if any
    active: Option<ItemId>,
    total_complete: u64,
    total_aborted: u64,
    total_error: u64,
}

impl QueueState {
    fn new() -> Self {
        QueueState {
            queue: Vec::new(),
            registry: TransferRegistry::new(),
            active: None,
            total_complete: 0,
            total_aborted: 0,
            total_error: 0,
        }
    }

    /// Copies the canonical in-flight state back into the queue slot,
    /// when the slot still exists (clear() may have dropped it)
    fn mirror(&mut self, item: &UploadItem) {
        if let Some(slot) = self.queue.iter_mut().find(|i| i.id == item.id) {
            *slot = item.clone();
        }
    }
}

struct QueueInner {
    backend: Arc<dyn TransferBackend>,
    remote: Arc<dyn RemoteDelete>,
    policy: Arc<dyn FilterPolicySource>,
    config: QueueConfig,
    state: Mutex<QueueState>,
    events: UploadEvents,
    next_id: AtomicU64,
}

/// Central coordinator for all uploads.
///
/// Cheap to clone; clones share the same queue. Settlement handling
/// runs in spawned tasks holding such clones.
#[derive(Clone)]
pub struct UploadQueue {
    inner: Arc<QueueInner>,
}

impl UploadQueue {
    pub fn new(
        backend: Arc<dyn TransferBackend>,
        remote: Arc<dyn RemoteDelete>,
        policy: Arc<dyn FilterPolicySource>,
    ) -> Self {
        Self::with_config(backend, remote, policy, QueueConfig::default())
    }

    pub fn with_config(
        backend: Arc<dyn TransferBackend>,
        remote: Arc<dyn RemoteDelete>,
        policy: Arc<dyn FilterPolicySource>,
        config: QueueConfig,
    ) -> Self {
        UploadQueue {
            inner: Arc::new(QueueInner {
                backend,
                remote,
                policy,
                config,
                state: Mutex::new(QueueState::new()),
                events: UploadEvents::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Event streams published by this queue
    pub fn events(&self) -> &UploadEvents {
        &self.inner.events
    }

    /// Checks whether a transfer is currently in flight
    pub async fn is_uploading(&self) -> bool {
        self.inner.state.lock().await.active.is_some()
    }

    /// Clones the current queue contents
    pub async fn queue_snapshot(&self) -> Vec<UploadItem> {
        self.inner.state.lock().await.queue.clone()
    }

    /// (complete, aborted, error) totals at this moment
    pub async fn totals(&self) -> (u64, u64, u64) {
        let state = self.inner.state.lock().await;
        (state.total_complete, state.total_aborted, state.total_error)
    }

    /// Admits requests into the queue.
    ///
    /// Each candidate is tested against the filename and parent-folder
    /// exclusion lists from the filter policy; anything matching either
    /// list is dropped. Returns the admitted items, in queue order,
    /// with their assigned ids. A queue-changed snapshot fires
    /// regardless of how many candidates survived.
    pub async fn enqueue(&self, requests: Vec<UploadRequest>) -> Vec<UploadItem> {
        let filter = ExclusionFilter::from_policy(self.inner.policy.as_ref());
        let mut accepted = Vec::new();

        let snapshot = {
            let mut state = self.inner.state.lock().await;
            for request in requests {
                if filter.allows(&request) {
                    let id = ItemId::new(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
                    let item = UploadItem::from_request(id, request);
                    state.queue.push(item.clone());
                    accepted.push(item);
                } else {
                    debug!("upload {:?} rejected by exclusion rules", request.name);
                    if self.inner.config.notify_rejected {
                        self.inner.events.emit_rejected(request);
                    }
                }
            }
            state.queue.clone()
        };

        self.inner.events.emit_queue_changed(snapshot);
        accepted
    }

    /// Runs the next pending upload, if no transfer is active.
    ///
    /// No-op while a transfer is in flight or when the queue holds no
    /// pending item. On settlement the driver re-arms itself after
    /// [`QueueConfig::rearm_delay`], so a single call drains the queue.
    pub async fn pump(&self) {
        let item = {
            let mut state = self.inner.state.lock().await;
            if state.active.is_some() {
                return;
            }
            let Some(slot) = state.queue.iter_mut().find(|i| i.status.is_pending()) else {
                return;
            };
            slot.status = UploadStatus::Starting;
            let item = slot.clone();
            state.active = Some(item.id);
            item
        };

        self.inner.events.emit(UploadEvent::Starting { item: item.clone() });

        let options = TransferOptions::for_item(&item);
        match self.inner.backend.begin(&item, &options).await {
            Ok(handle) => {
                let id = item.id;
                {
                    let mut state = self.inner.state.lock().await;
                    state.registry.insert(
                        id,
                        ActiveEntry {
                            item,
                            abort: handle.abort_signal(),
                            cancel_requested: false,
                        },
                    );
                }
                let queue = self.clone();
                tokio::spawn(async move { queue.drive(id, handle).await });
            }
            Err(error) => {
                warn!("failed to start upload {}: {}", item.name, error);
                self.settle_begin_failure(item, error).await;
                self.rearm();
            }
        }
    }

    /// Cancels uploads.
    ///
    /// A live transfer is hard-aborted only when the item is large and
    /// early (size above 1 MB, progress under 50%); otherwise it runs to
    /// completion and the finished artifact is removed best-effort, so a
    /// near-complete transfer is not thrown away just to be re-uploaded.
    /// Items without a live transfer get a state-specific terminal
    /// action; states with no defined action are left untouched.
    pub async fn cancel(&self, ids: &[ItemId]) {
        let mut pending_events = Vec::new();
        {
            let mut state = self.inner.state.lock().await;
            for &id in ids {
                if let Some(entry) = state.registry.get_mut(id) {
                    entry.cancel_requested = true;
                    if is_safe_to_abort(&entry.item) {
                        entry.request_abort();
                    } else {
                        debug!(
                            "letting {} finish before cleanup (size {}, {:.0}% done)",
                            entry.item.name, entry.item.size, entry.item.progress.percent
                        );
                    }
                    continue;
                }

                let Some(pos) = state.queue.iter().position(|i| i.id == id) else {
                    continue;
                };
                match state.queue[pos].status {
                    UploadStatus::Pending => {
                        state.queue[pos].status = UploadStatus::Cancelled;
                        pending_events.push(UploadEvent::Cancelled {
                            item: state.queue[pos].clone(),
                        });
                    }
                    UploadStatus::Deleted => {
                        state.total_complete = state.total_complete.saturating_sub(1);
                        pending_events.push(UploadEvent::Deleted {
                            item: state.queue[pos].clone(),
                            total_complete: state.total_complete,
                        });
                    }
                    UploadStatus::Error => {
                        state.total_error += 1;
                        let item = state.queue[pos].clone();
                        let error = stored_error(&item);
                        pending_events.push(UploadEvent::Error {
                            item,
                            error,
                            total_errors: state.total_error,
                        });
                    }
                    // No cancel action defined for the remaining states
                    _ => {}
                }
            }
        }
        for event in pending_events {
            self.inner.events.emit(event);
        }
    }

    /// Empties the queue and resets all counters.
    ///
    /// Deliberately leaves an in-flight transfer (and its registry
    /// entry) alone; cancel active items first if that is wanted. The
    /// in-flight item still settles and its events still fire.
    pub async fn clear(&self) {
        let mut state = self.inner.state.lock().await;
        state.queue.clear();
        state.total_complete = 0;
        state.total_aborted = 0;
        state.total_error = 0;
    }

    /// Removes the remote artifact of a completed upload.
    ///
    /// The delete itself is best-effort (failure is logged, not
    /// surfaced); the item transitions to Deleted and the complete
    /// counter drops immediately. No-op for anything not Complete.
    pub async fn delete_upload(&self, id: ItemId) {
        let settled = {
            let mut state = self.inner.state.lock().await;
            let Some(pos) = state.queue.iter().position(|i| i.id == id) else {
                return;
            };
            if state.queue[pos].status != UploadStatus::Complete {
                return;
            }
            let Some(node_id) = state.queue[pos].remote_node_id().map(str::to_string) else {
                return;
            };
            state.queue[pos].status = UploadStatus::Deleted;
            state.total_complete = state.total_complete.saturating_sub(1);
            let event = UploadEvent::Deleted {
                item: state.queue[pos].clone(),
                total_complete: state.total_complete,
            };
            (node_id, event)
        };

        self.spawn_remote_delete(&settled.0);
        self.inner.events.emit(settled.1);
    }

    /// Removes and returns all terminal items, passing their ownership
    /// to the caller; pending and in-flight items stay queued
    pub async fn drain_finished(&self) -> Vec<UploadItem> {
        let mut state = self.inner.state.lock().await;
        let (finished, remaining): (Vec<_>, Vec<_>) = state
            .queue
            .drain(..)
            .partition(|item| item.status.is_terminal());
        state.queue = remaining;
        finished
    }

    /// Consumes backend signals for one transfer until it settles, then
    /// re-arms the driver after the configured delay.
    ///
    /// Boxed rather than `async fn`: drive awaits pump, which spawns
    /// drive, and rustc cannot prove `Send` through that opaque-type
    /// cycle (rust-lang/rust#102211).
    fn drive(
        self,
        id: ItemId,
        mut handle: TransferHandle,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
        loop {
            let signal = match self.inner.config.stall_timeout {
                Some(limit) => match timeout(limit, handle.recv()).await {
                    Ok(signal) => signal,
                    Err(_) => {
                        handle.abort();
                        Some(TransferSignal::Error(TransferError::Timeout(format!(
                            "no backend signal within {:?}",
                            limit
                        ))))
                    }
                },
                None => handle.recv().await,
            };
            // A backend that drops its feed without a terminal signal
            // settles the item as failed
            let signal = signal.unwrap_or_else(|| {
                TransferSignal::Error(TransferError::Other(
                    "transfer ended without a result".into(),
                ))
            });
            if self.apply_signal(id, signal).await {
                break;
            }
        }

        sleep(self.inner.config.rearm_delay).await;
        self.pump().await;
        })
    }

    /// Applies one backend signal; returns true once the item settled
    async fn apply_signal(&self, id: ItemId, signal: TransferSignal) -> bool {
        let mut state = self.inner.state.lock().await;
        match signal {
            TransferSignal::Progress(progress) => {
                let item = match state.registry.get_mut(id) {
                    Some(entry) => {
                        entry.item.progress = progress;
                        entry.item.status = UploadStatus::Progress;
                        entry.item.clone()
                    }
                    // Late signal for an already-settled transfer
                    None => return true,
                };
                state.mirror(&item);
                drop(state);
                self.inner.events.emit(UploadEvent::Progress { item });
                false
            }
            TransferSignal::Aborted => {
                let Some(mut entry) = state.registry.remove(id) else {
                    return true;
                };
                entry.item.status = UploadStatus::Aborted;
                state.total_aborted += 1;
                let total_aborted = state.total_aborted;
                state.mirror(&entry.item);
                if state.active == Some(id) {
                    state.active = None;
                }
                drop(state);
                debug!("upload {} aborted", entry.item.name);
                self.inner.events.emit(UploadEvent::Aborted {
                    item: entry.item,
                    total_aborted,
                });
                true
            }
            TransferSignal::Error(error) => {
                let Some(mut entry) = state.registry.remove(id) else {
                    return true;
                };
                entry.item.status = UploadStatus::Error;
                entry.item.error_code = error.status_code();
                state.total_error += 1;
                let total_errors = state.total_error;
                state.mirror(&entry.item);
                if state.active == Some(id) {
                    state.active = None;
                }
                drop(state);
                warn!("upload {} failed: {}", entry.item.name, error);
                self.inner.events.emit(UploadEvent::Error {
                    item: entry.item,
                    error,
                    total_errors,
                });
                true
            }
            TransferSignal::Success(data) => {
                let Some(mut entry) = state.registry.remove(id) else {
                    return true;
                };
                if entry.cancel_requested {
                    // Cancelled while running: count as aborted and
                    // clean up the artifact the server just created
                    entry.item.status = UploadStatus::Aborted;
                    state.total_aborted += 1;
                    let total_aborted = state.total_aborted;
                    state.mirror(&entry.item);
                    if state.active == Some(id) {
                        state.active = None;
                    }
                    drop(state);
                    self.spawn_remote_delete(&data.id);
                    self.inner.events.emit(UploadEvent::Aborted {
                        item: entry.item,
                        total_aborted,
                    });
                } else {
                    entry.item.status = UploadStatus::Complete;
                    entry.item.data = Some(data.clone());
                    state.total_complete += 1;
                    let total_complete = state.total_complete;
                    let total_aborted = state.total_aborted;
                    state.mirror(&entry.item);
                    if state.active == Some(id) {
                        state.active = None;
                    }
                    drop(state);
                    debug!("upload {} complete as node {}", entry.item.name, data.id);
                    self.inner.events.emit(UploadEvent::Complete {
                        item: entry.item,
                        data,
                        total_complete,
                        total_aborted,
                    });
                }
                true
            }
        }
    }

    /// Settles an item whose transfer could not even be started
    async fn settle_begin_failure(&self, fallback: UploadItem, error: TransferError) {
        let event = {
            let mut state = self.inner.state.lock().await;
            state.total_error += 1;
            let total_errors = state.total_error;
            let item = match state.queue.iter_mut().find(|i| i.id == fallback.id) {
                Some(slot) => {
                    slot.status = UploadStatus::Error;
                    slot.error_code = error.status_code();
                    slot.clone()
                }
                None => {
                    let mut item = fallback;
                    item.status = UploadStatus::Error;
                    item.error_code = error.status_code();
                    item
                }
            };
            if state.active == Some(item.id) {
                state.active = None;
            }
            UploadEvent::Error {
                item,
                error,
                total_errors,
            }
        };
        self.inner.events.emit(event);
    }

    /// Schedules the next driver pass after the configured delay,
    /// outside the current call stack
    fn rearm(&self) {
        let queue = self.clone();
        let delay = self.inner.config.rearm_delay;
        tokio::spawn(async move {
            sleep(delay).await;
            queue.pump().await;
        });
    }

    /// Fire-and-forget removal of a remote node; failures are logged
    /// and never surfaced to the caller
    fn spawn_remote_delete(&self, node_id: &str) {
        let remote = self.inner.remote.clone();
        let node_id = node_id.to_string();
        tokio::spawn(async move {
            match remote.delete_node(&node_id, true).await {
                Ok(()) => debug!("removed remote node {}", node_id),
                Err(error) => warn!("failed to remove remote node {}: {}", node_id, error),
            }
        });
    }
}

/// Hard-abort only large transfers that are still early; aborting a
/// small or near-complete transfer wastes more than letting it finish
fn is_safe_to_abort(item: &UploadItem) -> bool {
    item.size > MIN_CANCELLABLE_SIZE && item.progress.percent < MAX_CANCELLABLE_PERCENT
}

/// Reconstructs the error carried by an item that already failed, for
/// re-emission on cancel
fn stored_error(item: &UploadItem) -> TransferError {
    match item.error_code {
        Some(code) => TransferError::from_status(code, "upload failed"),
        None => TransferError::Other("upload failed".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::upload_item::{UploadOptions, UploadProgress};
    use crate::services::simulated_backend::SimulatedBackend;
    use crate::settings::filter_config::FilterSettings;
    use tokio::time::Duration;

    fn fast_config() -> QueueConfig {
        QueueConfig {
            rearm_delay: Duration::from_millis(5),
            ..QueueConfig::default()
        }
    }

    fn queue_with_policy(policy: FilterSettings) -> (UploadQueue, Arc<SimulatedBackend>) {
        let backend = Arc::new(SimulatedBackend::with_timing(4, Duration::from_millis(2)));
        let queue = UploadQueue::with_config(
            backend.clone(),
            backend.clone(),
            Arc::new(policy),
            fast_config(),
        );
        (queue, backend)
    }

    fn open_queue() -> (UploadQueue, Arc<SimulatedBackend>) {
        queue_with_policy(FilterSettings::default())
    }

    async fn drain(queue: &UploadQueue) {
        queue.pump().await;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let snapshot = queue.queue_snapshot().await;
            let done = snapshot.iter().all(|i| i.status.is_terminal());
            if done && !queue.is_uploading().await {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "queue did not drain in time"
            );
            sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_enqueue_applies_exclusion_filter() {
        let (queue, _) =
            queue_with_policy(FilterSettings::with_patterns(vec!["*.tmp".into()], vec![]));
        let accepted = queue
            .enqueue(vec![
                UploadRequest::new("a.tmp", 10),
                UploadRequest::new("a.txt", 10),
            ])
            .await;

        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].name, "a.txt");
        assert_eq!(queue.queue_snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_items_are_silent_by_default() {
        let (queue, _) =
            queue_with_policy(FilterSettings::with_patterns(vec!["*.tmp".into()], vec![]));
        let mut rejected = queue.events().subscribe_rejected();

        queue.enqueue(vec![UploadRequest::new("a.tmp", 10)]).await;
        assert!(rejected.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rejected_notification_opt_in() {
        let backend = Arc::new(SimulatedBackend::new());
        let policy = FilterSettings::with_patterns(vec!["*.tmp".into()], vec![]);
        let queue = UploadQueue::with_config(
            backend.clone(),
            backend,
            Arc::new(policy),
            QueueConfig {
                notify_rejected: true,
                ..fast_config()
            },
        );
        let mut rejected = queue.events().subscribe_rejected();

        queue.enqueue(vec![UploadRequest::new("a.tmp", 10)]).await;
        let dropped = rejected.recv().await.unwrap();
        assert_eq!(dropped.name, "a.tmp");
    }

    #[tokio::test]
    async fn test_queue_changed_fires_with_snapshot() {
        let (queue, _) = open_queue();
        let mut changed = queue.events().subscribe_queue_changed();

        queue
            .enqueue(vec![
                UploadRequest::new("one.txt", 10),
                UploadRequest::new("two.txt", 10),
            ])
            .await;

        let snapshot = changed.recv().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|i| i.status.is_pending()));
    }

    #[tokio::test]
    async fn test_successful_uploads_bump_complete_counter() {
        let (queue, _) = open_queue();
        queue
            .enqueue(vec![
                UploadRequest::new("one.txt", 100),
                UploadRequest::new("two.txt", 100),
                UploadRequest::new("three.txt", 100),
            ])
            .await;
        drain(&queue).await;

        let (complete, aborted, errors) = queue.totals().await;
        assert_eq!(complete, 3);
        assert_eq!(aborted, 0);
        assert_eq!(errors, 0);
        assert!(queue
            .queue_snapshot()
            .await
            .iter()
            .all(|i| i.status == UploadStatus::Complete));
    }

    #[tokio::test]
    async fn test_delete_upload_decrements_complete_counter() {
        let (queue, backend) = open_queue();
        queue.enqueue(vec![UploadRequest::new("doc.txt", 100)]).await;
        drain(&queue).await;

        let item = queue.queue_snapshot().await.remove(0);
        let node_id = item.remote_node_id().unwrap().to_string();
        assert!(backend.contains_node(&node_id));

        let mut deleted = queue.events().subscribe_deleted();
        queue.delete_upload(item.id).await;

        let event = deleted.recv().await.unwrap();
        assert_eq!(event.status(), UploadStatus::Deleted);
        let (complete, _, _) = queue.totals().await;
        assert_eq!(complete, 0);

        // Remote delete is fire-and-forget; give it a moment
        sleep(Duration::from_millis(50)).await;
        assert!(!backend.contains_node(&node_id));
    }

    #[tokio::test]
    async fn test_cancel_pending_item() {
        let (queue, _) = open_queue();
        let accepted = queue.enqueue(vec![UploadRequest::new("idle.txt", 10)]).await;
        let mut cancelled = queue.events().subscribe_cancelled();

        queue.cancel(&[accepted[0].id]).await;

        let event = cancelled.recv().await.unwrap();
        assert_eq!(event.item().name, "idle.txt");
        assert_eq!(
            queue.queue_snapshot().await[0].status,
            UploadStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_cancelled_item_never_starts() {
        let (queue, _) = open_queue();
        let accepted = queue
            .enqueue(vec![
                UploadRequest::new("skip.txt", 10),
                UploadRequest::new("keep.txt", 10),
            ])
            .await;
        queue.cancel(&[accepted[0].id]).await;
        drain(&queue).await;

        let snapshot = queue.queue_snapshot().await;
        assert_eq!(snapshot[0].status, UploadStatus::Cancelled);
        assert_eq!(snapshot[1].status, UploadStatus::Complete);
        let (complete, _, _) = queue.totals().await;
        assert_eq!(complete, 1);
    }

    #[tokio::test]
    async fn test_cancel_error_item_re_emits_error() {
        let (queue, _) = {
            let backend = Arc::new(
                SimulatedBackend::with_timing(2, Duration::from_millis(2)).fail_on("bad.txt"),
            );
            let queue = UploadQueue::with_config(
                backend.clone(),
                backend.clone(),
                Arc::new(FilterSettings::default()),
                fast_config(),
            );
            (queue, backend)
        };
        let accepted = queue.enqueue(vec![UploadRequest::new("bad.txt", 10)]).await;
        drain(&queue).await;
        let (_, _, errors) = queue.totals().await;
        assert_eq!(errors, 1);

        let mut error_stream = queue.events().subscribe_error();
        queue.cancel(&[accepted[0].id]).await;

        let event = error_stream.recv().await.unwrap();
        assert_eq!(event.status(), UploadStatus::Error);
        let (_, _, errors) = queue.totals().await;
        assert_eq!(errors, 2);
    }

    #[tokio::test]
    async fn test_cancel_unknown_id_is_noop() {
        let (queue, _) = open_queue();
        queue.cancel(&[ItemId::from(999)]).await;
        assert!(queue.queue_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_resets_counters_and_queue() {
        let (queue, _) = open_queue();
        queue.enqueue(vec![UploadRequest::new("a.txt", 10)]).await;
        drain(&queue).await;

        queue.clear().await;
        assert!(queue.queue_snapshot().await.is_empty());
        assert_eq!(queue.totals().await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_pump_on_empty_queue_is_noop() {
        let (queue, _) = open_queue();
        queue.pump().await;
        assert!(!queue.is_uploading().await);
    }

    #[tokio::test]
    async fn test_backend_error_does_not_halt_the_driver() {
        let backend = Arc::new(
            SimulatedBackend::with_timing(2, Duration::from_millis(2)).fail_on("bad.txt"),
        );
        let queue = UploadQueue::with_config(
            backend.clone(),
            backend.clone(),
            Arc::new(FilterSettings::default()),
            fast_config(),
        );
        queue
            .enqueue(vec![
                UploadRequest::new("bad.txt", 10),
                UploadRequest::new("good.txt", 10),
            ])
            .await;
        drain(&queue).await;

        let snapshot = queue.queue_snapshot().await;
        assert_eq!(snapshot[0].status, UploadStatus::Error);
        assert_eq!(snapshot[0].error_code, Some(503));
        assert_eq!(snapshot[1].status, UploadStatus::Complete);
        let (complete, _, errors) = queue.totals().await;
        assert_eq!((complete, errors), (1, 1));
    }

    #[tokio::test]
    async fn test_drain_finished_takes_only_terminal_items() {
        let (queue, _) = open_queue();
        queue
            .enqueue(vec![
                UploadRequest::new("done.txt", 10),
                UploadRequest::new("waiting.txt", 10),
            ])
            .await;
        drain(&queue).await;
        queue.enqueue(vec![UploadRequest::new("fresh.txt", 10)]).await;

        let finished = queue.drain_finished().await;
        assert_eq!(finished.len(), 2);
        let remaining = queue.queue_snapshot().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "fresh.txt");
    }

    #[tokio::test]
    async fn test_safe_abort_heuristic_boundaries() {
        let mut item =
            UploadItem::from_request(ItemId::from(1), UploadRequest::new("big.bin", 5_000_000));
        item.progress = UploadProgress::new(500_000, 5_000_000);
        assert!(is_safe_to_abort(&item));

        // Near-complete large transfer: let it finish
        item.progress = UploadProgress::new(4_500_000, 5_000_000);
        assert!(!is_safe_to_abort(&item));

        // Small transfer, early: not worth aborting per the heuristic
        let mut small =
            UploadItem::from_request(ItemId::from(2), UploadRequest::new("small.bin", 500_000));
        small.progress = UploadProgress::new(50_000, 500_000);
        assert!(!is_safe_to_abort(&small));
    }

    #[tokio::test]
    async fn test_new_version_options_reach_backend() {
        let (queue, backend) = open_queue();
        let request = UploadRequest::new("doc.txt", 10)
            .with_remote_id("node-existing")
            .with_options(UploadOptions {
                new_version: true,
                major_version: true,
                comment: Some("v2".into()),
                ..UploadOptions::default()
            });
        queue.enqueue(vec![request]).await;
        drain(&queue).await;

        let seen = backend.seen_options();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].overwrite);
        assert!(seen[0].major_version);
        assert_eq!(seen[0].comment.as_deref(), Some("v2"));
    }
}
