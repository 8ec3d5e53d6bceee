//! Contracts between the queue manager and the subsystem that moves bytes.
//!
//! A backend receives an item plus a recognized options bag and returns a
//! [`TransferHandle`]: a live, cancellable view of one in-flight upload.
//! The backend keeps the producing half ([`TransferFeed`]) and reports
//! progress and the final outcome through it.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::model::error::{TransferError, TransferResult};
use crate::model::upload_item::{UploadData, UploadItem, UploadProgress};

/// Signal used to request an abort of a running transfer
pub type AbortSignal = Arc<AtomicBool>;

/// One observation reported by a backend for an in-flight transfer
#[derive(Debug, Clone)]
pub enum TransferSignal {
    /// New byte counts
    Progress(UploadProgress),
    /// The transfer stopped in response to an abort request
    Aborted,
    /// The transfer failed
    Error(TransferError),
    /// The transfer finished; carries the server-assigned result
    Success(UploadData),
}

/// Consumer half of a live transfer: a signal stream plus an abort control.
///
/// Exactly one handle exists per in-flight item; the queue driver owns it
/// until a terminal signal arrives.
pub struct TransferHandle {
    signals: UnboundedReceiver<TransferSignal>,
    abort: AbortSignal,
}

impl TransferHandle {
    /// Creates a connected feed/handle pair. Backends keep the feed and
    /// hand the handle back from [`TransferBackend::begin`].
    pub fn channel() -> (TransferFeed, TransferHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let abort = Arc::new(AtomicBool::new(false));
        let feed = TransferFeed {
            tx,
            abort: abort.clone(),
        };
        let handle = TransferHandle {
            signals: rx,
            abort,
        };
        (feed, handle)
    }

    /// Requests an abort. The backend acknowledges by emitting
    /// [`TransferSignal::Aborted`]; the request itself is not a transition.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    /// Shared flag behind [`abort`](Self::abort), for registry bookkeeping
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Next signal, or None once the backend dropped its feed
    pub async fn recv(&mut self) -> Option<TransferSignal> {
        self.signals.recv().await
    }
}

/// Producer half kept by the backend implementation
#[derive(Clone)]
pub struct TransferFeed {
    tx: UnboundedSender<TransferSignal>,
    abort: AbortSignal,
}

impl TransferFeed {
    pub fn progress(&self, progress: UploadProgress) {
        let _ = self.tx.send(TransferSignal::Progress(progress));
    }

    pub fn aborted(&self) {
        let _ = self.tx.send(TransferSignal::Aborted);
    }

    pub fn error(&self, error: TransferError) {
        let _ = self.tx.send(TransferSignal::Error(error));
    }

    pub fn success(&self, data: UploadData) {
        let _ = self.tx.send(TransferSignal::Success(data));
    }

    /// True once the consumer asked for an abort; backends should check
    /// this between chunks and acknowledge with [`aborted`](Self::aborted)
    pub fn is_abort_requested(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }
}

/// Options bag passed to the backend alongside the item.
///
/// Field semantics follow the content-server upload API: a new-version
/// upload overwrites with version metadata, a fresh upload auto-renames
/// on name clashes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferOptions {
    /// Renditions to request for the uploaded content
    pub renditions: Option<String>,
    /// Extra entry facets to include in the result payload
    pub include: Vec<String>,
    /// Overwrite the existing node content (new-version uploads)
    pub overwrite: bool,
    /// Bump the major version instead of the minor one
    pub major_version: bool,
    /// Version comment
    pub comment: Option<String>,
    /// Explicit node name (new-version uploads)
    pub name: Option<String>,
    /// Let the server rename on conflicts (fresh uploads)
    pub auto_rename: bool,
    /// Override the node type assigned by the server
    pub node_type: Option<String>,
}

impl TransferOptions {
    /// Builds the options bag for an item the way the upload API expects:
    /// fixed renditions/include defaults, then either the new-version
    /// fields or auto-rename.
    pub fn for_item(item: &UploadItem) -> Self {
        let mut opts = TransferOptions {
            renditions: Some("doclib".to_string()),
            include: vec!["allowableOperations".to_string()],
            ..TransferOptions::default()
        };

        if item.options.new_version {
            opts.overwrite = true;
            opts.major_version = item.options.major_version;
            opts.comment = item.options.comment.clone();
            opts.name = Some(item.name.clone());
        } else {
            opts.auto_rename = true;
        }

        if let Some(node_type) = &item.options.node_type {
            opts.node_type = Some(node_type.clone());
        }

        opts
    }
}

/// Performs the actual byte transfer for one item.
///
/// Implementations decide between a fresh upload and a content update
/// based on `item.remote_id`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransferBackend: Send + Sync {
    /// Initiates the transfer and returns its live handle.
    ///
    /// An error here settles the item as failed without it ever
    /// becoming active.
    async fn begin(
        &self,
        item: &UploadItem,
        options: &TransferOptions,
    ) -> TransferResult<TransferHandle>;
}

/// Remote-delete side channel, keyed by server-assigned node ids.
///
/// Used best-effort for cancel-after-complete cleanup and for explicit
/// removal of completed uploads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteDelete: Send + Sync {
    async fn delete_node(&self, node_id: &str, permanent: bool) -> TransferResult<()>;
}
