//! In-memory transfer backend.
//!
//! Streams progress in fixed chunks with a configurable delay, honours
//! abort requests between chunks, and keeps a map of "stored" nodes so
//! demos and tests can observe uploads and deletions without a server.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::model::error::{TransferError, TransferResult};
use crate::model::upload_item::{UploadData, UploadItem, UploadProgress};
use crate::services::transfer_backend::{
    RemoteDelete, TransferBackend, TransferHandle, TransferOptions,
};

/// A node held by the simulated content store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    pub name: String,
    pub size: u64,
}

pub struct SimulatedBackend {
    chunk_count: u32,
    chunk_delay: Duration,
    fail_names: HashSet<String>,
    next_node: AtomicU64,
    nodes: Arc<Mutex<HashMap<String, StoredNode>>>,
    seen_options: Mutex<Vec<TransferOptions>>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::with_timing(4, Duration::from_millis(10))
    }

    pub fn with_timing(chunk_count: u32, chunk_delay: Duration) -> Self {
        SimulatedBackend {
            chunk_count: chunk_count.max(1),
            chunk_delay,
            fail_names: HashSet::new(),
            next_node: AtomicU64::new(1),
            nodes: Arc::new(Mutex::new(HashMap::new())),
            seen_options: Mutex::new(Vec::new()),
        }
    }

    /// Makes every upload of the given file name fail mid-transfer
    pub fn fail_on(mut self, name: impl Into<String>) -> Self {
        self.fail_names.insert(name.into());
        self
    }

    /// True if the store currently holds the node
    pub fn contains_node(&self, node_id: &str) -> bool {
        match self.nodes.lock() {
            Ok(nodes) => nodes.contains_key(node_id),
            Err(_) => false,
        }
    }

    pub fn stored_node_count(&self) -> usize {
        self.nodes.lock().map(|nodes| nodes.len()).unwrap_or(0)
    }

    /// Options bags received so far, in call order
    pub fn seen_options(&self) -> Vec<TransferOptions> {
        self.seen_options
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransferBackend for SimulatedBackend {
    async fn begin(
        &self,
        item: &UploadItem,
        options: &TransferOptions,
    ) -> TransferResult<TransferHandle> {
        if let Ok(mut seen) = self.seen_options.lock() {
            seen.push(options.clone());
        }

        let (feed, handle) = TransferHandle::channel();
        let chunk_count = self.chunk_count;
        let chunk_delay = self.chunk_delay;
        let should_fail = self.fail_names.contains(&item.name);
        let node_id = format!("node-{}", self.next_node.fetch_add(1, Ordering::SeqCst));
        let nodes = self.nodes.clone();
        let name = item.name.clone();
        let size = item.size;

        tokio::spawn(async move {
            for chunk in 1..=chunk_count {
                sleep(chunk_delay).await;
                if feed.is_abort_requested() {
                    feed.aborted();
                    return;
                }
                if should_fail && chunk == 2 {
                    feed.error(TransferError::Network("simulated connection drop".into()));
                    return;
                }
                let loaded = size * u64::from(chunk) / u64::from(chunk_count);
                feed.progress(UploadProgress::new(loaded, size));
            }
            if feed.is_abort_requested() {
                feed.aborted();
                return;
            }
            if let Ok(mut nodes) = nodes.lock() {
                nodes.insert(node_id.clone(), StoredNode { name, size });
            }
            feed.success(UploadData::new(node_id));
        });

        Ok(handle)
    }
}

#[async_trait]
impl RemoteDelete for SimulatedBackend {
    async fn delete_node(&self, node_id: &str, _permanent: bool) -> TransferResult<()> {
        let removed = self
            .nodes
            .lock()
            .map(|mut nodes| nodes.remove(node_id))
            .unwrap_or(None);
        match removed {
            Some(_) => Ok(()),
            None => Err(TransferError::NotFound(format!(
                "no such node: {}",
                node_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::upload_item::{ItemId, UploadRequest};
    use crate::services::transfer_backend::TransferSignal;

    fn item(name: &str, size: u64) -> UploadItem {
        UploadItem::from_request(ItemId::from(1), UploadRequest::new(name, size))
    }

    #[tokio::test]
    async fn test_successful_transfer_stores_node() {
        let backend = SimulatedBackend::with_timing(2, Duration::from_millis(1));
        let item = item("a.txt", 100);
        let mut handle = backend
            .begin(&item, &TransferOptions::for_item(&item))
            .await
            .unwrap();

        let mut saw_success = None;
        while let Some(signal) = handle.recv().await {
            if let TransferSignal::Success(data) = signal {
                saw_success = Some(data);
                break;
            }
        }
        let data = saw_success.unwrap();
        assert!(backend.contains_node(&data.id));
        assert_eq!(backend.stored_node_count(), 1);
    }

    #[tokio::test]
    async fn test_abort_between_chunks() {
        let backend = SimulatedBackend::with_timing(10, Duration::from_millis(5));
        let item = item("a.txt", 100);
        let mut handle = backend
            .begin(&item, &TransferOptions::for_item(&item))
            .await
            .unwrap();
        handle.abort();

        let mut saw_aborted = false;
        while let Some(signal) = handle.recv().await {
            if matches!(signal, TransferSignal::Aborted) {
                saw_aborted = true;
            }
        }
        assert!(saw_aborted);
        assert_eq!(backend.stored_node_count(), 0);
    }

    #[tokio::test]
    async fn test_configured_failure() {
        let backend =
            SimulatedBackend::with_timing(3, Duration::from_millis(1)).fail_on("bad.txt");
        let item = item("bad.txt", 100);
        let mut handle = backend
            .begin(&item, &TransferOptions::for_item(&item))
            .await
            .unwrap();

        let mut saw_error = false;
        while let Some(signal) = handle.recv().await {
            if matches!(signal, TransferSignal::Error(TransferError::Network(_))) {
                saw_error = true;
            }
        }
        assert!(saw_error);
        assert_eq!(backend.stored_node_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_node_errors() {
        let backend = SimulatedBackend::new();
        assert!(matches!(
            backend.delete_node("node-404", true).await,
            Err(TransferError::NotFound(_))
        ));
    }
}
