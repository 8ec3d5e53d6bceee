//! Registry of live transfer handles, keyed by stable item id.
//!
//! Keeps the bookkeeping for in-flight uploads explicit: one entry is
//! inserted when the driver starts a transfer and removed on its
//! terminal outcome. The registry lives inside the queue state and is
//! only touched under the queue lock.

use std::collections::HashMap;

use crate::model::upload_item::{ItemId, UploadItem};
use crate::services::transfer_backend::AbortSignal;

/// Bookkeeping entry for one in-flight upload.
///
/// Holds the canonical copy of the item while its transfer runs; the
/// queue slot is mirrored from it so events keep firing even after
/// `clear()` dropped the slot.
#[derive(Debug)]
pub struct ActiveEntry {
    /// Canonical item state during the flight
    pub item: UploadItem,
    /// Shared abort flag of the transfer handle
    pub abort: AbortSignal,
    /// Set by `cancel()`; a success signal arriving while this is set is
    /// treated as aborted and the remote artifact is cleaned up
    pub cancel_requested: bool,
}

impl ActiveEntry {
    /// Requests an abort of the underlying transfer
    pub fn request_abort(&self) {
        self.abort.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

/// Map of in-flight transfers with insert-on-start/remove-on-terminal
/// discipline. With a single-flight driver it holds at most one entry,
/// but the structure does not depend on that.
#[derive(Debug, Default)]
pub struct TransferRegistry {
    entries: HashMap<ItemId, ActiveEntry>,
}

impl TransferRegistry {
    pub fn new() -> Self {
        TransferRegistry {
            entries: HashMap::new(),
        }
    }

    /// Registers a transfer the moment it starts
    pub fn insert(&mut self, id: ItemId, entry: ActiveEntry) {
        self.entries.insert(id, entry);
    }

    /// Removes a transfer on its terminal outcome, returning the entry
    pub fn remove(&mut self, id: ItemId) -> Option<ActiveEntry> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: ItemId) -> Option<&ActiveEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut ActiveEntry> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
