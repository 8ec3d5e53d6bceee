//! Queue item types: requests submitted by callers and the promoted
//! items tracked by the queue manager.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::upload_status::UploadStatus;

/// Unique identifier for a queued upload, assigned at admission time.
///
/// The active-transfer registry is keyed by this id rather than by the
/// filename, so duplicate filenames in one queue cannot collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(u64);

impl ItemId {
    pub(crate) fn new(id: u64) -> Self {
        ItemId(id)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        ItemId(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upload-{}", self.0)
    }
}

/// Caller-supplied knobs for a single upload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Relative destination path, also used for folder-exclusion matching
    pub path: Option<String>,
    /// Identifier of the destination parent folder
    pub parent_id: Option<String>,
    /// Upload as a new version of an existing node instead of auto-renaming
    pub new_version: bool,
    /// Bump the major version rather than the minor one (new-version uploads)
    pub major_version: bool,
    /// Version comment (new-version uploads)
    pub comment: Option<String>,
    /// Override the node type assigned by the server
    pub node_type: Option<String>,
}

/// What callers hand to [`enqueue`](crate::services::upload_queue::UploadQueue::enqueue)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// File name, matched against the filename exclusion patterns
    pub name: String,
    /// Size in bytes, drives the safe-abort heuristic
    pub size: u64,
    /// Pre-existing remote node to update, if any
    pub remote_id: Option<String>,
    pub options: UploadOptions,
}

impl UploadRequest {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        UploadRequest {
            name: name.into(),
            size,
            remote_id: None,
            options: UploadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }
}

/// Byte-level progress of an in-flight transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
    /// Percentage (0.0 to 100.0), reported by the backend
    pub percent: f64,
}

impl UploadProgress {
    pub fn new(loaded: u64, total: u64) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            (loaded as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        };
        UploadProgress {
            loaded,
            total,
            percent,
        }
    }
}

/// Result payload returned by the backend on success
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadData {
    /// Server-assigned node identifier, used for post-hoc deletion
    pub id: String,
    /// Additional entry metadata the backend chose to return
    pub metadata: Option<serde_json::Value>,
}

impl UploadData {
    pub fn new(id: impl Into<String>) -> Self {
        UploadData {
            id: id.into(),
            metadata: None,
        }
    }
}

/// A request promoted into the queue.
///
/// Owned by the queue while pending/active; terminal items pass to
/// whoever drains the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadItem {
    pub id: ItemId,
    pub name: String,
    pub size: u64,
    /// Pre-existing remote node to update, if any
    pub remote_id: Option<String>,
    pub options: UploadOptions,
    pub status: UploadStatus,
    pub progress: UploadProgress,
    /// HTTP-ish status code captured from the last backend error
    pub error_code: Option<u16>,
    /// Backend result, present once the upload completed
    pub data: Option<UploadData>,
}

impl UploadItem {
    pub(crate) fn from_request(id: ItemId, request: UploadRequest) -> Self {
        let progress = UploadProgress {
            loaded: 0,
            total: request.size,
            percent: 0.0,
        };
        UploadItem {
            id,
            name: request.name,
            size: request.size,
            remote_id: request.remote_id,
            options: request.options,
            status: UploadStatus::Pending,
            progress,
            error_code: None,
            data: None,
        }
    }

    /// Remote node id of the finished upload, when the backend reported one
    pub fn remote_node_id(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.id.as_str())
    }
}
