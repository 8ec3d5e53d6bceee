//! Structured error types for transfer and remote-store operations

use std::fmt;

/// Errors reported by a transfer backend for a single upload.
///
/// Captured per item and surfaced through the error event stream; these
/// never halt the queue driver.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferError {
    /// Access denied - insufficient permissions on the destination
    AccessDenied(String),
    /// Destination folder or node not found
    NotFound(String),
    /// Name clash or version conflict at the destination
    Conflict(String),
    /// Content exceeded a server-side quota or size limit
    QuotaExceeded(String),
    /// Network or connectivity error
    Network(String),
    /// No signal from the backend within the configured stall timeout
    Timeout(String),
    /// Generic transfer error
    Other(String),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            TransferError::NotFound(msg) => write!(f, "Not found: {}", msg),
            TransferError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            TransferError::QuotaExceeded(msg) => write!(f, "Quota exceeded: {}", msg),
            TransferError::Network(msg) => write!(f, "Network error: {}", msg),
            TransferError::Timeout(msg) => write!(f, "Timed out: {}", msg),
            TransferError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransferError {}

impl TransferError {
    /// Create a TransferError from an error message, attempting to categorize it
    pub fn from_message(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("access denied") || msg_lower.contains("permission") {
            TransferError::AccessDenied(msg)
        } else if msg_lower.contains("not found") || msg_lower.contains("no such") {
            TransferError::NotFound(msg)
        } else if msg_lower.contains("conflict") || msg_lower.contains("already exists") {
            TransferError::Conflict(msg)
        } else if msg_lower.contains("quota") || msg_lower.contains("too large") {
            TransferError::QuotaExceeded(msg)
        } else if msg_lower.contains("network") || msg_lower.contains("connection") {
            TransferError::Network(msg)
        } else if msg_lower.contains("timeout") || msg_lower.contains("timed out") {
            TransferError::Timeout(msg)
        } else {
            TransferError::Other(msg)
        }
    }

    /// Create a TransferError from an HTTP status code returned by the server
    pub fn from_status(code: u16, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        match code {
            401 | 403 => TransferError::AccessDenied(msg),
            404 => TransferError::NotFound(msg),
            409 => TransferError::Conflict(msg),
            413 | 507 => TransferError::QuotaExceeded(msg),
            408 | 504 => TransferError::Timeout(msg),
            502 | 503 => TransferError::Network(msg),
            _ => TransferError::Other(msg),
        }
    }

    /// HTTP-ish status code recorded on the item as its error code
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransferError::AccessDenied(_) => Some(403),
            TransferError::NotFound(_) => Some(404),
            TransferError::Conflict(_) => Some(409),
            TransferError::QuotaExceeded(_) => Some(413),
            TransferError::Network(_) => Some(503),
            TransferError::Timeout(_) => Some(408),
            TransferError::Other(_) => None,
        }
    }
}

/// Result type for backend transfer operations
pub type TransferResult<T = ()> = Result<T, TransferError>;
