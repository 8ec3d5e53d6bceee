//! This module provides the queue manager itself plus the contracts it
//! consumes: the transfer backend, the remote-delete side channel and
//! the admission filter.

pub mod admission;
pub mod events;
pub mod simulated_backend;
pub mod transfer_backend;
pub mod transfer_registry;
pub mod upload_queue;
