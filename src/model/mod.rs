//! This module provides common objects used throughout the entire crate

pub mod error;
pub mod event;
pub mod upload_item;
pub mod upload_status;
