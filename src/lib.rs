//! # Upload Queue Library
//!
//! This library provides the core functionality of the upload queue
//! manager: queue admission with glob-based exclusion filtering,
//! single-flight transfer scheduling, cancellation with a safe-abort
//! heuristic, and lifecycle event streams for observers.
//!
//! The library is primarily used by the upload-queue demo binary, but
//! can also be embedded by any application that brings its own
//! transfer backend.

#![forbid(unsafe_code)]

pub mod model;
pub mod services;
pub mod settings;
pub mod utils;
